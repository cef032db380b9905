//! In-process gateway for development and tests. Intents start unconfirmed unless the
//! gateway auto-confirms; tests flip them to succeeded or failed explicitly.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use super::{
    CreatedIntent, GatewayError, IntentMetadata, IntentSnapshot, IntentStatus, PaymentGateway,
};

#[derive(Debug, Clone)]
struct MockIntent {
    amount: i64,
    owner: Uuid,
    status: IntentStatus,
}

#[derive(Debug, Default)]
pub struct MockGateway {
    intents: Mutex<HashMap<String, MockIntent>>,
    auto_confirm: bool,
}

impl MockGateway {
    /// Every intent reports `succeeded` as soon as it exists. Used by the dev server.
    pub fn auto_confirming() -> Self {
        Self {
            intents: Mutex::default(),
            auto_confirm: true,
        }
    }

    pub fn confirm(&self, intent_id: &str) -> Result<(), GatewayError> {
        self.set_status(intent_id, IntentStatus::Succeeded)
    }

    pub fn fail(&self, intent_id: &str) -> Result<(), GatewayError> {
        self.set_status(intent_id, IntentStatus::Failed)
    }

    fn set_status(&self, intent_id: &str, status: IntentStatus) -> Result<(), GatewayError> {
        let mut intents = self
            .intents
            .lock()
            .map_err(|_| GatewayError::Rejected("mock gateway poisoned".into()))?;
        let intent = intents
            .get_mut(intent_id)
            .ok_or_else(|| GatewayError::UnknownIntent(intent_id.to_string()))?;
        intent.status = status;
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_intent(
        &self,
        amount: i64,
        _currency: &str,
        metadata: IntentMetadata,
    ) -> Result<CreatedIntent, GatewayError> {
        if amount <= 0 {
            return Err(GatewayError::Rejected("amount must be greater than zero".into()));
        }
        let intent_id = format!("mock_pi_{}", Uuid::new_v4().simple());
        let client_secret = format!("{intent_id}_secret_{}", Uuid::new_v4().simple());
        self.intents
            .lock()
            .map_err(|_| GatewayError::Rejected("mock gateway poisoned".into()))?
            .insert(
                intent_id.clone(),
                MockIntent {
                    amount,
                    owner: metadata.user_id,
                    status: if self.auto_confirm {
                        IntentStatus::Succeeded
                    } else {
                        IntentStatus::RequiresPayment
                    },
                },
            );
        tracing::debug!(%intent_id, amount, "mock intent created");
        Ok(CreatedIntent {
            intent_id,
            client_secret,
        })
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<IntentSnapshot, GatewayError> {
        let intents = self
            .intents
            .lock()
            .map_err(|_| GatewayError::Rejected("mock gateway poisoned".into()))?;
        let intent = intents
            .get(intent_id)
            .ok_or_else(|| GatewayError::UnknownIntent(intent_id.to_string()))?;
        Ok(IntentSnapshot {
            intent_id: intent_id.to_string(),
            status: intent.status,
            amount: intent.amount,
            owner: Some(intent.owner),
        })
    }
}
