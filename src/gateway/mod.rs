//! Payment processor seam. The ledger only ever trusts what [`PaymentGateway::retrieve_intent`]
//! reports, never a success claim coming from the browser.

pub mod mock;
pub mod stripe;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment intent {0} not found")]
    UnknownIntent(String),

    #[error("gateway rejected request: {0}")]
    Rejected(String),

    #[error("gateway transport error")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPayment,
    Processing,
    Succeeded,
    Canceled,
    Failed,
}

impl IntentStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "succeeded" => IntentStatus::Succeeded,
            "processing" => IntentStatus::Processing,
            "canceled" => IntentStatus::Canceled,
            "requires_payment_method" | "requires_confirmation" | "requires_action"
            | "requires_capture" => IntentStatus::RequiresPayment,
            _ => IntentStatus::Failed,
        }
    }
}

/// Gateway intent ids are plain tokens such as `pi_3Nq...`. Anything else never
/// reaches a gateway URL or the transactions table.
pub fn is_well_formed_intent_id(intent_id: &str) -> bool {
    !intent_id.is_empty()
        && intent_id.len() <= 255
        && intent_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[derive(Debug, Clone)]
pub struct IntentMetadata {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatedIntent {
    pub intent_id: String,
    pub client_secret: String,
}

/// The gateway's authoritative view of an intent.
#[derive(Debug, Clone)]
pub struct IntentSnapshot {
    pub intent_id: String,
    pub status: IntentStatus,
    pub amount: i64,
    /// Owner recorded in the intent metadata at creation time.
    pub owner: Option<Uuid>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        metadata: IntentMetadata,
    ) -> Result<CreatedIntent, GatewayError>;

    async fn retrieve_intent(&self, intent_id: &str) -> Result<IntentSnapshot, GatewayError>;
}
