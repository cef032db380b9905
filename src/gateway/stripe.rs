//! Stripe PaymentIntents over the REST API.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::{
    CreatedIntent, GatewayError, IntentMetadata, IntentSnapshot, IntentStatus, PaymentGateway,
    is_well_formed_intent_id,
};

const API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> Self {
        Self::with_base_url(secret_key, API_BASE.to_string())
    }

    pub fn with_base_url(secret_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
            base_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeIntent {
    id: String,
    status: String,
    amount: i64,
    client_secret: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
    code: Option<String>,
}

async fn read_intent(resp: reqwest::Response, intent_id: Option<&str>) -> Result<StripeIntent, GatewayError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<StripeIntent>().await?);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        if let Some(id) = intent_id {
            return Err(GatewayError::UnknownIntent(id.to_string()));
        }
    }
    let detail = resp
        .json::<StripeErrorBody>()
        .await
        .ok()
        .map(|body| {
            body.error
                .message
                .or(body.error.code)
                .unwrap_or_else(|| "unknown error".to_string())
        })
        .unwrap_or_else(|| format!("HTTP {status}"));
    Err(GatewayError::Rejected(detail))
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        metadata: IntentMetadata,
    ) -> Result<CreatedIntent, GatewayError> {
        let amount = amount.to_string();
        let user_id = metadata.user_id.to_string();
        let resp = self
            .client
            .post(format!("{}/payment_intents", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", currency),
                ("automatic_payment_methods[enabled]", "true"),
                ("metadata[user_id]", user_id.as_str()),
            ])
            .send()
            .await?;

        let intent = read_intent(resp, None).await?;
        let client_secret = intent
            .client_secret
            .ok_or_else(|| GatewayError::Rejected("intent has no client secret".into()))?;
        tracing::info!(intent_id = %intent.id, "stripe intent created");
        Ok(CreatedIntent {
            intent_id: intent.id,
            client_secret,
        })
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<IntentSnapshot, GatewayError> {
        if !is_well_formed_intent_id(intent_id) {
            return Err(GatewayError::UnknownIntent(intent_id.to_string()));
        }
        let resp = self
            .client
            .get(format!("{}/payment_intents/{intent_id}", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;

        let intent = read_intent(resp, Some(intent_id)).await?;
        Ok(IntentSnapshot {
            owner: intent
                .metadata
                .get("user_id")
                .and_then(|raw| Uuid::parse_str(raw).ok()),
            status: IntentStatus::parse(&intent.status),
            amount: intent.amount,
            intent_id: intent.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_ids_never_reach_the_api() {
        // Nothing listens here; a request would surface as a transport error.
        let gateway = StripeGateway::with_base_url("sk_test".into(), "http://127.0.0.1:9".into());
        for id in ["pi_123?expand[]=customer", "pi_123/capture", ""] {
            assert!(matches!(
                gateway.retrieve_intent(id).await,
                Err(GatewayError::UnknownIntent(_))
            ));
        }
    }
}
