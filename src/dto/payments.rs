use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentForm {
    /// `COD` or the name of an online method.
    pub method: String,
    /// Gateway intent being confirmed; required for online methods.
    pub intent_id: Option<String>,
}

/// Page model of the payment step.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentPage {
    pub total_amount: i64,
    pub currency: String,
    pub order_count: usize,
    pub intent_id: String,
    pub client_secret: String,
}
