use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::products;

/// Where an order line sits in its payment lifecycle.
///
/// Stored as text: `pending`, `COD`, `PAID`. Parsing is case-insensitive because
/// older rows carry lower-case values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PaymentStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "COD")]
    Cod,
    #[serde(rename = "PAID")]
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Cod => "COD",
            PaymentStatus::Paid => "PAID",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "cod" => Ok(PaymentStatus::Cod),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(format!("unknown payment status {other:?}")),
        }
    }
}

/// How a checkout batch is settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethod {
    CashOnDelivery,
    /// Card or other online method, named as the client sent it.
    Online(String),
}

impl PaymentMethod {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.eq_ignore_ascii_case("cod") || raw.eq_ignore_ascii_case("cash on delivery") {
            Some(PaymentMethod::CashOnDelivery)
        } else {
            Some(PaymentMethod::Online(raw.to_string()))
        }
    }

    /// Value recorded on the payment row.
    pub fn label(&self) -> &str {
        match self {
            PaymentMethod::CashOnDelivery => "Cash on Delivery",
            PaymentMethod::Online(name) => name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub discount: i32,
    pub image: String,
    pub category: String,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            price: model.price,
            discount: model.discount,
            image: model.image,
            category: model.category,
            stock_quantity: model.stock_quantity,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
