use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderForm {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// One line of the "my orders" page. `payment_status` is absent while pending.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLine {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    pub description: String,
    pub total_price: i64,
    pub quantity: i32,
    pub is_delivered: bool,
    pub payment_status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductManagerLine {
    pub product_id: Uuid,
    pub title: String,
    pub price: i64,
    pub discount: i32,
    pub quantity: i32,
    pub total_price: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryLine {
    pub title: String,
    pub category: String,
    pub discount: i32,
    pub total_price: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLines<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryUpdate {
    pub order_id: Uuid,
    pub is_delivered: bool,
}
