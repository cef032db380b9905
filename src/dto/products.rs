use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{models::Product, session::flash::Flash};

/// Parsed multipart body of the add-product form.
#[derive(Debug, Default)]
pub struct NewProduct {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub discount: Option<i32>,
    pub category: Option<String>,
    pub stock_quantity: Option<i32>,
    pub image_name: Option<String>,
    pub image: Option<Vec<u8>>,
}

/// Documents the multipart fields of `POST /add-product`.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct NewProductForm {
    pub title: String,
    pub description: String,
    /// Minor currency units.
    pub price: i64,
    pub discount: i32,
    pub category: String,
    pub stock_quantity: Option<i32>,
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDiscountForm {
    pub product_id: Uuid,
    pub discount: i32,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

/// Page model of the storefront.
#[derive(Serialize, ToSchema)]
pub struct HomePage {
    pub products: Vec<Product>,
    pub user_id: Option<Uuid>,
    pub flash: Option<Flash>,
}
