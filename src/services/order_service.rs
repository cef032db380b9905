use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CategoryLine, CreateOrderForm, DeliveryUpdate, OrderLine, ProductManagerLine},
    entity::{orders::Model as OrderModel, products::Model as ProductModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::PaymentStatus,
    pricing,
    repository::{self, is_unique_violation},
    state::AppState,
};

const DUPLICATE_PENDING: &str = "Product already in a bag";

/// Adds a pending line for the product and takes its quantity out of stock.
///
/// The product row stays locked from the stock check until commit, so two
/// requests for the last unit cannot both succeed. Stock and the new line are
/// committed together or not at all.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderForm,
) -> AppResult<OrderModel> {
    let CreateOrderForm {
        product_id,
        quantity,
    } = payload;
    let cap = state.config.max_order_quantity;
    if quantity <= 0 || quantity > cap {
        return Err(AppError::Validation(format!(
            "Quantity must be between 1 and {cap}"
        )));
    }

    let txn = state.orm.begin().await?;

    let product = repository::products::find_by_id_for_update(&txn, product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    if product.stock_quantity <= 0 {
        return Err(AppError::OutOfStock(format!("{} is out of stock", product.title)));
    }
    if quantity > product.stock_quantity {
        return Err(AppError::Validation(format!(
            "Only {} left in stock",
            product.stock_quantity
        )));
    }

    if repository::orders::find_pending_for_product(&txn, user.user_id, product.id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(DUPLICATE_PENDING.into()));
    }

    let total_price = pricing::line_total(product.price, product.discount, quantity)
        .ok_or_else(|| AppError::Validation("Order total is too large".into()))?;

    if !repository::products::decrement_stock(&txn, product.id, quantity).await? {
        return Err(AppError::OutOfStock(format!("{} is out of stock", product.title)));
    }

    let order = match repository::orders::insert_pending(
        &txn,
        user.user_id,
        product.id,
        quantity,
        total_price,
    )
    .await
    {
        Ok(order) => order,
        Err(err) if is_unique_violation(&err) => {
            return Err(AppError::Conflict(DUPLICATE_PENDING.into()));
        }
        Err(err) => return Err(err.into()),
    };

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        product_id = %product.id,
        quantity,
        total_price,
        "order created"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_create",
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "product_id": product.id,
            "quantity": quantity,
            "total_price": total_price,
        }),
    )
    .await;

    Ok(order)
}

/// Deletes the caller's pending order. `None` when there was nothing to cancel
/// (unknown id, someone else's order, or no longer pending).
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<Option<OrderModel>> {
    let txn = state.orm.begin().await?;

    let Some(order) = repository::orders::find_pending_owned(&txn, order_id, user.user_id).await?
    else {
        tracing::debug!(%order_id, user_id = %user.user_id, "nothing to cancel");
        return Ok(None);
    };

    repository::orders::delete(&txn, order.clone()).await?;
    let restocked = state.config.restock_on_cancel;
    if restocked {
        repository::products::increment_stock(&txn, order.product_id, order.quantity).await?;
    }

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        product_id = %order.product_id,
        restocked,
        "order cancelled"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_cancel",
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "product_id": order.product_id,
            "restocked": restocked,
        }),
    )
    .await;

    Ok(Some(order))
}

/// Marks the caller's settled, undelivered order for the product as delivered.
pub async fn update_delivery(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<DeliveryUpdate> {
    let txn = state.orm.begin().await?;

    let Some(order) =
        repository::orders::find_deliverable(&txn, user.user_id, product_id).await?
    else {
        if repository::orders::has_delivered(&txn, user.user_id, product_id).await? {
            return Err(AppError::AlreadyDelivered);
        }
        return Err(AppError::NotFound("Order not found or unpaid".into()));
    };

    let order = repository::orders::mark_delivered(&txn, order).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        %product_id,
        "order delivered"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_delivered",
        "orders",
        serde_json::json!({ "order_id": order.id, "product_id": product_id }),
    )
    .await;

    Ok(DeliveryUpdate {
        order_id: order.id,
        is_delivered: order.is_delivered,
    })
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
) -> AppResult<Vec<OrderLine>> {
    let rows = owned_rows(state, user, user_id).await?;
    Ok(rows
        .into_iter()
        .map(|(order, product)| OrderLine {
            order_id: order.id,
            product_id: product.id,
            title: product.title,
            description: product.description,
            total_price: order.total_price,
            quantity: order.quantity,
            is_delivered: order.is_delivered,
            payment_status: visible_status(&order.payment_status),
        })
        .collect())
}

pub async fn product_manager_view(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
) -> AppResult<Vec<ProductManagerLine>> {
    let rows = owned_rows(state, user, user_id).await?;
    Ok(rows
        .into_iter()
        .map(|(order, product)| ProductManagerLine {
            product_id: product.id,
            title: product.title,
            price: product.price,
            discount: product.discount,
            quantity: order.quantity,
            total_price: order.total_price,
        })
        .collect())
}

pub async fn category_view(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
) -> AppResult<Vec<CategoryLine>> {
    let rows = owned_rows(state, user, user_id).await?;
    Ok(rows
        .into_iter()
        .map(|(order, product)| CategoryLine {
            title: product.title,
            category: product.category,
            discount: product.discount,
            total_price: order.total_price,
        })
        .collect())
}

async fn owned_rows(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
) -> AppResult<Vec<(OrderModel, ProductModel)>> {
    user.ensure_self(user_id)?;
    Ok(repository::orders::list_with_products(&state.orm, user_id).await?)
}

/// Pending lines show no status; settled ones show the canonical spelling.
fn visible_status(raw: &str) -> Option<String> {
    match raw.parse::<PaymentStatus>() {
        Ok(PaymentStatus::Pending) => None,
        Ok(status) => Some(status.to_string()),
        Err(_) => Some(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_status_is_hidden() {
        assert_eq!(visible_status("pending"), None);
        assert_eq!(visible_status("cod"), Some("COD".into()));
        assert_eq!(visible_status("PAID"), Some("PAID".into()));
        assert_eq!(visible_status("refunded"), Some("refunded".into()));
    }
}
