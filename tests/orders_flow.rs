mod common;

use std::sync::Arc;

use order_portal::{
    dto::{orders::CreateOrderForm, products::UpdateDiscountForm},
    entity::orders::ActiveModel as OrderActive,
    error::AppError,
    gateway::mock::MockGateway,
    middleware::auth::AuthUser,
    models::PaymentMethod,
    repository,
    services::{order_service, payment_service, product_service},
    state::AppState,
};
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

// Integration flow: pending lines, stock, cancel, delivery and the per-user views.
#[tokio::test]
async fn order_ledger_flow() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&database_url, Arc::new(MockGateway::default())).await?;

    total_is_frozen_at_discounted_price(&state).await?;
    rejected_orders_leave_stock_untouched(&state).await?;
    cancel_removes_only_own_pending_lines(&state).await?;
    cancel_can_restock_when_configured(&state).await?;
    delivery_happens_once(&state).await?;
    order_views_are_private(&state).await?;
    last_unit_goes_to_one_request(&state).await?;

    Ok(())
}

async fn order(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    quantity: i32,
) -> Result<order_portal::entity::orders::Model, AppError> {
    order_service::create_order(
        state,
        user,
        CreateOrderForm {
            product_id,
            quantity,
        },
    )
    .await
}

async fn total_is_frozen_at_discounted_price(state: &AppState) -> anyhow::Result<()> {
    let user = common::create_user(state).await?;
    let product = common::create_product(state, 100, 20, 10).await?;

    let created = order(state, &user, product.id, 2).await?;
    assert_eq!(created.total_price, 160);
    assert_eq!(created.payment_status, "pending");
    assert!(!created.is_delivered);
    assert_eq!(common::stock_of(state, product.id).await?, 8);

    product_service::update_discount(
        state,
        &user,
        UpdateDiscountForm {
            product_id: product.id,
            discount: 50,
        },
    )
    .await?;

    let lines = order_service::list_orders(state, &user, user.user_id).await?;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].total_price, 160);
    assert_eq!(lines[0].payment_status, None);

    let manager = order_service::product_manager_view(state, &user, user.user_id).await?;
    assert_eq!(manager[0].discount, 50);
    assert_eq!(manager[0].total_price, 160);
    Ok(())
}

async fn rejected_orders_leave_stock_untouched(state: &AppState) -> anyhow::Result<()> {
    let user = common::create_user(state).await?;
    let product = common::create_product(state, 250, 10, 3).await?;

    for quantity in [0, -1, 101] {
        let err = order(state, &user, product.id, quantity).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "quantity {quantity}: {err:?}");
    }

    let err = order(state, &user, product.id, 5).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(ref msg) if msg == "Only 3 left in stock"));

    let err = order(state, &user, Uuid::new_v4(), 1).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    assert_eq!(common::stock_of(state, product.id).await?, 3);
    assert_eq!(repository::orders::count_by_user(&state.orm, user.user_id).await?, 0);

    order(state, &user, product.id, 1).await?;
    let err = order(state, &user, product.id, 1).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ref msg) if msg == "Product already in a bag"));
    assert_eq!(common::stock_of(state, product.id).await?, 2);
    assert_eq!(repository::orders::count_by_user(&state.orm, user.user_id).await?, 1);

    let sold_out = common::create_product(state, 100, 10, 0).await?;
    let err = order(state, &user, sold_out.id, 1).await.unwrap_err();
    assert!(matches!(err, AppError::OutOfStock(_)));

    // A row written straight to the table can carry a price no form would accept.
    let priceless = common::create_product(state, 200_000_000_000_000_000, 10, 5).await?;
    let err = order(state, &user, priceless.id, 1).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(ref msg) if msg == "Order total is too large"));
    assert_eq!(common::stock_of(state, priceless.id).await?, 5);
    assert_eq!(repository::orders::count_by_user(&state.orm, user.user_id).await?, 1);
    Ok(())
}

async fn cancel_removes_only_own_pending_lines(state: &AppState) -> anyhow::Result<()> {
    let owner = common::create_user(state).await?;
    let stranger = common::create_user(state).await?;
    let product = common::create_product(state, 100, 20, 10).await?;

    let pending = order(state, &owner, product.id, 1).await?;
    assert_eq!(repository::orders::count_by_user(&state.orm, owner.user_id).await?, 1);

    assert!(order_service::cancel_order(state, &stranger, pending.id).await?.is_none());
    assert_eq!(repository::orders::count_by_user(&state.orm, owner.user_id).await?, 1);

    let cancelled = order_service::cancel_order(state, &owner, pending.id).await?;
    assert_eq!(cancelled.map(|o| o.id), Some(pending.id));
    assert_eq!(repository::orders::count_by_user(&state.orm, owner.user_id).await?, 0);
    // Stock stays reserved by default.
    assert_eq!(common::stock_of(state, product.id).await?, 9);

    // A settled line cannot be cancelled.
    let settled = order(state, &owner, product.id, 1).await?;
    payment_service::pay(state, &owner, PaymentMethod::CashOnDelivery, None).await?;
    assert!(order_service::cancel_order(state, &owner, settled.id).await?.is_none());
    assert_eq!(repository::orders::count_by_user(&state.orm, owner.user_id).await?, 1);
    Ok(())
}

async fn cancel_can_restock_when_configured(state: &AppState) -> anyhow::Result<()> {
    let state = common::with_config(state, |config| config.restock_on_cancel = true);
    let user = common::create_user(&state).await?;
    let product = common::create_product(&state, 100, 20, 10).await?;

    let pending = order(&state, &user, product.id, 4).await?;
    assert_eq!(common::stock_of(&state, product.id).await?, 6);
    order_service::cancel_order(&state, &user, pending.id).await?;
    assert_eq!(common::stock_of(&state, product.id).await?, 10);
    Ok(())
}

async fn delivery_happens_once(state: &AppState) -> anyhow::Result<()> {
    let user = common::create_user(state).await?;
    let stranger = common::create_user(state).await?;
    let product = common::create_product(state, 100, 20, 10).await?;

    let pending = order(state, &user, product.id, 1).await?;
    let err = order_service::update_delivery(state, &user, product.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "pending line: {err:?}");

    // Older rows spell the status in lower case.
    let mut active: OrderActive = pending.into();
    active.payment_status = Set("cod".into());
    active.update(&state.orm).await?;

    let err = order_service::update_delivery(state, &stranger, product.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let update = order_service::update_delivery(state, &user, product.id).await?;
    assert!(update.is_delivered);

    let err = order_service::update_delivery(state, &user, product.id).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyDelivered));

    let lines = order_service::list_orders(state, &user, user.user_id).await?;
    assert_eq!(lines[0].payment_status.as_deref(), Some("COD"));
    assert!(lines[0].is_delivered);
    Ok(())
}

async fn order_views_are_private(state: &AppState) -> anyhow::Result<()> {
    let user = common::create_user(state).await?;
    let other = common::create_user(state).await?;
    let product = common::create_product(state, 1_999, 15, 10).await?;
    order(state, &user, product.id, 3).await?;

    let err = order_service::list_orders(state, &other, user.user_id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let err = order_service::category_view(state, &other, user.user_id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let categories = order_service::category_view(state, &user, user.user_id).await?;
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].category, "Testing");
    // 1999 at 15% off rounds to 1699 per unit.
    assert_eq!(categories[0].total_price, 3 * 1_699);
    Ok(())
}

async fn last_unit_goes_to_one_request(state: &AppState) -> anyhow::Result<()> {
    let user = common::create_user(state).await?;
    let rival = common::create_user(state).await?;
    let product = common::create_product(state, 500, 10, 1).await?;
    let product_id = product.id;

    let tasks = [user.clone(), user.clone(), rival.clone()].map(|buyer| {
        let state = state.clone();
        tokio::spawn(async move {
            order_service::create_order(
                &state,
                &buyer,
                CreateOrderForm {
                    product_id,
                    quantity: 1,
                },
            )
            .await
        })
    });

    let mut created = 0;
    for task in tasks {
        match task.await? {
            Ok(_) => created += 1,
            Err(AppError::OutOfStock(_) | AppError::Conflict(_) | AppError::Validation(_)) => {}
            Err(other) => return Err(other.into()),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(common::stock_of(state, product.id).await?, 0);
    Ok(())
}
