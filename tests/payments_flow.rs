mod common;

use std::sync::Arc;

use async_trait::async_trait;
use order_portal::{
    dto::{orders::CreateOrderForm, reviews::ReviewForm},
    error::AppError,
    gateway::{
        CreatedIntent, GatewayError, IntentMetadata, IntentSnapshot, PaymentGateway,
        mock::MockGateway,
    },
    middleware::auth::AuthUser,
    models::{PaymentMethod, PaymentStatus},
    repository,
    services::{
        order_service,
        payment_service::{self, PaymentOutcome},
        review_service,
    },
    state::AppState,
};
use uuid::Uuid;

// Integration flow: checkout, COD and card settlement, replay protection and review gating.
#[tokio::test]
async fn payment_and_review_flow() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let gateway = Arc::new(MockGateway::default());
    let state = common::setup_state(&database_url, gateway.clone()).await?;

    cash_on_delivery_settles_without_transaction(&state).await?;
    card_payment_is_verified_and_idempotent(&state, &gateway).await?;
    foreign_intent_is_forbidden(&state, &gateway).await?;
    amount_must_match_pending_total(&state, &gateway).await?;
    reviews_require_a_settled_purchase(&state).await?;

    let lenient = Arc::new(LenientGateway(MockGateway::default()));
    let lenient_state = common::setup_state(&database_url, lenient.clone()).await?;
    confirmed_intent_pays_for_one_bag_only(&lenient_state, &lenient.0).await?;

    Ok(())
}

/// Resolves ids the way a REST gateway resolves a URL path: the query string is
/// dropped and case is folded.
struct LenientGateway(MockGateway);

#[async_trait]
impl PaymentGateway for LenientGateway {
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        metadata: IntentMetadata,
    ) -> Result<CreatedIntent, GatewayError> {
        self.0.create_intent(amount, currency, metadata).await
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<IntentSnapshot, GatewayError> {
        let path_id = intent_id.split('?').next().unwrap_or_default();
        self.0.retrieve_intent(&path_id.to_ascii_lowercase()).await
    }
}

async fn add_line(state: &AppState, user: &AuthUser, price: i64, quantity: i32) -> anyhow::Result<Uuid> {
    let product = common::create_product(state, price, 10, 20).await?;
    order_service::create_order(
        state,
        user,
        CreateOrderForm {
            product_id: product.id,
            quantity,
        },
    )
    .await?;
    Ok(product.id)
}

async fn cash_on_delivery_settles_without_transaction(state: &AppState) -> anyhow::Result<()> {
    let user = common::create_user(state).await?;
    assert!(!payment_service::start_checkout(state, &user).await?);

    add_line(state, &user, 1_000, 1).await?;
    add_line(state, &user, 2_000, 2).await?;
    assert!(payment_service::start_checkout(state, &user).await?);

    // Case-insensitive method name.
    let method = PaymentMethod::parse("cod").expect("cod parses");
    let outcome = payment_service::pay(state, &user, method, None).await?;
    let PaymentOutcome::Settled(settlement) = outcome else {
        panic!("expected a settlement, got {outcome:?}");
    };
    assert_eq!(settlement.status, PaymentStatus::Cod);
    assert_eq!(settlement.orders.len(), 2);
    assert_eq!(settlement.amount, 900 + 2 * 1_800);
    assert_eq!(settlement.transaction_id, None);

    for order_id in &settlement.orders {
        let payment = repository::payments::find_for_order(&state.orm, *order_id)
            .await?
            .expect("payment row");
        assert_eq!(payment.method, "Cash on Delivery");
        assert_eq!(payment.status, "completed");
        assert!(payment.transaction_id.is_none());
    }

    assert!(!payment_service::start_checkout(state, &user).await?);
    let again = payment_service::pay(state, &user, PaymentMethod::CashOnDelivery, None).await?;
    assert_eq!(again, PaymentOutcome::NothingPending);
    Ok(())
}

async fn card_payment_is_verified_and_idempotent(
    state: &AppState,
    gateway: &MockGateway,
) -> anyhow::Result<()> {
    let user = common::create_user(state).await?;
    add_line(state, &user, 5_000, 1).await?;

    let page = payment_service::payment_page(state, &user)
        .await?
        .expect("something to pay");
    assert_eq!(page.total_amount, 4_500);
    assert_eq!(page.order_count, 1);

    let card = PaymentMethod::Online("card".into());

    let err = payment_service::pay(state, &user, card.clone(), None).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = payment_service::pay(state, &user, card.clone(), Some("pi_unknown"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Not confirmed yet.
    let err = payment_service::pay(state, &user, card.clone(), Some(&page.intent_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref msg) if msg == "Payment has not been completed"));

    gateway.confirm(&page.intent_id)?;
    let outcome = payment_service::pay(state, &user, card.clone(), Some(&page.intent_id)).await?;
    let PaymentOutcome::Settled(settlement) = outcome else {
        panic!("expected a settlement, got {outcome:?}");
    };
    assert_eq!(settlement.status, PaymentStatus::Paid);
    assert_eq!(settlement.amount, 4_500);
    let transaction_id = settlement.transaction_id.expect("card payments record a transaction");

    let payment = repository::payments::find_for_order(&state.orm, settlement.orders[0])
        .await?
        .expect("payment row");
    assert_eq!(payment.transaction_id, Some(transaction_id));
    assert_eq!(payment.method, "card");

    // Replayed confirmation.
    let replay = payment_service::pay(state, &user, card, Some(&page.intent_id)).await?;
    assert_eq!(replay, PaymentOutcome::AlreadyProcessed);
    assert_eq!(
        repository::payments::count_transactions_for_intent(&state.orm, &page.intent_id).await?,
        1
    );

    let lines = order_service::list_orders(state, &user, user.user_id).await?;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].payment_status.as_deref(), Some("PAID"));
    Ok(())
}

async fn foreign_intent_is_forbidden(state: &AppState, gateway: &MockGateway) -> anyhow::Result<()> {
    let owner = common::create_user(state).await?;
    let intruder = common::create_user(state).await?;
    add_line(state, &owner, 3_000, 1).await?;
    add_line(state, &intruder, 3_000, 1).await?;

    let page = payment_service::payment_page(state, &owner)
        .await?
        .expect("something to pay");
    gateway.confirm(&page.intent_id)?;

    let err = payment_service::pay(
        state,
        &intruder,
        PaymentMethod::Online("card".into()),
        Some(&page.intent_id),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(payment_service::start_checkout(state, &intruder).await?);
    Ok(())
}

async fn amount_must_match_pending_total(
    state: &AppState,
    gateway: &MockGateway,
) -> anyhow::Result<()> {
    let user = common::create_user(state).await?;
    add_line(state, &user, 1_000, 1).await?;

    let page = payment_service::payment_page(state, &user)
        .await?
        .expect("something to pay");
    gateway.confirm(&page.intent_id)?;

    // The bag grew after the intent was created.
    add_line(state, &user, 1_000, 1).await?;

    let err = payment_service::pay(
        state,
        &user,
        PaymentMethod::Online("card".into()),
        Some(&page.intent_id),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(
        repository::payments::count_transactions_for_intent(&state.orm, &page.intent_id).await?,
        0
    );
    Ok(())
}

async fn reviews_require_a_settled_purchase(state: &AppState) -> anyhow::Result<()> {
    let user = common::create_user(state).await?;
    let never_bought = common::create_product(state, 700, 10, 5).await?;

    let review = |product_id: Uuid, rating: i32| ReviewForm {
        product_id,
        rating,
        comment: Some("  Solid build  ".into()),
    };

    for product_id in [never_bought.id, Uuid::new_v4()] {
        let err = review_service::add_review(state, &user, review(product_id, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)), "{product_id}: {err:?}");
    }

    let bought = add_line(state, &user, 700, 1).await?;
    let err = review_service::add_review(state, &user, review(bought, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "pending lines do not count");

    payment_service::pay(state, &user, PaymentMethod::CashOnDelivery, None).await?;

    for rating in [0, 6] {
        let err = review_service::add_review(state, &user, review(bought, rating))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    let created = review_service::add_review(state, &user, review(bought, 4)).await?;
    assert_eq!(created.comment.as_deref(), Some("Solid build"));

    let err = review_service::add_review(state, &user, review(bought, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let listed = review_service::list_reviews(state, bought).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].user_email, user.email);
    assert_eq!(listed[0].rating, 4);

    let err = review_service::list_reviews(state, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

async fn confirmed_intent_pays_for_one_bag_only(
    state: &AppState,
    gateway: &MockGateway,
) -> anyhow::Result<()> {
    let user = common::create_user(state).await?;
    let card = PaymentMethod::Online("card".into());

    add_line(state, &user, 1_000, 1).await?;
    let page = payment_service::payment_page(state, &user)
        .await?
        .expect("something to pay");
    gateway.confirm(&page.intent_id)?;
    let first = payment_service::pay(state, &user, card.clone(), Some(&page.intent_id)).await?;
    assert!(matches!(first, PaymentOutcome::Settled(_)));

    // A second bag with the same total.
    add_line(state, &user, 1_000, 1).await?;
    for variant in [
        format!("{}?replay=1", page.intent_id),
        page.intent_id.to_uppercase(),
    ] {
        let err = payment_service::pay(state, &user, card.clone(), Some(&variant))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::Validation(ref msg) if msg == "Payment intent is invalid"),
            "{variant}: {err:?}"
        );
        assert_eq!(
            repository::payments::count_transactions_for_intent(&state.orm, &variant).await?,
            0
        );
    }

    let replay = payment_service::pay(state, &user, card, Some(&page.intent_id)).await?;
    assert_eq!(replay, PaymentOutcome::AlreadyProcessed);
    assert_eq!(
        repository::payments::count_transactions_for_intent(&state.orm, &page.intent_id).await?,
        1
    );

    assert!(payment_service::start_checkout(state, &user).await?);
    let statuses: Vec<_> = order_service::list_orders(state, &user, user.user_id)
        .await?
        .into_iter()
        .map(|line| line.payment_status)
        .collect();
    assert_eq!(statuses.iter().filter(|s| s.as_deref() == Some("PAID")).count(), 1);
    Ok(())
}
