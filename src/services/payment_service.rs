use sea_orm::{ConnectionTrait, TransactionTrait};
use uuid::Uuid;

use crate::{
    audit,
    dto::payments::PaymentPage,
    entity::orders::Model as OrderModel,
    error::{AppError, AppResult},
    gateway::{IntentMetadata, IntentStatus, is_well_formed_intent_id},
    middleware::auth::AuthUser,
    models::{PaymentMethod, PaymentStatus},
    pricing,
    repository::{self, is_unique_violation},
    state::AppState,
};

/// Result of a payment attempt that was not rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The caller had no pending orders.
    NothingPending,
    /// The intent was already recorded by an earlier confirmation.
    AlreadyProcessed,
    Settled(Settlement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub status: PaymentStatus,
    pub orders: Vec<Uuid>,
    pub amount: i64,
    pub transaction_id: Option<Uuid>,
}

/// Checkout may only start while something is waiting to be paid.
pub async fn start_checkout(state: &AppState, user: &AuthUser) -> AppResult<bool> {
    Ok(repository::orders::has_pending(&state.orm, user.user_id).await?)
}

/// Creates a gateway intent for everything the caller still owes.
/// `None` when nothing is pending.
pub async fn payment_page(state: &AppState, user: &AuthUser) -> AppResult<Option<PaymentPage>> {
    let pending = repository::orders::find_pending_by_user(&state.orm, user.user_id).await?;
    let outstanding = unpaid(&state.orm, pending).await?;
    if outstanding.is_empty() {
        return Ok(None);
    }

    let total_amount = total(&outstanding)?;
    let currency = state.config.currency.clone();
    let intent = state
        .gateway
        .create_intent(
            total_amount,
            &currency,
            IntentMetadata {
                user_id: user.user_id,
            },
        )
        .await?;

    tracing::debug!(
        user_id = %user.user_id,
        intent_id = %intent.intent_id,
        total_amount,
        "payment intent created"
    );

    Ok(Some(PaymentPage {
        total_amount,
        currency,
        order_count: outstanding.len(),
        intent_id: intent.intent_id,
        client_secret: intent.client_secret,
    }))
}

pub async fn pay(
    state: &AppState,
    user: &AuthUser,
    method: PaymentMethod,
    intent_id: Option<&str>,
) -> AppResult<PaymentOutcome> {
    let outcome = match &method {
        PaymentMethod::CashOnDelivery => pay_on_delivery(state, user).await?,
        PaymentMethod::Online(_) => {
            let intent_id = intent_id
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| AppError::Validation("Payment intent is required".into()))?;
            pay_online(state, user, &method, intent_id).await?
        }
    };

    if let PaymentOutcome::Settled(settlement) = &outcome {
        tracing::info!(
            user_id = %user.user_id,
            status = %settlement.status,
            orders = settlement.orders.len(),
            amount = settlement.amount,
            "orders settled"
        );
        audit::record(
            &state.orm,
            Some(user.user_id),
            "order_paid",
            "orders",
            serde_json::json!({
                "method": method.label(),
                "status": settlement.status.as_str(),
                "orders": settlement.orders,
                "amount": settlement.amount,
                "transaction_id": settlement.transaction_id,
                "intent_id": intent_id,
            }),
        )
        .await;
    }

    Ok(outcome)
}

/// Records a COD payment for each pending line that lacks one and flips the whole
/// batch to COD in a single commit.
async fn pay_on_delivery(state: &AppState, user: &AuthUser) -> AppResult<PaymentOutcome> {
    let method = PaymentMethod::CashOnDelivery;
    let txn = state.orm.begin().await?;

    let pending = repository::orders::find_pending_by_user_for_update(&txn, user.user_id).await?;
    if pending.is_empty() {
        return Ok(PaymentOutcome::NothingPending);
    }

    let mut orders = Vec::with_capacity(pending.len());
    let mut amount = 0;
    for order in pending {
        if !repository::payments::exists_for_order(&txn, order.id).await? {
            repository::payments::insert_payment(
                &txn,
                order.id,
                None,
                order.total_price,
                method.label(),
            )
            .await?;
            amount = pricing::sum([amount, order.total_price])
                .ok_or_else(|| AppError::Validation("Order total is too large".into()))?;
        }
        let order = repository::orders::set_payment_status(&txn, order, PaymentStatus::Cod).await?;
        orders.push(order.id);
    }

    txn.commit().await?;

    Ok(PaymentOutcome::Settled(Settlement {
        status: PaymentStatus::Cod,
        orders,
        amount,
        transaction_id: None,
    }))
}

/// Re-verifies the intent with the gateway, then records one transaction and one
/// payment per outstanding line. Replays of a recorded intent are a no-op.
async fn pay_online(
    state: &AppState,
    user: &AuthUser,
    method: &PaymentMethod,
    intent_id: &str,
) -> AppResult<PaymentOutcome> {
    if !is_well_formed_intent_id(intent_id) {
        return Err(AppError::Validation("Payment intent is invalid".into()));
    }
    let snapshot = state.gateway.retrieve_intent(intent_id).await?;
    // The recorded key is the gateway's id, never the string the client sent.
    if snapshot.intent_id != intent_id {
        tracing::warn!(
            user_id = %user.user_id,
            intent_id,
            resolved = %snapshot.intent_id,
            "payment intent id does not match the gateway's"
        );
        return Err(AppError::Validation("Payment intent is invalid".into()));
    }
    let intent_id = snapshot.intent_id.as_str();

    if snapshot.owner != Some(user.user_id) {
        tracing::warn!(
            user_id = %user.user_id,
            intent_id,
            owner = ?snapshot.owner,
            "payment intent owner mismatch"
        );
        return Err(AppError::Forbidden(
            "Payment does not belong to this account".into(),
        ));
    }
    if snapshot.status != IntentStatus::Succeeded {
        return Err(AppError::Validation("Payment has not been completed".into()));
    }

    if repository::payments::find_transaction_by_intent(&state.orm, intent_id)
        .await?
        .is_some()
    {
        tracing::info!(user_id = %user.user_id, intent_id, "payment intent already processed");
        return Ok(PaymentOutcome::AlreadyProcessed);
    }

    let txn = state.orm.begin().await?;

    let pending = repository::orders::find_pending_by_user_for_update(&txn, user.user_id).await?;
    let outstanding = unpaid(&txn, pending).await?;
    if outstanding.is_empty() {
        return Ok(PaymentOutcome::NothingPending);
    }

    let amount = total(&outstanding)?;
    if amount != snapshot.amount {
        return Err(AppError::Validation(
            "Payment amount does not match the pending total".into(),
        ));
    }

    let transaction =
        match repository::payments::insert_transaction(&txn, intent_id, snapshot.amount).await {
            Ok(transaction) => transaction,
            Err(err) if is_unique_violation(&err) => {
                tracing::info!(intent_id, "payment intent recorded concurrently");
                return Ok(PaymentOutcome::AlreadyProcessed);
            }
            Err(err) => return Err(err.into()),
        };

    let mut orders = Vec::with_capacity(outstanding.len());
    for order in outstanding {
        let inserted = repository::payments::insert_payment(
            &txn,
            order.id,
            Some(transaction.id),
            order.total_price,
            method.label(),
        )
        .await;
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => return Ok(PaymentOutcome::AlreadyProcessed),
            Err(err) => return Err(err.into()),
        }
        let order = repository::orders::set_payment_status(&txn, order, PaymentStatus::Paid).await?;
        orders.push(order.id);
    }

    txn.commit().await?;

    Ok(PaymentOutcome::Settled(Settlement {
        status: PaymentStatus::Paid,
        orders,
        amount,
        transaction_id: Some(transaction.id),
    }))
}

/// Drops lines that already carry a payment row.
async fn unpaid<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<OrderModel>,
) -> AppResult<Vec<OrderModel>> {
    let mut outstanding = Vec::with_capacity(orders.len());
    for order in orders {
        if !repository::payments::exists_for_order(conn, order.id).await? {
            outstanding.push(order);
        }
    }
    Ok(outstanding)
}

fn total(orders: &[OrderModel]) -> AppResult<i64> {
    pricing::sum(orders.iter().map(|order| order.total_price))
        .ok_or_else(|| AppError::Validation("Order total is too large".into()))
}
