use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::entity::{
    payments::{ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments, Model as PaymentModel},
    transactions::{
        ActiveModel as TransactionActive, Column as TransactionCol, Entity as Transactions,
        Model as TransactionModel,
    },
};

pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_SUCCESS: &str = "success";

/// A payment row for the order is proof the order was already settled.
pub async fn exists_for_order<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> Result<bool, DbErr> {
    let count = Payments::find()
        .filter(PaymentCol::OrderId.eq(order_id))
        .count(conn)
        .await?;
    Ok(count > 0)
}

pub async fn find_for_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Option<PaymentModel>, DbErr> {
    Payments::find()
        .filter(PaymentCol::OrderId.eq(order_id))
        .one(conn)
        .await
}

pub async fn find_transaction_by_intent<C: ConnectionTrait>(
    conn: &C,
    intent_id: &str,
) -> Result<Option<TransactionModel>, DbErr> {
    Transactions::find()
        .filter(TransactionCol::IntentId.eq(intent_id))
        .one(conn)
        .await
}

pub async fn insert_transaction<C: ConnectionTrait>(
    conn: &C,
    intent_id: &str,
    amount: i64,
) -> Result<TransactionModel, DbErr> {
    TransactionActive {
        id: Set(Uuid::new_v4()),
        intent_id: Set(intent_id.to_string()),
        amount: Set(amount),
        status: Set(STATUS_SUCCESS.to_string()),
        created_at: NotSet,
    }
    .insert(conn)
    .await
}

pub async fn insert_payment<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    transaction_id: Option<Uuid>,
    amount: i64,
    method: &str,
) -> Result<PaymentModel, DbErr> {
    PaymentActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        transaction_id: Set(transaction_id),
        amount: Set(amount),
        method: Set(method.to_string()),
        status: Set(STATUS_COMPLETED.to_string()),
        created_at: NotSet,
    }
    .insert(conn)
    .await
}

pub async fn count_transactions_for_intent<C: ConnectionTrait>(
    conn: &C,
    intent_id: &str,
) -> Result<u64, DbErr> {
    Transactions::find()
        .filter(TransactionCol::IntentId.eq(intent_id))
        .count(conn)
        .await
}
