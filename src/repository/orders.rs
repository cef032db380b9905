use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, Func, LockType},
};
use uuid::Uuid;

use crate::{
    entity::{
        orders::{ActiveModel, Column, Entity as Orders, Model},
        products::{Entity as Products, Model as ProductModel},
    },
    models::PaymentStatus,
};

/// Case-insensitive match on the settled statuses (COD, PAID).
fn settled() -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col(Column::PaymentStatus))).is_in(["cod", "paid"])
}

fn pending() -> sea_orm::sea_query::SimpleExpr {
    Column::PaymentStatus.eq(PaymentStatus::Pending.as_str())
}

pub async fn find_pending_by_user<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<Vec<Model>, DbErr> {
    Orders::find()
        .filter(Column::UserId.eq(user_id))
        .filter(pending())
        .order_by_asc(Column::CreatedAt)
        .all(conn)
        .await
}

/// Same as [`find_pending_by_user`], row-locking the lines for the rest of the transaction.
pub async fn find_pending_by_user_for_update<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<Vec<Model>, DbErr> {
    Orders::find()
        .filter(Column::UserId.eq(user_id))
        .filter(pending())
        .order_by_asc(Column::CreatedAt)
        .lock(LockType::Update)
        .all(conn)
        .await
}

pub async fn has_pending<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> Result<bool, DbErr> {
    let count = Orders::find()
        .filter(Column::UserId.eq(user_id))
        .filter(pending())
        .count(conn)
        .await?;
    Ok(count > 0)
}

pub async fn find_pending_for_product<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<Option<Model>, DbErr> {
    Orders::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::ProductId.eq(product_id))
        .filter(pending())
        .one(conn)
        .await
}

/// A pending order owned by the user, locked for deletion.
pub async fn find_pending_owned<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Model>, DbErr> {
    Orders::find()
        .filter(
            Condition::all()
                .add(Column::Id.eq(order_id))
                .add(Column::UserId.eq(user_id))
                .add(pending()),
        )
        .lock(LockType::Update)
        .one(conn)
        .await
}

/// The settled, undelivered order for (user, product), locked for update.
pub async fn find_deliverable<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<Option<Model>, DbErr> {
    Orders::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::ProductId.eq(product_id))
        .filter(Column::IsDelivered.eq(false))
        .filter(settled())
        .order_by_asc(Column::CreatedAt)
        .lock(LockType::Update)
        .one(conn)
        .await
}

pub async fn has_delivered<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<bool, DbErr> {
    let count = Orders::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::ProductId.eq(product_id))
        .filter(Column::IsDelivered.eq(true))
        .filter(settled())
        .count(conn)
        .await?;
    Ok(count > 0)
}

/// True when the user holds a COD or PAID order for the product.
pub async fn has_settled_purchase<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<bool, DbErr> {
    let count = Orders::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::ProductId.eq(product_id))
        .filter(settled())
        .count(conn)
        .await?;
    Ok(count > 0)
}

pub async fn count_by_user<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> Result<u64, DbErr> {
    Orders::find()
        .filter(Column::UserId.eq(user_id))
        .count(conn)
        .await
}

pub async fn list_with_products<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<Vec<(Model, ProductModel)>, DbErr> {
    let rows = Orders::find()
        .filter(Column::UserId.eq(user_id))
        .order_by_desc(Column::CreatedAt)
        .find_also_related(Products)
        .all(conn)
        .await?;
    // product_id is a foreign key, so the join always finds a row.
    Ok(rows
        .into_iter()
        .filter_map(|(order, product)| product.map(|p| (order, p)))
        .collect())
}

pub async fn insert_pending<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    total_price: i64,
) -> Result<Model, DbErr> {
    ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
        total_price: Set(total_price),
        payment_status: Set(PaymentStatus::Pending.as_str().to_string()),
        is_delivered: Set(false),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(conn)
    .await
}

pub async fn set_payment_status<C: ConnectionTrait>(
    conn: &C,
    order: Model,
    status: PaymentStatus,
) -> Result<Model, DbErr> {
    let mut active: ActiveModel = order.into();
    active.payment_status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await
}

pub async fn mark_delivered<C: ConnectionTrait>(conn: &C, order: Model) -> Result<Model, DbErr> {
    let mut active: ActiveModel = order.into();
    active.is_delivered = Set(true);
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await
}

pub async fn delete<C: ConnectionTrait>(conn: &C, order: Model) -> Result<(), DbErr> {
    Orders::delete_by_id(order.id).exec(conn).await?;
    Ok(())
}
