use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QuerySelect, Set,
    sea_query::{Expr, Func, LockType},
};
use uuid::Uuid;

use crate::entity::products::{ActiveModel, Column, Entity as Products, Model};

pub async fn find_by_id<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<Option<Model>, DbErr> {
    Products::find_by_id(id).one(conn).await
}

/// Row-locks the product until the surrounding transaction ends.
pub async fn find_by_id_for_update<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<Option<Model>, DbErr> {
    Products::find_by_id(id)
        .lock(LockType::Update)
        .one(conn)
        .await
}

pub async fn find_by_title_ci<C: ConnectionTrait>(
    conn: &C,
    title: &str,
) -> Result<Option<Model>, DbErr> {
    Products::find()
        .filter(Expr::expr(Func::lower(Expr::col(Column::Title))).eq(title.trim().to_lowercase()))
        .one(conn)
        .await
}

pub struct NewProductRow {
    pub title: String,
    pub description: String,
    pub price: i64,
    pub discount: i32,
    pub image: String,
    pub category: String,
    pub stock_quantity: i32,
}

pub async fn insert<C: ConnectionTrait>(conn: &C, row: NewProductRow) -> Result<Model, DbErr> {
    ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(row.title),
        description: Set(row.description),
        price: Set(row.price),
        discount: Set(row.discount),
        image: Set(row.image),
        category: Set(row.category),
        stock_quantity: Set(row.stock_quantity),
        created_at: NotSet,
    }
    .insert(conn)
    .await
}

/// Decrements stock only while enough remains. Returns false when nothing was updated.
pub async fn decrement_stock<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    quantity: i32,
) -> Result<bool, DbErr> {
    let result = Products::update_many()
        .col_expr(
            Column::StockQuantity,
            Expr::col(Column::StockQuantity).sub(quantity),
        )
        .filter(Column::Id.eq(id))
        .filter(Column::StockQuantity.gte(quantity))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

pub async fn increment_stock<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    quantity: i32,
) -> Result<(), DbErr> {
    Products::update_many()
        .col_expr(
            Column::StockQuantity,
            Expr::col(Column::StockQuantity).add(quantity),
        )
        .filter(Column::Id.eq(id))
        .exec(conn)
        .await?;
    Ok(())
}

pub async fn set_discount<C: ConnectionTrait>(
    conn: &C,
    product: Model,
    discount: i32,
) -> Result<Model, DbErr> {
    let mut active: ActiveModel = product.into();
    active.discount = Set(discount);
    active.update(conn).await
}
