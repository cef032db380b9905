use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::{
    reviews::{ActiveModel, Column, Entity as Reviews, Model},
    users::{Entity as Users, Model as UserModel},
};

pub async fn exists<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<bool, DbErr> {
    let count = Reviews::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::ProductId.eq(product_id))
        .count(conn)
        .await?;
    Ok(count > 0)
}

pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    product_id: Uuid,
    rating: i32,
    comment: Option<String>,
) -> Result<Model, DbErr> {
    ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        product_id: Set(product_id),
        rating: Set(rating),
        comment: Set(comment),
        created_at: NotSet,
    }
    .insert(conn)
    .await
}

pub async fn list_for_product<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<Vec<(Model, Option<UserModel>)>, DbErr> {
    Reviews::find()
        .filter(Column::ProductId.eq(product_id))
        .order_by_desc(Column::CreatedAt)
        .find_also_related(Users)
        .all(conn)
        .await
}
