use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use crate::entity::users::{ActiveModel, Column, Entity as Users, Model};

pub async fn find_by_id<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<Option<Model>, DbErr> {
    Users::find_by_id(id).one(conn).await
}

pub async fn find_by_email<C: ConnectionTrait>(
    conn: &C,
    email: &str,
) -> Result<Option<Model>, DbErr> {
    Users::find().filter(Column::Email.eq(email)).one(conn).await
}

pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    password_hash: String,
) -> Result<Model, DbErr> {
    ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        created_at: NotSet,
    }
    .insert(conn)
    .await
}

pub async fn replace_password_hash<C: ConnectionTrait>(
    conn: &C,
    user: Model,
    password_hash: String,
) -> Result<Model, DbErr> {
    let mut active: ActiveModel = user.into();
    active.password_hash = Set(password_hash);
    active.update(conn).await
}
