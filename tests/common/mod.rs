#![allow(dead_code)]

use std::sync::Arc;

use order_portal::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::products::Model as ProductModel,
    gateway::PaymentGateway,
    middleware::auth::AuthUser,
    repository::{self, products::NewProductRow},
    state::AppState,
};
use uuid::Uuid;

/// Database flows need Postgres; without one they are skipped.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            None
        }
    }
}

pub async fn setup_state(
    database_url: &str,
    gateway: Arc<dyn PaymentGateway>,
) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;
    let config = AppConfig::for_tests(database_url, "integration-secret");
    Ok(AppState::new(orm, config, gateway))
}

/// Same database and gateway, different configuration.
pub fn with_config(state: &AppState, edit: impl FnOnce(&mut AppConfig)) -> AppState {
    let mut config = (*state.config).clone();
    edit(&mut config);
    AppState::new(state.orm.clone(), config, state.gateway.clone())
}

/// Rows are never truncated; every user and product gets a unique name instead.
pub async fn create_user(state: &AppState) -> anyhow::Result<AuthUser> {
    let email = format!("shopper-{}@example.com", Uuid::new_v4().simple());
    let user = repository::users::insert(&state.orm, &email, "not-a-real-hash".into()).await?;
    Ok(AuthUser {
        user_id: user.id,
        email: user.email,
    })
}

pub async fn create_product(
    state: &AppState,
    price: i64,
    discount: i32,
    stock_quantity: i32,
) -> anyhow::Result<ProductModel> {
    let product = repository::products::insert(
        &state.orm,
        NewProductRow {
            title: format!("Widget {}", Uuid::new_v4().simple()),
            description: "A product for testing".into(),
            price,
            discount,
            image: "uploads/widget.png".into(),
            category: "Testing".into(),
            stock_quantity,
        },
    )
    .await?;
    Ok(product)
}

pub async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let product = repository::products::find_by_id(&state.orm, product_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {product_id} vanished"))?;
    Ok(product.stock_quantity)
}
