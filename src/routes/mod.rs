use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    middleware::from_fn,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    error::AppError,
    middleware::csrf::csrf_protect,
    response::{ApiResponse, FormNotice, Meta},
    session::flash::Flash,
    state::AppState,
};

pub mod auth;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod payments;
pub mod products;
pub mod reviews;

/// Every page and form endpoint, without state.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(products::router())
        .merge(orders::router())
        .merge(payments::router())
        .merge(reviews::router())
}

/// The full application with CSRF protection, docs and the not-found fallback.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(create_router())
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .layer(from_fn(csrf_protect))
        .with_state(state)
}

pub async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}

/// Re-renders a form: business rejections come back as a 200 page notice,
/// infrastructure failures keep their status.
pub(crate) fn rendered(err: AppError) -> Response {
    if err.is_rejection() {
        err.log();
        Json(ApiResponse::<FormNotice>::rendered_error(err.public_message())).into_response()
    } else {
        err.into_response()
    }
}

pub(crate) fn redirect_with(
    state: &AppState,
    jar: PrivateCookieJar,
    flash: Flash,
    to: &str,
) -> Response {
    (flash.set(jar, &state.config), Redirect::to(to)).into_response()
}

/// Redirects with the rejection as a flash error. Infrastructure failures are not redirected.
pub(crate) fn redirect_with_error(
    state: &AppState,
    jar: PrivateCookieJar,
    err: AppError,
    to: &str,
) -> Response {
    if !err.is_rejection() {
        return err.into_response();
    }
    err.log();
    redirect_with(state, jar, Flash::error(err.public_message()), to)
}

pub(crate) fn order_list_path(user_id: uuid::Uuid) -> String {
    format!("/products/get-orders/{user_id}")
}
