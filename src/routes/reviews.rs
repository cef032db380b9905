use axum::{
    Form, Json, Router,
    extract::{Path, State, rejection::FormRejection},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::PrivateCookieJar;
use uuid::Uuid;

use crate::{
    dto::reviews::{ReviewForm, ReviewList},
    error::AppResult,
    middleware::auth::{AuthUser, wants_json},
    response::ApiResponse,
    routes::{redirect_with, redirect_with_error},
    services::review_service,
    session::flash::Flash,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add-review", post(add_review))
        .route("/products/{id}/reviews", get(list_reviews))
}

#[utoipa::path(
    post,
    path = "/add-review",
    request_body(content = ReviewForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the product page with a flash notice"),
        (status = 403, description = "API clients: product not purchased")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn add_review(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    jar: PrivateCookieJar,
    form: Result<Form<ReviewForm>, FormRejection>,
) -> Response {
    let (back, result) = match form {
        Ok(Form(payload)) => (
            format!("/products/{}", payload.product_id),
            review_service::add_review(&state, &user, payload).await,
        ),
        Err(rejection) => ("/".to_string(), Err(rejection.into())),
    };
    match result {
        Ok(_) => redirect_with(&state, jar, Flash::success("Thanks for your review"), &back),
        Err(err) if wants_json(&headers) => err.into_response(),
        Err(err) => redirect_with_error(&state, jar, err, &back),
    }
}

#[utoipa::path(
    get,
    path = "/products/{id}/reviews",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Reviews with the reviewer's email", body = ApiResponse<ReviewList>),
        (status = 404, description = "Product not found")
    ),
    tag = "Reviews"
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let items = review_service::list_reviews(&state, id).await?;
    Ok(Json(ApiResponse::success("Reviews", ReviewList { items }, None)))
}
