use axum::{
    Form, Json, Router,
    extract::{Path, State, rejection::FormRejection},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post, put},
};
use axum_extra::extract::PrivateCookieJar;
use uuid::Uuid;

use crate::{
    dto::orders::{
        CategoryLine, CreateOrderForm, DeliveryUpdate, OrderLine, OrderLines, ProductManagerLine,
    },
    error::AppResult,
    middleware::auth::{AuthUser, wants_json},
    response::ApiResponse,
    routes::{order_list_path, redirect_with, redirect_with_error},
    services::order_service,
    session::flash::Flash,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/order", post(create_order))
        .route("/products/get-orders/{user_id}", get(list_orders))
        .route(
            "/products/get-orders/{user_id}/productmanager",
            get(product_manager_view),
        )
        .route("/products/get-orders/{user_id}/category", get(category_view))
        .route("/orders/cancel/{id}", post(cancel_order))
        .route("/updatedeliver/{product_id}", put(update_delivery))
}

#[utoipa::path(
    post,
    path = "/order",
    request_body(content = CreateOrderForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Pending order created (or rejected), redirect to / with a flash notice"),
        (status = 409, description = "API clients: duplicate pending order or out of stock")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    jar: PrivateCookieJar,
    form: Result<Form<CreateOrderForm>, FormRejection>,
) -> Response {
    let result = match form {
        Ok(Form(payload)) => order_service::create_order(&state, &user, payload).await,
        Err(rejection) => Err(rejection.into()),
    };
    match result {
        Ok(_) => redirect_with(&state, jar, Flash::success("Added to your bag"), "/"),
        Err(err) if wants_json(&headers) => err.into_response(),
        Err(err) => redirect_with_error(&state, jar, err, "/"),
    }
}

#[utoipa::path(
    get,
    path = "/products/get-orders/{user_id}",
    params(("user_id" = Uuid, Path, description = "Must be the caller's own id")),
    responses(
        (status = 200, description = "Order lines of the caller", body = ApiResponse<OrderLines<OrderLine>>),
        (status = 403, description = "Another user's orders")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderLines<OrderLine>>>> {
    let items = order_service::list_orders(&state, &user, user_id).await?;
    Ok(Json(ApiResponse::success("Orders", OrderLines { items }, None)))
}

#[utoipa::path(
    get,
    path = "/products/get-orders/{user_id}/productmanager",
    params(("user_id" = Uuid, Path, description = "Must be the caller's own id")),
    responses(
        (status = 200, description = "Pricing view of the caller's orders", body = ApiResponse<OrderLines<ProductManagerLine>>),
        (status = 403, description = "Another user's orders")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn product_manager_view(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderLines<ProductManagerLine>>>> {
    let items = order_service::product_manager_view(&state, &user, user_id).await?;
    Ok(Json(ApiResponse::success("Product manager", OrderLines { items }, None)))
}

#[utoipa::path(
    get,
    path = "/products/get-orders/{user_id}/category",
    params(("user_id" = Uuid, Path, description = "Must be the caller's own id")),
    responses(
        (status = 200, description = "Category view of the caller's orders", body = ApiResponse<OrderLines<CategoryLine>>),
        (status = 403, description = "Another user's orders")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn category_view(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderLines<CategoryLine>>>> {
    let items = order_service::category_view(&state, &user, user_id).await?;
    Ok(Json(ApiResponse::success("Categories", OrderLines { items }, None)))
}

#[utoipa::path(
    post,
    path = "/orders/cancel/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 303, description = "Redirect to the order list with a flash notice")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    jar: PrivateCookieJar,
    Path(id): Path<Uuid>,
) -> Response {
    let back = order_list_path(user.user_id);
    match order_service::cancel_order(&state, &user, id).await {
        Ok(Some(_)) => redirect_with(&state, jar, Flash::success("Order cancelled"), &back),
        Ok(None) => redirect_with(
            &state,
            jar,
            Flash::error("Order not found or no longer pending"),
            &back,
        ),
        Err(err) => redirect_with_error(&state, jar, err, &back),
    }
}

#[utoipa::path(
    put,
    path = "/updatedeliver/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product of the settled order")),
    responses(
        (status = 303, description = "Delivered, redirect to the order list"),
        (status = 200, description = "API clients: delivered", body = ApiResponse<DeliveryUpdate>),
        (status = 404, description = "No settled undelivered order for this product"),
        (status = 400, description = "Order already delivered")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    Path(product_id): Path<Uuid>,
) -> AppResult<Response> {
    let update = order_service::update_delivery(&state, &user, product_id).await?;
    if wants_json(&headers) {
        return Ok(Json(ApiResponse::success("Delivered", update, None)).into_response());
    }
    Ok(Redirect::to(&order_list_path(user.user_id)).into_response())
}
