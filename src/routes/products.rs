use axum::{
    Form, Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, Query, State, multipart::MultipartError,
        rejection::FormRejection,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::PrivateCookieJar;
use uuid::Uuid;

use crate::{
    dto::products::{HomePage, NewProduct, NewProductForm, ProductList, UpdateDiscountForm},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, MaybeUser, wants_json},
    models::Product,
    response::{ApiResponse, FormNotice, Meta},
    routes::{params::ProductQuery, redirect_with, rendered},
    services::product_service,
    session::flash::Flash,
    state::AppState,
};

/// Upper bound for a product image upload.
pub const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .route(
            "/add-product",
            post(create_product).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
        .route("/updatediscount", post(update_discount))
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Storefront with the pending flash notice", body = ApiResponse<HomePage>)
    ),
    tag = "Products"
)]
pub async fn home(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: PrivateCookieJar,
) -> AppResult<impl IntoResponse> {
    let products = product_service::storefront(&state).await?;
    let (jar, flash) = Flash::take(jar);
    let page = HomePage {
        products,
        user_id: user.map(|u| u.user_id),
        flash,
    };
    Ok((jar, Json(ApiResponse::success("Home", page, Some(Meta::empty())))))
}

#[utoipa::path(
    get,
    path = "/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "List products", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found")
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = product_service::get_product(&state, id).await?;
    Ok(Json(ApiResponse::success("Product", product, None)))
}

#[utoipa::path(
    post,
    path = "/add-product",
    request_body(content = NewProductForm, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Product created, redirect to /"),
        (status = 200, description = "Form re-rendered with the error", body = ApiResponse<FormNotice>)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    jar: PrivateCookieJar,
    mut multipart: Multipart,
) -> Response {
    let result = match read_new_product(&mut multipart).await {
        Ok(payload) => product_service::create_product(&state, &user, payload).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(product) => redirect_with(
            &state,
            jar,
            Flash::success(format!("{} added", product.title)),
            "/",
        ),
        Err(err) if wants_json(&headers) => err.into_response(),
        Err(err) => rendered(err),
    }
}

#[utoipa::path(
    post,
    path = "/updatediscount",
    request_body(content = UpdateDiscountForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Discount changed, redirect to /"),
        (status = 200, description = "Form re-rendered with the error", body = ApiResponse<FormNotice>)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_discount(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    jar: PrivateCookieJar,
    form: Result<Form<UpdateDiscountForm>, FormRejection>,
) -> Response {
    let result = match form {
        Ok(Form(payload)) => product_service::update_discount(&state, &user, payload).await,
        Err(rejection) => Err(rejection.into()),
    };
    match result {
        Ok(product) => redirect_with(
            &state,
            jar,
            Flash::success(format!(
                "Discount for {} set to {}%",
                product.title, product.discount
            )),
            "/",
        ),
        Err(err) if wants_json(&headers) => err.into_response(),
        Err(err) => rendered(err),
    }
}

async fn read_new_product(multipart: &mut Multipart) -> AppResult<NewProduct> {
    let mut product = NewProduct::default();
    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            product.image_name = field.file_name().map(str::to_string);
            product.image = Some(field.bytes().await.map_err(invalid_form)?.to_vec());
            continue;
        }

        let text = field.text().await.map_err(invalid_form)?;
        match name.as_str() {
            "title" => product.title = Some(text),
            "description" => product.description = Some(text),
            "category" => product.category = Some(text),
            "price" => product.price = parse_number(&text, "Price")?,
            "discount" => product.discount = parse_number(&text, "Discount")?,
            "stock_quantity" => product.stock_quantity = parse_number(&text, "Stock quantity")?,
            _ => {}
        }
    }
    Ok(product)
}

/// Blank means "not supplied".
fn parse_number<T: std::str::FromStr>(raw: &str, label: &str) -> AppResult<Option<T>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| AppError::Validation(format!("{label} must be a whole number")))
}

fn invalid_form(err: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid form data: {}", err.body_text()))
}
