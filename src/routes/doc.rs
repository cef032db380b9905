use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{CsrfResponse, LoginForm, LoginResponse, PasswordResetForm, RegisterForm},
        orders::{CategoryLine, CreateOrderForm, DeliveryUpdate, OrderLine, ProductManagerLine},
        payments::{PaymentForm, PaymentPage},
        products::{HomePage, NewProductForm, ProductList, UpdateDiscountForm},
        reviews::{ReviewForm, ReviewList, ReviewResponse},
    },
    models::{PaymentStatus, Product},
    response::{ApiResponse, FormNotice, Meta},
    routes::{auth, health, orders, params, payments, products, reviews},
    session::flash::{Flash, FlashKind},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::csrf_token,
        auth::register,
        auth::login,
        auth::logout,
        auth::reset_password,
        products::home,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_discount,
        orders::create_order,
        orders::list_orders,
        orders::product_manager_view,
        orders::category_view,
        orders::cancel_order,
        orders::update_delivery,
        payments::start_checkout,
        payments::payment_page,
        payments::pay,
        reviews::add_review,
        reviews::list_reviews
    ),
    components(
        schemas(
            Product,
            PaymentStatus,
            RegisterForm,
            LoginForm,
            PasswordResetForm,
            LoginResponse,
            CsrfResponse,
            NewProductForm,
            UpdateDiscountForm,
            ProductList,
            HomePage,
            Flash,
            FlashKind,
            CreateOrderForm,
            OrderLine,
            ProductManagerLine,
            CategoryLine,
            DeliveryUpdate,
            PaymentForm,
            PaymentPage,
            ReviewForm,
            ReviewResponse,
            ReviewList,
            FormNotice,
            params::Pagination,
            params::SortOrder,
            params::ProductSortBy,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<FormNotice>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and password reset"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Orders", description = "Order ledger endpoints"),
        (name = "Payments", description = "Checkout and payment endpoints"),
        (name = "Reviews", description = "Product review endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
