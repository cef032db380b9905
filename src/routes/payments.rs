use axum::{
    Form, Json, Router,
    extract::{State, rejection::FormRejection},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    dto::payments::{PaymentForm, PaymentPage},
    error::AppError,
    middleware::auth::{AuthUser, wants_json},
    models::{PaymentMethod, PaymentStatus},
    response::ApiResponse,
    routes::{redirect_with, redirect_with_error},
    services::payment_service::{self, PaymentOutcome},
    session::{checkout, flash::Flash},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout/start", post(start_checkout))
        .route("/payment", get(payment_page).post(pay))
}

#[utoipa::path(
    post,
    path = "/checkout/start",
    responses(
        (status = 303, description = "Capability granted, redirect to /payment; redirect to / when nothing is pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn start_checkout(
    State(state): State<AppState>,
    user: AuthUser,
    jar: PrivateCookieJar,
) -> Response {
    match payment_service::start_checkout(&state, &user).await {
        Ok(true) => {
            tracing::debug!(user_id = %user.user_id, "checkout started");
            let jar = checkout::grant(jar, user.user_id, &state.config);
            (jar, Redirect::to("/payment")).into_response()
        }
        Ok(false) => redirect_with(&state, jar, Flash::error("Your bag is empty"), "/"),
        Err(err) => redirect_with_error(&state, jar, err, "/"),
    }
}

#[utoipa::path(
    get,
    path = "/payment",
    responses(
        (status = 200, description = "Pending total and a fresh gateway intent", body = ApiResponse<PaymentPage>),
        (status = 303, description = "No checkout capability or nothing to pay, redirect to /")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn payment_page(
    State(state): State<AppState>,
    user: AuthUser,
    jar: PrivateCookieJar,
) -> Response {
    if !checkout::is_granted(&jar, user.user_id) {
        return not_authorized(&state, jar);
    }

    match payment_service::payment_page(&state, &user).await {
        Ok(Some(page)) => (jar, Json(ApiResponse::success("Payment", page, None))).into_response(),
        Ok(None) => redirect_with(
            &state,
            checkout::revoke(jar),
            Flash::error("Nothing to pay"),
            "/",
        ),
        Err(err) => redirect_with_error(&state, checkout::revoke(jar), err, "/"),
    }
}

#[utoipa::path(
    post,
    path = "/payment",
    request_body(content = PaymentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Settled (or nothing to do), redirect to /; rejected, redirect to /payment"),
        (status = 403, description = "The intent belongs to another account")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn pay(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    jar: PrivateCookieJar,
    form: Result<Form<PaymentForm>, FormRejection>,
) -> Response {
    if !checkout::is_granted(&jar, user.user_id) {
        return not_authorized(&state, jar);
    }

    let payload = match form {
        Ok(Form(payload)) => payload,
        Err(rejection) if wants_json(&headers) => return AppError::from(rejection).into_response(),
        Err(rejection) => {
            return redirect_with_error(&state, jar, rejection.into(), "/payment");
        }
    };

    let Some(method) = PaymentMethod::parse(&payload.method) else {
        return redirect_with(
            &state,
            jar,
            Flash::error("Choose a payment method"),
            "/payment",
        );
    };

    let result = payment_service::pay(&state, &user, method, payload.intent_id.as_deref()).await;
    match result {
        Ok(outcome) => {
            let notice = match outcome {
                PaymentOutcome::Settled(settlement) if settlement.status == PaymentStatus::Cod => {
                    Flash::success("Order placed, pay on delivery")
                }
                PaymentOutcome::Settled(_) => Flash::success("Payment completed"),
                PaymentOutcome::AlreadyProcessed => Flash::success("Payment already recorded"),
                PaymentOutcome::NothingPending => Flash::error("Nothing to pay"),
            };
            redirect_with(&state, checkout::revoke(jar), notice, "/")
        }
        Err(err @ AppError::Forbidden(_)) => (checkout::revoke(jar), err).into_response(),
        Err(err) if wants_json(&headers) => err.into_response(),
        Err(err) => redirect_with_error(&state, jar, err, "/payment"),
    }
}

fn not_authorized(state: &AppState, jar: PrivateCookieJar) -> Response {
    redirect_with(
        state,
        checkout::revoke(jar),
        Flash::error("Start checkout first"),
        "/",
    )
}
