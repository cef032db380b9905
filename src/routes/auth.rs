use axum::{
    Extension, Form, Json, Router,
    extract::{State, rejection::FormRejection},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::{CookieJar, PrivateCookieJar};

use crate::{
    dto::auth::{CsrfResponse, LoginForm, LoginResponse, PasswordResetForm, RegisterForm},
    entity::users::Model as UserModel,
    middleware::{
        auth::{AuthUser, wants_json},
        csrf::CsrfToken,
    },
    response::{ApiResponse, FormNotice},
    routes::{redirect_with, rendered},
    services::auth_service,
    session::{self, CHECKOUT_COOKIE, FLASH_COOKIE, SESSION_COOKIE, flash::Flash},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/csrf", get(csrf_token))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/password", post(reset_password))
}

#[utoipa::path(
    get,
    path = "/csrf",
    responses(
        (status = 200, description = "Anti-forgery token of this browser", body = ApiResponse<CsrfResponse>)
    ),
    tag = "Auth"
)]
pub async fn csrf_token(Extension(CsrfToken(token)): Extension<CsrfToken>) -> Json<ApiResponse<CsrfResponse>> {
    Json(ApiResponse::success(
        "CSRF token",
        CsrfResponse { csrf_token: token },
        None,
    ))
}

#[utoipa::path(
    post,
    path = "/register",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Registered; session cookie set, redirect to /"),
        (status = 200, description = "Form re-rendered with the error, or a bearer token for API clients", body = ApiResponse<LoginResponse>),
        (status = 409, description = "API clients: email already registered", body = ApiResponse<FormNotice>)
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: CookieJar,
    jar: PrivateCookieJar,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> Response {
    let api = wants_json(&headers);
    let result = match form {
        Ok(Form(payload)) => auth_service::register_user(&state, payload).await,
        Err(rejection) => Err(rejection.into()),
    };
    match result {
        Ok(user) => signed_in(&state, cookies, jar, &user, api, "Registered successfully"),
        Err(err) if api => err.into_response(),
        Err(err) => rendered(err),
    }
}

#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Logged in; session cookie set, redirect to /"),
        (status = 200, description = "Form re-rendered with the error, or a bearer token for API clients", body = ApiResponse<LoginResponse>)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: CookieJar,
    jar: PrivateCookieJar,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let api = wants_json(&headers);
    let result = match form {
        Ok(Form(payload)) => auth_service::login_user(&state, payload).await,
        Err(rejection) => Err(rejection.into()),
    };
    match result {
        Ok(user) => signed_in(&state, cookies, jar, &user, api, "Logged in successfully"),
        Err(err) if api => err.into_response(),
        Err(err) => rendered(err),
    }
}

#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 303, description = "Session, checkout and flash cookies cleared")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    user: AuthUser,
    cookies: CookieJar,
    jar: PrivateCookieJar,
) -> impl IntoResponse {
    tracing::debug!(user_id = %user.user_id, "logout");
    let cookies = cookies.remove(session::removal(SESSION_COOKIE));
    let jar = jar
        .remove(session::removal(CHECKOUT_COOKIE))
        .remove(session::removal(FLASH_COOKIE));
    (cookies, jar, Redirect::to("/"))
}

#[utoipa::path(
    post,
    path = "/password",
    request_body(content = PasswordResetForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Password replaced, redirect to /login"),
        (status = 200, description = "Form re-rendered with the error", body = ApiResponse<FormNotice>)
    ),
    tag = "Auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: PrivateCookieJar,
    form: Result<Form<PasswordResetForm>, FormRejection>,
) -> Response {
    let result = match form {
        Ok(Form(payload)) => auth_service::reset_password(&state, payload).await,
        Err(rejection) => Err(rejection.into()),
    };
    match result {
        Ok(()) => redirect_with(
            &state,
            jar,
            Flash::success("Password updated, please login"),
            "/login",
        ),
        Err(err) if wants_json(&headers) => err.into_response(),
        Err(err) => rendered(err),
    }
}

/// Browsers get the session cookie and a redirect home; API clients get the token.
fn signed_in(
    state: &AppState,
    cookies: CookieJar,
    jar: PrivateCookieJar,
    user: &UserModel,
    api: bool,
    notice: &str,
) -> Response {
    let token = match auth_service::issue_session(state, user) {
        Ok(token) => token,
        Err(err) => return err.into_response(),
    };

    if api {
        let body = ApiResponse::success(
            notice,
            LoginResponse {
                token: format!("Bearer {token}"),
            },
            None,
        );
        return Json(body).into_response();
    }

    let cookies = cookies.add(session::cookie(SESSION_COOKIE, token, &state.config));
    (cookies, redirect_with(state, jar, Flash::success(notice), "/")).into_response()
}
