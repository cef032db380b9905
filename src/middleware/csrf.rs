//! Double-submit anti-forgery check. Every browser gets a `csrf_token` cookie; unsafe
//! cookie-authenticated requests must echo it in `x-csrf-token` or a `csrf_token` form field.

use axum::{
    Form,
    body::{Body, to_bytes},
    extract::{FromRequest, Request},
    http::{HeaderMap, Method, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

const FORM_BUFFER_LIMIT: usize = 64 * 1024;

/// Token for the current browser, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct CsrfToken(pub String);

#[derive(Deserialize)]
struct CsrfField {
    #[serde(default)]
    csrf_token: Option<String>,
}

fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

fn rejected() -> Response {
    AppError::Forbidden("CSRF token missing or invalid".into()).into_response()
}

pub async fn csrf_protect(jar: CookieJar, mut request: Request, next: Next) -> Response {
    let existing = jar.get(CSRF_COOKIE).map(|c| c.value().to_string());

    if is_safe(request.method()) {
        let (token, fresh) = match existing {
            Some(token) => (token, false),
            None => (new_token(), true),
        };
        request.extensions_mut().insert(CsrfToken(token.clone()));
        let response = next.run(request).await;
        if !fresh {
            return response;
        }
        let cookie = Cookie::build((CSRF_COOKIE, token))
            .path("/")
            .same_site(SameSite::Strict)
            .build();
        return (jar.add(cookie), response).into_response();
    }

    // Bearer-authenticated calls do not ride on ambient cookies.
    if request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|raw| raw.starts_with("Bearer "))
    {
        return next.run(request).await;
    }

    let Some(expected) = existing else {
        return rejected();
    };

    let from_header = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let (request, submitted) = match from_header {
        Some(token) => (request, Some(token)),
        None if is_form(request.headers()) => {
            let (parts, body) = request.into_parts();
            let Ok(bytes) = to_bytes(body, FORM_BUFFER_LIMIT).await else {
                return rejected();
            };
            let mut peek = Request::new(Body::from(bytes.clone()));
            *peek.method_mut() = parts.method.clone();
            *peek.headers_mut() = parts.headers.clone();
            let submitted = match Form::<CsrfField>::from_request(peek, &()).await {
                Ok(Form(field)) => field.csrf_token,
                Err(_) => None,
            };
            (Request::from_parts(parts, Body::from(bytes)), submitted)
        }
        None => (request, None),
    };

    match submitted {
        Some(token) if token == expected => {
            let mut request = request;
            request.extensions_mut().insert(CsrfToken(expected));
            next.run(request).await
        }
        _ => {
            tracing::warn!(uri = %request.uri(), "csrf check failed");
            rejected()
        }
    }
}
