use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use order_portal::{
    config::AppConfig,
    gateway::mock::MockGateway,
    middleware::csrf::{CSRF_COOKIE, CSRF_HEADER},
    routes::create_app,
    state::AppState,
};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

/// Router over a database handle that is never connected; only paths that stay
/// off the database are exercised here.
fn app() -> Router {
    let config = AppConfig::for_tests("postgres://unused", "surface-secret");
    let state = AppState::new(
        DatabaseConnection::Disconnected,
        config,
        Arc::new(MockGateway::default()),
    );
    create_app(state)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookie_values(response: &axum::response::Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn health_reports_database_state() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["message"], "Health check");
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "unavailable");
}

#[tokio::test]
async fn unknown_paths_get_a_json_not_found() {
    let response = app()
        .oneshot(Request::get("/no/such/page").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["data"]["path"], "/no/such/page");
}

#[tokio::test]
async fn safe_requests_issue_a_csrf_cookie() {
    let response = app()
        .oneshot(Request::get("/csrf").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookie_values(&response);
    let issued = cookies
        .iter()
        .find_map(|c| c.strip_prefix(&format!("{CSRF_COOKIE}=")))
        .and_then(|rest| rest.split(';').next())
        .map(str::to_string)
        .expect("csrf cookie");

    let body = json_body(response).await;
    assert_eq!(body["data"]["csrf_token"], issued.as_str());
}

#[tokio::test]
async fn existing_csrf_cookie_is_not_reissued() {
    let response = app()
        .oneshot(
            Request::get("/csrf")
                .header(header::COOKIE, format!("{CSRF_COOKIE}=known-token"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(set_cookie_values(&response).is_empty());
    let body = json_body(response).await;
    assert_eq!(body["data"]["csrf_token"], "known-token");
}

#[tokio::test]
async fn unsafe_form_without_csrf_token_is_forbidden() {
    let response = app()
        .oneshot(
            Request::post("/order")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!("product_id={}&quantity=1", Uuid::new_v4())))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn mismatched_csrf_token_is_forbidden() {
    let response = app()
        .oneshot(
            Request::post("/order")
                .header(header::COOKIE, format!("{CSRF_COOKIE}=expected"))
                .header(CSRF_HEADER, "forged")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn csrf_form_field_passes_through_to_authentication() {
    let response = app()
        .oneshot(
            Request::post("/order")
                .header(header::COOKIE, format!("{CSRF_COOKIE}=expected"))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!(
                    "csrf_token=expected&product_id={}&quantity=1",
                    Uuid::new_v4()
                )))
                .unwrap(),
        )
        .await
        .unwrap();
    // Token accepted; the anonymous browser is sent to log in.
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn anonymous_browser_is_redirected_to_login() {
    let response = app()
        .oneshot(
            Request::get(format!("/products/get-orders/{}", Uuid::new_v4()))
                .header(header::ACCEPT, "text/html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn anonymous_api_client_gets_401() {
    let response = app()
        .oneshot(
            Request::get(format!("/products/get-orders/{}", Uuid::new_v4()))
                .header(header::ACCEPT, "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_bearer_is_401_and_skips_csrf() {
    let response = app()
        .oneshot(
            Request::post("/checkout/start")
                .header(header::AUTHORIZATION, "Bearer not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn stale_session_cookie_is_cleared() {
    let response = app()
        .oneshot(
            Request::get("/logout")
                .header(header::COOKIE, "session=garbage")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(
        set_cookie_values(&response)
            .iter()
            .any(|c| c.starts_with("session=") && c.contains("Max-Age=0")),
        "session cookie should be removed"
    );
}

#[tokio::test]
async fn docs_are_served() {
    let response = app()
        .oneshot(Request::get("/docs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
