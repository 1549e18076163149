//! Behavior shared by every response: headers, panics, not found.

#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    http::{StatusCode, header},
    routing::get,
};
use snippetbox_integration_tests::{SESSION_COOKIE, TestApp};
use snippetbox_web::AppState;

async fn boom() -> &'static str {
    panic!("handler exploded")
}

fn assert_security_headers(headers: &axum::http::HeaderMap) {
    assert!(
        headers[header::CONTENT_SECURITY_POLICY]
            .to_str()
            .unwrap()
            .starts_with("default-src 'self'")
    );
    assert_eq!(headers[header::REFERRER_POLICY], "origin-when-cross-origin");
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "deny");
    assert_eq!(headers[header::X_XSS_PROTECTION], "0");
}

#[tokio::test]
async fn test_security_headers_on_every_kind_of_response() {
    let mut app = TestApp::new();

    for path in ["/", "/user/login", "/snippet/create", "/snippet/view/7", "/nope", "/static/css/main.css"] {
        let response = app.get(path).await;
        assert_security_headers(&response.headers);
    }
}

#[tokio::test]
async fn test_panic_is_recovered_and_server_keeps_serving() {
    let mut app = TestApp::with_extra_routes(Router::<AppState>::new().route("/boom", get(boom)));

    let response = app.get("/boom").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers[header::CONNECTION], "close");
    assert_eq!(response.body, "Internal Server Error");
    assert_security_headers(&response.headers);

    let response = app.get("/").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let mut app = TestApp::new();

    let response = app.get("/does/not/exist").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, "Not Found");
}

#[tokio::test]
async fn test_static_files_skip_sessions() {
    let mut app = TestApp::new();

    let response = app.get("/static/css/main.css").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(app.cookie(SESSION_COOKIE).is_none());
}

#[tokio::test]
async fn test_home_page_sets_session_cookie() {
    let mut app = TestApp::new();

    let response = app.get("/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(app.cookie(SESSION_COOKIE).is_some());
}
