//! Cross-site request forgery protection on unsafe methods.

#![allow(clippy::unwrap_used)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use snippetbox_integration_tests::{CSRF_COOKIE, TestApp};

const EMAIL: &str = "alice@example.com";
const PASSWORD: &str = "correct horse battery";

#[tokio::test]
async fn test_first_visit_issues_csrf_cookie() {
    let mut app = TestApp::new();

    let page = app.get("/user/login").await;
    assert!(app.cookie(CSRF_COOKIE).is_some());
    assert!(page.csrf_token().is_some());

    // Masked tokens differ per render; the cookie does not.
    let cookie = app.cookie(CSRF_COOKIE).unwrap().to_string();
    let again = app.get("/user/login").await;
    assert_ne!(page.csrf_token(), again.csrf_token());
    assert_eq!(app.cookie(CSRF_COOKIE).unwrap(), cookie);
}

#[tokio::test]
async fn test_post_without_token_is_rejected() {
    let mut app = TestApp::new();
    app.get("/user/login").await;

    let response = app
        .post_form("/user/login", &[("email", EMAIL), ("password", PASSWORD)])
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_post_with_forged_token_is_rejected() {
    let mut app = TestApp::new();
    app.get("/user/login").await;

    let response = app
        .post_form(
            "/user/login",
            &[("email", EMAIL), ("password", PASSWORD), ("csrf_token", "forged")],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_post_without_cookie_is_rejected() {
    let mut app = TestApp::new();
    let token = app.get("/user/login").await.csrf_token().unwrap();
    app.clear_cookie(CSRF_COOKIE);

    let response = app
        .post_form(
            "/user/login",
            &[("email", EMAIL), ("password", PASSWORD), ("csrf_token", &token)],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_token_accepted_from_header() {
    let mut app = TestApp::new();
    app.create_user("Alice", EMAIL, PASSWORD).await;
    let token = app.get("/user/login").await.csrf_token().unwrap();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/user/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-csrf-token", &token)
        .body(Body::from(format!(
            "email=alice%40example.com&password={}",
            PASSWORD.replace(' ', "+")
        )))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_protected_post_without_token_is_rejected_before_handler() {
    let mut app = TestApp::new();
    app.create_user("Alice", EMAIL, PASSWORD).await;
    app.login(EMAIL, PASSWORD).await;

    let response = app
        .post_form(
            "/snippet/create",
            &[("title", "t"), ("content", "c"), ("expires", "7")],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(app.snippets.is_empty().await);
}

#[tokio::test]
async fn test_pre_login_token_is_invalid_after_login() {
    let mut app = TestApp::new();
    app.create_user("Alice", EMAIL, PASSWORD).await;

    let stale = app.get("/user/login").await.csrf_token().unwrap();
    app.login(EMAIL, PASSWORD).await;

    let response = app
        .post_form(
            "/snippet/create",
            &[("title", "t"), ("content", "c"), ("expires", "7"), ("csrf_token", &stale)],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(app.snippets.is_empty().await);
}
