//! Signup, login, logout and session renewal.

#![allow(clippy::unwrap_used)]

use axum::http::{StatusCode, header};
use snippetbox_core::Email;
use snippetbox_integration_tests::{SESSION_COOKIE, TestApp};
use snippetbox_web::db::UserStore;

const EMAIL: &str = "alice@example.com";
const PASSWORD: &str = "correct horse battery";

#[tokio::test]
async fn test_login_renews_session_and_unlocks_protected_routes() {
    let mut app = TestApp::new();
    app.create_user("Alice", EMAIL, PASSWORD).await;

    let page = app.get("/user/login").await;
    let token = page.csrf_token().unwrap();
    let before = app.cookie(SESSION_COOKIE).unwrap().to_string();

    let response = app
        .post_form(
            "/user/login",
            &[("email", EMAIL), ("password", PASSWORD), ("csrf_token", &token)],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/snippet/create"));
    assert_ne!(app.cookie(SESSION_COOKIE).unwrap(), before);

    let response = app.get("/snippet/create").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CACHE_CONTROL], "no-store");
    assert!(response.body.contains("action=\"/user/logout\""));
}

#[tokio::test]
async fn test_wrong_password_keeps_session_anonymous() {
    let mut app = TestApp::new();
    app.create_user("Alice", EMAIL, PASSWORD).await;

    let token = app.get("/user/login").await.csrf_token().unwrap();
    let before = app.cookie(SESSION_COOKIE).unwrap().to_string();

    let response = app
        .post_form(
            "/user/login",
            &[("email", EMAIL), ("password", "wrong password"), ("csrf_token", &token)],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Email or password is incorrect"));
    assert!(response.body.contains(EMAIL));
    assert_eq!(app.cookie(SESSION_COOKIE).unwrap(), before);

    let response = app.get("/snippet/create").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));
}

#[tokio::test]
async fn test_unknown_email_gets_the_same_message() {
    let mut app = TestApp::new();

    let response = app.login("nobody@example.com", PASSWORD).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Email or password is incorrect"));
}

#[tokio::test]
async fn test_signup_then_login() {
    let mut app = TestApp::new();

    let response = app
        .submit(
            "/user/signup",
            "/user/signup",
            &[("name", "Alice"), ("email", EMAIL), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));

    let page = app.get("/user/login").await;
    assert!(page.body.contains("Your signup was successful. Please log in."));

    let email = Email::parse(EMAIL).unwrap();
    let id = app.users.authenticate(&email, PASSWORD).await.unwrap();
    assert_eq!(app.users.name(id).await.as_deref(), Some("Alice"));

    let response = app.login(EMAIL, PASSWORD).await;
    assert_eq!(response.location(), Some("/snippet/create"));
}

#[tokio::test]
async fn test_signup_with_taken_email_is_rejected() {
    let mut app = TestApp::new();
    app.create_user("Alice", EMAIL, PASSWORD).await;

    let response = app
        .submit(
            "/user/signup",
            "/user/signup",
            &[("name", "Mallory"), ("email", EMAIL), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Email address is already in use"));
    assert!(response.body.contains("Mallory"));
    assert!(!response.body.contains(PASSWORD));
}

#[tokio::test]
async fn test_signup_validation_errors() {
    let mut app = TestApp::new();

    let response = app
        .submit(
            "/user/signup",
            "/user/signup",
            &[("name", ""), ("email", "nope"), ("password", "short")],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("This field cannot be blank"));
    assert!(response.body.contains("This field must be a valid email address"));
    assert!(response.body.contains("This field must be at least 8 characters long"));
}

#[tokio::test]
async fn test_logout() {
    let mut app = TestApp::new();
    app.create_user("Alice", EMAIL, PASSWORD).await;
    app.login(EMAIL, PASSWORD).await;
    let logged_in = app.cookie(SESSION_COOKIE).unwrap().to_string();

    let response = app.submit("/snippet/create", "/user/logout", &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/"));
    assert_ne!(app.cookie(SESSION_COOKIE).unwrap(), logged_in);

    let home = app.get("/").await;
    assert!(home.body.contains("been logged out successfully"));
    assert!(home.body.contains("href=\"/user/login\""));

    let response = app.get("/snippet/create").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_deleted_user_is_treated_as_anonymous() {
    let mut app = TestApp::new();
    let id = app.create_user("Alice", EMAIL, PASSWORD).await;
    app.login(EMAIL, PASSWORD).await;

    app.users.remove(id).await;

    let response = app.get("/snippet/create").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));

    let home = app.get("/").await;
    assert_eq!(home.status, StatusCode::OK);
    assert!(!home.body.contains("action=\"/user/logout\""));
}

#[tokio::test]
async fn test_pre_login_session_id_is_not_authenticated() {
    let mut app = TestApp::new();
    app.create_user("Alice", EMAIL, PASSWORD).await;

    app.get("/user/login").await;
    let planted = app.cookie(SESSION_COOKIE).unwrap().to_string();
    app.login(EMAIL, PASSWORD).await;

    app.set_cookie(SESSION_COOKIE, &planted);
    let response = app.get("/snippet/create").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));
}
