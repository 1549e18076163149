//! HTTP route handlers for Snippetbox.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                   - Latest snippets
//! GET  /snippet/view/{id}  - Snippet detail
//! GET  /user/signup        - Signup form
//! POST /user/signup        - Create account
//! GET  /user/login         - Login form
//! POST /user/login         - Log in
//!
//! # Protected (requires auth)
//! GET  /snippet/create     - New snippet form
//! POST /snippet/create     - Create snippet
//! POST /user/logout        - Log out
//!
//! # Static (no session)
//! GET  /static/*           - CSS and other assets
//! ```
//!
//! Which middleware wraps which group is decided in [`crate::pipeline`].

pub mod home;
pub mod snippets;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};

use crate::error::AppError;
use crate::state::AppState;

/// Routes reachable without logging in.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/snippet/view/{id}", get(snippets::view))
        .route("/user/signup", get(users::signup_page).post(users::signup))
        .route("/user/login", get(users::login_page).post(users::login))
}

/// Routes that require an authenticated user.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/snippet/create",
            get(snippets::create_page).post(snippets::create),
        )
        .route("/user/logout", post(users::logout))
}

/// Fallback for every unmatched path.
pub async fn not_found() -> AppError {
    AppError::NotFound
}
