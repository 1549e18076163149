//! Request pipeline: which middleware wraps which routes, in which order.
//!
//! A chain is an ordered list of [`Stage`]s, outermost first. [`compose`]
//! applies one to a router; [`app`] builds the whole application:
//!
//! ```text
//! STANDARD_CHAIN  recover panic > log request > security headers
//!   ├── public routes     DYNAMIC_CHAIN    session > CSRF > authenticate
//!   ├── protected routes  PROTECTED_CHAIN  session > CSRF > authenticate > require auth
//!   ├── /static           (no session)
//!   └── fallback          404
//! ```
//!
//! The chains are fixed at startup; nothing reorders them at runtime.

use axum::{Router, middleware};
use tower_http::services::ServeDir;
use tower_sessions::SessionStore;

use crate::middleware::{
    authenticate, csrf_protect, log_request, recover_panic, require_authentication,
    security_headers_middleware,
};
use crate::routes;
use crate::state::AppState;

/// One middleware in a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Turn a handler panic into a 500 with `Connection: close`.
    RecoverPanic,
    /// Open the `request` span and log the request line.
    LogRequest,
    /// Add the security response headers.
    SecureHeaders,
    /// Load the session before the handler and save it after.
    Session,
    /// Issue the CSRF secret and reject unverified unsafe requests.
    Csrf,
    /// Derive the [`AuthState`](crate::middleware::AuthState).
    Authenticate,
    /// Redirect anonymous requests to the login page.
    RequireAuthentication,
}

/// Wraps every request, matched or not.
pub const STANDARD_CHAIN: &[Stage] = &[Stage::RecoverPanic, Stage::LogRequest, Stage::SecureHeaders];

/// Wraps routes that use sessions but are open to anonymous visitors.
pub const DYNAMIC_CHAIN: &[Stage] = &[Stage::Session, Stage::Csrf, Stage::Authenticate];

/// Wraps routes that require a logged-in user.
pub const PROTECTED_CHAIN: &[Stage] = &[
    Stage::Session,
    Stage::Csrf,
    Stage::Authenticate,
    Stage::RequireAuthentication,
];

/// Wrap `router` in `chain`, first stage outermost.
pub fn compose<St>(
    router: Router<AppState>,
    chain: &[Stage],
    state: &AppState,
    store: &St,
) -> Router<AppState>
where
    St: SessionStore + Clone,
{
    // Each layer wraps everything added so far, so the innermost goes first.
    chain
        .iter()
        .rev()
        .fold(router, |router, stage| apply(router, *stage, state, store))
}

fn apply<St>(router: Router<AppState>, stage: Stage, state: &AppState, store: &St) -> Router<AppState>
where
    St: SessionStore + Clone,
{
    match stage {
        Stage::RecoverPanic => router.layer(middleware::from_fn(recover_panic)),
        Stage::LogRequest => router.layer(middleware::from_fn(log_request)),
        Stage::SecureHeaders => router.layer(middleware::from_fn(security_headers_middleware)),
        Stage::Session => router.layer(state.sessions().layer(store.clone())),
        Stage::Csrf => router.layer(middleware::from_fn_with_state(
            state.clone(),
            csrf_protect,
        )),
        Stage::Authenticate => router.layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate,
        )),
        Stage::RequireAuthentication => router.layer(middleware::from_fn(require_authentication)),
    }
}

/// Build the application router with sessions kept in `store`.
pub fn app<St>(state: AppState, store: St) -> Router
where
    St: SessionStore + Clone,
{
    let public = compose(routes::public_routes(), DYNAMIC_CHAIN, &state, &store);
    let protected = compose(routes::protected_routes(), PROTECTED_CHAIN, &state, &store);

    let router = public
        .merge(protected)
        .nest_service("/static", ServeDir::new(&state.config().static_dir))
        .fallback(routes::not_found);

    compose(router, STANDARD_CHAIN, &state, &store).with_state(state)
}
