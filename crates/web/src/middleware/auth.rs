//! Authentication state derivation and the protected-route gate.
//!
//! [`authenticate`] runs on every dynamic route and records an [`AuthState`]
//! in the request extensions. Handlers take it as an extractor instead of
//! probing the session themselves. [`require_authentication`] sits on
//! protected routes only and redirects anonymous visitors to the login page
//! without running the handler.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use snippetbox_core::UserId;

use super::session::AppSession;
use crate::db::UserStore;
use crate::error::AppError;
use crate::state::AppState;

/// Where anonymous visitors are sent from protected routes.
pub const LOGIN_PATH: &str = "/user/login";

/// Whether the current request belongs to a logged-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Anonymous,
    Authenticated(UserId),
}

impl AuthState {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Authenticated(id) => Some(*id),
            Self::Anonymous => None,
        }
    }
}

/// Reads the state set by [`authenticate`]; routes without it are anonymous.
impl<S> FromRequestParts<S> for AuthState
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().copied().unwrap_or_default())
    }
}

/// Derive the auth state for a session.
///
/// A session without a user ID is anonymous and costs no store lookup. An ID
/// whose user has since been deleted is also anonymous; the stale key is
/// left in the session rather than written back on every request.
///
/// # Errors
///
/// Returns `AppError` if the session or user store fails.
pub async fn resolve(session: &AppSession, users: &dyn UserStore) -> Result<AuthState, AppError> {
    let Some(id) = session.authenticated_user_id().await? else {
        return Ok(AuthState::Anonymous);
    };

    if users.exists(id).await? {
        Ok(AuthState::Authenticated(id))
    } else {
        tracing::debug!(user_id = %id, "session references a missing user");
        Ok(AuthState::Anonymous)
    }
}

/// Middleware that attaches the [`AuthState`] to the request.
///
/// # Errors
///
/// Returns `AppError` if the session or user store fails.
pub async fn authenticate(
    State(state): State<AppState>,
    session: AppSession,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth = resolve(&session, state.users()).await?;
    request.extensions_mut().insert(auth);
    Ok(next.run(request).await)
}

/// Middleware that stops anonymous requests with `303 See Other` to the login page.
///
/// Authenticated responses are marked `Cache-Control: no-store` so pages
/// behind the gate are not kept in shared caches.
pub async fn require_authentication(auth: AuthState, request: Request, next: Next) -> Response {
    if !auth.is_authenticated() {
        return Redirect::to(LOGIN_PATH).into_response();
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
