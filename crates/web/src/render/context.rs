//! Per-request template context.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::middleware::{AppSession, AuthState, CsrfToken, SessionError};
use crate::models::session_keys;

/// Request-derived values every page shows.
///
/// Read-only once built. Building it consumes the flash message, so build
/// it only for a response that will actually render a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub is_authenticated: bool,
    pub csrf_token: String,
    pub flash: Option<String>,
}

impl RequestContext {
    /// Assemble the context, popping the flash message from the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session store fails.
    pub async fn new(
        session: &AppSession,
        auth: AuthState,
        csrf: &CsrfToken,
    ) -> Result<Self, SessionError> {
        Ok(Self {
            is_authenticated: auth.is_authenticated(),
            csrf_token: csrf.value().to_string(),
            flash: session.pop_string(session_keys::FLASH).await?,
        })
    }
}

/// The request-scoped state a page handler needs: session, auth and CSRF token.
#[derive(Debug, Clone)]
pub struct RequestScope {
    pub session: AppSession,
    pub auth: AuthState,
    pub csrf: CsrfToken,
}

impl RequestScope {
    /// Build the [`RequestContext`] for rendering.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the session store fails.
    pub async fn context(&self) -> Result<RequestContext, AppError> {
        Ok(RequestContext::new(&self.session, self.auth, &self.csrf).await?)
    }
}

impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = AppSession::from_request_parts(parts, state).await?;
        let Ok(auth) = AuthState::from_request_parts(parts, state).await;
        let Ok(csrf) = CsrfToken::from_request_parts(parts, state).await;

        Ok(Self {
            session,
            auth,
            csrf,
        })
    }
}
