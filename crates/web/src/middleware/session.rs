//! Session lifecycle on top of tower-sessions.
//!
//! [`SessionManager`] holds the cookie policy and builds the
//! `SessionManagerLayer` for whichever store the caller supplies
//! (`PostgresStore` in production, `MemoryStore` in tests). The layer loads
//! the record before the handler runs and saves it, refreshing the cookie,
//! once the response is built.
//!
//! [`AppSession`] is what handlers and middleware talk to: typed
//! get/put/remove, a one-shot [`AppSession::pop_string`] for flash messages,
//! and [`AppSession::renew_token`] for privilege changes.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tower_sessions::cookie::{SameSite, time::Duration};
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};

use snippetbox_core::UserId;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::session_keys;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "session";

/// Session store failure.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store error: {0}")]
    Store(#[from] tower_sessions::session::Error),
}

/// Cookie and lifetime policy for sessions.
#[derive(Debug, Clone)]
pub struct SessionManager {
    lifetime: Duration,
    secure: bool,
}

impl SessionManager {
    /// Create a manager with an explicit lifetime and `Secure` flag.
    #[must_use]
    pub const fn new(lifetime: Duration, secure: bool) -> Self {
        Self { lifetime, secure }
    }

    /// Build from configuration: lifetime in hours, `Secure` when served over HTTPS.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Duration::hours(config.session_lifetime_hours),
            config.secure_cookies(),
        )
    }

    /// Whether session and CSRF cookies carry the `Secure` attribute.
    #[must_use]
    pub const fn secure(&self) -> bool {
        self.secure
    }

    /// Create the session layer for `store`.
    ///
    /// Sessions expire after the configured lifetime without a save.
    #[must_use]
    pub fn layer<S>(&self, store: S) -> SessionManagerLayer<S>
    where
        S: SessionStore + Clone,
    {
        SessionManagerLayer::new(store)
            .with_name(SESSION_COOKIE_NAME)
            .with_expiry(Expiry::OnInactivity(self.lifetime))
            .with_secure(self.secure)
            .with_same_site(SameSite::Lax)
            .with_http_only(true)
            .with_path("/")
    }
}

/// The current request's session.
///
/// Requires the session layer; extracting it on a route without one is a
/// server error.
#[derive(Debug, Clone)]
pub struct AppSession(Session);

impl AppSession {
    /// Wrap a tower-sessions handle.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self(session)
    }

    /// Read a typed value.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails or the value has another type.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        Ok(self.0.get(key).await?)
    }

    /// Write a typed value.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails or the value cannot be serialized.
    pub async fn put<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: T,
    ) -> Result<(), SessionError> {
        self.0.insert(key, value).await?;
        Ok(())
    }

    /// Delete a key.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails.
    pub async fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.0.remove_value(key).await?;
        Ok(())
    }

    /// Read and delete a string in one step.
    ///
    /// A second call returns `None`, so a flash message renders at most once.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails.
    pub async fn pop_string(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.0.remove::<String>(key).await?)
    }

    /// Move the session data to a freshly generated token.
    ///
    /// The old token stops resolving once the response is saved. The CSRF
    /// secret is dropped with it so the CSRF guard issues a new one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails.
    pub async fn renew_token(&self) -> Result<(), SessionError> {
        self.0.cycle_id().await?;
        self.0.remove_value(session_keys::CSRF_SECRET).await?;
        Ok(())
    }

    /// The user ID stored at login, if any.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails.
    pub async fn authenticated_user_id(&self) -> Result<Option<UserId>, SessionError> {
        self.get(session_keys::AUTHENTICATED_USER_ID).await
    }

    /// The current session token, `None` until the session is first saved.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.0.id().map(|id| id.to_string())
    }
}

impl<S> FromRequestParts<S> for AppSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(Self)
            .ok_or_else(|| AppError::Internal("session layer missing on route".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Request, header},
        response::Response,
        routing::get,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;
    use tower_sessions::cookie::Cookie;

    use super::*;

    /// A session backed by a throwaway in-memory store.
    pub(crate) fn memory_session() -> AppSession {
        AppSession::new(Session::new(None, Arc::new(MemoryStore::default()), None))
    }

    #[tokio::test]
    async fn test_pop_string_returns_value_once() {
        let session = memory_session();
        session
            .put(session_keys::FLASH, "Snippet successfully created!")
            .await
            .unwrap();

        assert_eq!(
            session.pop_string(session_keys::FLASH).await.unwrap().as_deref(),
            Some("Snippet successfully created!")
        );
        assert_eq!(session.pop_string(session_keys::FLASH).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let session = memory_session();
        session
            .put(session_keys::AUTHENTICATED_USER_ID, UserId::new(3))
            .await
            .unwrap();
        assert_eq!(
            session.authenticated_user_id().await.unwrap(),
            Some(UserId::new(3))
        );

        session
            .remove(session_keys::AUTHENTICATED_USER_ID)
            .await
            .unwrap();
        assert_eq!(session.authenticated_user_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_renew_token_keeps_data_and_drops_csrf_secret() {
        let session = memory_session();
        session.put("theme", "dark").await.unwrap();
        session
            .put(session_keys::CSRF_SECRET, "secret")
            .await
            .unwrap();

        session.renew_token().await.unwrap();

        assert_eq!(
            session.get::<String>("theme").await.unwrap().as_deref(),
            Some("dark")
        );
        assert_eq!(
            session
                .get::<String>(session_keys::CSRF_SECRET)
                .await
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_secure_flag_follows_config() {
        let manager = SessionManager::new(Duration::hours(12), false);
        assert!(!manager.secure());
        let manager = SessionManager::new(Duration::hours(12), true);
        assert!(manager.secure());
    }

    /// Reports the stored user, then stores one if there was none.
    async fn whoami(session: AppSession) -> String {
        let seen = session.authenticated_user_id().await.unwrap();
        if seen.is_none() {
            session
                .put(session_keys::AUTHENTICATED_USER_ID, UserId::new(7))
                .await
                .unwrap();
        }
        seen.map_or_else(|| "anonymous".to_string(), |id| id.to_string())
    }

    fn with_session_cookie(token: &str) -> Request<Body> {
        Request::get("/")
            .header(header::COOKIE, format!("{SESSION_COOKIE_NAME}={token}"))
            .body(Body::empty())
            .unwrap()
    }

    fn session_cookie(response: &Response) -> String {
        let value = response.headers()[header::SET_COOKIE].to_str().unwrap();
        let cookie = Cookie::parse(value.to_owned()).unwrap();
        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
        cookie.value().to_string()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_expired_session_reads_as_new() {
        let manager = SessionManager::new(Duration::seconds(1), false);
        let app = Router::new()
            .route("/", get(whoami))
            .layer(manager.layer(MemoryStore::default()));

        let response = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let first = session_cookie(&response);
        assert_eq!(body_text(response).await, "anonymous");

        let response = app.clone().oneshot(with_session_cookie(&first)).await.unwrap();
        assert_eq!(body_text(response).await, "7");

        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

        let response = app.oneshot(with_session_cookie(&first)).await.unwrap();
        let renewed = session_cookie(&response);
        assert_ne!(renewed, first);
        assert_eq!(body_text(response).await, "anonymous");
    }
}
