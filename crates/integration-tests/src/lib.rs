//! Integration tests for Snippetbox.
//!
//! Tests drive the full application router in-process with
//! `tower::ServiceExt::oneshot`, backed by the in-memory snippet, user and
//! session stores. No database or network is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p snippetbox-integration-tests
//! ```
//!
//! [`TestApp`] behaves like a single browser: it keeps a cookie jar,
//! replays cookies on every request and applies `Set-Cookie` from every
//! response.

#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use tower_sessions::cookie::Cookie;

use snippetbox_core::{Email, UserId};
use snippetbox_web::config::{AppConfig, LogFormat};
use snippetbox_web::db::{MemorySnippetStore, MemoryUserStore, UserStore};
use snippetbox_web::pipeline::{STANDARD_CHAIN, compose};
use snippetbox_web::render::{Renderer, TemplateCache};
use snippetbox_web::{AppState, app};

/// Session cookie name.
pub const SESSION_COOKIE: &str = "session";

/// CSRF cookie name.
pub const CSRF_COOKIE: &str = "csrf_token";

/// A collected response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The `Location` header, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// The masked CSRF token embedded in the page's first form.
    #[must_use]
    pub fn csrf_token(&self) -> Option<String> {
        const MARKER: &str = "name=\"csrf_token\" value=\"";
        let start = self.body.find(MARKER)? + MARKER.len();
        let end = self.body[start..].find('"')? + start;
        Some(unescape_html(&self.body[start..end]))
    }
}

/// The application plus one browser's cookie jar.
pub struct TestApp {
    router: Router,
    pub snippets: Arc<MemorySnippetStore>,
    pub users: Arc<MemoryUserStore>,
    cookies: BTreeMap<String, String>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// The application exactly as served.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// The application plus `extra` routes wrapped only in the standard chain.
    #[must_use]
    pub fn with_extra_routes(extra: Router<AppState>) -> Self {
        Self::build(Some(extra))
    }

    fn build(extra: Option<Router<AppState>>) -> Self {
        let snippets = Arc::new(MemorySnippetStore::new());
        let users = Arc::new(MemoryUserStore::new());
        let state = AppState::new(
            test_config(),
            snippets.clone(),
            users.clone(),
            Renderer::new(TemplateCache::new().unwrap()),
        );
        let store = MemoryStore::default();

        let mut router = app(state.clone(), store.clone());
        if let Some(extra) = extra {
            router = router.merge(compose(extra, STANDARD_CHAIN, &state, &store).with_state(state));
        }

        Self {
            router,
            snippets,
            users,
            cookies: BTreeMap::new(),
        }
    }

    /// Current value of a cookie in the jar.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Overwrite a cookie in the jar.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    /// Drop a cookie from the jar.
    pub fn clear_cookie(&mut self, name: &str) {
        self.cookies.remove(name);
    }

    /// Send a request with the jar's cookies and absorb the response's.
    pub async fn send(&mut self, mut request: Request<Body>) -> TestResponse {
        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            request
                .headers_mut()
                .insert(header::COOKIE, HeaderValue::from_str(&cookie_header).unwrap());
        }

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        for value in headers.get_all(header::SET_COOKIE) {
            let cookie = Cookie::parse(value.to_str().unwrap().to_owned()).unwrap();
            if cookie.max_age().is_some_and(|age| age.is_zero()) {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies
                    .insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }

        TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Request::get(path).body(Body::empty()).unwrap())
            .await
    }

    /// POST a urlencoded form exactly as given.
    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// GET `form_page` for a CSRF token, then POST `fields` plus the token to `path`.
    pub async fn submit(
        &mut self,
        form_page: &str,
        path: &str,
        fields: &[(&str, &str)],
    ) -> TestResponse {
        let token = self.get(form_page).await.csrf_token().unwrap();
        let mut fields = fields.to_vec();
        fields.push(("csrf_token", &token));
        self.post_form(path, &fields).await
    }

    /// Create an account directly in the user store.
    pub async fn create_user(&self, name: &str, email: &str, password: &str) -> UserId {
        let email = Email::parse(email).unwrap();
        self.users.insert(name, &email, password).await.unwrap();
        self.users.authenticate(&email, password).await.unwrap()
    }

    /// Log in through the login form.
    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        self.submit(
            "/user/login",
            "/user/login",
            &[("email", email), ("password", password)],
        )
        .await
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        database_url: SecretString::from("postgres://localhost/unused"),
        host: "127.0.0.1".parse().unwrap(),
        port: 4000,
        base_url: "http://localhost:4000".to_string(),
        session_lifetime_hours: 12,
        static_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../web/static")),
        log_format: LogFormat::Text,
        sentry_dsn: None,
    }
}

/// Undo askama's HTML escaping of an attribute value.
fn unescape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let Some(semi) = rest[amp..].find(';') else {
            out.push_str(&rest[amp..]);
            return out;
        };
        let entity = &rest[amp + 1..amp + semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => out.push(c),
            None => out.push_str(&rest[amp..=amp + semi]),
        }
        rest = &rest[amp + semi + 1..];
    }

    out.push_str(rest);
    out
}
