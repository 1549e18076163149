//! CSRF protection for state-changing requests.
//!
//! Each session carries one random secret, issued on first contact and
//! replaced only when [`AppSession::renew_token`] rotates the session. The
//! secret is mirrored into the `csrf_token` cookie (double submit), and forms
//! embed a masked copy: a fresh random pad followed by `pad XOR secret`, so
//! the value printed into pages differs on every render while still
//! unmasking to the same secret.
//!
//! A `POST`/`PUT`/`PATCH`/`DELETE` passes only when the cookie matches the
//! session secret and the submitted token (`X-CSRF-Token` header or
//! `csrf_token` form field) unmasks to it. Anything else is answered with
//! `400 Bad Request` before authentication or the handler run.

use axum::{
    body::{Body, to_bytes},
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, Method, header, request::Parts},
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;
use tower_sessions::cookie::{Cookie, SameSite};

use super::session::AppSession;
use crate::error::AppError;
use crate::forms::MAX_FORM_BYTES;
use crate::models::session_keys;
use crate::state::AppState;

/// Cookie carrying the unmasked secret.
pub const CSRF_COOKIE_NAME: &str = "csrf_token";

/// Header accepted in place of the form field.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Form field forms must include.
pub const CSRF_FORM_FIELD: &str = "csrf_token";

const SECRET_LEN: usize = 32;

/// Masked CSRF token for embedding in forms.
#[derive(Clone, Debug, Default)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Get the token value for use in templates.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_else(|| {
            tracing::warn!(
                "CSRF token not found in request extensions - middleware may be misconfigured"
            );
            Self::default()
        }))
    }
}

/// Middleware that issues the session secret and verifies unsafe requests.
///
/// Must run inside the session layer and before authentication.
///
/// # Errors
///
/// Returns `AppError::BadRequest` when verification fails and
/// `AppError::Session` when the session store does.
pub async fn csrf_protect(
    State(state): State<AppState>,
    session: AppSession,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let secret = session_secret(&session).await?;
    let cookie_secret = read_cookie(request.headers());

    let mut request = if is_safe_method(request.method()) {
        request
    } else {
        let (parts, body) = request.into_parts();
        let bytes = to_bytes(body, MAX_FORM_BYTES)
            .await
            .map_err(|_| AppError::BadRequest("request body too large".to_string()))?;

        let submitted = submitted_token(&parts.headers, &bytes);
        let verified = cookie_secret
            .as_deref()
            .is_some_and(|cookie| constant_time_compare(cookie.as_bytes(), secret.as_bytes()))
            && submitted.as_deref().is_some_and(|token| verify(token, &secret));

        if !verified {
            tracing::warn!(
                method = %parts.method,
                uri = %parts.uri,
                has_cookie = cookie_secret.is_some(),
                has_token = submitted.is_some(),
                "CSRF verification failed"
            );
            return Err(AppError::BadRequest("CSRF token mismatch".to_string()));
        }

        Request::from_parts(parts, Body::from(bytes))
    };

    request.extensions_mut().insert(CsrfToken(mask(&secret)));

    let mut response = next.run(request).await;

    // The handler may have rotated the session, which drops the secret.
    let current = session_secret(&session).await?;
    if cookie_secret.as_deref() != Some(current.as_str()) {
        let cookie = Cookie::build((CSRF_COOKIE_NAME, current))
            .path("/")
            .http_only(true)
            .secure(state.sessions().secure())
            .same_site(SameSite::Lax)
            .build();
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => {
                return Err(AppError::Internal(format!("invalid CSRF cookie: {e}")));
            }
        }
    }

    Ok(response)
}

/// The session's secret, generating and storing one if absent.
async fn session_secret(session: &AppSession) -> Result<String, AppError> {
    if let Some(secret) = session.get::<String>(session_keys::CSRF_SECRET).await? {
        return Ok(secret);
    }

    let mut bytes = [0u8; SECRET_LEN];
    rand::rng().fill_bytes(&mut bytes);
    let secret = STANDARD.encode(bytes);
    session.put(session_keys::CSRF_SECRET, &secret).await?;
    Ok(secret)
}

fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

fn read_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == CSRF_COOKIE_NAME)
        .map(|cookie| cookie.value().to_owned())
}

/// Token from the header, falling back to the urlencoded form field.
fn submitted_token(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    if let Some(value) = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(value.to_owned());
    }

    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == CSRF_FORM_FIELD)
        .map(|(_, value)| value.into_owned())
}

/// Mask the secret with a fresh random pad.
fn mask(secret: &str) -> String {
    let Ok(secret) = STANDARD.decode(secret) else {
        return String::new();
    };

    let mut pad = vec![0u8; secret.len()];
    rand::rng().fill_bytes(&mut pad);

    let masked: Vec<u8> = pad.iter().zip(&secret).map(|(p, s)| p ^ s).collect();
    pad.extend(masked);
    STANDARD.encode(pad)
}

/// Whether a masked token unmasks to `secret`.
fn verify(token: &str, secret: &str) -> bool {
    let (Ok(token), Ok(secret)) = (STANDARD.decode(token), STANDARD.decode(secret)) else {
        return false;
    };
    if token.len() != 2 * secret.len() {
        return false;
    }

    let (pad, masked) = token.split_at(secret.len());
    let unmasked: Vec<u8> = pad.iter().zip(masked).map(|(p, m)| p ^ m).collect();
    constant_time_compare(&unmasked, &secret)
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret() -> String {
        STANDARD.encode([7u8; SECRET_LEN])
    }

    #[test]
    fn test_masked_tokens_differ_but_verify() {
        let secret = secret();
        let a = mask(&secret);
        let b = mask(&secret);
        assert_ne!(a, b);
        assert!(verify(&a, &secret));
        assert!(verify(&b, &secret));
    }

    #[test]
    fn test_raw_secret_does_not_verify_as_token() {
        let secret = secret();
        assert!(!verify(&secret, &secret));
    }

    #[test]
    fn test_token_for_other_secret_fails() {
        let other = STANDARD.encode([9u8; SECRET_LEN]);
        assert!(!verify(&mask(&other), &secret()));
        assert!(!verify("not base64!", &secret()));
        assert!(!verify("", &secret()));
    }

    #[test]
    fn test_safe_methods() {
        assert!(is_safe_method(&Method::GET));
        assert!(is_safe_method(&Method::HEAD));
        assert!(is_safe_method(&Method::OPTIONS));
        assert!(!is_safe_method(&Method::POST));
        assert!(!is_safe_method(&Method::DELETE));
    }

    #[test]
    fn test_read_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("session=abc; csrf_token=s3cr3t=="),
        );
        assert_eq!(read_cookie(&headers).as_deref(), Some("s3cr3t=="));
        assert_eq!(read_cookie(&HeaderMap::new()), None);
    }

    #[test]
    fn test_submitted_token_prefers_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            submitted_token(&headers, b"title=x&csrf_token=ab%2Bc%3D").as_deref(),
            Some("ab+c=")
        );

        headers.insert(CSRF_HEADER, HeaderValue::from_static("from-header"));
        assert_eq!(
            submitted_token(&headers, b"csrf_token=from-form").as_deref(),
            Some("from-header")
        );
        assert_eq!(submitted_token(&HeaderMap::new(), b"title=x"), None);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"abc", b"abc"));
        assert!(!constant_time_compare(b"abc", b"abd"));
        assert!(!constant_time_compare(b"abc", b"abcd"));
    }
}
