//! HTTP middleware for Snippetbox.
//!
//! # Middleware Order (outermost first)
//!
//! Standard chain, every request:
//! 1. Panic recovery
//! 2. Request logging
//! 3. Security headers
//!
//! Dynamic chain, every route except `/static`:
//! 4. Session layer (tower-sessions)
//! 5. CSRF protection
//! 6. Authentication state
//!
//! Protected chain, dynamic chain plus:
//! 7. Require authentication
//!
//! The chains themselves are declared in [`crate::pipeline`].

pub mod auth;
pub mod csrf;
pub mod logging;
pub mod recover;
pub mod security_headers;
pub mod session;

pub use auth::{AuthState, authenticate, require_authentication};
pub use csrf::{CsrfToken, csrf_protect};
pub use logging::log_request;
pub use recover::recover_panic;
pub use security_headers::security_headers_middleware;
pub use session::{AppSession, SessionError, SessionManager};
