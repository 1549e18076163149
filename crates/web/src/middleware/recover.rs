//! Panic recovery.
//!
//! Catches a panic anywhere below it in the stack and turns it into a
//! `500 Internal Server Error` with `Connection: close`, so the transport
//! drops the connection instead of reusing state the panic may have left
//! half-written. The process keeps serving other requests.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;

use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;

use super::security_headers::apply_security_headers;

/// Middleware that converts a panicking handler into a server error.
///
/// Installed outermost so a panic is caught exactly once per request. The
/// security headers are added here because the inner layer that normally
/// sets them never sees a response.
pub async fn recover_panic(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            let backtrace = Backtrace::force_capture();
            let event_id = sentry::capture_message(&message, sentry::Level::Fatal);
            tracing::error!(
                %method,
                %uri,
                panic = %message,
                sentry_event_id = %event_id,
                backtrace = %backtrace,
                "Recovered from handler panic"
            );

            let mut response = (
                StatusCode::INTERNAL_SERVER_ERROR,
                StatusCode::INTERNAL_SERVER_ERROR
                    .canonical_reason()
                    .unwrap_or_default(),
            )
                .into_response();
            let headers = response.headers_mut();
            headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
            apply_security_headers(headers);
            response
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
