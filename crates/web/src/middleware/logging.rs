//! Request logging.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

/// Log each request and run the rest of the stack inside a `request` span.
///
/// The span carries method and URI, so errors logged further in (store
/// failures, template errors, recovered panics) are attributed to the request.
/// The peer address comes from `ConnectInfo` and is `-` when the server was
/// not started with connect info (e.g. in tests).
pub async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "-".to_string(), |ConnectInfo(addr)| addr.ip().to_string());
    let proto = format!("{:?}", request.version());

    let span = tracing::info_span!("request", %method, %uri);
    span.in_scope(|| {
        tracing::info!(%ip, %proto, %method, %uri, "received request");
    });

    next.run(request).instrument(span).await
}
