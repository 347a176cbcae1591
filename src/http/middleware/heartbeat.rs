//! Liveness probe.

use axum::{
    extract::Request,
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

pub const PING_PATH: &str = "/ping";

/// Answer `GET`/`HEAD /ping` with 200 before any later middleware or handler.
///
/// Never touches the broker, so it reports the process alive even when the
/// connection has dropped.
pub async fn heartbeat(request: Request, next: Next) -> Response {
    let is_probe = matches!(*request.method(), Method::GET | Method::HEAD)
        && request.uri().path() == PING_PATH;

    if is_probe {
        return (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], ".").into_response();
    }

    next.run(request).await
}
