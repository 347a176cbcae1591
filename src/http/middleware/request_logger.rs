//! Request-scoped logger injection.

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::Span;

use crate::http::request::request_id;

/// Logger handed to handlers through request extensions.
///
/// Wraps a span carrying the request id, method and path; events recorded
/// with it as parent inherit those fields.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    span: Span,
}

impl RequestLogger {
    /// A logger that records nothing.
    pub fn disabled() -> Self {
        Self { span: Span::none() }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn is_enabled(&self) -> bool {
        !self.span.is_disabled()
    }

    /// The logger attached to `request`, or a disabled one.
    pub fn from_request<B>(request: &axum::http::Request<B>) -> Self {
        request
            .extensions()
            .get::<RequestLogger>()
            .cloned()
            .unwrap_or_else(Self::disabled)
    }
}

pub async fn inject_request_logger(mut request: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "request",
        request_id = %request_id(&request),
        method = %request.method(),
        path = %request.uri().path(),
    );
    request.extensions_mut().insert(RequestLogger { span });
    next.run(request).await
}
