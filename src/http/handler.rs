//! The single request handler behind every registered route.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, FailedToBufferBody},
        FromRequest, Request,
    },
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use tracing::Instrument;

use crate::dispatch::{Capability, DispatchError, DispatchResult, Dispatcher, ValidationError};
use crate::http::middleware::RequestLogger;
use crate::observability::metrics;

/// Read the body, dispatch it, and render the outcome.
///
/// Errors become JSON responses here and never escape the task.
pub async fn handle_capability(
    dispatcher: Arc<Dispatcher>,
    capability: Capability,
    request: Request,
) -> Response {
    let start = Instant::now();
    let logger = RequestLogger::from_request(&request);
    let method = request.method().to_string();
    let headers = request.headers().clone();
    let limit = dispatcher.settings().max_body_size;

    let outcome = read_and_dispatch(&dispatcher, capability, &headers, request, limit)
        .instrument(logger.span().clone())
        .await;

    let response = match outcome {
        Ok(result) => {
            tracing::info!(
                parent: logger.span(),
                capability = %capability,
                status = result.status.as_u16(),
                "Request dispatched"
            );
            result.into_response()
        }
        Err(err) => {
            log_failure(&logger, capability, &err);
            if let Some(component) = err.downstream_component() {
                metrics::record_downstream_error(component);
            }
            err.into_response()
        }
    };

    metrics::record_request(&method, response.status().as_u16(), capability.name(), start);
    response
}

async fn read_and_dispatch(
    dispatcher: &Dispatcher,
    capability: Capability,
    headers: &HeaderMap,
    request: Request,
    limit: usize,
) -> Result<DispatchResult, DispatchError> {
    check_declared_length(headers, limit)?;
    let bytes = Bytes::from_request(request, &()).await.map_err(|rejection| match rejection {
        BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(_)) => {
            ValidationError::BodyTooLarge { limit }
        }
        other => ValidationError::UnreadableBody(other.body_text()),
    })?;
    dispatcher.dispatch(capability, headers, &bytes).await
}

fn check_declared_length(headers: &HeaderMap, limit: usize) -> Result<(), DispatchError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    match declared {
        Some(length) if length > limit => Err(ValidationError::BodyTooLarge { limit }.into()),
        _ => Ok(()),
    }
}

fn log_failure(logger: &RequestLogger, capability: Capability, err: &DispatchError) {
    let status = err.status().as_u16();
    if err.status().is_server_error() {
        tracing::error!(
            parent: logger.span(),
            component = err.component(),
            capability = %capability,
            status,
            error = %err,
            "Dispatch failed"
        );
    } else {
        tracing::warn!(
            parent: logger.span(),
            component = err.component(),
            capability = %capability,
            status,
            error = %err,
            "Request rejected"
        );
    }
}
