//! Per-request error taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::broker::BrokerError;
use crate::http::response::ApiResponse;
use crate::rpc::RpcError;

/// The inbound payload cannot be dispatched as sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported content type '{0}', expected application/json")]
    UnsupportedContentType(String),

    #[error("malformed JSON body: {0}")]
    MalformedJson(String),

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("request body could not be read: {0}")]
    UnreadableBody(String),

    #[error("missing '{0}' field")]
    MissingField(&'static str),

    #[error("unknown action '{0}'")]
    UnknownAction(String),
}

/// A downstream transport failed while handling a valid request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownstreamError {
    #[error("broker connection unavailable")]
    BrokerUnavailable,

    #[error("broker publish failed: {0}")]
    Publish(String),

    #[error("broker rejected the message")]
    Nacked,

    #[error("logging service unavailable: {0}")]
    RpcUnavailable(String),

    #[error("logging service rejected the request: {0}")]
    RpcRejected(String),

    #[error("downstream call timed out")]
    Timeout,
}

impl From<BrokerError> for DownstreamError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::Disconnected => DownstreamError::BrokerUnavailable,
            BrokerError::Nacked { .. } => DownstreamError::Nacked,
            other => DownstreamError::Publish(other.to_string()),
        }
    }
}

impl From<RpcError> for DownstreamError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Unavailable(reason) => DownstreamError::RpcUnavailable(reason),
            RpcError::Timeout => DownstreamError::Timeout,
            other => DownstreamError::RpcRejected(other.to_string()),
        }
    }
}

/// Anything a dispatch can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Downstream(#[from] DownstreamError),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::Validation(ValidationError::BodyTooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
            DispatchError::Downstream(err) => match err {
                DownstreamError::BrokerUnavailable | DownstreamError::RpcUnavailable(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                DownstreamError::Publish(_)
                | DownstreamError::Nacked
                | DownstreamError::RpcRejected(_) => StatusCode::BAD_GATEWAY,
                DownstreamError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            },
        }
    }

    /// Component the failure originated in, for logs and metrics.
    pub fn component(&self) -> &'static str {
        match self {
            DispatchError::Validation(_) => "validation",
            DispatchError::Downstream(err) => match err {
                DownstreamError::BrokerUnavailable
                | DownstreamError::Publish(_)
                | DownstreamError::Nacked => "broker",
                DownstreamError::RpcUnavailable(_) | DownstreamError::RpcRejected(_) => "log_rpc",
                DownstreamError::Timeout => "deadline",
            },
        }
    }

    /// Component a downstream failure came from; `None` for rejected input.
    pub fn downstream_component(&self) -> Option<&'static str> {
        match self {
            DispatchError::Validation(_) => None,
            DispatchError::Downstream(_) => Some(self.component()),
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        ApiResponse::failure(self.to_string()).with_status(self.status())
    }
}
