//! Remote procedure calls to downstream services.
//!
//! # Data Flow
//! ```text
//! dispatch (LogRpc capability)
//!     → LogService::write_log(LogEntry)
//!     → log_client.rs: POST {endpoint}{write_path} {"logEntry": {...}}
//!     → LogReply | RpcError
//! ```
//!
//! # Design Decisions
//! - One call per dispatch, no retries here
//! - The client owns a deadline; the dispatcher adds its own on top
//! - Transport errors and service rejections stay distinct so they map to
//!   different status codes

pub mod log_client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use log_client::HttpLogClient;

/// A log record forwarded to the logging service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub name: String,
    pub data: String,
}

/// Reply of the write-log procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogReply {
    pub result: String,
}

#[derive(Debug, Error)]
pub enum RpcError {
    /// The service could not be reached.
    #[error("logging service unreachable: {0}")]
    Unavailable(String),

    /// The call did not complete in time.
    #[error("logging service timed out")]
    Timeout,

    /// The service answered with a failure status.
    #[error("logging service returned {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The reply could not be decoded.
    #[error("invalid reply from logging service: {0}")]
    InvalidReply(String),

    #[error("invalid logging service endpoint: {0}")]
    Endpoint(String),
}

/// Client side of the logging service.
#[async_trait]
pub trait LogService: Send + Sync {
    async fn write_log(&self, entry: &LogEntry) -> Result<LogReply, RpcError>;
}
