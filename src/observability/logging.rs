//! Structured logging.
//!
//! # Responsibilities
//! - Install the global subscriber once at startup
//! - Pick the output format from configuration
//! - Describe the running build for the startup banner
//!
//! # Design Decisions
//! - `RUST_LOG` wins over `observability.log_level` when it parses
//! - JSON format for production, pretty/compact for development

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("logging already initialised: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Build the level filter, preferring `RUST_LOG` when set and valid.
pub fn build_filter(default_directives: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(default_directives)?),
    }
}

pub fn init_logging(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let registry = tracing_subscriber::registry().with(build_filter(&config.log_level)?);

    match config.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(false))
            .try_init()?,
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init()?,
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init()?,
    }

    Ok(())
}

/// Version and provenance of the running binary.
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_hash: option_env!("GATEWAY_GIT_HASH").unwrap_or("unknown"),
            build_timestamp: option_env!("GATEWAY_BUILD_TIMESTAMP").unwrap_or("unknown"),
        }
    }

    pub fn log_banner(&self) {
        tracing::info!(
            version = self.version,
            git_hash = self.git_hash,
            build_timestamp = self.build_timestamp,
            "broker-gateway starting"
        );
    }
}
