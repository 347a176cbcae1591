//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, request span per call)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON by default)
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the request span
//! - Secrets never reach logs (broker URL is redacted)

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, BuildInfo, LoggingError};
