//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     connector.rs (dial, count failures)
//!     → backoff.rs (failure n → n² seconds)
//!     → timeouts.rs Clock (sleep, interruptible by shutdown)
//!
//! Per request:
//!     dispatch → timeouts.rs with_deadline (504 on expiry)
//! ```
//!
//! # Design Decisions
//! - Retry lives only on the startup path; request dispatch never retries
//! - Every external call has a deadline
//! - The backoff schedule is deterministic so it can be asserted in tests

pub mod backoff;
pub mod connector;
pub mod timeouts;

pub use backoff::{BackoffPolicy, QuadraticBackoff};
pub use connector::{ConnectError, Connector, RetryPolicy, RetryState};
pub use timeouts::{with_deadline, Clock, Elapsed, TokioClock};
