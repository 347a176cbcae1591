//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Connector (retry until broker answers) → Dispatcher → Router → bind → serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting → drain (bounded) → close broker → exit 0
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger shutdown (also cancels a pending connect)
//! ```
//!
//! # Design Decisions
//! - Ordered startup: broker first, listener last
//! - Startup failures exit with status 1
//! - Shutdown has a drain deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{run, Collaborators, Gateway, StartupError};
