//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route registration (at startup):
//!     gateway_routes()
//!     → RouteTable::register (duplicates rejected)
//!     → RouteTable::into_router (frozen)
//!
//! Incoming request (method, path)
//!     → matched route → capability handler
//!     → unknown path → 404, known path with other method → 405
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Capability chosen at registration, not per request
//! - Deterministic: same input always matches same route

pub mod table;

pub use table::{gateway_routes, Route, RouteError, RouteNotFound, RouteTable};
