//! Middleware applied to every request before dispatch.
//!
//! Order, outermost first: origin policy → liveness probe → request logger.

pub mod cors;
pub mod heartbeat;
pub mod request_logger;

pub use cors::cors_layer;
pub use heartbeat::{heartbeat, PING_PATH};
pub use request_logger::{inject_request_logger, RequestLogger};
