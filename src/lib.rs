//! Broker gateway library.

// Core subsystems
pub mod config;
pub mod dispatch;
pub mod http;
pub mod routing;

// Downstream collaborators
pub mod broker;
pub mod rpc;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
