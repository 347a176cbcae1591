//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)          CLI flags / env
//!     → loader.rs (parse)         │
//!     → validation.rs             │
//!     → GatewayConfig ◀───────────┘ (overrides applied in main)
//!     → read once at startup, never reloaded
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the route table depends on it
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BrokerConfig, CorsConfig, GatewayConfig, ListenerConfig, LogFormat, LogServiceConfig,
    ObservabilityConfig,
};
