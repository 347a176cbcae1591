//! Message broker subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     BrokerTarget (from config)
//!     → resilience::connector (retry loop)
//!     → BrokerDialer::dial
//!     → Arc<dyn BrokerConnection> (owned by lifecycle)
//!
//! Per request:
//!     dispatch → BrokerConnection::publish(OutboundMessage)
//! ```
//!
//! # Design Decisions
//! - The connection is shared read-only; only the lifecycle closes it
//! - No reconnection after startup: a dropped connection reports
//!   `is_connected() == false` and publishes fail until restart
//! - Transport is hidden behind traits so tests run without a broker

pub mod amqp;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use amqp::AmqpDialer;

/// Errors raised by broker transports.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Opening the connection or channel failed.
    #[error("dial failed: {0}")]
    Dial(String),

    /// The dial did not complete within the connect timeout.
    #[error("dial timed out after {0:?}")]
    DialTimeout(std::time::Duration),

    /// The connection is no longer usable.
    #[error("connection is closed")]
    Disconnected,

    /// The publish could not be written to the channel.
    #[error("publish failed: {0}")]
    Publish(String),

    /// The broker negatively acknowledged the message.
    #[error("broker rejected message on exchange '{exchange}'")]
    Nacked { exchange: String },

    #[error("close failed: {0}")]
    Close(String),
}

/// Where and how to connect to the broker.
#[derive(Clone)]
pub struct BrokerTarget {
    /// AMQP URL including credentials.
    pub url: String,

    /// Exchange published to; declared on connect.
    pub exchange: String,

    /// Put the channel in confirm mode and await acks.
    pub publisher_confirms: bool,
}

impl BrokerTarget {
    /// The URL with any password masked, safe for logs.
    pub fn redacted_url(&self) -> String {
        match url::Url::parse(&self.url) {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some("****"));
                }
                url.to_string()
            }
            Err(_) => "<invalid url>".to_string(),
        }
    }
}

impl fmt::Debug for BrokerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerTarget")
            .field("url", &self.redacted_url())
            .field("exchange", &self.exchange)
            .field("publisher_confirms", &self.publisher_confirms)
            .finish()
    }
}

impl From<&crate::config::BrokerConfig> for BrokerTarget {
    fn from(config: &crate::config::BrokerConfig) -> Self {
        Self {
            url: config.url.clone(),
            exchange: config.exchange.clone(),
            publisher_confirms: config.publisher_confirms,
        }
    }
}

/// A message to put on the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub routing_key: String,
    pub content_type: &'static str,
    pub payload: Vec<u8>,
}

impl OutboundMessage {
    /// A JSON message for the given routing key.
    pub fn json(routing_key: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            routing_key: routing_key.into(),
            content_type: "application/json",
            payload,
        }
    }
}

/// A live connection to the broker.
#[async_trait]
pub trait BrokerConnection: Send + Sync + fmt::Debug {
    /// Liveness flag of the underlying transport.
    fn is_connected(&self) -> bool;

    /// Publish one message. Resolves once the broker acknowledged it when
    /// confirms are enabled, or once it is written otherwise.
    async fn publish(&self, message: OutboundMessage) -> Result<(), BrokerError>;

    /// Close the connection. Called once, at shutdown.
    async fn close(&self) -> Result<(), BrokerError>;
}

/// Opens broker connections. One call is one connection attempt.
#[async_trait]
pub trait BrokerDialer: Send + Sync {
    async fn dial(&self, target: &BrokerTarget) -> Result<Arc<dyn BrokerConnection>, BrokerError>;
}
