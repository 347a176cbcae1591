//! Startup orchestration.
//!
//! # Responsibilities
//! - Connect to the broker before anything else
//! - Build the dispatcher around the live connection
//! - Bind the listener and serve until shutdown
//! - Release the broker connection on the way out
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, there is no partial startup
//! - Listener binds last (traffic only once the broker is connected)
//! - A listener failure after startup is fatal too

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::broker::{AmqpDialer, BrokerConnection, BrokerDialer, BrokerTarget};
use crate::config::GatewayConfig;
use crate::dispatch::{AppContext, DispatchSettings, Dispatcher};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::{signalled, Shutdown};
use crate::resilience::{Clock, ConnectError, Connector, QuadraticBackoff, RetryPolicy, TokioClock};
use crate::routing::{gateway_routes, RouteError, RouteTable};
use crate::rpc::{HttpLogClient, LogService, RpcError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("broker connection failed: {0}")]
    Connect(#[from] ConnectError),

    #[error("invalid route table: {0}")]
    Routes(#[from] RouteError),

    #[error("logging service client: {0}")]
    Rpc(#[from] RpcError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("listener failed: {0}")]
    Serve(#[source] std::io::Error),
}

impl StartupError {
    /// Startup was abandoned because shutdown was requested, not because it failed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StartupError::Connect(ConnectError::Cancelled { .. }))
    }
}

/// External collaborators the gateway is wired to.
pub struct Collaborators {
    pub dialer: Arc<dyn BrokerDialer>,
    pub log_service: Arc<dyn LogService>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// AMQP broker, HTTP logging service, real timers.
    pub fn production(config: &GatewayConfig) -> Result<Self, StartupError> {
        let log_service = HttpLogClient::new(
            &config.log_service,
            Duration::from_secs(config.timeouts.downstream_secs),
        )?;
        tracing::debug!(endpoint = %log_service.url(), "Logging service client ready");

        Ok(Self {
            dialer: Arc::new(AmqpDialer),
            log_service: Arc::new(log_service),
            clock: Arc::new(TokioClock),
        })
    }
}

/// A connected, bound gateway that has not started serving yet.
pub struct Gateway {
    server: HttpServer,
    listener: TcpListener,
    connection: Arc<dyn BrokerConnection>,
    drain_timeout: Duration,
}

impl Gateway {
    /// Connect to the broker, build the router, bind the listener.
    pub async fn start(
        config: &GatewayConfig,
        collaborators: Collaborators,
        routes: RouteTable,
        shutdown: &Shutdown,
    ) -> Result<Self, StartupError> {
        let policy = RetryPolicy::new(
            config.broker.max_attempts,
            QuadraticBackoff::new(config.broker.backoff_unit()),
        );
        let connector = Connector::new(collaborators.dialer, policy)
            .with_clock(collaborators.clock)
            .with_connect_timeout(config.broker.connect_timeout());

        let target = BrokerTarget::from(&config.broker);
        tracing::info!(
            broker = %target.redacted_url(),
            max_attempts = config.broker.max_attempts,
            "Connecting to broker"
        );
        let connection = connector.connect(&target, &mut shutdown.subscribe()).await?;

        let dispatcher = Arc::new(Dispatcher::new(AppContext {
            broker: connection.clone(),
            log_service: collaborators.log_service,
            settings: DispatchSettings::from_config(config),
        }));
        let server = HttpServer::new(config, routes, dispatcher);

        let listener = match TcpListener::bind(&config.listener.bind_address).await {
            Ok(listener) => listener,
            Err(source) => {
                release(connection.as_ref()).await;
                return Err(StartupError::Bind {
                    address: config.listener.bind_address.clone(),
                    source,
                });
            }
        };

        Ok(Self {
            server,
            listener,
            connection,
            drain_timeout: Duration::from_secs(config.timeouts.shutdown_secs),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until shutdown, then close the broker connection.
    pub async fn serve(self, shutdown: &Shutdown) -> Result<(), StartupError> {
        let Gateway {
            server,
            listener,
            connection,
            drain_timeout,
        } = self;

        let drain_deadline = {
            let rx = shutdown.subscribe();
            async move {
                signalled(rx).await;
                tokio::time::sleep(drain_timeout).await;
            }
        };

        let served = tokio::select! {
            result = server.run(listener, shutdown.subscribe()) => {
                result.map_err(StartupError::Serve)
            }
            _ = drain_deadline => {
                tracing::warn!(
                    timeout = ?drain_timeout,
                    "Drain deadline elapsed with requests in flight"
                );
                Ok(())
            }
        };

        release(connection.as_ref()).await;
        served
    }
}

/// Connect, build, bind and serve with the gateway's fixed routes.
pub async fn run(
    config: GatewayConfig,
    collaborators: Collaborators,
    shutdown: &Shutdown,
) -> Result<(), StartupError> {
    let routes = gateway_routes()?;
    let gateway = Gateway::start(&config, collaborators, routes, shutdown).await?;
    gateway.serve(shutdown).await
}

async fn release(connection: &dyn BrokerConnection) {
    match connection.close().await {
        Ok(()) => tracing::info!("Broker connection closed"),
        Err(e) => tracing::warn!(error = %e, "Failed to close broker connection"),
    }
}
