//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Turn the frozen route table into the served router
//! - Wire up middleware (request id, tracing, timeout, CORS, probe, logger)
//! - Serve on a bound listener until shutdown is signalled

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::DefaultBodyLimit, middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::dispatch::Dispatcher;
use crate::http::middleware::{cors_layer, heartbeat, inject_request_logger};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::shutdown::signalled;
use crate::routing::RouteTable;

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server dispatching `routes` through `dispatcher`.
    pub fn new(config: &GatewayConfig, routes: RouteTable, dispatcher: Arc<Dispatcher>) -> Self {
        let router = Self::build_router(config, routes, dispatcher);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers run outermost first in the reverse order they are added here.
    #[allow(deprecated)]
    fn build_router(
        config: &GatewayConfig,
        routes: RouteTable,
        dispatcher: Arc<Dispatcher>,
    ) -> Router {
        let mut router = routes
            .into_router()
            .with_state(dispatcher)
            .layer(DefaultBodyLimit::max(config.limits.max_body_size));

        if config.observability.request_logging {
            router = router.layer(middleware::from_fn(inject_request_logger));
        }

        router
            .layer(middleware::from_fn(heartbeat))
            .layer(cors_layer(&config.cors))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for in-process use.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signalled(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
