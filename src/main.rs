//! Broker gateway.
//!
//! An HTTP front door for a message-driven backend: requests are turned into
//! messages on a topic exchange or calls to the logging service.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────┐
//!                   │                  BROKER GATEWAY                  │
//!                   │                                                  │
//!   Client Request  │  ┌─────────┐   ┌──────────┐   ┌────────────┐     │
//!   ────────────────┼─▶│  http   │──▶│ routing  │──▶│  dispatch  │─────┼──▶ Broker (AMQP)
//!                   │  │ server  │   │  table   │   │ capability │     │
//!                   │  └─────────┘   └──────────┘   └─────┬──────┘     │
//!   Client Response │       ▲                             │            │
//!   ◀───────────────┼───────┴─────────────────────────────┴────────────┼──▶ Logging service
//!                   │                                                  │
//!                   │  ┌────────────────────────────────────────────┐  │
//!                   │  │            Cross-Cutting Concerns           │  │
//!                   │  │  config · observability · resilience ·      │  │
//!                   │  │  lifecycle (connect → serve → drain)        │  │
//!                   │  └────────────────────────────────────────────┘  │
//!                   └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use broker_gateway::config::validation::validate_config;
use broker_gateway::config::{load_config, GatewayConfig, LogFormat};
use broker_gateway::lifecycle::signals::spawn_signal_listener;
use broker_gateway::lifecycle::{self, Collaborators, Shutdown, StartupError};
use broker_gateway::observability::{self, BuildInfo};

#[derive(Parser, Debug)]
#[command(name = "broker-gateway")]
#[command(
    about = "HTTP gateway in front of a message broker and a logging service",
    long_about = None
)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Listener port, keeping the configured host.
    #[arg(short, long, env = "GATEWAY_PORT")]
    port: Option<u16>,

    #[arg(long, env = "BROKER_URL")]
    broker_url: Option<String>,

    /// json, pretty or compact
    #[arg(long, env = "GATEWAY_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn resolve_config(&self) -> Result<GatewayConfig, String> {
        let mut config = match &self.config {
            Some(path) => load_config(path).map_err(|e| format!("{}: {}", path.display(), e))?,
            None => GatewayConfig::default(),
        };

        if let Some(port) = self.port {
            config.listener.set_port(port);
        }
        if let Some(url) = &self.broker_url {
            config.broker.url = url.clone();
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }

        validate_config(&config).map_err(|errors| {
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        })?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("broker-gateway: invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = observability::init_logging(&config.observability) {
        eprintln!("broker-gateway: {}", e);
        return ExitCode::FAILURE;
    }
    BuildInfo::current().log_banner();

    tracing::info!(
        bind_address = %config.listener.bind_address,
        log_service = %config.log_service.endpoint,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = observability::metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_listener(shutdown.clone());

    let collaborators = match Collaborators::production(&config) {
        Ok(collaborators) => collaborators,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    exit_status(lifecycle::run(config, collaborators, &shutdown).await)
}

/// Map the gateway outcome to the process exit code.
///
/// A signal that cancels startup is a clean shutdown, not a failure.
fn exit_status(result: Result<(), StartupError>) -> ExitCode {
    match result {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) if e.is_cancelled() => {
            tracing::info!(reason = %e, "Startup cancelled by shutdown signal");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Gateway stopped with error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker_gateway::broker::BrokerError;
    use broker_gateway::resilience::ConnectError;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["broker-gateway"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let config = cli(&[
            "--port",
            "9000",
            "--broker-url",
            "amqp://u:p@localhost",
            "--log-format",
            "compact",
        ])
        .resolve_config()
        .unwrap();
        assert!(config.listener.bind_address.ends_with(":9000"));
        assert_eq!(config.broker.url, "amqp://u:p@localhost");
        assert_eq!(config.observability.log_format, LogFormat::Compact);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let err = cli(&["--broker-url", "not a url"]).resolve_config().unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = cli(&["--config", "/nonexistent/gateway.toml"])
            .resolve_config()
            .unwrap_err();
        assert!(err.contains("/nonexistent/gateway.toml"));
    }

    #[test]
    fn cancelled_startup_exits_cleanly() {
        let cancelled = StartupError::Connect(ConnectError::Cancelled { attempts: 1 });
        assert_eq!(exit_status(Err(cancelled)), ExitCode::SUCCESS);
        assert_eq!(exit_status(Ok(())), ExitCode::SUCCESS);
    }

    #[test]
    fn exhausted_broker_exits_with_failure() {
        let exhausted = StartupError::Connect(ConnectError::Exhausted {
            attempts: 6,
            source: BrokerError::Dial("connection refused".into()),
        });
        assert_eq!(exit_status(Err(exhausted)), ExitCode::FAILURE);
    }
}
