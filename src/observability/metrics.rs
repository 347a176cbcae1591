//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, capability
//! - `gateway_request_duration_seconds` (histogram): latency by capability
//! - `gateway_broker_connect_attempts_total` (counter): dials by outcome
//! - `gateway_downstream_errors_total` (counter): failures by component
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Exporter is opt-in via `observability.metrics_enabled`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "gateway_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "gateway_request_duration_seconds";
pub const BROKER_CONNECT_ATTEMPTS_TOTAL: &str = "gateway_broker_connect_attempts_total";
pub const DOWNSTREAM_ERRORS_TOTAL: &str = "gateway_downstream_errors_total";

/// Install the global Prometheus recorder with a scrape listener on `addr`.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, capability: &'static str, start: Instant) {
    ::metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string(),
        "capability" => capability
    )
    .increment(1);
    ::metrics::histogram!(REQUEST_DURATION_SECONDS, "capability" => capability)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_connect_attempt(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    ::metrics::counter!(BROKER_CONNECT_ATTEMPTS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_downstream_error(component: &'static str) {
    ::metrics::counter!(DOWNSTREAM_ERRORS_TOTAL, "component" => component).increment(1);
}
