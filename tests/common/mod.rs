//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;

use broker_gateway::broker::{
    BrokerConnection, BrokerDialer, BrokerError, BrokerTarget, OutboundMessage,
};
use broker_gateway::config::GatewayConfig;
use broker_gateway::dispatch::{AppContext, DispatchSettings, Dispatcher};
use broker_gateway::http::{ApiResponse, HttpServer};
use broker_gateway::lifecycle::Collaborators;
use broker_gateway::resilience::Clock;
use broker_gateway::routing::gateway_routes;
use broker_gateway::rpc::{LogEntry, LogReply, LogService, RpcError};

/// In-memory broker connection that records every publish.
#[derive(Debug)]
pub struct MockBroker {
    pub published: Mutex<Vec<OutboundMessage>>,
    pub connected: AtomicBool,
    pub fail_publish: AtomicBool,
    pub closed: AtomicBool,
}

impl MockBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            published: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
            fail_publish: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    pub fn published(&self) -> Vec<OutboundMessage> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrokerConnection for MockBroker {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn publish(&self, message: OutboundMessage) -> Result<(), BrokerError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(BrokerError::Publish("channel closed by broker".into()));
        }
        self.published.lock().unwrap().push(message);
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.closed.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Dialer that refuses the first `failures` attempts, then hands out `broker`.
pub struct MockDialer {
    pub broker: Arc<MockBroker>,
    failures_left: AtomicU32,
    pub dials: AtomicU32,
}

impl MockDialer {
    pub fn new(broker: Arc<MockBroker>, failures: u32) -> Arc<Self> {
        Arc::new(Self {
            broker,
            failures_left: AtomicU32::new(failures),
            dials: AtomicU32::new(0),
        })
    }

    pub fn dials(&self) -> u32 {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerDialer for MockDialer {
    async fn dial(&self, _target: &BrokerTarget) -> Result<Arc<dyn BrokerConnection>, BrokerError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(BrokerError::Dial("connection refused".into()));
        }
        let connection: Arc<dyn BrokerConnection> = self.broker.clone();
        Ok(connection)
    }
}

/// Logging service stub that records entries.
#[derive(Default)]
pub struct MockLogService {
    pub entries: Mutex<Vec<LogEntry>>,
    pub unreachable: AtomicBool,
}

impl MockLogService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogService for MockLogService {
    async fn write_log(&self, entry: &LogEntry) -> Result<LogReply, RpcError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RpcError::Unavailable("connection refused".into()));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(LogReply {
            result: format!("logged: {}", entry.name),
        })
    }
}

/// Clock that records requested sleeps and returns immediately.
#[derive(Default)]
pub struct RecordingClock {
    pub sleeps: Mutex<Vec<Duration>>,
}

impl RecordingClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// Defaults with a loopback listener on an ephemeral port.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.timeouts.shutdown_secs = 2;
    config
}

pub fn collaborators(
    dialer: Arc<MockDialer>,
    log_service: Arc<MockLogService>,
    clock: Arc<RecordingClock>,
) -> Collaborators {
    Collaborators {
        dialer,
        log_service,
        clock,
    }
}

/// Fully layered router around the mocks, without a listener.
pub fn router_with(
    config: &GatewayConfig,
    broker: Arc<MockBroker>,
    log_service: Arc<MockLogService>,
) -> Router {
    let dispatcher = Arc::new(Dispatcher::new(AppContext {
        broker,
        log_service,
        settings: DispatchSettings::from_config(config),
    }));
    HttpServer::new(config, gateway_routes().unwrap(), dispatcher).into_router()
}

pub fn router(broker: Arc<MockBroker>, log_service: Arc<MockLogService>) -> Router {
    router_with(&test_config(), broker, log_service)
}

pub fn post_json(path: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> ApiResponse {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
