//! Dispatch subsystem: turns a routed request into one downstream call.
//!
//! # Data Flow
//! ```text
//! handler (capability fixed at route registration)
//!     → payload.rs (content type, JSON, required sections)
//!     → Capability::Publish → BrokerConnection::publish
//!     → Capability::LogRpc  → LogService::write_log
//!     → Capability::Inspect → action field → Publish | LogRpc
//!     → DispatchResult | DispatchError (error.rs)
//! ```
//!
//! # Design Decisions
//! - Validation happens before any transport is touched
//! - Exactly one outbound call per dispatch; retry belongs to the transport
//! - Every downstream call runs under a deadline
//! - Only `Inspect` looks at payload content to choose a transport

pub mod error;
pub mod payload;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::broker::{BrokerConnection, OutboundMessage};
use crate::config::GatewayConfig;
use crate::http::response::ApiResponse;
use crate::resilience::timeouts::with_deadline;
use crate::rpc::{LogEntry, LogService};

pub use error::{DispatchError, DownstreamError, ValidationError};
pub use payload::{Action, Submission};

/// Downstream behavior a route invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Forward the body as a message on the broker.
    Publish,
    /// Write a log record through the logging RPC service.
    LogRpc,
    /// Read the payload's action field and redirect.
    Inspect,
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Capability::Publish => "publish",
            Capability::LogRpc => "log_rpc",
            Capability::Inspect => "inspect",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Knobs the dispatcher reads on every request.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Routing key for bodies published via `POST /`.
    pub routing_key: String,
    /// Routing key for `event` actions.
    pub event_routing_key: String,
    pub downstream_timeout: Duration,
    pub max_body_size: usize,
}

impl DispatchSettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            routing_key: config.broker.routing_key.clone(),
            event_routing_key: config.broker.event_routing_key.clone(),
            downstream_timeout: Duration::from_secs(config.timeouts.downstream_secs),
            max_body_size: config.limits.max_body_size,
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

/// Everything a dispatch needs, built once at boot and shared by reference.
#[derive(Clone)]
pub struct AppContext {
    pub broker: Arc<dyn BrokerConnection>,
    pub log_service: Arc<dyn LogService>,
    pub settings: DispatchSettings,
}

/// A successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    pub status: StatusCode,
    pub body: ApiResponse,
}

impl IntoResponse for DispatchResult {
    fn into_response(self) -> Response {
        self.body.with_status(self.status)
    }
}

/// Handler facade over the downstream transports.
pub struct Dispatcher {
    ctx: AppContext,
}

impl Dispatcher {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.ctx.settings
    }

    /// Validate `body` for `capability` and forward it.
    pub async fn dispatch(
        &self,
        capability: Capability,
        headers: &HeaderMap,
        body: &Bytes,
    ) -> Result<DispatchResult, DispatchError> {
        payload::ensure_json(headers)?;

        match capability {
            Capability::Publish => {
                let _: serde_json::Value = payload::parse_json(body)?;
                self.publish(&self.ctx.settings.routing_key, body.to_vec()).await
            }
            Capability::LogRpc => {
                let submission: Submission = payload::parse_json(body)?;
                self.log_via_rpc(submission.log_entry()?).await
            }
            Capability::Inspect => {
                let submission: Submission = payload::parse_json(body)?;
                match submission.into_action()? {
                    Action::Log(entry) => self.log_via_rpc(entry).await,
                    Action::Event(event) => {
                        let payload = serde_json::to_vec(&event)
                            .map_err(|e| ValidationError::MalformedJson(e.to_string()))?;
                        self.publish(&self.ctx.settings.event_routing_key, payload).await
                    }
                }
            }
        }
    }

    async fn publish(
        &self,
        routing_key: &str,
        payload: Vec<u8>,
    ) -> Result<DispatchResult, DispatchError> {
        let broker = &self.ctx.broker;
        if !broker.is_connected() {
            return Err(DownstreamError::BrokerUnavailable.into());
        }

        let message = OutboundMessage::json(routing_key, payload);
        with_deadline(self.ctx.settings.downstream_timeout, broker.publish(message))
            .await
            .map_err(|_| DownstreamError::Timeout)?
            .map_err(DownstreamError::from)?;

        Ok(DispatchResult {
            status: StatusCode::ACCEPTED,
            body: ApiResponse::ok(
                "published to broker",
                Some(json!({ "routing_key": routing_key })),
            ),
        })
    }

    async fn log_via_rpc(&self, entry: LogEntry) -> Result<DispatchResult, DispatchError> {
        let reply = with_deadline(
            self.ctx.settings.downstream_timeout,
            self.ctx.log_service.write_log(&entry),
        )
        .await
        .map_err(|_| DownstreamError::Timeout)?
        .map_err(DownstreamError::from)?;

        Ok(DispatchResult {
            status: StatusCode::ACCEPTED,
            body: ApiResponse::ok("logged via RPC", Some(json!({ "result": reply.result }))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::BrokerError;
    use crate::rpc::{LogReply, RpcError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingBroker {
        published: Mutex<Vec<OutboundMessage>>,
        down: AtomicBool,
    }

    #[async_trait]
    impl BrokerConnection for RecordingBroker {
        fn is_connected(&self) -> bool {
            !self.down.load(Ordering::SeqCst)
        }
        async fn publish(&self, message: OutboundMessage) -> Result<(), BrokerError> {
            self.published.lock().unwrap().push(message);
            Ok(())
        }
        async fn close(&self) -> Result<(), BrokerError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingLogService {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LogService for RecordingLogService {
        async fn write_log(&self, entry: &LogEntry) -> Result<LogReply, RpcError> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(LogReply {
                result: "logged!".into(),
            })
        }
    }

    struct SlowLogService;

    #[async_trait]
    impl LogService for SlowLogService {
        async fn write_log(&self, _entry: &LogEntry) -> Result<LogReply, RpcError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(LogReply { result: "late".into() })
        }
    }

    fn dispatcher(
        broker: Arc<RecordingBroker>,
        log_service: Arc<dyn LogService>,
    ) -> Dispatcher {
        Dispatcher::new(AppContext {
            broker,
            log_service,
            settings: DispatchSettings {
                downstream_timeout: Duration::from_millis(50),
                ..DispatchSettings::default()
            },
        })
    }

    #[tokio::test]
    async fn publish_forwards_body_verbatim() {
        let broker = Arc::new(RecordingBroker::default());
        let d = dispatcher(broker.clone(), Arc::new(RecordingLogService::default()));
        let body = Bytes::from_static(br#"{"hello": "world"}"#);

        let result = d.dispatch(Capability::Publish, &HeaderMap::new(), &body).await.unwrap();

        assert_eq!(result.status, StatusCode::ACCEPTED);
        let published = broker.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].payload, body.to_vec());
        assert_eq!(published[0].routing_key, "gateway.submission");
    }

    #[tokio::test]
    async fn inspect_event_publishes_event_section() {
        let broker = Arc::new(RecordingBroker::default());
        let d = dispatcher(broker.clone(), Arc::new(RecordingLogService::default()));
        let body = Bytes::from_static(br#"{"action":"event","event":{"kind":"signup"}}"#);

        d.dispatch(Capability::Inspect, &HeaderMap::new(), &body).await.unwrap();

        let published = broker.published.lock().unwrap();
        assert_eq!(published[0].routing_key, "gateway.event");
        assert_eq!(published[0].payload, br#"{"kind":"signup"}"#.to_vec());
    }

    #[tokio::test]
    async fn disconnected_broker_fails_without_publishing() {
        let broker = Arc::new(RecordingBroker::default());
        broker.down.store(true, Ordering::SeqCst);
        let d = dispatcher(broker.clone(), Arc::new(RecordingLogService::default()));

        let err = d
            .dispatch(Capability::Publish, &HeaderMap::new(), &Bytes::from_static(b"{}"))
            .await
            .unwrap_err();

        assert_eq!(err, DispatchError::Downstream(DownstreamError::BrokerUnavailable));
        assert!(broker.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_body_never_reaches_transport() {
        let broker = Arc::new(RecordingBroker::default());
        let logs = Arc::new(RecordingLogService::default());
        let d = dispatcher(broker.clone(), logs.clone());

        for capability in [Capability::Publish, Capability::LogRpc, Capability::Inspect] {
            let err = d
                .dispatch(capability, &HeaderMap::new(), &Bytes::from_static(b"not json"))
                .await
                .unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }

        assert!(broker.published.lock().unwrap().is_empty());
        assert!(logs.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn slow_rpc_hits_deadline() {
        let d = dispatcher(Arc::new(RecordingBroker::default()), Arc::new(SlowLogService));
        let body = Bytes::from_static(br#"{"log":{"name":"a","data":"b"}}"#);

        let err = d.dispatch(Capability::LogRpc, &HeaderMap::new(), &body).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
