//! Inbound payload validation.

use axum::http::{header, HeaderMap};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatch::error::ValidationError;
use crate::rpc::LogEntry;

/// Body accepted by `POST /handle` and `POST /log-grpc`.
///
/// ```json
/// {"action": "log", "log": {"name": "event", "data": "user signed in"}}
/// {"action": "event", "event": {"kind": "signup", "user": 42}}
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub action: Option<String>,

    #[serde(default)]
    pub log: Option<LogEntry>,

    #[serde(default)]
    pub event: Option<Value>,
}

/// What a submission asks for, once its action field is resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Log(LogEntry),
    Event(Value),
}

impl Submission {
    pub fn log_entry(self) -> Result<LogEntry, ValidationError> {
        self.log.ok_or(ValidationError::MissingField("log"))
    }

    /// Resolve the declared action against its payload section.
    pub fn into_action(mut self) -> Result<Action, ValidationError> {
        let action = self
            .action
            .take()
            .ok_or(ValidationError::MissingField("action"))?;

        match action.as_str() {
            "log" => self.log_entry().map(Action::Log),
            "event" => self
                .event
                .map(Action::Event)
                .ok_or(ValidationError::MissingField("event")),
            other => Err(ValidationError::UnknownAction(other.to_string())),
        }
    }
}

/// Accept JSON media types; a missing header is treated as JSON.
pub fn ensure_json(headers: &HeaderMap) -> Result<(), ValidationError> {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return Ok(());
    };

    let raw = value
        .to_str()
        .map_err(|_| ValidationError::UnsupportedContentType("<non-ascii>".to_string()))?;
    let essence = raw
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence == "application/json" || essence.ends_with("+json") {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedContentType(raw.to_string()))
    }
}

pub fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ValidationError> {
    serde_json::from_slice(body).map_err(|e| ValidationError::MalformedJson(e.to_string()))
}
