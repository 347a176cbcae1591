//! JSON-over-HTTP client for the logging service.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::config::LogServiceConfig;
use crate::rpc::{LogEntry, LogReply, LogService, RpcError};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteLogRequest<'a> {
    log_entry: &'a LogEntry,
}

/// Calls the write-log procedure over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLogClient {
    client: reqwest::Client,
    url: Url,
}

impl HttpLogClient {
    pub fn new(config: &LogServiceConfig, timeout: Duration) -> Result<Self, RpcError> {
        let url = Url::parse(&config.endpoint)
            .and_then(|base| base.join(&config.write_path))
            .map_err(|e| RpcError::Endpoint(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            // Internal service; never route through an outbound proxy.
            .no_proxy()
            .build()
            .map_err(|e| RpcError::Endpoint(e.to_string()))?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl LogService for HttpLogClient {
    async fn write_log(&self, entry: &LogEntry) -> Result<LogReply, RpcError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&WriteLogRequest { log_entry: entry })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::Timeout
                } else {
                    RpcError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RpcError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<LogReply>()
            .await
            .map_err(|e| RpcError::InvalidReply(e.to_string()))
    }
}
