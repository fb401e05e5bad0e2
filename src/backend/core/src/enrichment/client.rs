//! Client for the remote flow service.
//!
//! The flow service speaks JSON over HTTP POST and wraps every answer in a
//! `{retcode, retmsg, data}` envelope.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::FlowConfig;
use crate::error::{BoardError, ErrorCode, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// Client Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Sends a JSON body to a flow-service endpoint and returns the raw response text.
///
/// Implementations map transport failures onto [`BoardError`] so that
/// `is_retryable()` tells transient failures apart from permanent ones.
#[async_trait]
pub trait FlowClient: Send + Sync {
    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<String>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// HTTP Implementation
// ═══════════════════════════════════════════════════════════════════════════════

/// [`FlowClient`] over reqwest.
#[derive(Debug, Clone)]
pub struct HttpFlowClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFlowClient {
    /// Create a client with a per-request timeout.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                BoardError::new(ErrorCode::ConfigurationError, "Failed to build HTTP client").with_source(e)
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &FlowConfig) -> Result<Self> {
        Self::new(&config.base_url, config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl FlowClient for HttpFlowClient {
    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<String> {
        let url = self.url(path);
        tracing::debug!(url = %url, "POST to flow service");

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(BoardError::upstream_status(status.as_u16(), text).with_context("url", url));
        }

        Ok(text)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Response Envelope
// ═══════════════════════════════════════════════════════════════════════════════

/// The `{retcode, retmsg, data}` wrapper around every flow-service answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEnvelope {
    #[serde(default)]
    pub retcode: i64,
    #[serde(default)]
    pub retmsg: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl FlowEnvelope {
    /// Parse a raw response body.
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| {
            BoardError::new(ErrorCode::InvalidJson, "Flow service returned malformed JSON").with_source(e)
        })
    }

    pub fn is_success(&self) -> bool {
        self.retcode == 0
    }

    /// The envelope itself on success, an upstream error carrying `retmsg` otherwise.
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(BoardError::upstream(self.retcode, self.retmsg))
        }
    }
}

/// One proxied call: POST, bounded by `timeout`, parsed and checked for `retcode == 0`.
///
/// Not retried; callers that proxy user actions (stop) must not repeat them.
pub async fn call_once(
    client: &dyn FlowClient,
    path: &str,
    body: &serde_json::Value,
    timeout: Duration,
) -> Result<FlowEnvelope> {
    let raw = tokio::time::timeout(timeout, client.post(path, body)).await??;
    FlowEnvelope::parse(&raw)?.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_joining() {
        let client = HttpFlowClient::new("http://flow:9380/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://flow:9380");
        assert_eq!(client.url("/v1/job/stop"), "http://flow:9380/v1/job/stop");
        assert_eq!(client.url("v1/job/stop"), "http://flow:9380/v1/job/stop");
    }

    #[test]
    fn test_envelope_parse() {
        let env = FlowEnvelope::parse(r#"{"retcode":0,"retmsg":"success","data":{"a":1}}"#).unwrap();
        assert!(env.is_success());
        assert_eq!(env.data, Some(json!({"a": 1})));

        let env = FlowEnvelope::parse(r#"{"retcode":100,"retmsg":"no such job"}"#).unwrap();
        let err = env.into_result().unwrap_err();
        assert_eq!(err.code(), ErrorCode::UpstreamError);
        assert_eq!(err.user_message(), "no such job");
    }

    #[test]
    fn test_envelope_rejects_garbage() {
        let err = FlowEnvelope::parse("<html>").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidJson);
    }
}
