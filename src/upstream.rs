//! HTTP client for the upstream chat-completions endpoint.

use bytes::Bytes;

use crate::error::{BridgeError, Result};

/// Raw upstream answer: whatever status and body came back.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
    endpoint: String,
    api_key: String,
}

impl UpstreamClient {
    /// `client` carries any timeout policy; this type adds none and never retries.
    pub fn new(client: reqwest::Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST an already-serialized payload. Non-2xx statuses are not errors
    /// here; only a failed exchange is.
    pub async fn send(&self, payload: Bytes) -> Result<UpstreamReply> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| BridgeError::transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::transport(format!("failed to read response body: {e}")))?;

        Ok(UpstreamReply { status, body })
    }
}
