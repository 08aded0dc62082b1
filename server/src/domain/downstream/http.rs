//! HTTP downstream client
//!
//! Carrier entries become HTTP request headers, so the `traceparent` and
//! `tracestate` pair injected by the orchestrator reaches the collaborator
//! unchanged. The reqwest client is shared across stages; per-stage
//! deadlines are enforced by the orchestrator, not here.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::{DownstreamCall, DownstreamError};
use crate::trace::Carrier;

/// Collaborator reached with an HTTP POST of the JSON request body.
pub struct HttpDownstream {
    client: reqwest::Client,
    url: String,
}

impl HttpDownstream {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DownstreamCall for HttpDownstream {
    async fn call(&self, carrier: &Carrier, body: &JsonValue) -> Result<JsonValue, DownstreamError> {
        let mut request = self.client.post(&self.url).json(body);
        for (key, value) in carrier.iter() {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DownstreamError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownstreamError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| DownstreamError::InvalidResponse(e.to_string()))
    }
}
