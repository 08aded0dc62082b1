//! Downstream collaborator boundary
//!
//! Each pipeline stage talks to one external collaborator through
//! [`DownstreamCall`]: a carrier plus a structured request body in, a
//! structured response body or a classified error out. The orchestrator is
//! transport-agnostic; the HTTP implementation lives in [`http`].

mod http;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::trace::Carrier;

pub use http::HttpDownstream;

/// One downstream collaborator call.
#[async_trait]
pub trait DownstreamCall: Send + Sync {
    /// Invoke the collaborator with the outbound carrier and request body.
    ///
    /// Implementations do not enforce the stage deadline; the orchestrator
    /// owns it.
    async fn call(&self, carrier: &Carrier, body: &JsonValue) -> Result<JsonValue, DownstreamError>;
}

/// Why a downstream call failed.
///
/// Every variant maps into the owning stage's declared failure policy; none
/// of them escapes the pipeline directly.
#[derive(Debug, Error)]
pub enum DownstreamError {
    /// The stage deadline expired before a response arrived.
    #[error("call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Connection-level failure (refused, reset, DNS).
    #[error("transport error: {0}")]
    Transport(String),

    /// The collaborator answered with a non-success status.
    #[error("unexpected response status {status}")]
    Status { status: u16 },

    /// The collaborator answered, but not with a decodable body.
    #[error("invalid response body: {0}")]
    InvalidResponse(String),
}

impl DownstreamError {
    /// Stable failure classification for span attributes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }

    /// HTTP status carried by the failure, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }
}
