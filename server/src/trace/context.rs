//! Trace identity types
//!
//! A `TraceContext` is the correlating tuple carried between services: the
//! 128-bit trace id shared by every span of one logical request, the 64-bit
//! id of the span that is currently active, and the sampled flag. Contexts
//! are created either by extraction from an inbound carrier (remote origin)
//! or by minting a fresh id pair when no valid carrier is present (root).

use std::fmt;

/// Trace id size in bytes (W3C traceparent format)
pub const TRACE_ID_LEN: usize = 16;

/// Span id size in bytes (W3C traceparent format)
pub const SPAN_ID_LEN: usize = 8;

// =============================================================================
// Identifiers
// =============================================================================

/// 128-bit trace identifier.
///
/// Immutable for the lifetime of one logical request and identical across
/// every span derived from it. The all-zero value is invalid on the wire and
/// never produced by [`TraceId::random`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId([u8; TRACE_ID_LEN]);

impl TraceId {
    pub const fn from_bytes(bytes: [u8; TRACE_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Mint a fresh random trace id, rejecting the invalid all-zero value.
    pub fn random() -> Self {
        loop {
            let bytes: [u8; TRACE_ID_LEN] = rand::random();
            if bytes != [0u8; TRACE_ID_LEN] {
                return Self(bytes);
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; TRACE_ID_LEN]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// 64-bit span identifier, unique within a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId([u8; SPAN_ID_LEN]);

impl SpanId {
    pub const fn from_bytes(bytes: [u8; SPAN_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Mint a fresh random span id, rejecting the invalid all-zero value.
    pub fn random() -> Self {
        loop {
            let bytes: [u8; SPAN_ID_LEN] = rand::random();
            if bytes != [0u8; SPAN_ID_LEN] {
                return Self(bytes);
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; SPAN_ID_LEN]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// =============================================================================
// TraceContext
// =============================================================================

/// The correlating identity passed between services.
///
/// `span_id` is the span that is logically current: new work started under
/// this context parents under it. For a remote context the id pair comes
/// straight off the wire, so `span_id` is the caller's active span and
/// `parent_span_id` is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub sampled: bool,
    pub is_remote: bool,
    /// Opaque `tracestate` passthrough. Never parsed for correctness
    /// decisions, only re-emitted on injection.
    pub trace_state: Option<String>,
}

impl TraceContext {
    /// Mint a root context: fresh trace id, fresh span id, no parent.
    pub fn root() -> Self {
        Self {
            trace_id: TraceId::random(),
            span_id: SpanId::random(),
            parent_span_id: None,
            sampled: true,
            is_remote: false,
            trace_state: None,
        }
    }

    /// Build a remote-origin context from wire identity.
    pub fn remote(
        trace_id: TraceId,
        span_id: SpanId,
        sampled: bool,
        trace_state: Option<String>,
    ) -> Self {
        Self {
            trace_id,
            span_id,
            parent_span_id: None,
            sampled,
            is_remote: true,
            trace_state,
        }
    }

    /// Derive a child context: same trace, fresh span id, parented under
    /// this context's span.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id: SpanId::random(),
            parent_span_id: Some(self.span_id),
            sampled: self.sampled,
            is_remote: false,
            trace_state: self.trace_state.clone(),
        }
    }
}
