//! Span model and tree builder
//!
//! A span is one recorded unit of work with timing, attributes, and a
//! position in the trace tree. The [`Tracer`] is the explicit handle through
//! which spans are started and ended; it is constructed once at application
//! init and passed by reference, never held in process-wide state.
//!
//! Parenting rule: a span started while a context is in scope inherits that
//! context's trace id and parents under its span id. With no context in
//! scope a fresh trace is minted and the span becomes a root.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::context::{SpanId, TraceContext, TraceId};
use super::export::SpanSink;
use super::scope::{ScopeGuard, ScopeStack};

// =============================================================================
// ATTRIBUTE KEYS
// =============================================================================

/// Closed set of span attribute and event names used by the pipeline.
///
/// Call sites reference these constants instead of re-deriving string
/// literals per collaborator.
pub mod keys {
    /// Stage name, set on every stage span.
    pub const STAGE: &str = "loom.stage";

    /// Declared failure policy of the stage.
    pub const STAGE_POLICY: &str = "loom.stage.policy";

    /// Wall-clock duration of the operation in milliseconds.
    pub const DURATION_MS: &str = "loom.duration_ms";

    /// Whether this request originated the trace.
    pub const IS_ROOT: &str = "loom.trace.is_root";

    /// Whether the composite response was degraded by a recoverable failure.
    pub const DEGRADED: &str = "loom.degraded";

    /// Failure classification: timeout, transport, status, invalid_response.
    pub const FAILURE_KIND: &str = "loom.failure.kind";

    /// Human-readable failure cause.
    pub const ERROR_MESSAGE: &str = "error.message";

    /// Downstream HTTP status code, when the failure carries one.
    pub const HTTP_STATUS: &str = "http.response.status_code";

    /// Event recorded on a stage span when its downstream call fails.
    pub const EVENT_STAGE_FAILED: &str = "stage.failed";
}

// =============================================================================
// SPAN MODEL
// =============================================================================

/// Role of a span relative to the call boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Internal,
    Server,
    Client,
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanKind::Internal => write!(f, "internal"),
            SpanKind::Server => write!(f, "server"),
            SpanKind::Client => write!(f, "client"),
        }
    }
}

/// Final status of a span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error,
}

impl fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanStatus::Unset => write!(f, "unset"),
            SpanStatus::Ok => write!(f, "ok"),
            SpanStatus::Error => write!(f, "error"),
        }
    }
}

/// Scalar attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(v) => write!(f, "{}", v),
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

/// Timestamped occurrence within a span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanEvent {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub attributes: BTreeMap<String, AttrValue>,
}

/// One recorded unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub name: String,
    pub kind: SpanKind,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub attributes: BTreeMap<String, AttrValue>,
    pub status: SpanStatus,
    pub events: Vec<SpanEvent>,
}

// =============================================================================
// ACTIVE SPAN
// =============================================================================

/// A started, not-yet-ended span together with the scope it holds.
///
/// The span's context is current for as long as this value lives; the scope
/// is released when the span is ended, or on drop if the unit of work
/// unwinds before ending it.
#[derive(Debug)]
pub struct ActiveSpan<'a> {
    span: Span,
    ctx: TraceContext,
    scope: ScopeGuard<'a>,
}

impl ActiveSpan<'_> {
    pub fn trace_id(&self) -> TraceId {
        self.span.trace_id
    }

    pub fn span_id(&self) -> SpanId {
        self.span.span_id
    }

    /// The context this span made current.
    pub fn context(&self) -> TraceContext {
        self.ctx.clone()
    }

    /// Set an attribute; a prior value for the same key is overwritten.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.span.attributes.insert(key.to_string(), value.into());
    }

    /// Append a timestamped event.
    pub fn add_event(&mut self, name: &str, attributes: BTreeMap<String, AttrValue>) {
        self.span.events.push(SpanEvent {
            name: name.to_string(),
            timestamp: Utc::now(),
            attributes,
        });
    }
}

// =============================================================================
// TRACER
// =============================================================================

/// Span tree builder.
///
/// Holds the export sink; all span lifecycle operations go through this
/// handle.
pub struct Tracer {
    sink: Arc<dyn SpanSink>,
}

impl Tracer {
    pub fn new(sink: Arc<dyn SpanSink>) -> Self {
        Self { sink }
    }

    /// Start a span parented under whatever context is current in `scope`.
    ///
    /// The new span's context is pushed as current; the previous scope is
    /// restored when the span ends (or the returned value is dropped).
    pub fn start_span<'a>(&self, scope: &'a ScopeStack, name: &str, kind: SpanKind) -> ActiveSpan<'a> {
        let parent = scope.current();
        let ctx = match &parent {
            Some(parent) => parent.child(),
            None => TraceContext::root(),
        };

        let span = Span {
            trace_id: ctx.trace_id,
            span_id: ctx.span_id,
            parent_span_id: ctx.parent_span_id,
            name: name.to_string(),
            kind,
            start_time: Utc::now(),
            end_time: None,
            attributes: BTreeMap::new(),
            status: SpanStatus::Unset,
            events: Vec::new(),
        };

        tracing::trace!(
            trace_id = %span.trace_id,
            span_id = %span.span_id,
            parent_span_id = ?span.parent_span_id.map(|id| id.to_string()),
            name = %span.name,
            "Span started"
        );

        let guard = scope.attach(ctx.clone());
        ActiveSpan {
            span,
            ctx,
            scope: guard,
        }
    }

    /// End a span exactly once: record end time and status, restore the
    /// previous scope, and emit the completed span to the export sink.
    pub fn end_span(&self, active: ActiveSpan<'_>, status: SpanStatus) {
        let ActiveSpan { mut span, scope, .. } = active;
        span.end_time = Some(Utc::now());
        span.status = status;
        drop(scope);
        self.sink.export(span);
    }

    /// Run `f` inside a span with guaranteed scope restoration.
    ///
    /// The span ends with `Ok` status when `f` succeeds and `Error` status
    /// (with the failure recorded) when it fails; either way the previously
    /// current context is restored. A panic inside `f` still restores the
    /// scope via the span's guard.
    pub fn in_span<'a, T, E, F>(
        &self,
        scope: &'a ScopeStack,
        name: &str,
        kind: SpanKind,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut ActiveSpan<'a>) -> Result<T, E>,
        E: fmt::Display,
    {
        let mut active = self.start_span(scope, name, kind);
        match f(&mut active) {
            Ok(value) => {
                self.end_span(active, SpanStatus::Ok);
                Ok(value)
            }
            Err(e) => {
                active.set_attribute(keys::ERROR_MESSAGE, e.to_string());
                self.end_span(active, SpanStatus::Error);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "span_tests.rs"]
mod tests;
