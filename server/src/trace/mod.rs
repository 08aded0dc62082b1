//! Trace-context propagation fabric
//!
//! Everything that touches correlation identity lives in this one module;
//! call sites depend on it instead of re-deriving extract/attach/inject
//! logic per collaborator.
//!
//! | Component         | Module       |
//! |-------------------|--------------|
//! | Identity types    | `context`    |
//! | Carrier + codec   | `carrier`    |
//! | Context Extractor | `extract`    |
//! | Scope Manager     | `scope`      |
//! | Span Tree Builder | `span`       |
//! | Context Injector  | `inject`     |
//! | Export sinks      | `export`     |
//!
//! Data flow for one request: inbound carrier → [`extract`] → remote scope →
//! root span via [`Tracer::start_span`] → per downstream call: child span →
//! [`inject`] into the outbound carrier → call → span end → scope restore.

pub mod carrier;
pub mod context;
pub mod export;
pub mod extract;
pub mod inject;
pub mod scope;
pub mod span;

pub use carrier::{Carrier, TRACEPARENT_KEY, TRACESTATE_KEY, TraceParentError};
pub use context::{SpanId, TraceContext, TraceId};
pub use export::{LogSink, MemorySink, SpanSink};
pub use extract::{Extraction, extract};
pub use inject::inject;
pub use scope::{ScopeGuard, ScopeStack, ScopeToken};
pub use span::{ActiveSpan, AttrValue, Span, SpanEvent, SpanKind, SpanStatus, Tracer, keys};
