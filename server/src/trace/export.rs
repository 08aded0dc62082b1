//! Span export boundary
//!
//! Completed spans are handed to a [`SpanSink`]; what happens to them after
//! that (persistence, forwarding) is an external collaborator's concern.
//! Two sinks ship with the server: [`LogSink`] emits structured log lines,
//! [`MemorySink`] keeps a bounded in-memory window for inspection in tests.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::span::Span;
use crate::utils::time;

/// Export sink for completed spans.
pub trait SpanSink: Send + Sync {
    fn export(&self, span: Span);

    /// Short backend name for startup logging.
    fn name(&self) -> &'static str;
}

// =============================================================================
// Log sink
// =============================================================================

/// Emits each completed span as one structured log line.
#[derive(Debug, Default)]
pub struct LogSink;

impl SpanSink for LogSink {
    fn export(&self, span: Span) {
        let duration_ms = span
            .end_time
            .map(|end| time::duration_ms(span.start_time, end));
        tracing::info!(
            target: "traceloom::span",
            trace_id = %span.trace_id,
            span_id = %span.span_id,
            parent_span_id = ?span.parent_span_id.map(|id| id.to_hex()),
            name = %span.name,
            kind = %span.kind,
            status = %span.status,
            start_time = %time::to_rfc3339_micros(span.start_time),
            duration_ms = ?duration_ms,
            events = span.events.len(),
            "Span completed"
        );
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

// =============================================================================
// Memory sink
// =============================================================================

/// Default retained-span window for [`MemorySink`].
pub const MEMORY_SINK_CAPACITY: usize = 1024;

/// Bounded in-memory sink; the oldest spans are dropped past capacity.
#[derive(Debug)]
pub struct MemorySink {
    spans: Mutex<VecDeque<Span>>,
    capacity: usize,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            spans: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Copy of the retained spans in export order.
    pub fn snapshot(&self) -> Vec<Span> {
        self.spans.lock().iter().cloned().collect()
    }

    /// Remove and return all retained spans.
    pub fn drain(&self) -> Vec<Span> {
        self.spans.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.spans.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.lock().is_empty()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(MEMORY_SINK_CAPACITY)
    }
}

impl SpanSink for MemorySink {
    fn export(&self, span: Span) {
        let mut spans = self.spans.lock();
        if spans.len() == self.capacity {
            spans.pop_front();
        }
        spans.push_back(span);
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
