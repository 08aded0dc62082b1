//! Carrier wire format and `traceparent` codec
//!
//! A carrier is the serialized header form used to transmit a
//! [`TraceContext`] across a call boundary: an ordered mapping of
//! header-style string keys to string values. The one contractually
//! meaningful key is `traceparent`:
//!
//! ```text
//! {version}-{trace-id}-{span-id}-{trace-flags}
//! 00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01
//! ```
//!
//! `tracestate` is an opaque passthrough, never parsed.

use thiserror::Error;

use super::context::{SPAN_ID_LEN, SpanId, TRACE_ID_LEN, TraceContext, TraceId};

/// Contractual carrier key for the trace identity.
pub const TRACEPARENT_KEY: &str = "traceparent";

/// Opaque vendor passthrough key.
pub const TRACESTATE_KEY: &str = "tracestate";

/// The only supported `traceparent` version.
pub const TRACEPARENT_VERSION: &str = "00";

/// Bit 0 of the trace flags field: sampled.
pub const SAMPLED_FLAG: u8 = 0x01;

// =============================================================================
// Carrier
// =============================================================================

/// Ordered header-style key/value mapping.
///
/// Lookup is case-insensitive; `set` is last-write-wins per key; iteration
/// preserves insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Carrier {
    entries: Vec<(String, String)>,
}

impl Carrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive lookup. The first matching entry wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace a value. An existing entry keeps its position and
    /// original key casing.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            Some((_, v)) => *v = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Carrier {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut carrier = Self::new();
        for (k, v) in iter {
            carrier.set(&k.into(), v);
        }
        carrier
    }
}

// =============================================================================
// traceparent codec
// =============================================================================

/// Why a `traceparent` value was rejected.
///
/// Consumed by the extractor and turned into a root-context decision; this
/// error never propagates past the trace module.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceParentError {
    #[error("expected 4 '-'-separated fields, found {0}")]
    FieldCount(usize),

    #[error("unsupported version '{0}'")]
    Version(String),

    #[error("trace id must be 32 hex characters")]
    TraceIdFormat,

    #[error("trace id must not be all zeros")]
    TraceIdZero,

    #[error("span id must be 16 hex characters")]
    SpanIdFormat,

    #[error("span id must not be all zeros")]
    SpanIdZero,

    #[error("trace flags must be 2 hex characters")]
    FlagsFormat,
}

/// Identity fields decoded from a valid `traceparent` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTraceParent {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub sampled: bool,
}

/// Decode a `traceparent` value.
///
/// Requires exactly 4 hyphen-separated fields: version `00`, a 32-hex-digit
/// non-zero trace id, a 16-hex-digit non-zero span id, and 2 hex digits of
/// flags. Decoding is a pure function of the input value.
pub fn parse_traceparent(value: &str) -> Result<ParsedTraceParent, TraceParentError> {
    let fields: Vec<&str> = value.trim().split('-').collect();
    if fields.len() != 4 {
        return Err(TraceParentError::FieldCount(fields.len()));
    }

    if fields[0] != TRACEPARENT_VERSION {
        return Err(TraceParentError::Version(fields[0].to_string()));
    }

    if fields[1].len() != TRACE_ID_LEN * 2 {
        return Err(TraceParentError::TraceIdFormat);
    }
    let trace_bytes = hex::decode(fields[1]).map_err(|_| TraceParentError::TraceIdFormat)?;
    let mut trace_id = [0u8; TRACE_ID_LEN];
    trace_id.copy_from_slice(&trace_bytes);
    let trace_id = TraceId::from_bytes(trace_id);
    if trace_id.is_zero() {
        return Err(TraceParentError::TraceIdZero);
    }

    if fields[2].len() != SPAN_ID_LEN * 2 {
        return Err(TraceParentError::SpanIdFormat);
    }
    let span_bytes = hex::decode(fields[2]).map_err(|_| TraceParentError::SpanIdFormat)?;
    let mut span_id = [0u8; SPAN_ID_LEN];
    span_id.copy_from_slice(&span_bytes);
    let span_id = SpanId::from_bytes(span_id);
    if span_id.is_zero() {
        return Err(TraceParentError::SpanIdZero);
    }

    if fields[3].len() != 2 {
        return Err(TraceParentError::FlagsFormat);
    }
    let flags = u8::from_str_radix(fields[3], 16).map_err(|_| TraceParentError::FlagsFormat)?;

    Ok(ParsedTraceParent {
        trace_id,
        span_id,
        sampled: flags & SAMPLED_FLAG != 0,
    })
}

/// Encode a context's identity as a `traceparent` value.
pub fn format_traceparent(ctx: &TraceContext) -> String {
    let flags = if ctx.sampled { SAMPLED_FLAG } else { 0 };
    format!(
        "{}-{}-{}-{:02x}",
        TRACEPARENT_VERSION,
        ctx.trace_id.to_hex(),
        ctx.span_id.to_hex(),
        flags
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    #[test]
    fn test_parse_valid_traceparent() {
        let parsed = parse_traceparent(SAMPLE).unwrap();
        assert_eq!(parsed.trace_id.to_hex(), "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(parsed.span_id.to_hex(), "00f067aa0ba902b7");
        assert!(parsed.sampled);
    }

    #[test]
    fn test_parse_unsampled_flags() {
        let parsed =
            parse_traceparent("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-00").unwrap();
        assert!(!parsed.sampled);
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        assert_eq!(
            parse_traceparent("00-abc-def"),
            Err(TraceParentError::FieldCount(3))
        );
        assert_eq!(
            parse_traceparent(""),
            Err(TraceParentError::FieldCount(1))
        );
    }

    #[test]
    fn test_parse_rejects_unknown_version() {
        let value = "01-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";
        assert_eq!(
            parse_traceparent(value),
            Err(TraceParentError::Version("01".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_bad_trace_id() {
        // Too short
        assert_eq!(
            parse_traceparent("00-abc123-00f067aa0ba902b7-01"),
            Err(TraceParentError::TraceIdFormat)
        );
        // Non-hex
        assert_eq!(
            parse_traceparent("00-zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz-00f067aa0ba902b7-01"),
            Err(TraceParentError::TraceIdFormat)
        );
        // All zeros
        assert_eq!(
            parse_traceparent("00-00000000000000000000000000000000-00f067aa0ba902b7-01"),
            Err(TraceParentError::TraceIdZero)
        );
    }

    #[test]
    fn test_parse_rejects_bad_span_id() {
        assert_eq!(
            parse_traceparent("00-4bf92f3577b34da6a3ce929d0e0e4736-def456-01"),
            Err(TraceParentError::SpanIdFormat)
        );
        assert_eq!(
            parse_traceparent("00-4bf92f3577b34da6a3ce929d0e0e4736-0000000000000000-01"),
            Err(TraceParentError::SpanIdZero)
        );
    }

    #[test]
    fn test_parse_rejects_bad_flags() {
        assert_eq!(
            parse_traceparent("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-0"),
            Err(TraceParentError::FlagsFormat)
        );
        assert_eq!(
            parse_traceparent("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-zz"),
            Err(TraceParentError::FlagsFormat)
        );
    }

    #[test]
    fn test_format_round_trip() {
        let parsed = parse_traceparent(SAMPLE).unwrap();
        let ctx = TraceContext::remote(parsed.trace_id, parsed.span_id, parsed.sampled, None);
        assert_eq!(format_traceparent(&ctx), SAMPLE);
    }

    #[test]
    fn test_carrier_get_is_case_insensitive() {
        let carrier: Carrier = [("TraceParent", SAMPLE)].into_iter().collect();
        assert_eq!(carrier.get("traceparent"), Some(SAMPLE));
        assert_eq!(carrier.get("TRACEPARENT"), Some(SAMPLE));
        assert_eq!(carrier.get("tracestate"), None);
    }

    #[test]
    fn test_carrier_set_is_last_write_wins() {
        let mut carrier = Carrier::new();
        carrier.set("X-Request-Id", "first");
        carrier.set("x-request-id", "second");
        assert_eq!(carrier.len(), 1);
        assert_eq!(carrier.get("X-Request-Id"), Some("second"));
        // Original key casing is preserved
        assert_eq!(carrier.iter().next(), Some(("X-Request-Id", "second")));
    }

    #[test]
    fn test_carrier_preserves_insertion_order() {
        let mut carrier = Carrier::new();
        carrier.set("a", "1");
        carrier.set("b", "2");
        carrier.set("c", "3");
        let keys: Vec<&str> = carrier.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }
}
