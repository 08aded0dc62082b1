//! Inbound context extraction
//!
//! Decodes an inbound carrier into a [`TraceContext`] with a deterministic
//! fallback: any absent or malformed `traceparent` produces a root decision
//! instead of an error. Extraction never raises past this module; a rejected
//! header is a loggable event, not an exception.

use super::carrier::{Carrier, TRACEPARENT_KEY, TRACESTATE_KEY, parse_traceparent};
use super::context::TraceContext;

/// Result of inspecting an inbound carrier.
///
/// `is_root` is true exactly when no valid remote context was found and the
/// request will originate a new trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub context: Option<TraceContext>,
    pub is_root: bool,
}

/// Decode the inbound carrier.
///
/// A pure function of the carrier's `traceparent` and `tracestate` values:
/// identical input always yields identical output.
pub fn extract(carrier: &Carrier) -> Extraction {
    let Some(raw) = carrier.get(TRACEPARENT_KEY) else {
        tracing::debug!("No traceparent in carrier, starting a new trace");
        return Extraction {
            context: None,
            is_root: true,
        };
    };

    match parse_traceparent(raw) {
        Ok(parsed) => {
            let trace_state = carrier.get(TRACESTATE_KEY).map(str::to_string);
            let ctx = TraceContext::remote(parsed.trace_id, parsed.span_id, parsed.sampled, trace_state);
            tracing::trace!(
                trace_id = %ctx.trace_id,
                parent_span_id = %ctx.span_id,
                sampled = ctx.sampled,
                "Continuing remote trace"
            );
            Extraction {
                context: Some(ctx),
                is_root: false,
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, value = raw, "Malformed traceparent, starting a new trace");
            Extraction {
                context: None,
                is_root: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    fn carrier_with(value: &str) -> Carrier {
        [("traceparent", value)].into_iter().collect()
    }

    #[test]
    fn test_extract_valid_carrier() {
        let extraction = extract(&carrier_with(SAMPLE));
        assert!(!extraction.is_root);
        let ctx = extraction.context.unwrap();
        assert_eq!(ctx.trace_id.to_hex(), "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(ctx.span_id.to_hex(), "00f067aa0ba902b7");
        assert!(ctx.sampled);
        assert!(ctx.is_remote);
        assert_eq!(ctx.parent_span_id, None);
    }

    #[test]
    fn test_extract_absent_header_is_root() {
        let extraction = extract(&Carrier::new());
        assert!(extraction.is_root);
        assert_eq!(extraction.context, None);
    }

    #[test]
    fn test_extract_malformed_header_is_root() {
        for value in [
            "garbage",
            "00-abc-def-01",
            "01-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
            "00-00000000000000000000000000000000-00f067aa0ba902b7-01",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-0000000000000000-01",
        ] {
            let extraction = extract(&carrier_with(value));
            assert!(extraction.is_root, "expected root for {value:?}");
            assert_eq!(extraction.context, None);
        }
    }

    #[test]
    fn test_extract_is_deterministic() {
        let carrier = carrier_with(SAMPLE);
        let first = extract(&carrier);
        for _ in 0..8 {
            assert_eq!(extract(&carrier), first);
        }
    }

    #[test]
    fn test_extract_case_insensitive_key() {
        let carrier: Carrier = [("TraceParent", SAMPLE)].into_iter().collect();
        assert!(!extract(&carrier).is_root);
    }

    #[test]
    fn test_extract_carries_tracestate_passthrough() {
        let carrier: Carrier = [("traceparent", SAMPLE), ("tracestate", "vendor=opaque")]
            .into_iter()
            .collect();
        let ctx = extract(&carrier).context.unwrap();
        assert_eq!(ctx.trace_state.as_deref(), Some("vendor=opaque"));
    }
}
