//! Outbound context injection
//!
//! Encodes the currently active span's identity into an outbound carrier.
//! The span id written into `traceparent` is exactly the identity of the
//! span that is logically the parent of whatever the callee will create;
//! this function has no way to mint a fresh id.

use super::carrier::{Carrier, TRACEPARENT_KEY, TRACESTATE_KEY, format_traceparent};
use super::scope::ScopeStack;

/// Write the current context's identity into `carrier`.
///
/// Sets `traceparent` from the context at the top of `scope` and re-emits
/// any `tracestate` passthrough it carries. With nothing in scope the
/// carrier is left untouched.
pub fn inject(scope: &ScopeStack, carrier: &mut Carrier) {
    let Some(ctx) = scope.current() else {
        tracing::debug!("No active context, carrier left untouched");
        return;
    };

    carrier.set(TRACEPARENT_KEY, format_traceparent(&ctx));
    if let Some(state) = &ctx.trace_state {
        carrier.set(TRACESTATE_KEY, state.clone());
    }
}
