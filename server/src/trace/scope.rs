//! Scope management
//!
//! Makes a [`TraceContext`] "current" for the duration of a unit of work.
//! Each inbound request owns one [`ScopeStack`]; scopes nest in strict LIFO
//! order within it and two requests never observe each other's stack.
//!
//! Release is unconditional: [`ScopeStack::attach`] returns an RAII guard
//! whose `Drop` performs the exit, so the previous context is restored on
//! normal completion, early return, and unwind alike. The raw
//! [`enter`](ScopeStack::enter)/[`exit`](ScopeStack::exit) pair exists for
//! callers that manage token lifetime explicitly.

use parking_lot::Mutex;

use super::context::TraceContext;

/// Per-request stack of active trace contexts.
#[derive(Debug, Default)]
pub struct ScopeStack {
    stack: Mutex<Vec<TraceContext>>,
}

/// Proof of a scope entry; spent by [`ScopeStack::exit`].
#[derive(Debug)]
#[must_use = "an unexited scope leaks its context into later work"]
pub struct ScopeToken {
    depth: usize,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// The context new spans will parent under, if any.
    pub fn current(&self) -> Option<TraceContext> {
        self.stack.lock().last().cloned()
    }

    pub fn depth(&self) -> usize {
        self.stack.lock().len()
    }

    /// Push a context and return the token that releases it.
    pub fn enter(&self, ctx: TraceContext) -> ScopeToken {
        let mut stack = self.stack.lock();
        let depth = stack.len();
        stack.push(ctx);
        ScopeToken { depth }
    }

    /// Pop back to the state recorded by `token`.
    ///
    /// Exits are expected in LIFO order. An out-of-order exit truncates every
    /// scope above the token so the stack stays deterministic; an exit whose
    /// scopes were already unwound is a no-op.
    pub fn exit(&self, token: ScopeToken) {
        let mut stack = self.stack.lock();
        if stack.len() <= token.depth {
            return;
        }
        if stack.len() != token.depth + 1 {
            tracing::warn!(
                expected_depth = token.depth + 1,
                actual_depth = stack.len(),
                "Out-of-order scope exit, truncating to restore balance"
            );
        }
        stack.truncate(token.depth);
    }

    /// Enter a scope with guaranteed release on every exit path.
    pub fn attach(&self, ctx: TraceContext) -> ScopeGuard<'_> {
        ScopeGuard {
            stack: self,
            token: Some(self.enter(ctx)),
        }
    }
}

/// RAII scope handle returned by [`ScopeStack::attach`].
#[derive(Debug)]
#[must_use = "dropping the guard immediately exits the scope"]
pub struct ScopeGuard<'a> {
    stack: &'a ScopeStack,
    token: Option<ScopeToken>,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            self.stack.exit(token);
        }
    }
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod tests;
