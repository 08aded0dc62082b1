//! Pipeline orchestrator
//!
//! Runs the configured stages for one inbound request:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        REQUEST PIPELINE                             │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  carrier ─▶ extract ─▶ root scope ─▶ root span                      │
//! │    for each stage, in declared order:                               │
//! │      child span ─▶ inject ─▶ downstream call (deadline) ─▶ classify │
//! │      ─▶ end span ─▶ keep stage context current for the next stage   │
//! │    unwind stage scopes (LIFO) ─▶ aggregate ─▶ end root span         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stages are strictly sequential. Each downstream call carries an explicit
//! deadline; expiry surfaces as a stage failure, never a hang. Cancellation
//! is soft: a fatal failure prevents later stages from starting but an
//! in-flight call is left to resolve on its own deadline.
//!
//! A completed stage's context stays current until the pipeline finishes,
//! so the next stage's span parents under the previous stage's span rather
//! than the root; the chain unwinds in LIFO order before the root span
//! ends.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde_json::Value as JsonValue;

use super::aggregate::{self, PipelineResponse, StageOutcome, StageReport};
use super::error::PipelineError;
use super::stage::{FailurePolicy, Stage, StageState};
use crate::domain::downstream::DownstreamError;
use crate::trace::{
    AttrValue, Carrier, ScopeStack, SpanKind, SpanStatus, TraceContext, Tracer, extract, inject,
    keys,
};
use crate::utils::time;

// =============================================================================
// Process-wide counters
// =============================================================================

/// Counters shared across all concurrent requests.
///
/// The only cross-request mutable state in the server; everything else is
/// request-local.
#[derive(Debug, Default)]
pub struct PipelineStats {
    requests_total: AtomicU64,
    requests_failed: AtomicU64,
    requests_degraded: AtomicU64,
    stages_failed: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub requests_total: u64,
    pub requests_failed: u64,
    pub requests_degraded: u64,
    pub stages_failed: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    fn record_request_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_request_degraded(&self) {
        self.requests_degraded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_stage_failure(&self) {
        self.stages_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            requests_degraded: self.requests_degraded.load(Ordering::Relaxed),
            stages_failed: self.stages_failed.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Per-stage execution result handed back to the request loop.
struct StageRun {
    ctx: TraceContext,
    report: StageReport,
    fatal: bool,
}

/// Sequences the configured stages for each inbound request while
/// preserving trace correlation and applying per-stage failure policy.
pub struct Pipeline {
    tracer: Arc<Tracer>,
    stages: Vec<Stage>,
    stats: Arc<PipelineStats>,
    root_span_name: String,
}

impl Pipeline {
    pub fn new(
        tracer: Arc<Tracer>,
        stages: Vec<Stage>,
        stats: Arc<PipelineStats>,
        root_span_name: impl Into<String>,
    ) -> Self {
        Self {
            tracer,
            stages,
            stats,
            root_span_name: root_span_name.into(),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run the full pipeline for one inbound request.
    ///
    /// Never returns an error: extraction issues resolve into a root
    /// decision, stage issues follow their declared policy, and the outcome
    /// is always a structured [`PipelineResponse`].
    pub async fn run(&self, inbound: &Carrier, input: &JsonValue) -> PipelineResponse {
        self.stats.record_request();

        let scope = ScopeStack::new();
        let extraction = extract(inbound);
        let is_root = extraction.is_root;
        let _remote_guard = extraction.context.map(|ctx| scope.attach(ctx));

        let mut root = self
            .tracer
            .start_span(&scope, &self.root_span_name, SpanKind::Server);
        root.set_attribute(keys::IS_ROOT, is_root);
        let trace_id = root.trace_id();

        tracing::debug!(
            trace_id = %trace_id,
            is_root,
            stages = self.stages.len(),
            "Pipeline started"
        );

        let mut reports = Vec::with_capacity(self.stages.len());
        let mut chain = Vec::new();
        let mut fatal = false;

        for stage in &self.stages {
            let run = self.run_stage(&scope, stage, input).await;
            // The ended stage's context becomes current so the next stage
            // parents under it.
            chain.push(scope.attach(run.ctx));
            reports.push(run.report);
            if run.fatal {
                // Remaining stages are never invoked.
                fatal = true;
                break;
            }
        }

        // Unwind the stage chain in LIFO order before the root span ends.
        while let Some(guard) = chain.pop() {
            drop(guard);
        }

        let degraded = reports.iter().any(|r| r.outcome == StageOutcome::Degraded);
        if fatal {
            self.stats.record_request_failed();
        } else if degraded {
            self.stats.record_request_degraded();
        }

        root.set_attribute(keys::DEGRADED, degraded);
        let status = if fatal {
            SpanStatus::Error
        } else {
            SpanStatus::Ok
        };
        self.tracer.end_span(root, status);

        let response = aggregate::aggregate(trace_id, is_root, reports);
        tracing::debug!(
            trace_id = %trace_id,
            success = response.success,
            degraded = response.degraded,
            services_called = ?response.services_called,
            "Pipeline finished"
        );
        response
    }

    /// Execute one stage: child span, inject, deadline call, classify, end.
    ///
    /// The stage's span is ended unconditionally, whatever the outcome.
    async fn run_stage(&self, scope: &ScopeStack, stage: &Stage, input: &JsonValue) -> StageRun {
        let state = StageState::Pending;

        let mut span = self.tracer.start_span(scope, &stage.name, SpanKind::Client);
        span.set_attribute(keys::STAGE, stage.name.as_str());
        span.set_attribute(keys::STAGE_POLICY, stage.policy.to_string());
        let ctx = span.context();

        // The stage span is now the active context; its identity goes into
        // the outbound carrier.
        let mut carrier = Carrier::new();
        inject(scope, &mut carrier);

        let state = state.advance(StageState::Running, &stage.name);
        let started = Utc::now();
        let result = match tokio::time::timeout(stage.timeout, stage.call.call(&carrier, input))
            .await
        {
            Ok(inner) => inner,
            Err(_) => Err(DownstreamError::Timeout {
                timeout_ms: stage.timeout.as_millis() as u64,
            }),
        };
        let duration_ms = time::duration_ms(started, Utc::now());
        span.set_attribute(keys::DURATION_MS, duration_ms);

        let (state, report, fatal) = match result {
            Ok(body) => {
                let state = state.advance(StageState::Succeeded, &stage.name);
                self.tracer.end_span(span, SpanStatus::Ok);
                let report = StageReport {
                    name: stage.name.clone(),
                    outcome: StageOutcome::Succeeded,
                    duration_ms,
                    result: Some(body),
                    error: None,
                };
                (state, report, false)
            }
            Err(e) => {
                self.stats.record_stage_failure();
                let mut attrs = BTreeMap::new();
                attrs.insert(keys::FAILURE_KIND.to_string(), AttrValue::from(e.kind()));
                attrs.insert(
                    keys::ERROR_MESSAGE.to_string(),
                    AttrValue::from(e.to_string()),
                );
                span.add_event(keys::EVENT_STAGE_FAILED, attrs);
                if let Some(status) = e.status() {
                    span.set_attribute(keys::HTTP_STATUS, status as i64);
                }

                let state = state.advance(StageState::Failed(stage.policy), &stage.name);
                self.tracer.end_span(span, SpanStatus::Error);

                let message = e.to_string();
                let fatal = match stage.policy {
                    FailurePolicy::Recoverable => {
                        tracing::warn!(
                            stage = %stage.name,
                            error = %e,
                            "Stage failed, continuing degraded"
                        );
                        false
                    }
                    FailurePolicy::Fatal => {
                        let err = PipelineError::FatalStage {
                            stage: stage.name.clone(),
                            source: e,
                        };
                        tracing::error!(error = %err, "Aborting pipeline");
                        true
                    }
                };
                let report = StageReport {
                    name: stage.name.clone(),
                    outcome: if fatal {
                        StageOutcome::Failed
                    } else {
                        StageOutcome::Degraded
                    },
                    duration_ms,
                    result: None,
                    error: Some(message),
                };
                (state, report, fatal)
            }
        };

        let _ = state.advance(StageState::Ended, &stage.name);
        StageRun { ctx, report, fatal }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
