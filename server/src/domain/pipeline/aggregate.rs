//! Composite response assembly
//!
//! Folds the per-stage outcomes of one request into the caller-facing
//! response: the merged domain result, the ordered list of stages whose
//! outcome contributed to it, the trace identity, and the error body when
//! the pipeline failed.
//!
//! `services_called` membership rule: every succeeded stage plus a
//! fatally-failing stage. A recoverable failure contributes nothing to the
//! response body; it is recorded on the stage's span and reflected by the
//! `degraded` flag.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::error::PipelineError;
use crate::trace::TraceId;

/// Outcome of one executed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageOutcome {
    Succeeded,
    /// Recoverable failure; the pipeline continued without this stage's
    /// contribution.
    Degraded,
    /// Fatal failure; the pipeline aborted here.
    Failed,
}

/// Per-stage entry in the caller-facing response.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub name: String,
    pub outcome: StageOutcome,
    pub duration_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Structured error carried by a failed response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub message: String,
}

/// Caller-facing composite response for one inbound request.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResponse {
    pub success: bool,
    pub degraded: bool,
    /// Merged domain result, keyed by stage name.
    pub result: JsonValue,
    pub stages: Vec<StageReport>,
    /// Ordered stage names whose outcome folded into this response.
    pub services_called: Vec<String>,
    pub trace_id: String,
    pub is_root_span: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Combine executed stage reports into one composite response.
pub fn aggregate(trace_id: TraceId, is_root: bool, reports: Vec<StageReport>) -> PipelineResponse {
    let mut merged = Map::new();
    let mut services_called = Vec::new();
    let mut fatal: Option<ErrorBody> = None;
    let mut degraded = false;

    for report in &reports {
        match report.outcome {
            StageOutcome::Succeeded => {
                services_called.push(report.name.clone());
                if let Some(result) = &report.result {
                    merged.insert(report.name.clone(), result.clone());
                }
            }
            StageOutcome::Degraded => {
                degraded = true;
            }
            StageOutcome::Failed => {
                services_called.push(report.name.clone());
                fatal = Some(ErrorBody {
                    stage: Some(report.name.clone()),
                    message: report.error.clone().unwrap_or_default(),
                });
            }
        }
    }

    let any_succeeded = reports
        .iter()
        .any(|r| r.outcome == StageOutcome::Succeeded);

    let (success, error) = match fatal {
        Some(body) => (false, Some(body)),
        None if !any_succeeded => {
            // Defensive: nothing usable and nothing fatal.
            tracing::error!(
                trace_id = %trace_id,
                stages = reports.len(),
                "Aggregation produced no usable result"
            );
            (
                false,
                Some(ErrorBody {
                    stage: None,
                    message: PipelineError::Aggregation.to_string(),
                }),
            )
        }
        None => (true, None),
    };

    PipelineResponse {
        success,
        degraded,
        result: JsonValue::Object(merged),
        stages: reports,
        services_called,
        trace_id: trace_id.to_hex(),
        is_root_span: is_root,
        error,
    }
}
