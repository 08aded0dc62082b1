//! Pipeline error taxonomy
//!
//! Extraction and injection issues never reach this level; they are resolved
//! inside the trace module with a deterministic fallback. What remains is
//! stage failure, classified by the owning stage's declared policy, and the
//! defensive aggregation case.

use thiserror::Error;

use crate::domain::downstream::DownstreamError;

/// Request-level pipeline failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage with `Fatal` policy failed; the remaining stages were never
    /// invoked.
    #[error("stage '{stage}' failed fatally: {source}")]
    FatalStage {
        stage: String,
        #[source]
        source: DownstreamError,
    },

    /// No stage produced a usable result despite no fatal failure.
    #[error("no stage produced a usable result")]
    Aggregation,
}
