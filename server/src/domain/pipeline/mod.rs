//! Request pipeline
//!
//! For one inbound request the orchestrator runs an ordered list of stages,
//! each a downstream call, propagating trace context to every collaborator
//! and applying per-stage failure policy. Results fold into one composite
//! response.
//!
//! | Stage piece      | Module            |
//! |------------------|-------------------|
//! | Stage config     | `stage`           |
//! | Orchestration    | `orchestrator`    |
//! | Aggregation      | `aggregate`       |
//! | Error taxonomy   | `error`           |

mod aggregate;
mod error;
mod orchestrator;
mod stage;

pub use aggregate::{ErrorBody, PipelineResponse, StageOutcome, StageReport};
pub use error::PipelineError;
pub use orchestrator::{Pipeline, PipelineStats, StatsSnapshot};
pub use stage::{FailurePolicy, Stage, StageState};
