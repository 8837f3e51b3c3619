//! Generation Pipeline
//!
//! Orchestration of a full run and the state it publishes to observers.

mod orchestrator;
mod state;

pub use orchestrator::{PipelineOrchestrator, PipelineOutcome};
pub use state::{ErrorInfo, PipelineStage, PipelineState, PollProgress};
