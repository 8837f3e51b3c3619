//! MedReel Core Library
//!
//! Turns a short structured description of a medical condition into a
//! narrated explainer video by orchestrating a text-generation service and
//! an asynchronous avatar video-synthesis service.
//!
//! The entry point is [`core::pipeline::PipelineOrchestrator`]; progress is
//! observed through its [`tokio::sync::watch`] subscription.

pub mod core;

pub use crate::core::pipeline::{PipelineOrchestrator, PipelineOutcome, PipelineStage, PipelineState};
pub use crate::core::{CoreError, CoreResult, ErrorKind, GenerationRequest};
