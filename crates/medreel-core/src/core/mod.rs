//! MedReel Core Engine
//!
//! Generation pipeline for narrated medical explainer videos.
//! Handles script generation, visual suggestions, render submission and
//! completion polling.

pub mod ai;
pub mod credentials;
pub mod generative;
pub mod pipeline;
pub mod script;
pub mod settings;
pub mod visuals;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;

#[cfg(test)]
mod tests_pipeline;
