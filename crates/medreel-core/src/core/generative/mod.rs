//! Avatar Video Rendering
//!
//! Builds render payloads, submits them to a rendering service and polls the
//! resulting job until it reaches a terminal status.

pub mod polling;
pub mod provider_impls;
pub mod providers;
pub mod request_builder;
pub mod video;

// Re-export main types
pub use polling::{PollingConfig, PollingController};
pub use provider_impls::HeyGenProvider;
pub use providers::{MockStatus, MockSubmit, MockVideoRenderProvider, VideoRenderProvider};
pub use request_builder::VideoRequestBuilder;
pub use video::{VideoJob, VideoJobStatus, VideoRenderRequest, VideoRenderStatus};
