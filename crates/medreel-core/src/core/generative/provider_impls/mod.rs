//! Video Render Provider Implementations
//!
//! Concrete adapters for avatar video rendering services.

pub mod heygen;

pub use heygen::HeyGenProvider;
