//! Video Render Types
//!
//! Wire payload for avatar video rendering, the render service's job status
//! and the locally tracked job record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::VideoJobId;

// =============================================================================
// Render Payload
// =============================================================================

/// Body of a render submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRenderRequest {
    pub video_inputs: Vec<VideoInput>,
    pub dimension: VideoDimension,
}

/// One speaking segment with its overlays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInput {
    pub character: AvatarCharacter,
    pub voice: NarrationVoice,
    pub background: VideoBackground,
    pub scenes: Vec<OverlayScene>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarCharacter {
    #[serde(rename = "type")]
    pub kind: String,
    pub avatar_id: String,
    pub avatar_style: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationVoice {
    #[serde(rename = "type")]
    pub kind: String,
    /// Spoken narration
    pub input_text: String,
    pub voice_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoBackground {
    #[serde(rename = "type")]
    pub kind: String,
    /// Hex color, e.g. `#008000`
    pub value: String,
}

/// A timed text overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayScene {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub position: ScenePosition,
    pub start_time: u32,
    pub duration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenePosition {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDimension {
    pub width: u32,
    pub height: u32,
}

// =============================================================================
// Remote Status
// =============================================================================

/// Status reported by the render service for a submitted job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VideoRenderStatus {
    /// Queued or waiting; carries the raw status string
    Pending { raw: String },
    Processing,
    Completed { video_url: String },
    Failed { error: Option<String> },
}

impl VideoRenderStatus {
    /// Whether polling can stop on this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VideoRenderStatus::Completed { .. } | VideoRenderStatus::Failed { .. }
        )
    }

    /// Short label for logs and progress reporting
    pub fn label(&self) -> &str {
        match self {
            VideoRenderStatus::Pending { raw } => raw,
            VideoRenderStatus::Processing => "processing",
            VideoRenderStatus::Completed { .. } => "completed",
            VideoRenderStatus::Failed { .. } => "failed",
        }
    }
}

// =============================================================================
// Local Job Record
// =============================================================================

/// Lifecycle of a submitted render job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoJobStatus {
    Pending,
    Rendering,
    Completed,
    Failed,
    TimedOut,
}

impl VideoJobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VideoJobStatus::Completed | VideoJobStatus::Failed | VideoJobStatus::TimedOut
        )
    }
}

impl std::fmt::Display for VideoJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoJobStatus::Pending => write!(f, "pending"),
            VideoJobStatus::Rendering => write!(f, "rendering"),
            VideoJobStatus::Completed => write!(f, "completed"),
            VideoJobStatus::Failed => write!(f, "failed"),
            VideoJobStatus::TimedOut => write!(f, "timed out"),
        }
    }
}

/// A render job as tracked by this process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoJob {
    pub id: VideoJobId,
    pub status: VideoJobStatus,
    /// Set only once the job completed
    pub video_url: Option<String>,
    pub submitted_at: DateTime<Utc>,
    /// Status checks performed so far
    pub attempts: u32,
    /// Status checks answered with "not found"
    pub not_found_count: u32,
}

impl VideoJob {
    pub fn new(id: impl Into<VideoJobId>) -> Self {
        Self {
            id: id.into(),
            status: VideoJobStatus::Pending,
            video_url: None,
            submitted_at: Utc::now(),
            attempts: 0,
            not_found_count: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_uses_type_keys() {
        let background = VideoBackground {
            kind: "color".to_string(),
            value: "#008000".to_string(),
        };
        let json = serde_json::to_value(&background).unwrap();
        assert_eq!(json["type"], "color");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_render_status_terminal() {
        assert!(!VideoRenderStatus::Pending {
            raw: "waiting".into()
        }
        .is_terminal());
        assert!(!VideoRenderStatus::Processing.is_terminal());
        assert!(VideoRenderStatus::Completed {
            video_url: "https://x/video.mp4".into()
        }
        .is_terminal());
        assert!(VideoRenderStatus::Failed { error: None }.is_terminal());
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = VideoJob::new("vid-1");
        assert_eq!(job.status, VideoJobStatus::Pending);
        assert!(job.video_url.is_none());
        assert_eq!(job.attempts, 0);
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_job_status_terminal_set() {
        assert!(VideoJobStatus::Completed.is_terminal());
        assert!(VideoJobStatus::Failed.is_terminal());
        assert!(VideoJobStatus::TimedOut.is_terminal());
        assert!(!VideoJobStatus::Rendering.is_terminal());
    }
}
