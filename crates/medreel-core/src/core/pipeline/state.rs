//! Pipeline State
//!
//! A single value describing where a run is and what it has produced so far.
//! Every transition consumes the previous state and returns the next one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::generative::VideoJob;
use crate::core::script::ScriptResult;
use crate::core::visuals::VisualElement;
use crate::core::{CoreError, ErrorKind, RunId};

/// Stage of a pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Idle,
    Scripting,
    Visualizing,
    Submitting,
    Polling,
    Done,
    Errored,
}

impl PipelineStage {
    /// Whether a run is in flight
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            PipelineStage::Idle | PipelineStage::Done | PipelineStage::Errored
        )
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Idle => write!(f, "idle"),
            PipelineStage::Scripting => write!(f, "scripting"),
            PipelineStage::Visualizing => write!(f, "visualizing"),
            PipelineStage::Submitting => write!(f, "submitting"),
            PipelineStage::Polling => write!(f, "polling"),
            PipelineStage::Done => write!(f, "done"),
            PipelineStage::Errored => write!(f, "errored"),
        }
    }
}

/// Failure reported to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&CoreError> for ErrorInfo {
    fn from(error: &CoreError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Polling progress while in [`PipelineStage::Polling`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollProgress {
    pub attempt: u32,
    pub max_attempts: u32,
}

/// Snapshot of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    /// `None` until the first run starts
    pub run_id: Option<RunId>,
    pub stage: PipelineStage,
    pub script: Option<ScriptResult>,
    pub visuals: Vec<VisualElement>,
    pub job: Option<VideoJob>,
    pub progress: Option<PollProgress>,
    /// Set only when `stage` is `Done`
    pub video_url: Option<String>,
    pub error: Option<ErrorInfo>,
    pub updated_at: DateTime<Utc>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            run_id: None,
            stage: PipelineStage::Idle,
            script: None,
            visuals: Vec::new(),
            job: None,
            progress: None,
            video_url: None,
            error: None,
            updated_at: Utc::now(),
        }
    }
}

impl PipelineState {
    /// Fresh state for a new run, with every result field cleared
    pub fn started(run_id: impl Into<RunId>) -> Self {
        Self {
            run_id: Some(run_id.into()),
            stage: PipelineStage::Scripting,
            ..Self::default()
        }
    }

    pub fn with_script(self, script: ScriptResult) -> Self {
        Self {
            stage: PipelineStage::Visualizing,
            script: Some(script),
            ..self
        }
        .touched()
    }

    pub fn with_visuals(self, visuals: Vec<VisualElement>) -> Self {
        Self {
            stage: PipelineStage::Submitting,
            visuals,
            ..self
        }
        .touched()
    }

    /// Enters polling for a freshly submitted job
    pub fn polling(self, job: VideoJob, max_attempts: u32) -> Self {
        Self {
            stage: PipelineStage::Polling,
            progress: Some(PollProgress {
                attempt: job.attempts,
                max_attempts,
            }),
            job: Some(job),
            ..self
        }
        .touched()
    }

    /// Records the job after a status check
    pub fn with_job_progress(self, job: VideoJob) -> Self {
        let progress = self.progress.map(|p| PollProgress {
            attempt: job.attempts,
            ..p
        });
        Self {
            job: Some(job),
            progress,
            ..self
        }
        .touched()
    }

    pub fn done(self, job: VideoJob, video_url: String) -> Self {
        Self {
            stage: PipelineStage::Done,
            job: Some(job),
            video_url: Some(video_url),
            error: None,
            ..self
        }
        .touched()
    }

    /// Ends the run with an error; results gathered so far are kept but no
    /// video URL is ever reported.
    pub fn errored(self, error: &CoreError) -> Self {
        Self {
            stage: PipelineStage::Errored,
            video_url: None,
            error: Some(ErrorInfo::from(error)),
            ..self
        }
        .touched()
    }

    pub fn is_active(&self) -> bool {
        self.stage.is_active()
    }

    fn touched(mut self) -> Self {
        self.updated_at = Utc::now();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_activity() {
        assert!(!PipelineStage::Idle.is_active());
        assert!(PipelineStage::Scripting.is_active());
        assert!(PipelineStage::Polling.is_active());
        assert!(!PipelineStage::Done.is_active());
        assert!(!PipelineStage::Errored.is_active());
    }

    #[test]
    fn test_started_clears_previous_results() {
        let finished = PipelineState::started("run-1")
            .with_script(ScriptResult::from_raw("Flu causes fever."))
            .with_visuals(VisualElement::sequence(vec!["a".into(), "b".into(), "c".into()]))
            .done(VideoJob::new("vid"), "https://x/video.mp4".to_string());
        assert_eq!(finished.stage, PipelineStage::Done);

        let next = PipelineState::started("run-2");
        assert_eq!(next.run_id.as_deref(), Some("run-2"));
        assert!(next.script.is_none());
        assert!(next.visuals.is_empty());
        assert!(next.video_url.is_none());
        assert!(next.error.is_none());
    }

    #[test]
    fn test_errored_drops_video_url() {
        let state = PipelineState::started("run-1")
            .done(VideoJob::new("vid"), "https://x/video.mp4".to_string())
            .errored(&CoreError::Cancelled("stop".into()));

        assert_eq!(state.stage, PipelineStage::Errored);
        assert!(state.video_url.is_none());
        assert_eq!(state.error.unwrap().kind, ErrorKind::Cancelled);
    }

    #[test]
    fn test_poll_progress_tracks_attempts() {
        let mut job = VideoJob::new("vid");
        let state = PipelineState::started("run-1").polling(job.clone(), 180);
        assert_eq!(
            state.progress,
            Some(PollProgress {
                attempt: 0,
                max_attempts: 180
            })
        );

        job.attempts = 7;
        let state = state.with_job_progress(job);
        assert_eq!(state.progress.map(|p| p.attempt), Some(7));
        assert_eq!(state.stage, PipelineStage::Polling);
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let json = serde_json::to_value(PipelineState::started("run-1")).unwrap();
        assert_eq!(json["runId"], "run-1");
        assert_eq!(json["stage"], "scripting");
        assert!(json["videoUrl"].is_null());
    }
}
