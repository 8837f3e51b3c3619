//! Video Render Providers
//!
//! Provider abstraction for avatar video rendering services.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use super::video::{VideoRenderRequest, VideoRenderStatus};
use crate::core::{CoreError, CoreResult, VideoJobId};

/// Trait for asynchronous video rendering services (submit, then poll)
#[async_trait]
pub trait VideoRenderProvider: Send + Sync {
    /// Returns the provider name
    fn name(&self) -> &str;

    /// Submits a render job and returns its id
    async fn submit(&self, request: &VideoRenderRequest) -> CoreResult<VideoJobId>;

    /// Queries the job status. An unknown job id yields
    /// [`CoreError::NotFound`].
    async fn status(&self, job_id: &str) -> CoreResult<VideoRenderStatus>;
}

// =============================================================================
// Mock Provider (for testing)
// =============================================================================

/// Scripted status-query outcome for [`MockVideoRenderProvider`]
#[derive(Clone, Debug)]
pub enum MockStatus {
    Pending,
    Processing,
    NotFound,
    Completed(String),
    Failed(Option<String>),
    Error(String),
}

/// Scripted submission outcome for [`MockVideoRenderProvider`]
#[derive(Clone, Debug)]
pub enum MockSubmit {
    Accepted(String),
    Unauthorized,
    Rejected(String),
}

/// Render provider that replays a scripted status sequence. Once the
/// sequence runs out every further query reports `pending`.
pub struct MockVideoRenderProvider {
    submit_reply: MockSubmit,
    statuses: Mutex<VecDeque<MockStatus>>,
    submissions: Mutex<Vec<VideoRenderRequest>>,
    status_queries: Mutex<Vec<String>>,
}

impl MockVideoRenderProvider {
    pub fn new() -> Self {
        Self {
            submit_reply: MockSubmit::Accepted("mock-video-1".to_string()),
            statuses: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
            status_queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_submit(mut self, reply: MockSubmit) -> Self {
        self.submit_reply = reply;
        self
    }

    /// Appends statuses to the scripted sequence
    pub fn with_statuses(self, statuses: impl IntoIterator<Item = MockStatus>) -> Self {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(statuses);
        self
    }

    /// Payloads submitted so far
    pub fn submissions(&self) -> Vec<VideoRenderRequest> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of status queries received
    pub fn status_query_count(&self) -> usize {
        self.status_queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for MockVideoRenderProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoRenderProvider for MockVideoRenderProvider {
    fn name(&self) -> &str {
        "mock-render"
    }

    async fn submit(&self, request: &VideoRenderRequest) -> CoreResult<VideoJobId> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        match &self.submit_reply {
            MockSubmit::Accepted(id) => Ok(id.clone()),
            MockSubmit::Unauthorized => Err(CoreError::AuthenticationFailed(
                "mock render service rejected the API key".to_string(),
            )),
            MockSubmit::Rejected(msg) => Err(CoreError::RenderRequestFailed(msg.clone())),
        }
    }

    async fn status(&self, job_id: &str) -> CoreResult<VideoRenderStatus> {
        self.status_queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(job_id.to_string());

        let next = self
            .statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(MockStatus::Pending);

        match next {
            MockStatus::Pending => Ok(VideoRenderStatus::Pending {
                raw: "pending".to_string(),
            }),
            MockStatus::Processing => Ok(VideoRenderStatus::Processing),
            MockStatus::NotFound => Err(CoreError::NotFound(format!("video {}", job_id))),
            MockStatus::Completed(video_url) => Ok(VideoRenderStatus::Completed { video_url }),
            MockStatus::Failed(error) => Ok(VideoRenderStatus::Failed { error }),
            MockStatus::Error(msg) => Err(CoreError::RenderRequestFailed(msg)),
        }
    }
}
