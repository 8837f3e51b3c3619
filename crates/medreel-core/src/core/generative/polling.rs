//! Render Job Polling
//!
//! Bounded, cancellable status polling for a submitted render job.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::providers::VideoRenderProvider;
use super::video::{VideoJob, VideoJobStatus, VideoRenderStatus};
use crate::core::settings::PollingSettings;
use crate::core::{CoreError, CoreResult};

/// Default delay between status checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of status checks before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 180;

/// Polling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub interval: Duration,
    /// Always at least 1
    pub max_attempts: u32,
}

impl PollingConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Wall-clock budget described for humans, e.g. "15+ minutes".
    /// Rounds down to the largest whole unit.
    pub fn budget_label(&self) -> String {
        let total_ms = self.interval.as_millis() * u128::from(self.max_attempts);
        match total_ms {
            ms if ms >= 60_000 => format!("{}+ minutes", ms / 60_000),
            ms if ms >= 1_000 => format!("{}+ seconds", ms / 1_000),
            ms => format!("{}+ milliseconds", ms),
        }
    }

    /// Error reported once every attempt has been used
    pub fn timeout_error(&self) -> CoreError {
        CoreError::Timeout(format!(
            "Video generation took too long ({})",
            self.budget_label()
        ))
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_MAX_ATTEMPTS)
    }
}

impl From<&PollingSettings> for PollingConfig {
    fn from(settings: &PollingSettings) -> Self {
        Self::new(settings.interval(), settings.max_attempts)
    }
}

/// Drives a [`VideoJob`] to a terminal status
pub struct PollingController {
    provider: Arc<dyn VideoRenderProvider>,
    config: PollingConfig,
}

impl PollingController {
    pub fn new(provider: Arc<dyn VideoRenderProvider>, config: PollingConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> PollingConfig {
        self.config
    }

    /// Polls until the job completes, fails or runs out of attempts.
    pub async fn poll(&self, job: &mut VideoJob, cancel: &CancellationToken) -> CoreResult<String> {
        self.poll_with_progress(job, cancel, |_| {}).await
    }

    /// Like [`poll`](Self::poll), calling `on_attempt` after every status
    /// check with the updated job.
    ///
    /// Each check increments `attempts` first. "Not found" answers are
    /// counted and treated as still pending; any other error ends polling.
    /// No delay follows the last allowed check. Cancellation leaves the job
    /// non-terminal.
    pub async fn poll_with_progress<F>(
        &self,
        job: &mut VideoJob,
        cancel: &CancellationToken,
        mut on_attempt: F,
    ) -> CoreResult<String>
    where
        F: FnMut(&VideoJob) + Send,
    {
        let max_attempts = self.config.max_attempts;

        loop {
            job.attempts += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Self::cancelled(job)),
                result = self.provider.status(&job.id) => result,
            };

            match result {
                Ok(VideoRenderStatus::Completed { video_url }) => {
                    job.status = VideoJobStatus::Completed;
                    job.video_url = Some(video_url.clone());
                    on_attempt(job);
                    info!(
                        "Video {} completed after {} status checks",
                        job.id, job.attempts
                    );
                    return Ok(video_url);
                }
                Ok(VideoRenderStatus::Failed { error }) => {
                    job.status = VideoJobStatus::Failed;
                    on_attempt(job);
                    let detail =
                        error.unwrap_or_else(|| "render service reported failure".to_string());
                    warn!("Video {} failed: {}", job.id, detail);
                    return Err(CoreError::VideoGenerationFailed(detail));
                }
                Ok(VideoRenderStatus::Processing) => {
                    job.status = VideoJobStatus::Rendering;
                }
                Ok(VideoRenderStatus::Pending { .. }) => {}
                Err(e) if e.is_transient_not_found() => {
                    job.not_found_count += 1;
                    debug!("Video {} not visible yet: {}", job.id, e);
                }
                Err(e) => return Err(e),
            }

            debug!(
                "Status check {}/{} for video {}: {}",
                job.attempts, max_attempts, job.id, job.status
            );
            on_attempt(job);

            if job.attempts >= max_attempts {
                job.status = VideoJobStatus::TimedOut;
                on_attempt(job);
                warn!(
                    "Video {} still not ready after {} status checks",
                    job.id, job.attempts
                );
                return Err(self.config.timeout_error());
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Self::cancelled(job)),
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }

    fn cancelled(job: &VideoJob) -> CoreError {
        info!("Polling for video {} cancelled", job.id);
        CoreError::Cancelled(format!(
            "Polling for video {} cancelled after {} status checks",
            job.id, job.attempts
        ))
    }
}
