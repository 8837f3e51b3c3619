//! HeyGen Avatar Video Provider
//!
//! Adapter for the HeyGen REST API. Rendering is asynchronous: a submission
//! returns a video id which is then polled through the status endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::core::generative::providers::VideoRenderProvider;
use crate::core::generative::video::{VideoRenderRequest, VideoRenderStatus};
use crate::core::settings::VideoRenderSettings;
use crate::core::{CoreError, CoreResult, VideoJobId};

// =============================================================================
// Constants
// =============================================================================

/// Default base URL for the HeyGen API
pub const DEFAULT_BASE_URL: &str = "https://api.heygen.com";

/// Message used when an error body carries nothing useful
const GENERIC_FAILURE: &str = "Failed to generate video";

// =============================================================================
// API Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    status: String,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

// =============================================================================
// HeyGenProvider
// =============================================================================

/// HeyGen avatar video provider
pub struct HeyGenProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for HeyGenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeyGenProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HeyGenProvider {
    /// Creates a provider from an API key and render settings
    pub fn new(api_key: impl Into<String>, settings: &VideoRenderSettings) -> CoreResult<Self> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(CoreError::MissingCredential(
                "HeyGen API key is required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| CoreError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Set custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn submit_url(&self) -> String {
        format!("{}/v2/video/generate", self.base_url)
    }

    fn status_url(&self) -> String {
        format!("{}/v1/video_status.get", self.base_url)
    }

    /// Best human-readable diagnostic from an error body: `error.message`,
    /// then `message`, then a string `error`.
    fn error_message(body: &str) -> Option<String> {
        let value: Value = serde_json::from_str(body).ok()?;
        Self::message_from_value(&value)
    }

    fn message_from_value(value: &Value) -> Option<String> {
        let candidates = [
            value.pointer("/error/message"),
            value.get("message"),
            value.get("error"),
        ];
        candidates
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|m| !m.is_empty())
            .map(str::to_string)
    }

    /// Parse an error response body
    fn parse_api_error(status: StatusCode, body: &str) -> CoreError {
        let message = Self::error_message(body).unwrap_or_else(|| GENERIC_FAILURE.to_string());

        if status == StatusCode::UNAUTHORIZED {
            CoreError::AuthenticationFailed(format!("HeyGen rejected the API key: {}", message))
        } else {
            CoreError::RenderRequestFailed(format!("HeyGen API error ({}): {}", status, message))
        }
    }

    fn status_from_data(data: StatusData) -> CoreResult<VideoRenderStatus> {
        match data.status.as_str() {
            "completed" => {
                let video_url = data
                    .video_url
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| {
                        CoreError::RenderRequestFailed(
                            "HeyGen reported completion without a video URL".to_string(),
                        )
                    })?;
                Ok(VideoRenderStatus::Completed { video_url })
            }
            "failed" => Ok(VideoRenderStatus::Failed {
                error: data
                    .error
                    .as_ref()
                    .and_then(|e| e.as_str().or_else(|| e.get("message")?.as_str()))
                    .map(str::to_string),
            }),
            "processing" => Ok(VideoRenderStatus::Processing),
            other => Ok(VideoRenderStatus::Pending {
                raw: other.to_string(),
            }),
        }
    }
}

#[async_trait]
impl VideoRenderProvider for HeyGenProvider {
    fn name(&self) -> &str {
        "heygen"
    }

    async fn submit(&self, request: &VideoRenderRequest) -> CoreResult<VideoJobId> {
        let response = self
            .client
            .post(self.submit_url())
            .header("X-Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| CoreError::RenderRequestFailed(format!("Network error: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            CoreError::RenderRequestFailed(format!("Failed to read response: {}", e))
        })?;

        if !status.is_success() {
            return Err(Self::parse_api_error(status, &body));
        }

        let video_id = serde_json::from_str::<Envelope<SubmitData>>(&body)
            .map_err(|e| CoreError::RenderRequestFailed(format!("Failed to parse response: {}", e)))?
            .data
            .map(|d| d.video_id)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                CoreError::RenderRequestFailed(
                    Self::error_message(&body).unwrap_or_else(|| GENERIC_FAILURE.to_string()),
                )
            })?;

        info!("HeyGen render submitted: video_id={}", video_id);
        Ok(video_id)
    }

    async fn status(&self, job_id: &str) -> CoreResult<VideoRenderStatus> {
        let response = self
            .client
            .get(self.status_url())
            .query(&[("video_id", job_id)])
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| CoreError::RenderRequestFailed(format!("Network error: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CoreError::NotFound(format!("HeyGen video {}", job_id)));
        }

        let body = response.text().await.map_err(|e| {
            CoreError::RenderRequestFailed(format!("Failed to read response: {}", e))
        })?;

        if !status.is_success() {
            return Err(Self::parse_api_error(status, &body));
        }

        let data = serde_json::from_str::<Envelope<StatusData>>(&body)
            .map_err(|e| CoreError::RenderRequestFailed(format!("Failed to parse status: {}", e)))?
            .data
            .ok_or_else(|| {
                CoreError::RenderRequestFailed("HeyGen status response has no data".to_string())
            })?;

        debug!("HeyGen video {} status: {}", job_id, data.status);
        Self::status_from_data(data)
    }
}

// =============================================================================
// Tests
// =============================================================================
