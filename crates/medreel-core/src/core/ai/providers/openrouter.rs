//! OpenRouter Provider Implementation
//!
//! Implements the AIProvider trait over the OpenRouter chat-completions API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::ProviderConfig;
use crate::core::ai::provider::{
    AIProvider, CompletionRequest, CompletionResponse, ConversationMessage, FinishReason,
    TokenUsage,
};
use crate::core::{CoreError, CoreResult};

// =============================================================================
// OpenRouter Provider
// =============================================================================

/// OpenRouter chat-completions provider
pub struct OpenRouterProvider {
    /// API key
    api_key: String,
    /// Base URL for API requests
    base_url: String,
    /// Default model
    default_model: String,
    /// HTTP client
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenRouterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterProvider")
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}

impl OpenRouterProvider {
    /// Default OpenRouter API base URL
    pub const DEFAULT_BASE_URL: &'static str = "https://openrouter.ai/api/v1";

    /// Default model
    pub const DEFAULT_MODEL: &'static str = "mistralai/mistral-7b-instruct";

    /// Creates a new OpenRouter provider
    pub fn new(config: ProviderConfig) -> CoreResult<Self> {
        let api_key = config
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                CoreError::MissingCredential("OpenRouter API key is required".to_string())
            })?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let default_model = config
            .model
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string());
        let timeout_secs = config.timeout_secs.unwrap_or(60);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CoreError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url,
            default_model,
            client,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Maps a non-success response onto the error taxonomy
    fn parse_api_error(status: StatusCode, body: &str) -> CoreError {
        let message = serde_json::from_str::<ApiError>(body)
            .ok()
            .and_then(|e| e.error.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                let truncated: String = body.chars().take(500).collect();
                if truncated.trim().is_empty() {
                    "Failed to generate text".to_string()
                } else {
                    truncated
                }
            });

        if status == StatusCode::UNAUTHORIZED {
            CoreError::AuthenticationFailed(format!("OpenRouter rejected the API key: {}", message))
        } else {
            CoreError::AIRequestFailed(format!("OpenRouter API error ({}): {}", status, message))
        }
    }
}

// =============================================================================
// OpenRouter API Types
// =============================================================================

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ConversationMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

// =============================================================================
// AIProvider Implementation
// =============================================================================

#[async_trait]
impl AIProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(&self, request: CompletionRequest) -> CoreResult<CompletionResponse> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let api_request = ChatCompletionRequest {
            model: model.clone(),
            messages: request.messages(),
            max_tokens: request.max_tokens,
        };

        debug!("OpenRouter completion request: model={}", model);

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| CoreError::AIRequestFailed(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CoreError::AIRequestFailed(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Self::parse_api_error(status, &body));
        }

        let api_response: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| CoreError::AIRequestFailed(format!("Failed to parse response: {}", e)))?;

        let choice = api_response.choices.into_iter().next().ok_or_else(|| {
            CoreError::AIRequestFailed("No completion choices returned".to_string())
        })?;

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        };

        let usage = api_response
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(CompletionResponse {
            text: choice.message.content.unwrap_or_default(),
            model: api_response.model.unwrap_or(model),
            usage,
            finish_reason,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
