//! AI Provider Module
//!
//! Defines the trait and types for text-generation providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::core::{CoreError, CoreResult};

// =============================================================================
// AI Provider Trait
// =============================================================================

/// Trait for text-generation providers (OpenRouter, test doubles, ...)
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Returns the provider name
    fn name(&self) -> &str;

    /// Generates a completion from a prompt
    async fn complete(&self, request: CompletionRequest) -> CoreResult<CompletionResponse>;
}

// =============================================================================
// Conversation Message
// =============================================================================

/// A single role-tagged message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Role: system, user, or assistant
    pub role: String,
    /// Message content
    pub content: String,
}

impl ConversationMessage {
    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }

    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }
}

// =============================================================================
// Completion Request
// =============================================================================

/// Request for text completion
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    /// System prompt/instructions
    pub system: Option<String>,
    /// User prompt
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Model to use (provider-specific)
    pub model: Option<String>,
}

impl CompletionRequest {
    /// Creates a new completion request
    pub fn new(prompt: &str) -> Self {
        Self {
            system: None,
            prompt: prompt.to_string(),
            max_tokens: None,
            model: None,
        }
    }

    /// Sets the system prompt
    pub fn with_system(mut self, system: &str) -> Self {
        self.system = Some(system.to_string());
        self
    }

    /// Sets the maximum tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the model
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    /// Ordered messages: system first (if any), then the user prompt
    pub fn messages(&self) -> Vec<ConversationMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system {
            messages.push(ConversationMessage::system(system));
        }
        messages.push(ConversationMessage::user(&self.prompt));
        messages
    }
}

// =============================================================================
// Completion Response
// =============================================================================

/// Response from text completion
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    /// Generated text
    pub text: String,
    /// Model used
    pub model: String,
    /// Token usage
    pub usage: TokenUsage,
    /// Finish reason
    pub finish_reason: FinishReason,
}

/// Token usage statistics
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt: u32, completion: u32) -> Self {
        Self {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }
    }
}

/// Reason for completion finish
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Normal stop
    #[default]
    Stop,
    /// Reached max tokens
    Length,
    /// Content filter triggered
    ContentFilter,
}

// =============================================================================
// Mock Provider (for testing)
// =============================================================================

/// Scripted reply for [`MockAIProvider`]
#[derive(Clone, Debug)]
pub enum MockReply {
    Text(String),
    /// Text cut off at the token limit
    Truncated(String),
    Unauthorized,
    Failure(String),
}

/// Mock AI provider that replays scripted replies in order and records
/// every request it receives.
pub struct MockAIProvider {
    name: String,
    replies: Mutex<VecDeque<MockReply>>,
    default_response: String,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockAIProvider {
    /// Creates a new mock provider
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            replies: Mutex::new(VecDeque::new()),
            default_response: "Mock response".to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sets the response used once scripted replies run out
    pub fn with_response(mut self, response: &str) -> Self {
        self.default_response = response.to_string();
        self
    }

    /// Queues a scripted reply
    pub fn then(self, reply: MockReply) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
        self
    }

    /// Queues a text reply
    pub fn then_text(self, text: &str) -> Self {
        self.then(MockReply::Text(text.to_string()))
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> CoreResult<CompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| MockReply::Text(self.default_response.clone()));

        let (text, finish_reason) = match reply {
            MockReply::Text(text) => (text, FinishReason::Stop),
            MockReply::Truncated(text) => (text, FinishReason::Length),
            MockReply::Unauthorized => {
                return Err(CoreError::AuthenticationFailed(
                    "mock provider rejected the API key".to_string(),
                ))
            }
            MockReply::Failure(msg) => return Err(CoreError::AIRequestFailed(msg)),
        };

        Ok(CompletionResponse {
            text,
            model: "mock-model".to_string(),
            usage: TokenUsage::new(10, 20),
            finish_reason,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
