//! AI Module
//!
//! Text-generation integration used for narration scripts and visual label
//! suggestions.

pub mod provider;
pub mod providers;

pub use provider::{
    AIProvider, CompletionRequest, CompletionResponse, ConversationMessage, FinishReason,
    MockAIProvider, MockReply, TokenUsage,
};
pub use providers::{OpenRouterProvider, ProviderConfig};
