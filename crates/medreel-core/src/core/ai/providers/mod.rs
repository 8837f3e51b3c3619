//! AI Provider Implementations
//!
//! Concrete implementations of the AIProvider trait.

mod openrouter;

pub use openrouter::OpenRouterProvider;

use serde::{Deserialize, Serialize};

use crate::core::settings::TextGenerationSettings;

/// Configuration for creating a provider
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// API key (bearer token)
    pub api_key: Option<String>,
    /// Base URL (for custom endpoints)
    pub base_url: Option<String>,
    /// Default model to use
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("has_api_key", &self.api_key.is_some())
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    /// Creates a new OpenRouter provider config
    pub fn openrouter(api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            base_url: None,
            model: Some(OpenRouterProvider::DEFAULT_MODEL.to_string()),
            timeout_secs: Some(60),
        }
    }

    /// Builds a config from persisted text-generation settings
    pub fn from_settings(api_key: &str, settings: &TextGenerationSettings) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            base_url: Some(settings.base_url.clone()),
            model: Some(settings.model.clone()),
            timeout_secs: Some(settings.timeout_secs),
        }
    }

    /// Sets the base URL
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    /// Sets the model
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }
}
