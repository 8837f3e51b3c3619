//! Credential Resolution
//!
//! Resolves the two service API keys the pipeline needs. Environment
//! variables take precedence; the settings file is a legacy fallback.
//! Keys are never logged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::core::settings::PipelineSettings;
use crate::core::{CoreError, CoreResult};

/// Credential type identifier for logging and validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    /// Text-generation service bearer token
    OpenRouterApiKey,
    /// Video-synthesis service API key
    HeyGenApiKey,
}

impl CredentialType {
    /// Environment variable holding this credential
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::OpenRouterApiKey => "OPENROUTER_API_KEY",
            Self::HeyGenApiKey => "HEYGEN_API_KEY",
        }
    }

    pub fn all() -> [CredentialType; 2] {
        [Self::OpenRouterApiKey, Self::HeyGenApiKey]
    }
}

impl std::fmt::Display for CredentialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenRouterApiKey => write!(f, "OpenRouter API key"),
            Self::HeyGenApiKey => write!(f, "HeyGen API key"),
        }
    }
}

/// Resolved credentials for one process
#[derive(Clone, Default)]
pub struct CredentialStore {
    values: HashMap<CredentialType, String>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("configured", &self.values.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Resolves credentials from the process environment, falling back to
    /// keys stored in settings.
    pub fn from_env(settings: &PipelineSettings) -> Self {
        Self::resolve_with(settings, |name| std::env::var(name).ok())
    }

    /// Resolves credentials through an arbitrary variable lookup.
    pub fn resolve_with(
        settings: &PipelineSettings,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut store = Self::default();

        for kind in CredentialType::all() {
            if let Some(value) = non_blank(lookup(kind.env_var())) {
                debug!("Resolved {} from {}", kind, kind.env_var());
                store.values.insert(kind, value);
                continue;
            }

            let fallback = match kind {
                CredentialType::OpenRouterApiKey => settings.text_generation.api_key.clone(),
                CredentialType::HeyGenApiKey => settings.video_render.api_key.clone(),
            };
            if let Some(value) = non_blank(fallback) {
                warn!("Using settings-based {} fallback", kind);
                store.values.insert(kind, value);
            }
        }

        store
    }

    /// Sets a credential directly
    pub fn with(mut self, kind: CredentialType, value: impl Into<String>) -> Self {
        if let Some(value) = non_blank(Some(value.into())) {
            self.values.insert(kind, value);
        }
        self
    }

    /// Returns the credential or fails with `MissingCredential`
    pub fn require(&self, kind: CredentialType) -> CoreResult<String> {
        self.values.get(&kind).cloned().ok_or_else(|| {
            CoreError::MissingCredential(format!("{} not configured (set {})", kind, kind.env_var()))
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_takes_precedence_over_settings() {
        let mut settings = PipelineSettings::default();
        settings.video_render.api_key = Some("from-settings".to_string());

        let store = CredentialStore::resolve_with(&settings, |name| match name {
            "HEYGEN_API_KEY" => Some("from-env".to_string()),
            _ => None,
        });

        assert_eq!(
            store.require(CredentialType::HeyGenApiKey).unwrap(),
            "from-env"
        );
    }

    #[test]
    fn test_settings_fallback() {
        let mut settings = PipelineSettings::default();
        settings.text_generation.api_key = Some("  sk-or-1  ".to_string());

        let store = CredentialStore::resolve_with(&settings, |_| None);

        assert_eq!(
            store.require(CredentialType::OpenRouterApiKey).unwrap(),
            "sk-or-1"
        );
    }

    #[test]
    fn test_blank_counts_as_missing() {
        let settings = PipelineSettings::default();
        let store = CredentialStore::resolve_with(&settings, |_| Some("   ".to_string()));

        match store.require(CredentialType::HeyGenApiKey) {
            Err(CoreError::MissingCredential(msg)) => assert!(msg.contains("HEYGEN_API_KEY")),
            other => panic!("Expected MissingCredential, got {:?}", other),
        }
    }

    #[test]
    fn test_debug_does_not_leak_values() {
        let store = CredentialStore::default().with(CredentialType::HeyGenApiKey, "secret-key");
        let debug = format!("{:?}", store);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("HeyGenApiKey"));
    }
}
