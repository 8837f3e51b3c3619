//! Narration Script Generation
//!
//! Asks the text-generation service for a short narration and cleans it into
//! something an avatar can speak: stage directions stripped, whitespace
//! collapsed, hard-capped at [`MAX_SCRIPT_CHARS`] characters.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::core::ai::{AIProvider, CompletionRequest, FinishReason};
use crate::core::{truncate_chars, CoreResult, GenerationRequest};

/// Character budget for the spoken narration
pub const MAX_SCRIPT_CHARS: usize = 300;

/// Token cap sent with the script request (budget plus headroom)
pub const DEFAULT_SCRIPT_MAX_TOKENS: u32 = 350;

const SYSTEM_PROMPT: &str =
    "You are a medical explainer. Create concise explanations (300 characters max).";

/// Raw model output and its speakable form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptResult {
    pub raw: String,
    /// Always at most [`MAX_SCRIPT_CHARS`] characters
    pub cleaned: String,
}

impl ScriptResult {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let cleaned = clean_script(&raw);
        Self { raw, cleaned }
    }
}

/// Removes `[...]` and `(...)` asides, collapses whitespace runs, trims and
/// truncates to [`MAX_SCRIPT_CHARS`] characters.
pub fn clean_script(raw: &str) -> String {
    static BRACKETS_RE: OnceLock<Regex> = OnceLock::new();
    static PARENS_RE: OnceLock<Regex> = OnceLock::new();
    static SPACES_RE: OnceLock<Regex> = OnceLock::new();

    let brackets =
        BRACKETS_RE.get_or_init(|| Regex::new(r"\[.*?\]").expect("bracket regex should compile"));
    let parens =
        PARENS_RE.get_or_init(|| Regex::new(r"\(.*?\)").expect("paren regex should compile"));
    let spaces =
        SPACES_RE.get_or_init(|| Regex::new(r"\s{2,}").expect("whitespace regex should compile"));

    let without_brackets = brackets.replace_all(raw, "");
    let without_parens = parens.replace_all(&without_brackets, "");
    let collapsed = spaces.replace_all(&without_parens, " ");

    truncate_chars(collapsed.trim(), MAX_SCRIPT_CHARS)
}

/// Builds the user prompt embedding the request fields
pub fn script_prompt(request: &GenerationRequest) -> String {
    format!(
        "Explain \"{}\" (symptoms: {}) in 300 CHARACTERS MAX: {}",
        request.disease, request.symptoms, request.description
    )
}

/// Generates narration scripts through an [`AIProvider`]
pub struct ScriptGenerator {
    provider: Arc<dyn AIProvider>,
    model: Option<String>,
    max_tokens: u32,
}

impl ScriptGenerator {
    pub fn new(provider: Arc<dyn AIProvider>) -> Self {
        Self {
            provider,
            model: None,
            max_tokens: DEFAULT_SCRIPT_MAX_TOKENS,
        }
    }

    /// Overrides the provider's default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Generates and cleans a narration script. Remote errors propagate
    /// unchanged; there is no retry.
    pub async fn generate(&self, request: &GenerationRequest) -> CoreResult<ScriptResult> {
        let mut completion = CompletionRequest::new(&script_prompt(request))
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(self.max_tokens);
        if let Some(model) = &self.model {
            completion = completion.with_model(model);
        }

        debug!(
            "Requesting narration script from {} for '{}'",
            self.provider.name(),
            request.disease
        );

        let response = self.provider.complete(completion).await?;
        match response.finish_reason {
            FinishReason::Length => warn!(
                "Script for '{}' hit the {}-token limit and may end mid-sentence",
                request.disease, self.max_tokens
            ),
            FinishReason::ContentFilter => warn!(
                "Script for '{}' was cut short by the provider's content filter",
                request.disease
            ),
            FinishReason::Stop => {}
        }
        let script = ScriptResult::from_raw(response.text);

        info!(
            "Script generated: {} chars ({} raw)",
            script.cleaned.chars().count(),
            script.raw.chars().count()
        );

        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::{MockAIProvider, MockReply};
    use crate::core::CoreError;

    #[test]
    fn test_clean_strips_directions_and_collapses() {
        let cleaned = clean_script("[narrator tone] Flu causes fever. (pause) Stay hydrated.");
        assert_eq!(cleaned, "Flu causes fever. Stay hydrated.");
    }

    #[test]
    fn test_clean_non_greedy_per_group() {
        let cleaned = clean_script("A [x] B [y] C (p) D (q) E");
        assert_eq!(cleaned, "A B C D E");
    }

    #[test]
    fn test_clean_keeps_single_newline() {
        // Only runs of two or more whitespace characters collapse
        assert_eq!(clean_script("Line one.\nLine two."), "Line one.\nLine two.");
        assert_eq!(clean_script("Line one.\n\nLine two."), "Line one. Line two.");
    }

    #[test]
    fn test_clean_hard_truncates() {
        let raw = "word ".repeat(200);
        let cleaned = clean_script(&raw);
        assert_eq!(cleaned.chars().count(), MAX_SCRIPT_CHARS);
        assert!(cleaned.starts_with("word word"));
    }

    #[test]
    fn test_clean_truncates_on_char_boundary() {
        let raw = "é".repeat(400);
        let cleaned = clean_script(&raw);
        assert_eq!(cleaned.chars().count(), MAX_SCRIPT_CHARS);
    }

    #[test]
    fn test_clean_never_exceeds_budget() {
        let samples = [
            "",
            "   ",
            "[only direction]",
            "(aside) text [x]",
            &"a".repeat(1000),
            &"[a] (b) ".repeat(100),
        ];
        for sample in samples {
            let cleaned = clean_script(sample);
            assert!(cleaned.chars().count() <= MAX_SCRIPT_CHARS);
            assert!(!cleaned.contains("[a]"));
            assert!(!cleaned.contains("(b)"));
        }
    }

    #[test]
    fn test_script_prompt_embeds_fields() {
        let request = GenerationRequest::new("Influenza", "fever, cough", "viral infection");
        assert_eq!(
            script_prompt(&request),
            "Explain \"Influenza\" (symptoms: fever, cough) in 300 CHARACTERS MAX: viral infection"
        );
    }

    #[tokio::test]
    async fn test_generate_sends_budget_and_cleans() {
        let provider = Arc::new(
            MockAIProvider::new("mock")
                .then_text("[narrator tone] Flu causes fever. (pause) Stay hydrated."),
        );
        let generator = ScriptGenerator::new(provider.clone()).with_model("test-model");
        let request = GenerationRequest::new("Influenza", "fever, cough", "viral infection");

        let script = generator.generate(&request).await.unwrap();

        assert_eq!(script.cleaned, "Flu causes fever. Stay hydrated.");
        assert!(script.raw.starts_with("[narrator tone]"));

        let sent = provider.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].system.as_deref(), Some(SYSTEM_PROMPT));
        assert_eq!(sent[0].max_tokens, Some(DEFAULT_SCRIPT_MAX_TOKENS));
        assert_eq!(sent[0].model.as_deref(), Some("test-model"));
    }

    #[tokio::test]
    async fn test_generate_keeps_token_limited_script() {
        let provider = Arc::new(MockAIProvider::new("mock").then(MockReply::Truncated(
            "(calm) Asthma narrows the airways and".to_string(),
        )));
        let generator = ScriptGenerator::new(provider).with_max_tokens(8);
        let request = GenerationRequest::new("Asthma", "wheezing", "chronic");

        let script = generator.generate(&request).await.unwrap();

        assert_eq!(script.cleaned, "Asthma narrows the airways and");
    }

    #[tokio::test]
    async fn test_generate_propagates_auth_error() {
        let provider = Arc::new(MockAIProvider::new("mock").then(MockReply::Unauthorized));
        let generator = ScriptGenerator::new(provider.clone());
        let request = GenerationRequest::new("Influenza", "fever", "viral");

        let result = generator.generate(&request).await;

        assert!(matches!(result, Err(CoreError::AuthenticationFailed(_))));
        assert_eq!(provider.requests().len(), 1);
    }
}
