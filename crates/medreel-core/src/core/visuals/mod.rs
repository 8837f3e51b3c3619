//! Visual Element Generation
//!
//! Asks the text-generation service for three short on-screen labels and
//! turns them into timed overlay elements. Label generation is best-effort:
//! anything unusable in the model output (or a failed call) falls back to a
//! fixed set derived from the request.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use crate::core::ai::{AIProvider, CompletionRequest};

/// Number of overlay labels per video
pub const VISUAL_ELEMENT_COUNT: usize = 3;

/// Seconds each overlay stays on screen
pub const SCENE_DURATION_SECS: u32 = 3;

/// Token cap sent with the label request
pub const DEFAULT_VISUALS_MAX_TOKENS: u32 = 100;

const SYSTEM_PROMPT: &str =
    "You suggest on-screen labels for medical explainer videos. Reply with a JSON array of strings only.";

// =============================================================================
// Visual Element
// =============================================================================

/// A label with its overlay placement in the rendered video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualElement {
    pub text: String,
    /// Position in the sequence, `0..3`
    pub order: u32,
    /// Seconds from video start
    pub start_time: u32,
    pub duration: u32,
}

impl VisualElement {
    pub fn new(text: impl Into<String>, order: u32) -> Self {
        Self {
            text: text.into(),
            order,
            start_time: order * SCENE_DURATION_SECS,
            duration: SCENE_DURATION_SECS,
        }
    }

    /// Lays out labels sequentially in the order given
    pub fn sequence(labels: Vec<String>) -> Vec<Self> {
        labels
            .into_iter()
            .enumerate()
            .map(|(i, text)| Self::new(text, i as u32))
            .collect()
    }
}

// =============================================================================
// Label Extraction
// =============================================================================

/// Labels used whenever the model output cannot be used
pub fn fallback_labels(disease: &str, symptoms: &str) -> Vec<String> {
    let first_symptom = symptoms
        .split(',')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("symptom");

    vec![
        format!("{} diagram", disease),
        format!("Symptom: {}", first_symptom),
        "Treatment options".to_string(),
    ]
}

/// Pulls the first bracketed JSON array out of free-form model output.
///
/// The match is greedy, spanning from the first `[` to the last `]`. The
/// first three elements are kept; strings are taken verbatim and any other
/// JSON value by its serialized text. Returns the fallback labels unless
/// three non-empty labels come out.
pub fn extract_visual_labels(raw: &str, disease: &str, symptoms: &str) -> Vec<String> {
    match parse_label_array(raw) {
        Some(labels) => labels,
        None => {
            debug!("No usable label array in model output, using fallback labels");
            fallback_labels(disease, symptoms)
        }
    }
}

fn parse_label_array(raw: &str) -> Option<Vec<String>> {
    static ARRAY_RE: OnceLock<Regex> = OnceLock::new();
    let re = ARRAY_RE
        .get_or_init(|| Regex::new(r"\[[\s\S]*\]").expect("array regex should compile"));

    let candidate = re.find(raw)?.as_str();
    let items = match serde_json::from_str::<Value>(candidate).ok()? {
        Value::Array(items) => items,
        _ => return None,
    };

    let labels: Vec<String> = items
        .into_iter()
        .take(VISUAL_ELEMENT_COUNT)
        .map(|item| match item {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect();

    let usable = labels.len() == VISUAL_ELEMENT_COUNT
        && labels.iter().all(|label| !label.trim().is_empty());
    usable.then_some(labels)
}

/// Builds the user prompt for label suggestions
pub fn visuals_prompt(disease: &str, symptoms: &str) -> String {
    format!(
        "Suggest exactly 3 short visual labels (2-4 words each) for a video explaining \"{}\" (symptoms: {}). Return only a JSON array of 3 strings.",
        disease, symptoms
    )
}

// =============================================================================
// Generator
// =============================================================================

/// Generates overlay elements through an [`AIProvider`]
pub struct VisualElementGenerator {
    provider: Arc<dyn AIProvider>,
    model: Option<String>,
    max_tokens: u32,
}

impl VisualElementGenerator {
    pub fn new(provider: Arc<dyn AIProvider>) -> Self {
        Self {
            provider,
            model: None,
            max_tokens: DEFAULT_VISUALS_MAX_TOKENS,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Always yields exactly three non-empty elements. Failures of the
    /// remote call are logged and replaced by the fallback labels.
    pub async fn generate(&self, disease: &str, symptoms: &str) -> Vec<VisualElement> {
        let mut request = CompletionRequest::new(&visuals_prompt(disease, symptoms))
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(self.max_tokens);
        if let Some(model) = &self.model {
            request = request.with_model(model);
        }

        let labels = match self.provider.complete(request).await {
            Ok(response) => extract_visual_labels(&response.text, disease, symptoms),
            Err(e) => {
                warn!("Visual label generation failed, using fallback labels: {}", e);
                fallback_labels(disease, symptoms)
            }
        };

        VisualElement::sequence(labels)
    }
}
