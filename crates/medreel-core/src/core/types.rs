//! MedReel Core Type Definitions
//!
//! Defines fundamental types shared by every pipeline stage.

use serde::{Deserialize, Serialize};

use super::{CoreError, CoreResult};

// =============================================================================
// ID Types
// =============================================================================

/// Pipeline run unique identifier (ULID)
pub type RunId = String;

/// Render-service-assigned video job identifier
pub type VideoJobId = String;

// =============================================================================
// Generation Request
// =============================================================================

/// Structured description of a condition to explain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Condition name (e.g. "Influenza")
    pub disease: String,
    /// Comma-separated symptom list
    pub symptoms: String,
    /// Free-text description
    pub description: String,
}

impl GenerationRequest {
    pub fn new(
        disease: impl Into<String>,
        symptoms: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            disease: disease.into(),
            symptoms: symptoms.into(),
            description: description.into(),
        }
    }

    /// Rejects requests with any blank field
    pub fn validate(&self) -> CoreResult<()> {
        for (field, value) in [
            ("disease", &self.disease),
            ("symptoms", &self.symptoms),
            ("description", &self.description),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::ValidationError(format!(
                    "Field '{}' cannot be empty",
                    field
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Text helpers
// =============================================================================

/// Truncates to at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_validate_success() {
        let req = GenerationRequest::new("Influenza", "fever, cough", "viral infection");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_request_validate_blank_field() {
        let req = GenerationRequest::new("Influenza", "   ", "viral infection");
        match req.validate() {
            Err(CoreError::ValidationError(msg)) => assert!(msg.contains("symptoms")),
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_request_serialization_is_camel_case() {
        let req = GenerationRequest::new("Migraine", "headache", "neurological");
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"disease\":\"Migraine\""));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hi", 10), "hi");
        // Multi-byte characters count as one
        assert_eq!(truncate_chars("ééé", 2), "éé");
    }
}
