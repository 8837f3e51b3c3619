//! MedReel Error Definitions
//!
//! Defines error types used throughout the pipeline and their mapping onto
//! the caller-facing error kinds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Credential / Auth Errors
    // =========================================================================
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    // =========================================================================
    // Remote Service Errors
    // =========================================================================
    #[error("AI request failed: {0}")]
    AIRequestFailed(String),

    #[error("Render request failed: {0}")]
    RenderRequestFailed(String),

    /// The render service does not know the job yet. Recovered by polling.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Video generation failed: {0}")]
    VideoGenerationFailed(String),

    #[error("{0}")]
    Timeout(String),

    // =========================================================================
    // Pipeline Errors
    // =========================================================================
    #[error("A pipeline run is already in progress")]
    RunInProgress,

    #[error("Cancelled: {0}")]
    Cancelled(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Caller-facing classification of a pipeline failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingCredential,
    AuthenticationFailure,
    /// The render service reported the job as failed
    BusinessFailure,
    /// The polling budget ran out before a terminal status
    BudgetExhausted,
    TransportError,
    Validation,
    Cancelled,
    /// Another run is already active
    Busy,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::MissingCredential => write!(f, "missing credential"),
            ErrorKind::AuthenticationFailure => write!(f, "authentication failure"),
            ErrorKind::BusinessFailure => write!(f, "generation failed"),
            ErrorKind::BudgetExhausted => write!(f, "timed out"),
            ErrorKind::TransportError => write!(f, "transport error"),
            ErrorKind::Validation => write!(f, "invalid input"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::Busy => write!(f, "busy"),
        }
    }
}

impl CoreError {
    /// Maps this error onto the caller-facing taxonomy.
    ///
    /// `NotFound` only escapes the polling loop when it was raised outside of
    /// it (e.g. on submission), so it is reported as a transport error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::MissingCredential(_) => ErrorKind::MissingCredential,
            CoreError::AuthenticationFailed(_) => ErrorKind::AuthenticationFailure,
            CoreError::VideoGenerationFailed(_) => ErrorKind::BusinessFailure,
            CoreError::Timeout(_) => ErrorKind::BudgetExhausted,
            CoreError::ValidationError(_) => ErrorKind::Validation,
            CoreError::Cancelled(_) => ErrorKind::Cancelled,
            CoreError::RunInProgress => ErrorKind::Busy,
            CoreError::AIRequestFailed(_)
            | CoreError::RenderRequestFailed(_)
            | CoreError::NotFound(_)
            | CoreError::IoError(_)
            | CoreError::JsonError(_)
            | CoreError::Internal(_) => ErrorKind::TransportError,
        }
    }

    /// Whether the polling loop should treat this error as "still pending".
    pub fn is_transient_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound(_))
    }
}
