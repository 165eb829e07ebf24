//! Error types for markguard-llm

use thiserror::Error;

/// Errors raised by external capability clients
#[derive(Error, Debug)]
pub enum LlmError {
    /// Required configuration is missing
    #[error("Capability not configured: {0}")]
    NotConfigured(String),

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// The service answered with a non-success status
    #[error("Service returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered but the payload has an unexpected shape
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image payload could not be decoded
    #[error("Invalid image payload: {0}")]
    InvalidImage(String),

    /// A scripted fake ran out of responses
    #[error("No scripted response left for {0}")]
    Exhausted(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Http(err.to_string())
    }
}
