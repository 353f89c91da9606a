//! Error types for LLM operations

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LLMError {
    /// API request failed
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Invalid API key or authentication failed
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model or deployment not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP error
    #[cfg(feature = "openai")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl LLMError {
    /// Whether repeating the same request may succeed
    ///
    /// Transport failures and throttling are retryable; authentication,
    /// configuration and malformed requests are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            LLMError::RequestFailed(_)
            | LLMError::RateLimitExceeded(_)
            | LLMError::UnexpectedResponse(_) => true,
            #[cfg(feature = "openai")]
            LLMError::HttpError(_) => true,
            LLMError::AuthenticationFailed
            | LLMError::InvalidRequest(_)
            | LLMError::ModelNotFound(_)
            | LLMError::SerializationError(_)
            | LLMError::ConfigurationError(_) => false,
        }
    }
}
