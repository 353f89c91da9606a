//! Error types for estate-core

use thiserror::Error;

/// Result type alias for estate-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for envelope and data-model operations
#[derive(Error, Debug)]
pub enum Error {
    /// Generic error message
    #[error("{0}")]
    Generic(String),

    /// Envelope payload did not match the shape its kind requires
    #[error("Malformed '{kind}' payload: {detail}")]
    MalformedPayload { kind: String, detail: String },

    /// A typed payload serialized to something other than a JSON object
    #[error("Payload must serialize to a JSON object, got {0}")]
    PayloadNotObject(String),

    /// Request data failed validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
