//! Error types for the analysis pipeline

use estate_core::Role;
use thiserror::Error;

/// Errors raised by collaborators, configuration and orchestration
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The prediction collaborator failed
    #[error("Prediction failed: {0}")]
    Prediction(String),

    /// The retrieval collaborator failed
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// The synthesis collaborator failed or returned unusable output
    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    /// No synthesis backend is configured
    #[error("Synthesis unavailable: no LLM credentials configured")]
    SynthesisUnavailable,

    /// The valuation stage reported a fault; the workflow is aborted
    #[error("Valuation stage failed: {0}")]
    ValuationFailed(String),

    /// A worker replied with something the orchestrator cannot use
    #[error("Unexpected reply from {role}: {detail}")]
    UnexpectedReply { role: Role, detail: String },

    /// Report rendering or queueing failed
    #[error("Report error: {0}")]
    Report(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(#[from] estate_llm::LLMError),

    /// Prompt template error
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// Envelope or data-model error
    #[error(transparent)]
    Core(#[from] estate_core::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

/// Convert AdvisorError to estate_core::Error
impl From<AdvisorError> for estate_core::Error {
    fn from(err: AdvisorError) -> Self {
        match err {
            AdvisorError::Core(inner) => inner,
            other => estate_core::Error::Generic(other.to_string()),
        }
    }
}
