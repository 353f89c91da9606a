//! LLM completion abstraction for estate-rs
//!
//! Provider-agnostic request/response types and the [`LLMProvider`] trait
//! the narrative synthesizer talks to. Concrete HTTP providers live behind
//! feature flags so the rest of the workspace can be built and tested
//! without a network stack.

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, ResponseFormat, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;

// Provider implementations (feature-gated)
#[cfg(feature = "openai")]
pub mod providers;
