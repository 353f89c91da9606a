//! Property investment analysis pipeline
//!
//! The [`Orchestrator`] drives one fixed workflow over four workers:
//!
//! ```text
//! Valuation ─┬─> MarketIntelligence ─┬─> merge ─> Narrative ─> validate ─> InvestmentAnalysis
//!            └─> RiskCompliance ─────┘
//! ```
//!
//! Workers talk to their external capability through the collaborator
//! traits in [`collaborators`]; deterministic in-process implementations
//! are provided for prediction and retrieval, and an LLM-backed one for
//! synthesis.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod merge;
pub mod orchestrator;
pub mod prompts;
pub mod report;
pub mod response;
pub mod validator;
pub mod workers;

pub use collaborators::{
    BaselinePredictor, DocumentRetriever, KeywordIndex, LlmSynthesizer, OfflineSynthesizer,
    PricePredictor, SearchFilter, Synthesizer,
};
pub use config::{AdvisorConfig, AdvisorConfigBuilder};
pub use error::{AdvisorError, Result};
pub use merge::merge_documents;
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use report::{MarkdownReportRenderer, ReportQueue, ReportRenderer, ReportStats};
pub use response::InvestmentResponse;
pub use validator::validate;
pub use workers::Worker;
