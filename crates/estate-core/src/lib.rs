//! Core types for estate-rs
//!
//! This crate defines the message envelope exchanged between the orchestrator
//! and its workers, the closed set of worker roles, the typed payloads carried
//! by each message kind, and the property-investment data model every stage
//! reads from.

pub mod analysis;
pub mod document;
pub mod envelope;
pub mod error;
pub mod history;
pub mod prediction;
pub mod property;
pub mod protocol;
pub mod role;

pub use analysis::{AnalysisResult, MarketSentiment, Recommendation, RiskLevel};
pub use document::RetrievedDocument;
pub use envelope::{Envelope, Payload};
pub use error::{Error, Result};
pub use history::MessageLog;
pub use prediction::PredictionResult;
pub use property::{InvestmentContext, InvestmentGoal, PropertyFacts, PropertyType};
pub use role::Role;
