//! External capabilities the workers delegate to
//!
//! Each worker owns exactly one collaborator behind an `Arc<dyn _>`. The
//! in-process defaults here are deterministic so the whole pipeline can run
//! (and be tested) without a model server or vector database.

use async_trait::async_trait;
use estate_core::protocol::NarrativeRequest;
use estate_core::{Payload, PredictionResult, PropertyFacts, RetrievedDocument};

use crate::Result;

pub mod prediction;
pub mod retrieval;
pub mod synthesis;

pub use prediction::BaselinePredictor;
pub use retrieval::{CorpusDocument, IndexStats, KeywordIndex, SearchFilter};
pub use synthesis::{LlmSynthesizer, OfflineSynthesizer};

/// Price and rent estimation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PricePredictor: Send + Sync {
    /// Estimate price, rent and yield for a property
    async fn predict(&self, property: &PropertyFacts) -> Result<PredictionResult>;
}

/// Ranked document search
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    /// Return at most `top_k` documents, best first
    ///
    /// No matches is an empty list, never an error.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<RetrievedDocument>>;
}

/// Draft analysis generation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Produce an unvalidated analysis draft as a JSON object
    async fn synthesize(&self, request: &NarrativeRequest) -> Result<Payload>;
}
