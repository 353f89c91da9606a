//! Market intelligence worker

use estate_core::protocol::{MarketIntelligenceRequest, MarketIntelligenceResponse, kinds};
use estate_core::{Envelope, MessageLog, PropertyFacts, RetrievedDocument};
use std::sync::Arc;
use tracing::{debug, info};

use crate::collaborators::{DocumentRetriever, SearchFilter};
use crate::config::AdvisorConfig;
use crate::error::Result;
use crate::merge::merge_documents;

/// Gathers market documents for the property's city and locality
pub struct MarketIntelligenceWorker {
    retriever: Arc<dyn DocumentRetriever>,
    config: Arc<AdvisorConfig>,
    pub(crate) history: MessageLog,
}

impl MarketIntelligenceWorker {
    pub fn new(retriever: Arc<dyn DocumentRetriever>, config: Arc<AdvisorConfig>) -> Self {
        Self {
            retriever,
            config,
            history: MessageLog::new(),
        }
    }

    pub(crate) async fn respond(&self, envelope: &Envelope) -> Result<Envelope> {
        let request: MarketIntelligenceRequest = envelope.parse_payload()?;
        let property = &request.property_data;
        info!("Gathering market intelligence for {}, {}", property.locality, property.city);

        let (city_scoped, query_scoped) = tokio::join!(
            self.city_documents(property),
            self.context_documents(property, &request.query),
        );

        // City-scoped hits come first so they win on duplicate ids
        let documents = merge_documents(
            [city_scoped?, query_scoped?],
            Some(self.config.market_document_cap),
        );
        debug!("Market intelligence returned {} documents", documents.len());

        Ok(envelope.typed_reply(
            kinds::MARKET_INTELLIGENCE_RESPONSE,
            &MarketIntelligenceResponse { documents },
        )?)
    }

    async fn city_documents(&self, property: &PropertyFacts) -> Result<Vec<RetrievedDocument>> {
        let query = format!(
            "Market analysis, price trends, investment outlook for {}, {}",
            property.locality, property.city
        );
        self.retriever
            .search(&query, self.config.market_top_k, &SearchFilter::none())
            .await
    }

    /// Query-scoped search, preferring hits tagged for the property's city
    ///
    /// Over-fetches and keeps the city-relevant hits when there are enough of
    /// them; otherwise the unfiltered ranking is used as is.
    async fn context_documents(
        &self,
        property: &PropertyFacts,
        query: &str,
    ) -> Result<Vec<RetrievedDocument>> {
        let top_k = self.config.context_top_k;
        let enhanced = format!(
            "Real estate investment analysis for {} in {}. Query: {}. Looking for: market trends, \
             regulatory compliance, risk factors, infrastructure developments.",
            property.property_type, property.city, query
        );

        let hits = self
            .retriever
            .search(&enhanced, top_k.saturating_mul(2), &SearchFilter::none())
            .await?;

        let scope = SearchFilter::none().with_locations(SearchFilter::city_scope(&property.city));
        let relevant: Vec<RetrievedDocument> = hits
            .iter()
            .filter(|d| scope.matches(&d.category, &d.location_tag))
            .cloned()
            .collect();

        let mut selected = if relevant.len() >= top_k { relevant } else { hits };
        selected.truncate(top_k);
        Ok(selected)
    }
}
