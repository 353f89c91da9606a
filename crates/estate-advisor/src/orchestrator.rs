//! Orchestrator for the investment analysis workflow
//!
//! Stages run in a fixed order:
//!
//! 1. Valuation (fatal on failure)
//! 2. Market intelligence and 3. risk compliance, concurrently when
//!    `parallel_stages` is set
//! 4. Merge market documents ahead of regulatory documents
//! 5. Narrative
//! 6. Validation, applied exactly once
//! 7. Union of rule-derived risks into the validated risk factors
//! 8. Aggregation with a per-stage completion summary
//!
//! Only stage 1 can abort the workflow. Later faults degrade the content
//! and are reported in the [`ExecutionSummary`].

use chrono::Utc;
use estate_core::envelope::{keys, to_payload};
use estate_core::protocol::{
    ErrorPayload, ExecutionSummary, InvestmentAnalysis, InvestmentAnalysisRequest,
    MarketIntelligenceRequest, MarketIntelligenceResponse, NarrativeRequest, NarrativeResponse,
    RiskAssessmentRequest, RiskAssessmentResponse, ValuationRequest, ValuationResponse,
    DEFAULT_MARKET_QUERY, kinds,
};
use estate_core::{Envelope, InvestmentContext, MessageLog, Payload, PropertyFacts, Role};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::collaborators::{
    BaselinePredictor, DocumentRetriever, OfflineSynthesizer, PricePredictor, Synthesizer,
};
use crate::config::AdvisorConfig;
use crate::error::{AdvisorError, Result};
use crate::merge::merge_documents;
use crate::validator::validate;
use crate::workers::{
    MarketIntelligenceWorker, NarrativeWorker, RiskComplianceWorker, ValuationWorker, Worker,
    error_reply, fallback_analysis, fault_report,
};

/// Sequences the four workers for one investment analysis request
pub struct Orchestrator {
    config: Arc<AdvisorConfig>,
    valuation: Worker,
    market: Worker,
    risk: Worker,
    narrative: Worker,
    history: MessageLog,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Worker serving `role`, if any
    pub fn worker(&self, role: Role) -> Option<&Worker> {
        match role {
            Role::Valuation => Some(&self.valuation),
            Role::MarketIntelligence => Some(&self.market),
            Role::RiskCompliance => Some(&self.risk),
            Role::Narrative => Some(&self.narrative),
            Role::Orchestrator => None,
        }
    }

    /// Envelopes the orchestrator itself has received, oldest first
    pub fn history(&self) -> &MessageLog {
        &self.history
    }

    /// Route an envelope to whichever participant it is addressed to
    pub async fn dispatch(&self, envelope: Envelope) -> Envelope {
        match self.worker(envelope.receiver()) {
            Some(worker) => worker.process(envelope).await,
            None => self.process(envelope).await,
        }
    }

    /// Handle an `investment_analysis_request` envelope
    ///
    /// Like the workers, never fails: faults come back as an `error` reply.
    pub async fn process(&self, envelope: Envelope) -> Envelope {
        self.history.record(&envelope).await;

        if envelope.kind() != kinds::INVESTMENT_ANALYSIS_REQUEST {
            warn!("Orchestrator does not handle message kind '{}'", envelope.kind());
            return error_reply(&envelope, &ErrorPayload::unknown_kind(envelope.kind()));
        }

        let outcome = match envelope.parse_payload::<InvestmentAnalysisRequest>() {
            Ok(request) => self
                .analyze(&request.property_data, &request.investment_context)
                .await
                .and_then(|analysis| {
                    Ok(envelope.typed_reply(kinds::INVESTMENT_ANALYSIS_RESPONSE, &analysis)?)
                }),
            Err(e) => Err(e.into()),
        };

        outcome.unwrap_or_else(|e| error_reply(&envelope, &fault_report(&e)))
    }

    /// Run the full workflow for one property
    pub async fn analyze(
        &self,
        property: &PropertyFacts,
        context: &InvestmentContext,
    ) -> Result<InvestmentAnalysis> {
        property.validate()?;
        context.validate()?;
        info!(
            "Starting investment analysis for {} in {}, {}",
            property.property_type, property.locality, property.city
        );

        // Stage 1
        let valuation_reply = self
            .valuation
            .process(self.request(
                Role::Valuation,
                kinds::VALUATION_REQUEST,
                &ValuationRequest {
                    property_data: property.clone(),
                },
            )?)
            .await;
        self.history.record(&valuation_reply).await;
        if let Some(report) = ErrorPayload::from_envelope(&valuation_reply) {
            error!("Valuation failed, aborting analysis: {}", report);
            return Err(AdvisorError::ValuationFailed(report.error));
        }
        let predictions = valuation_reply
            .parse_payload::<ValuationResponse>()
            .map_err(|e| AdvisorError::UnexpectedReply {
                role: Role::Valuation,
                detail: e.to_string(),
            })?
            .predictions;
        info!("Valuation complete: predicted price {:.0}", predictions.predicted_price);

        // Stages 2 and 3
        let market_request = self.request(
            Role::MarketIntelligence,
            kinds::MARKET_INTELLIGENCE_REQUEST,
            &MarketIntelligenceRequest {
                property_data: property.clone(),
                query: DEFAULT_MARKET_QUERY.to_string(),
            },
        )?;
        let risk_request = self.request(
            Role::RiskCompliance,
            kinds::RISK_ASSESSMENT_REQUEST,
            &RiskAssessmentRequest {
                property_data: property.clone(),
            },
        )?;
        let (market_reply, risk_reply) = if self.config.parallel_stages {
            tokio::join!(
                self.market.process(market_request),
                self.risk.process(risk_request)
            )
        } else {
            (
                self.market.process(market_request).await,
                self.risk.process(risk_request).await,
            )
        };
        self.history.record(&market_reply).await;
        self.history.record(&risk_reply).await;

        let market = self.stage_payload::<MarketIntelligenceResponse>(&market_reply);
        let risk = self.stage_payload::<RiskAssessmentResponse>(&risk_reply);
        let market_completed = market.is_some();
        let risk_completed = risk.is_some();

        let market_documents = market.map(|m| m.documents).unwrap_or_default();
        let (regulatory_documents, identified_risks) = risk
            .map(|r| (r.regulatory_documents, r.identified_risks))
            .unwrap_or_default();

        // Stage 4, uncapped: the market worker already capped its own set
        let retrieved_documents = merge_documents([market_documents, regulatory_documents], None);
        info!("Merged {} context documents", retrieved_documents.len());

        // Stage 5
        let narrative_reply = self
            .narrative
            .process(self.request(
                Role::Narrative,
                kinds::NARRATIVE_GENERATION_REQUEST,
                &NarrativeRequest {
                    property_data: property.clone(),
                    predictions: predictions.clone(),
                    investment_context: context.clone(),
                    retrieved_documents: retrieved_documents.clone(),
                },
            )?)
            .await;
        self.history.record(&narrative_reply).await;

        let (draft, fallback_used) =
            match self.stage_payload::<NarrativeResponse>(&narrative_reply) {
                Some(response) => (response.analysis, response.fallback_used),
                None => {
                    let fallback = fallback_analysis(&predictions, context);
                    (to_payload(&fallback).unwrap_or_default(), true)
                }
            };

        // Stages 6 and 7
        let mut analysis = validate(&draft, &predictions, context);
        analysis.merge_risk_factors(identified_risks);

        let agent_execution_summary = ExecutionSummary {
            valuation_completed: true,
            market_intelligence_completed: market_completed,
            risk_assessment_completed: risk_completed,
            narrative_completed: !fallback_used,
            fallback_used,
        };
        if agent_execution_summary.all_completed() {
            info!("Investment analysis complete: {}", analysis.recommendation);
        } else {
            warn!(
                "Investment analysis complete with degraded stages: {:?}",
                agent_execution_summary
            );
        }

        Ok(InvestmentAnalysis {
            predictions,
            analysis,
            retrieved_documents,
            agent_execution_summary,
        })
    }

    fn request<T: Serialize>(&self, receiver: Role, kind: &str, payload: &T) -> Result<Envelope> {
        let metadata = Payload::from_iter([
            (keys::TIMESTAMP.to_string(), json!(Utc::now().to_rfc3339())),
            (keys::MODEL_VERSION.to_string(), json!(self.config.model_version)),
        ]);
        Ok(Envelope::typed(Role::Orchestrator, receiver, kind, payload)?.with_metadata(metadata))
    }

    /// Typed payload of a non-fatal stage reply, or `None` when the stage faulted
    fn stage_payload<T: DeserializeOwned>(&self, reply: &Envelope) -> Option<T> {
        if let Some(report) = ErrorPayload::from_envelope(reply) {
            warn!("{} stage failed: {}", reply.sender(), report);
            return None;
        }
        reply
            .parse_payload()
            .inspect_err(|e| warn!("{} stage returned an unusable reply: {}", reply.sender(), e))
            .ok()
    }
}

/// Builder for [`Orchestrator`]
///
/// A retriever is required. Configuration defaults to
/// [`AdvisorConfig::default`], prediction to [`BaselinePredictor`] and
/// synthesis to [`OfflineSynthesizer`].
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: Option<Arc<AdvisorConfig>>,
    predictor: Option<Arc<dyn PricePredictor>>,
    retriever: Option<Arc<dyn DocumentRetriever>>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
}

impl OrchestratorBuilder {
    pub fn config(mut self, config: Arc<AdvisorConfig>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn predictor(mut self, predictor: Arc<dyn PricePredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn retriever(mut self, retriever: Arc<dyn DocumentRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let retriever = self
            .retriever
            .ok_or_else(|| AdvisorError::Config("a document retriever is required".to_string()))?;
        let predictor = self
            .predictor
            .unwrap_or_else(|| Arc::new(BaselinePredictor::new()));
        let synthesizer = self
            .synthesizer
            .unwrap_or_else(|| Arc::new(OfflineSynthesizer));

        Ok(Orchestrator {
            valuation: Worker::Valuation(ValuationWorker::new(predictor, Arc::clone(&config))),
            market: Worker::MarketIntelligence(MarketIntelligenceWorker::new(
                Arc::clone(&retriever),
                Arc::clone(&config),
            )),
            risk: Worker::RiskCompliance(RiskComplianceWorker::new(retriever, Arc::clone(&config))),
            narrative: Worker::Narrative(NarrativeWorker::new(synthesizer)),
            history: MessageLog::new(),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::retrieval::CorpusDocument;
    use crate::collaborators::{
        KeywordIndex, MockDocumentRetriever, MockPricePredictor, MockSynthesizer,
    };
    use crate::response::InvestmentResponse;
    use crate::workers::fixtures::{andheri, context, doc, prediction};
    use crate::workers::risk::AGE_RISK;
    use estate_core::protocol::Fault;
    use estate_core::{RetrievedDocument, RiskLevel};
    use std::collections::HashSet;

    fn corpus() -> KeywordIndex {
        let documents: Vec<CorpusDocument> =
            serde_json::from_str(include_str!("../../../data/documents.json")).unwrap();
        KeywordIndex::from_documents(documents)
    }

    fn draft(value: serde_json::Value) -> Payload {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("Expected object, got {other}"),
        }
    }

    fn stub_retriever() -> MockDocumentRetriever {
        let mut retriever = MockDocumentRetriever::new();
        retriever.expect_search().returning(|_, _, filter| {
            if filter.category.is_some() {
                Ok(vec![doc("REG_001_chunk_0", "rera_compliance"), doc("MKT_001_chunk_0", "rera_compliance")])
            } else {
                Ok(vec![doc("MKT_001_chunk_0", "market_analysis"), doc("NEWS_001_chunk_0", "news")])
            }
        });
        retriever
    }

    fn stub_predictor() -> MockPricePredictor {
        let mut predictor = MockPricePredictor::new();
        predictor.expect_predict().returning(|_| Ok(prediction()));
        predictor
    }

    #[tokio::test]
    async fn test_end_to_end_with_default_collaborators() {
        let config = Arc::new(AdvisorConfig::default());
        let orchestrator = Orchestrator::builder()
            .config(Arc::clone(&config))
            .retriever(Arc::new(corpus()))
            .build()
            .unwrap();

        let analysis = orchestrator.analyze(&andheri(), &context()).await.unwrap();

        let risk_levels = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];
        assert!(risk_levels.contains(&analysis.analysis.risk_level));
        assert!((0.0..=1.0).contains(&analysis.analysis.confidence_score));
        assert!(!analysis.analysis.limitations.is_empty());
        assert_eq!(analysis.predictions.model_used, "baseline-heuristic");
        assert_eq!(analysis.predictions.model_version.as_deref(), Some("1.0.0"));

        let ids: HashSet<&str> = analysis.retrieved_documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids.len(), analysis.retrieved_documents.len());

        // No LLM is configured, so the narrative stage falls back
        let summary = analysis.agent_execution_summary;
        assert!(summary.valuation_completed);
        assert!(summary.market_intelligence_completed);
        assert!(summary.risk_assessment_completed);
        assert!(!summary.narrative_completed);
        assert!(summary.fallback_used);

        let response = InvestmentResponse::from_analysis(
            uuid::Uuid::new_v4(),
            &andheri(),
            analysis,
            config.response_document_limit,
        );
        assert!(response.retrieved_documents.len() <= 5);
        let ids: HashSet<&str> = response.retrieved_documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids.len(), response.retrieved_documents.len());
    }

    #[tokio::test]
    async fn test_valuation_failure_is_fatal() {
        let mut predictor = MockPricePredictor::new();
        predictor
            .expect_predict()
            .returning(|_| Err(AdvisorError::Prediction("model offline".to_string())));
        let mut retriever = MockDocumentRetriever::new();
        retriever.expect_search().times(0);
        let mut synthesizer = MockSynthesizer::new();
        synthesizer.expect_synthesize().times(0);

        let orchestrator = Orchestrator::builder()
            .predictor(Arc::new(predictor))
            .retriever(Arc::new(retriever))
            .synthesizer(Arc::new(synthesizer))
            .build()
            .unwrap();

        let result = orchestrator.analyze(&andheri(), &context()).await;

        match result {
            Err(AdvisorError::ValuationFailed(detail)) => assert!(detail.contains("model offline")),
            other => panic!("Expected ValuationFailed, got {other:?}"),
        }
        assert!(orchestrator.worker(Role::Narrative).unwrap().history().is_empty().await);
    }

    #[tokio::test]
    async fn test_synthesis_failure_still_yields_valid_result() {
        let mut synthesizer = MockSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .returning(|_| Err(AdvisorError::Synthesis("timeout".to_string())));
        let orchestrator = Orchestrator::builder()
            .predictor(Arc::new(stub_predictor()))
            .retriever(Arc::new(stub_retriever()))
            .synthesizer(Arc::new(synthesizer))
            .build()
            .unwrap();

        let analysis = orchestrator.analyze(&andheri(), &context()).await.unwrap();

        assert_eq!(analysis.analysis.confidence_score, 0.5);
        assert!(!analysis.analysis.limitations.is_empty());
        assert!(analysis.agent_execution_summary.fallback_used);
        assert!(!analysis.agent_execution_summary.all_completed());
    }

    #[tokio::test]
    async fn test_validation_applied_exactly_once() {
        let mut synthesizer = MockSynthesizer::new();
        synthesizer.expect_synthesize().times(1).returning(|_| {
            Ok(draft(serde_json::json!({
                "recommendation": "Buy",
                "confidence_score": 0.8,
                "risk_factors": [AGE_RISK, "Builder delays"],
                "limitations": ["Sparse comparables"],
            })))
        });
        let orchestrator = Orchestrator::builder()
            .predictor(Arc::new(stub_predictor()))
            .retriever(Arc::new(stub_retriever()))
            .synthesizer(Arc::new(synthesizer))
            .build()
            .unwrap();
        let old = PropertyFacts {
            property_age: 25,
            ..andheri()
        };

        let analysis = orchestrator.analyze(&old, &context()).await.unwrap();

        assert_eq!(
            analysis.analysis.limitations,
            vec!["Sparse comparables", "Model confidence: 85.0%"]
        );
        // Rule-derived risk already present in the draft is not repeated
        assert_eq!(analysis.analysis.risk_factors, vec![AGE_RISK, "Builder delays"]);
        assert!(analysis.agent_execution_summary.all_completed());
        assert!(!analysis.agent_execution_summary.fallback_used);
    }

    #[tokio::test]
    async fn test_merge_keeps_market_documents_first() {
        for parallel in [true, false] {
            let config = AdvisorConfig::builder().parallel_stages(parallel).build().unwrap();
            let mut synthesizer = MockSynthesizer::new();
            synthesizer.expect_synthesize().returning(|_| Ok(Payload::new()));
            let orchestrator = Orchestrator::builder()
                .config(Arc::new(config))
                .predictor(Arc::new(stub_predictor()))
                .retriever(Arc::new(stub_retriever()))
                .synthesizer(Arc::new(synthesizer))
                .build()
                .unwrap();

            let analysis = orchestrator.analyze(&andheri(), &context()).await.unwrap();

            let ids: Vec<&str> = analysis.retrieved_documents.iter().map(|d| d.id.as_str()).collect();
            assert_eq!(ids, vec!["MKT_001_chunk_0", "NEWS_001_chunk_0", "REG_001_chunk_0"]);
            assert_eq!(analysis.retrieved_documents[0].category, "market_analysis");
        }
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_not_fatal() {
        let mut retriever = MockDocumentRetriever::new();
        retriever
            .expect_search()
            .returning(|_, _, _| Err(AdvisorError::Retrieval("index offline".to_string())));
        let mut synthesizer = MockSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .withf(|r| r.retrieved_documents.is_empty())
            .returning(|_| Ok(Payload::new()));
        let orchestrator = Orchestrator::builder()
            .predictor(Arc::new(stub_predictor()))
            .retriever(Arc::new(retriever))
            .synthesizer(Arc::new(synthesizer))
            .build()
            .unwrap();
        let far = PropertyFacts {
            distance_to_transit_km: Some(8.0),
            ..andheri()
        };

        let analysis = orchestrator.analyze(&far, &context()).await.unwrap();

        let summary = analysis.agent_execution_summary;
        assert!(!summary.market_intelligence_completed);
        assert!(!summary.risk_assessment_completed);
        assert!(summary.narrative_completed);
        assert!(analysis.retrieved_documents.is_empty());
        // Rule scan results are lost along with the failed risk stage
        assert!(analysis.analysis.risk_factors.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request_rejected_before_valuation() {
        let mut predictor = MockPricePredictor::new();
        predictor.expect_predict().times(0);
        let orchestrator = Orchestrator::builder()
            .predictor(Arc::new(predictor))
            .retriever(Arc::new(MockDocumentRetriever::new()))
            .build()
            .unwrap();
        let invalid = PropertyFacts {
            size_sqft: -5.0,
            ..andheri()
        };

        let result = orchestrator.analyze(&invalid, &context()).await;
        assert!(matches!(result, Err(AdvisorError::Core(_))));
    }

    #[tokio::test]
    async fn test_process_replies_with_analysis() {
        let orchestrator = Orchestrator::builder()
            .predictor(Arc::new(stub_predictor()))
            .retriever(Arc::new(stub_retriever()))
            .build()
            .unwrap();
        let request = Envelope::typed(
            Role::Orchestrator,
            Role::Orchestrator,
            kinds::INVESTMENT_ANALYSIS_REQUEST,
            &InvestmentAnalysisRequest {
                property_data: andheri(),
                investment_context: context(),
            },
        )
        .unwrap();

        let reply = orchestrator.dispatch(request).await;

        assert_eq!(reply.kind(), kinds::INVESTMENT_ANALYSIS_RESPONSE);
        let analysis: InvestmentAnalysis = reply.parse_payload().unwrap();
        let documents: Vec<RetrievedDocument> = analysis.retrieved_documents;
        assert_eq!(documents.len(), 3);

        for role in Role::WORKERS {
            let worker = orchestrator.worker(role).unwrap();
            assert_eq!(worker.history().len().await, 1);
            assert_eq!(worker.history().kinds().await, vec![worker.request_kind()]);
        }
        // Inbound request plus one reply per worker
        assert_eq!(orchestrator.history().len().await, 5);
    }

    #[tokio::test]
    async fn test_process_rejects_unknown_kind() {
        let orchestrator = Orchestrator::builder()
            .retriever(Arc::new(MockDocumentRetriever::new()))
            .build()
            .unwrap();
        let envelope = Envelope::new(Role::Narrative, Role::Orchestrator, "status_request", Payload::new());

        let reply = orchestrator.dispatch(envelope).await;

        assert!(reply.is_error());
        assert_eq!(reply.receiver(), Role::Narrative);
        let report = ErrorPayload::from_envelope(&reply).unwrap();
        assert_eq!(
            report.fault,
            Fault::UnknownKind {
                kind: "status_request".to_string()
            }
        );
    }

    #[test]
    fn test_builder_requires_retriever() {
        let result = Orchestrator::builder().build();
        assert!(matches!(result, Err(AdvisorError::Config(_))));
    }
}
