//! Narrative worker and its deterministic fallback

use estate_core::envelope::to_payload;
use estate_core::protocol::{NarrativeRequest, NarrativeResponse, kinds};
use estate_core::{
    AnalysisResult, Envelope, InvestmentContext, MarketSentiment, MessageLog, PredictionResult,
    Recommendation, RiskLevel,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::collaborators::Synthesizer;
use crate::error::Result;

/// Drafts the investment analysis through the synthesis collaborator
///
/// Synthesis failures are absorbed: the reply then carries
/// [`fallback_analysis`] with `fallback_used` set.
pub struct NarrativeWorker {
    synthesizer: Arc<dyn Synthesizer>,
    pub(crate) history: MessageLog,
}

impl NarrativeWorker {
    pub fn new(synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self {
            synthesizer,
            history: MessageLog::new(),
        }
    }

    pub(crate) async fn respond(&self, envelope: &Envelope) -> Result<Envelope> {
        let request: NarrativeRequest = envelope.parse_payload()?;
        info!(
            "Generating narrative with {} context documents",
            request.retrieved_documents.len()
        );

        let response = match self.synthesizer.synthesize(&request).await {
            Ok(analysis) => NarrativeResponse {
                analysis,
                fallback_used: false,
            },
            Err(e) => {
                warn!("Synthesis failed, using fallback analysis: {}", e);
                NarrativeResponse {
                    analysis: to_payload(&fallback_analysis(
                        &request.predictions,
                        &request.investment_context,
                    ))?,
                    fallback_used: true,
                }
            }
        };

        Ok(envelope.typed_reply(kinds::NARRATIVE_GENERATION_RESPONSE, &response)?)
    }
}

/// Conservative analysis built only from the prediction and investor context
pub fn fallback_analysis(prediction: &PredictionResult, context: &InvestmentContext) -> AnalysisResult {
    let strings = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();

    AnalysisResult {
        recommendation: Recommendation::Hold,
        confidence_score: 0.5,
        reasoning: "Analysis based on predictive models only. Limited contextual data available."
            .to_string(),
        positive_drivers: strings(&["Quantitative prediction available", "Property details verified"]),
        negative_drivers: strings(&[
            "Limited market intelligence",
            "Unable to generate comprehensive analysis",
        ]),
        risk_factors: strings(&["Data availability", "Market volatility", "Regulatory changes"]),
        mitigation_strategies: strings(&[
            "Conduct independent due diligence",
            "Verify RERA compliance",
            "Local market research",
        ]),
        market_sentiment: MarketSentiment::Neutral,
        location_score: 5.0,
        infrastructure_score: 5.0,
        regulatory_compliance_score: 0.7,
        risk_level: RiskLevel::Medium,
        expected_appreciation_3yr: Some(5.0),
        expected_appreciation_5yr: Some(8.0),
        expected_roi: Some(
            prediction.predicted_rental_yield * f64::from(context.investment_horizon_years) / 100.0,
        ),
        assumptions: strings(&["Model predictions are accurate", "Market conditions remain stable"]),
        limitations: strings(&[
            "LLM analysis unavailable",
            "Limited contextual data",
            "Requires expert verification",
        ]),
    }
}
