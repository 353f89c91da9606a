//! Transport-shaped view of an aggregated analysis

use chrono::{DateTime, Utc};
use estate_core::protocol::{ExecutionSummary, InvestmentAnalysis};
use estate_core::{
    MarketSentiment, PredictionResult, PropertyFacts, PropertyType, Recommendation,
    RetrievedDocument, RiskLevel,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Response returned to the caller for one analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentResponse {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub property_summary: PropertySummary,
    pub predictions: PredictionResult,
    pub investment_drivers: InvestmentDrivers,
    pub risk_assessment: RiskAssessment,
    pub recommendation: InvestmentRecommendation,
    pub retrieved_documents: Vec<RetrievedDocument>,
    pub assumptions: Vec<String>,
    pub limitations: Vec<String>,
    pub agent_execution_summary: ExecutionSummary,
    /// Set once a report has been queued for this request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySummary {
    pub city: String,
    pub locality: String,
    pub property_type: PropertyType,
    pub size_sqft: f64,
    pub bedrooms: u32,
    pub property_age: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentDrivers {
    pub positive_drivers: Vec<String>,
    pub negative_drivers: Vec<String>,
    pub market_sentiment: MarketSentiment,
    pub location_score: f64,
    pub infrastructure_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
    pub mitigation_strategies: Vec<String>,
    pub regulatory_compliance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentRecommendation {
    pub recommendation: Recommendation,
    pub confidence_score: f64,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_appreciation_3yr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_appreciation_5yr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_roi: Option<f64>,
}

impl InvestmentResponse {
    /// Reshape an aggregated analysis, keeping at most `document_limit`
    /// retrieved documents
    pub fn from_analysis(
        request_id: Uuid,
        property: &PropertyFacts,
        result: InvestmentAnalysis,
        document_limit: usize,
    ) -> Self {
        let InvestmentAnalysis {
            predictions,
            analysis,
            mut retrieved_documents,
            agent_execution_summary,
        } = result;
        retrieved_documents.truncate(document_limit);

        Self {
            request_id,
            timestamp: Utc::now(),
            property_summary: PropertySummary {
                city: property.city.clone(),
                locality: property.locality.clone(),
                property_type: property.property_type,
                size_sqft: property.size_sqft,
                bedrooms: property.bedrooms,
                property_age: property.property_age,
            },
            predictions,
            investment_drivers: InvestmentDrivers {
                positive_drivers: analysis.positive_drivers,
                negative_drivers: analysis.negative_drivers,
                market_sentiment: analysis.market_sentiment,
                location_score: analysis.location_score,
                infrastructure_score: analysis.infrastructure_score,
            },
            risk_assessment: RiskAssessment {
                risk_level: analysis.risk_level,
                risk_factors: analysis.risk_factors,
                mitigation_strategies: analysis.mitigation_strategies,
                regulatory_compliance_score: analysis.regulatory_compliance_score,
            },
            recommendation: InvestmentRecommendation {
                recommendation: analysis.recommendation,
                confidence_score: analysis.confidence_score,
                reasoning: analysis.reasoning,
                expected_appreciation_3yr: analysis.expected_appreciation_3yr,
                expected_appreciation_5yr: analysis.expected_appreciation_5yr,
                expected_roi: analysis.expected_roi,
            },
            retrieved_documents,
            assumptions: analysis.assumptions,
            limitations: analysis.limitations,
            agent_execution_summary,
            report_path: None,
        }
    }

    /// Name of the report file for this request
    pub fn report_file_name(&self) -> String {
        format!("report_{}.md", self.request_id)
    }
}
