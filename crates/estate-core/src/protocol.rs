//! Message kinds and the typed payload carried by each
//!
//! Workers parse the untyped envelope payload into one of these structs as
//! soon as they accept a message; business logic never handles raw maps.

use serde::{Deserialize, Serialize};

use crate::{
    AnalysisResult, Envelope, InvestmentContext, Payload, PredictionResult, PropertyFacts,
    RetrievedDocument, Role,
};

/// Envelope `kind` tags
pub mod kinds {
    pub const VALUATION_REQUEST: &str = "valuation_request";
    pub const VALUATION_RESPONSE: &str = "valuation_response";
    pub const MARKET_INTELLIGENCE_REQUEST: &str = "market_intelligence_request";
    pub const MARKET_INTELLIGENCE_RESPONSE: &str = "market_intelligence_response";
    pub const RISK_ASSESSMENT_REQUEST: &str = "risk_assessment_request";
    pub const RISK_ASSESSMENT_RESPONSE: &str = "risk_assessment_response";
    pub const NARRATIVE_GENERATION_REQUEST: &str = "narrative_generation_request";
    pub const NARRATIVE_GENERATION_RESPONSE: &str = "narrative_generation_response";
    pub const INVESTMENT_ANALYSIS_REQUEST: &str = "investment_analysis_request";
    pub const INVESTMENT_ANALYSIS_RESPONSE: &str = "investment_analysis_response";
    /// Worker fault report
    pub const ERROR: &str = "error";
}

/// Free-text query used when a market request carries none
pub const DEFAULT_MARKET_QUERY: &str = "Investment opportunity analysis";

fn default_market_query() -> String {
    DEFAULT_MARKET_QUERY.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRequest {
    pub property_data: PropertyFacts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResponse {
    pub predictions: PredictionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketIntelligenceRequest {
    pub property_data: PropertyFacts,
    #[serde(default = "default_market_query")]
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketIntelligenceResponse {
    pub documents: Vec<RetrievedDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessmentRequest {
    pub property_data: PropertyFacts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessmentResponse {
    pub regulatory_documents: Vec<RetrievedDocument>,
    /// Advisory strings from the rule-based scan
    pub identified_risks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeRequest {
    pub property_data: PropertyFacts,
    pub predictions: PredictionResult,
    pub investment_context: InvestmentContext,
    #[serde(default)]
    pub retrieved_documents: Vec<RetrievedDocument>,
}

/// Unvalidated draft from the narrative stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeResponse {
    pub analysis: Payload,
    /// Set when the deterministic fallback replaced the synthesized draft
    #[serde(default)]
    pub fallback_used: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentAnalysisRequest {
    pub property_data: PropertyFacts,
    pub investment_context: InvestmentContext,
}

/// Per-stage completion report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub valuation_completed: bool,
    pub market_intelligence_completed: bool,
    pub risk_assessment_completed: bool,
    /// False when the narrative fallback was used
    pub narrative_completed: bool,
    pub fallback_used: bool,
}

impl ExecutionSummary {
    /// Whether every stage completed without fault or fallback
    pub fn all_completed(&self) -> bool {
        self.valuation_completed
            && self.market_intelligence_completed
            && self.risk_assessment_completed
            && self.narrative_completed
    }
}

/// Aggregated result of one investment analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentAnalysis {
    pub predictions: PredictionResult,
    pub analysis: AnalysisResult,
    pub retrieved_documents: Vec<RetrievedDocument>,
    pub agent_execution_summary: ExecutionSummary,
}

/// Category of a worker fault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Fault {
    /// The worker does not handle this message kind
    UnknownKind { kind: String },
    /// The payload did not match the shape its kind requires
    MalformedPayload,
    /// The envelope was addressed to a different role
    Misaddressed { receiver: Role },
    /// The external collaborator failed
    Collaborator,
    /// A reply payload could not be serialized
    Serialization,
}

/// Payload of an `error` envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    pub fault: Fault,
}

impl ErrorPayload {
    pub fn new(error: impl Into<String>, fault: Fault) -> Self {
        Self {
            error: error.into(),
            fault,
        }
    }

    pub fn unknown_kind(kind: &str) -> Self {
        Self::new(
            format!("Unknown message type: {kind}"),
            Fault::UnknownKind {
                kind: kind.to_string(),
            },
        )
    }

    pub fn misaddressed(receiver: Role) -> Self {
        Self::new(
            format!("Envelope addressed to {receiver}"),
            Fault::Misaddressed { receiver },
        )
    }

    /// Extract the fault report from an `error` envelope
    ///
    /// Returns `None` for non-error envelopes. An error envelope whose
    /// payload is not a well-formed report still yields a payload, with the
    /// raw JSON as its message.
    pub fn from_envelope(envelope: &Envelope) -> Option<Self> {
        if !envelope.is_error() {
            return None;
        }
        Some(envelope.parse_payload().unwrap_or_else(|_| {
            Self::new(
                serde_json::Value::Object(envelope.payload().clone()).to_string(),
                Fault::MalformedPayload,
            )
        }))
    }
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_market_query_defaults() {
        let request: MarketIntelligenceRequest = serde_json::from_value(json!({
            "property_data": {
                "city": "Pune",
                "locality": "Baner",
                "property_type": "Apartment",
                "size_sqft": 900.0,
                "bedrooms": 2,
                "bathrooms": 1,
                "property_age": 3
            }
        }))
        .unwrap();
        assert_eq!(request.query, DEFAULT_MARKET_QUERY);
    }

    #[test]
    fn test_unknown_kind_wire_shape() {
        let payload = ErrorPayload::unknown_kind("bogus");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["error"], "Unknown message type: bogus");
        assert_eq!(json["fault"]["type"], "unknown_kind");
        assert_eq!(json["fault"]["kind"], "bogus");
    }

    #[test]
    fn test_from_envelope() {
        let ok = Envelope::new(Role::Valuation, Role::Orchestrator, kinds::VALUATION_RESPONSE, Payload::new());
        assert!(ErrorPayload::from_envelope(&ok).is_none());

        let err = Envelope::typed(
            Role::Valuation,
            Role::Orchestrator,
            kinds::ERROR,
            &ErrorPayload::misaddressed(Role::Narrative),
        )
        .unwrap();
        let report = ErrorPayload::from_envelope(&err).unwrap();
        assert_eq!(report.fault, Fault::Misaddressed { receiver: Role::Narrative });

        let mut raw = Payload::new();
        raw.insert("reason".to_string(), json!("opaque"));
        let opaque = Envelope::new(Role::Valuation, Role::Orchestrator, kinds::ERROR, raw);
        let report = ErrorPayload::from_envelope(&opaque).unwrap();
        assert_eq!(report.fault, Fault::MalformedPayload);
        assert!(report.error.contains("opaque"));
    }

    #[test]
    fn test_summary_all_completed() {
        let mut summary = ExecutionSummary {
            valuation_completed: true,
            market_intelligence_completed: true,
            risk_assessment_completed: true,
            narrative_completed: true,
            fallback_used: false,
        };
        assert!(summary.all_completed());
        summary.narrative_completed = false;
        assert!(!summary.all_completed());
    }
}
