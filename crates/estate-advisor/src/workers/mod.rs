//! The four pipeline workers
//!
//! A [`Worker`] consumes one envelope and always returns one envelope. Faults
//! never cross the `process` boundary: they come back as an `error` reply
//! carrying an [`ErrorPayload`].

use estate_core::envelope::to_payload;
use estate_core::protocol::{ErrorPayload, Fault, kinds};
use estate_core::{Envelope, MessageLog, Payload, Role};
use tracing::{debug, warn};

use crate::error::AdvisorError;

pub mod market;
pub mod narrative;
pub mod risk;
pub mod valuation;

pub use market::MarketIntelligenceWorker;
pub use narrative::{NarrativeWorker, fallback_analysis};
pub use risk::{RiskComplianceWorker, identify_risks};
pub use valuation::ValuationWorker;

/// Closed set of workers, one variant per worker role
pub enum Worker {
    Valuation(ValuationWorker),
    MarketIntelligence(MarketIntelligenceWorker),
    RiskCompliance(RiskComplianceWorker),
    Narrative(NarrativeWorker),
}

impl Worker {
    /// Role this worker answers to
    pub fn role(&self) -> Role {
        match self {
            Worker::Valuation(_) => Role::Valuation,
            Worker::MarketIntelligence(_) => Role::MarketIntelligence,
            Worker::RiskCompliance(_) => Role::RiskCompliance,
            Worker::Narrative(_) => Role::Narrative,
        }
    }

    /// The only request kind this worker accepts
    pub fn request_kind(&self) -> &'static str {
        match self {
            Worker::Valuation(_) => kinds::VALUATION_REQUEST,
            Worker::MarketIntelligence(_) => kinds::MARKET_INTELLIGENCE_REQUEST,
            Worker::RiskCompliance(_) => kinds::RISK_ASSESSMENT_REQUEST,
            Worker::Narrative(_) => kinds::NARRATIVE_GENERATION_REQUEST,
        }
    }

    /// Envelopes this worker has received, oldest first
    pub fn history(&self) -> &MessageLog {
        match self {
            Worker::Valuation(w) => &w.history,
            Worker::MarketIntelligence(w) => &w.history,
            Worker::RiskCompliance(w) => &w.history,
            Worker::Narrative(w) => &w.history,
        }
    }

    /// Handle one envelope
    ///
    /// Successful replies go back to the sender with the matching response
    /// kind; every fault becomes an `error` reply.
    pub async fn process(&self, envelope: Envelope) -> Envelope {
        let role = self.role();
        debug!(
            "{} received {} from {}",
            role,
            envelope.kind(),
            envelope.sender()
        );
        self.history().record(&envelope).await;

        if envelope.receiver() != role {
            warn!("{} rejected envelope addressed to {}", role, envelope.receiver());
            let report = ErrorPayload::misaddressed(envelope.receiver());
            return Envelope::new(role, envelope.sender(), kinds::ERROR, error_payload(&report));
        }

        if envelope.kind() != self.request_kind() {
            warn!("{} does not handle message kind '{}'", role, envelope.kind());
            return error_reply(&envelope, &ErrorPayload::unknown_kind(envelope.kind()));
        }

        let outcome = match self {
            Worker::Valuation(w) => w.respond(&envelope).await,
            Worker::MarketIntelligence(w) => w.respond(&envelope).await,
            Worker::RiskCompliance(w) => w.respond(&envelope).await,
            Worker::Narrative(w) => w.respond(&envelope).await,
        };

        outcome.unwrap_or_else(|e| {
            warn!("{} failed to handle {}: {}", role, envelope.kind(), e);
            error_reply(&envelope, &fault_report(&e))
        })
    }
}

/// Classify an internal error for the wire
pub(crate) fn fault_report(err: &AdvisorError) -> ErrorPayload {
    let fault = match err {
        AdvisorError::Core(estate_core::Error::MalformedPayload { .. }) => Fault::MalformedPayload,
        AdvisorError::Core(_) | AdvisorError::Json(_) => Fault::Serialization,
        _ => Fault::Collaborator,
    };
    ErrorPayload::new(err.to_string(), fault)
}

pub(crate) fn error_reply(request: &Envelope, report: &ErrorPayload) -> Envelope {
    request.reply(kinds::ERROR, error_payload(report))
}

fn error_payload(report: &ErrorPayload) -> Payload {
    to_payload(report).unwrap_or_else(|_| {
        let mut payload = Payload::new();
        payload.insert("error".to_string(), report.error.clone().into());
        payload
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use estate_core::{
        InvestmentContext, InvestmentGoal, PredictionResult, PropertyFacts, PropertyType,
        RetrievedDocument, RiskLevel,
    };

    pub fn andheri() -> PropertyFacts {
        PropertyFacts {
            city: "Mumbai".to_string(),
            locality: "Andheri".to_string(),
            property_type: PropertyType::Apartment,
            size_sqft: 1200.0,
            bedrooms: 2,
            bathrooms: 2,
            property_age: 5,
            distance_to_transit_km: Some(1.5),
            has_parking: true,
            floor: Some(3),
            amenities: vec!["Gym".to_string()],
        }
    }

    pub fn context() -> InvestmentContext {
        InvestmentContext {
            investment_horizon_years: 5,
            primary_goal: InvestmentGoal::Both,
            risk_tolerance: RiskLevel::Medium,
            budget_range_min: None,
            budget_range_max: None,
        }
    }

    pub fn prediction() -> PredictionResult {
        PredictionResult {
            predicted_price: 10_260_000.0,
            price_range_min: 9_234_000.0,
            price_range_max: 11_286_000.0,
            predicted_rent: 30_780.0,
            predicted_rental_yield: 3.6,
            price_confidence: 0.85,
            model_used: "baseline-heuristic".to_string(),
            valuation_timestamp: None,
            model_version: None,
        }
    }

    pub fn doc(id: &str, category: &str) -> RetrievedDocument {
        RetrievedDocument::new(id, format!("Title {id}"), format!("Body of {id}"), category, "Mumbai")
    }
}
