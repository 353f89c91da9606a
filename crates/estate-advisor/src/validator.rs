//! Result validation
//!
//! Repairs a narrative draft into a well-formed [`AnalysisResult`]. Every
//! field has a deterministic default, so validation cannot fail.
//!
//! One model-confidence limitation is appended on every call. Validating an
//! already-validated result therefore grows `limitations`; the orchestrator
//! validates each draft exactly once.

use estate_core::{
    AnalysisResult, InvestmentContext, MarketSentiment, Payload, PredictionResult, Recommendation,
    RiskLevel,
};
use serde_json::Value;
use tracing::{debug, warn};

pub const DEFAULT_REASONING: &str = "Analysis generated from predictive models.";

/// Used when the draft carries no limitations
pub const DEFAULT_LIMITATIONS: [&str; 4] = [
    "Analysis based on synthetic/limited data",
    "Market conditions subject to rapid change",
    "Predictions have inherent uncertainty",
    "Independent verification recommended",
];

const DEFAULT_AREA_SCORE: f64 = 5.0;
const DEFAULT_REGULATORY_SCORE: f64 = 0.7;

/// Normalize `draft` against the required-field contract
pub fn validate(
    draft: &Payload,
    prediction: &PredictionResult,
    context: &InvestmentContext,
) -> AnalysisResult {
    debug!(
        "Validating draft with {} fields for a {}-year {} investment",
        draft.len(),
        context.investment_horizon_years,
        context.primary_goal
    );

    let recommendation = enum_field(draft, "recommendation", Recommendation::parse_exact)
        .unwrap_or(Recommendation::Hold);

    let confidence_score = match draft.get("confidence_score").and_then(Value::as_f64) {
        Some(c) if (0.0..=1.0).contains(&c) => c,
        other => {
            if other.is_some() {
                warn!("confidence_score {:?} out of range, using model confidence", other);
            }
            prediction.bounded_confidence()
        }
    };

    let reasoning = draft
        .get("reasoning")
        .and_then(Value::as_str)
        .map_or_else(|| DEFAULT_REASONING.to_string(), str::to_string);

    let risk_level = enum_field(draft, "risk_level", RiskLevel::parse_exact).unwrap_or_default();
    let market_sentiment =
        enum_field(draft, "market_sentiment", MarketSentiment::parse_exact).unwrap_or_default();

    let mut limitations = string_list(draft, "limitations");
    if limitations.is_empty() {
        limitations = DEFAULT_LIMITATIONS.iter().map(|s| (*s).to_string()).collect();
    }
    limitations.push(format!(
        "Model confidence: {:.1}%",
        prediction.price_confidence * 100.0
    ));

    AnalysisResult {
        recommendation,
        confidence_score,
        reasoning,
        positive_drivers: string_list(draft, "positive_drivers"),
        negative_drivers: string_list(draft, "negative_drivers"),
        risk_factors: string_list(draft, "risk_factors"),
        mitigation_strategies: string_list(draft, "mitigation_strategies"),
        market_sentiment,
        location_score: clamped(draft, "location_score", DEFAULT_AREA_SCORE, 10.0),
        infrastructure_score: clamped(draft, "infrastructure_score", DEFAULT_AREA_SCORE, 10.0),
        regulatory_compliance_score: clamped(
            draft,
            "regulatory_compliance_score",
            DEFAULT_REGULATORY_SCORE,
            1.0,
        ),
        risk_level,
        expected_appreciation_3yr: finite(draft, "expected_appreciation_3yr"),
        expected_appreciation_5yr: finite(draft, "expected_appreciation_5yr"),
        expected_roi: finite(draft, "expected_roi"),
        assumptions: string_list(draft, "assumptions"),
        limitations,
    }
}

/// Exact-match enum field; anything else is reported and treated as absent
fn enum_field<T>(draft: &Payload, key: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    let value = draft.get(key)?;
    let parsed = value.as_str().and_then(parse);
    if parsed.is_none() {
        warn!("Invalid {} {}, using default", key, value);
    }
    parsed
}

/// String entries of an array field; non-arrays count as absent
fn string_list(draft: &Payload, key: &str) -> Vec<String> {
    match draft.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(other) => {
            warn!("Field {} is not a list ({}), treating as empty", key, other);
            Vec::new()
        }
        None => Vec::new(),
    }
}

fn finite(draft: &Payload, key: &str) -> Option<f64> {
    draft.get(key).and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn clamped(draft: &Payload, key: &str, default: f64, max: f64) -> f64 {
    finite(draft, key).map_or(default, |v| v.clamp(0.0, max))
}
