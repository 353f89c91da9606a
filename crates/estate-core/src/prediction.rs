//! Quantitative valuation output

use serde::{Deserialize, Serialize};

/// Price and rent estimate produced once per request by the prediction
/// collaborator. Read-only downstream of the valuation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_price: f64,
    pub price_range_min: f64,
    pub price_range_max: f64,
    /// Monthly rent
    pub predicted_rent: f64,
    /// Annual rent as a percentage of price
    pub predicted_rental_yield: f64,
    /// Confidence in [0, 1]
    pub price_confidence: f64,
    pub model_used: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl PredictionResult {
    /// Price per square foot for a property of the given size
    pub fn price_per_sqft(&self, size_sqft: f64) -> Option<f64> {
        (size_sqft > 0.0).then(|| self.predicted_price / size_sqft)
    }

    /// Confidence clamped into [0, 1]; non-finite values read as zero
    pub fn bounded_confidence(&self) -> f64 {
        if self.price_confidence.is_finite() {
            self.price_confidence.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PredictionResult {
        PredictionResult {
            predicted_price: 12_000_000.0,
            price_range_min: 10_800_000.0,
            price_range_max: 13_200_000.0,
            predicted_rent: 36_000.0,
            predicted_rental_yield: 3.6,
            price_confidence: 0.85,
            model_used: "baseline-heuristic".to_string(),
            valuation_timestamp: None,
            model_version: None,
        }
    }

    #[test]
    fn test_price_per_sqft() {
        let prediction = sample();
        assert_eq!(prediction.price_per_sqft(1200.0), Some(10_000.0));
        assert_eq!(prediction.price_per_sqft(0.0), None);
    }

    #[test]
    fn test_bounded_confidence() {
        let mut prediction = sample();
        prediction.price_confidence = 1.7;
        assert_eq!(prediction.bounded_confidence(), 1.0);
        prediction.price_confidence = f64::NAN;
        assert_eq!(prediction.bounded_confidence(), 0.0);
    }

    #[test]
    fn test_stamp_fields_are_optional_on_the_wire() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("model_version").is_none());

        let parsed: PredictionResult = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, sample());
    }
}
