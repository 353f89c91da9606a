//! Deterministic baseline valuation

use async_trait::async_trait;
use estate_core::{PredictionResult, PropertyFacts};
use tracing::debug;

use super::PricePredictor;
use crate::error::{AdvisorError, Result};

const BASE_PRICE_PER_SQFT: f64 = 6000.0;
const MONTHLY_RENT_RATIO: f64 = 0.003;
const RANGE_SPREAD: f64 = 0.10;
const AGE_DEPRECIATION_PER_YEAR: f64 = 0.01;
const MAX_DEPRECIATED_YEARS: u32 = 50;

/// Heuristic price model keyed on city, size and age
///
/// Produces stable numbers for demos and tests; it is not a trained model.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselinePredictor;

impl BaselinePredictor {
    pub const MODEL_NAME: &'static str = "baseline-heuristic";

    pub fn new() -> Self {
        Self
    }

    /// Price multiplier for a city, `None` for cities without market data
    pub fn city_multiplier(city: &str) -> Option<f64> {
        match city.trim().to_lowercase().as_str() {
            "mumbai" => Some(1.5),
            "delhi" => Some(1.3),
            "bangalore" | "bengaluru" => Some(1.2),
            "pune" => Some(1.0),
            "hyderabad" => Some(0.9),
            "chennai" => Some(0.95),
            _ => None,
        }
    }

    /// Synchronous estimate
    pub fn estimate(&self, property: &PropertyFacts) -> Result<PredictionResult> {
        if !property.size_sqft.is_finite() || property.size_sqft <= 0.0 {
            return Err(AdvisorError::Prediction(format!(
                "size_sqft must be positive, got {}",
                property.size_sqft
            )));
        }

        let known_city = Self::city_multiplier(&property.city);
        let multiplier = known_city.unwrap_or(1.0);
        let depreciation =
            1.0 - AGE_DEPRECIATION_PER_YEAR * f64::from(property.property_age.min(MAX_DEPRECIATED_YEARS));

        let price = property.size_sqft * BASE_PRICE_PER_SQFT * multiplier * depreciation;
        let rent = price * MONTHLY_RENT_RATIO;

        let mut confidence: f64 = 0.85;
        if known_city.is_none() {
            confidence -= 0.1;
        }
        if property.property_age > 20 {
            confidence -= 0.05;
        }

        debug!(
            "Baseline estimate for {} {}: price={:.0}, rent={:.0}, confidence={:.2}",
            property.locality, property.city, price, rent, confidence
        );

        Ok(PredictionResult {
            predicted_price: price,
            price_range_min: price * (1.0 - RANGE_SPREAD),
            price_range_max: price * (1.0 + RANGE_SPREAD),
            predicted_rent: rent,
            predicted_rental_yield: rent * 12.0 / price * 100.0,
            price_confidence: confidence,
            model_used: Self::MODEL_NAME.to_string(),
            valuation_timestamp: None,
            model_version: None,
        })
    }
}

#[async_trait]
impl PricePredictor for BaselinePredictor {
    async fn predict(&self, property: &PropertyFacts) -> Result<PredictionResult> {
        self.estimate(property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::PropertyType;

    fn property(city: &str, size: f64, age: u32) -> PropertyFacts {
        PropertyFacts {
            city: city.to_string(),
            locality: "Andheri".to_string(),
            property_type: PropertyType::Apartment,
            size_sqft: size,
            bedrooms: 2,
            bathrooms: 2,
            property_age: age,
            distance_to_transit_km: Some(1.5),
            has_parking: true,
            floor: None,
            amenities: Vec::new(),
        }
    }

    #[test]
    fn test_mumbai_estimate() {
        let result = BaselinePredictor::new().estimate(&property("Mumbai", 1200.0, 5)).unwrap();

        // 1200 * 6000 * 1.5 * 0.95
        assert!((result.predicted_price - 10_260_000.0).abs() < 1e-6);
        assert!((result.price_range_min - 9_234_000.0).abs() < 1e-6);
        assert!((result.predicted_rental_yield - 3.6).abs() < 1e-9);
        assert!((result.price_confidence - 0.85).abs() < 1e-9);
        assert_eq!(result.model_used, "baseline-heuristic");
    }

    #[test]
    fn test_confidence_penalties() {
        let result = BaselinePredictor::new().estimate(&property("Jaipur", 1000.0, 25)).unwrap();
        assert!((result.price_confidence - 0.70).abs() < 1e-9);
    }

    #[test]
    fn test_depreciation_floor() {
        let old = BaselinePredictor::new().estimate(&property("Pune", 1000.0, 80)).unwrap();
        assert!((old.predicted_price - 3_000_000.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_size() {
        let result = BaselinePredictor::new().predict(&property("Pune", 0.0, 1)).await;
        tokio_test::assert_err!(result);
    }
}
