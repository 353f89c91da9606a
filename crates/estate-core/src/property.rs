//! Request subject and investor preferences

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result, RiskLevel};

/// Kind of residential property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Apartment,
    Villa,
    #[serde(rename = "Independent House")]
    IndependentHouse,
    Penthouse,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "Apartment",
            PropertyType::Villa => "Villa",
            PropertyType::IndependentHouse => "Independent House",
            PropertyType::Penthouse => "Penthouse",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PropertyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['-', '_'], " ").as_str() {
            "apartment" => Ok(PropertyType::Apartment),
            "villa" => Ok(PropertyType::Villa),
            "independent house" | "house" => Ok(PropertyType::IndependentHouse),
            "penthouse" => Ok(PropertyType::Penthouse),
            other => Err(Error::InvalidRequest(format!("unknown property type '{other}'"))),
        }
    }
}

/// Immutable snapshot of the property under analysis
///
/// Every worker receives its own copy; none of them mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFacts {
    pub city: String,
    pub locality: String,
    pub property_type: PropertyType,
    pub size_sqft: f64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    /// Age in years
    pub property_age: u32,
    /// Distance to the nearest transit station, when known
    #[serde(default, alias = "distance_to_metro_km", skip_serializing_if = "Option::is_none")]
    pub distance_to_transit_km: Option<f64>,
    #[serde(default)]
    pub has_parking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amenities: Vec<String>,
}

impl PropertyFacts {
    /// Distance to transit, substituting `default_km` when unknown
    pub fn transit_distance_or(&self, default_km: f64) -> f64 {
        self.distance_to_transit_km.unwrap_or(default_km)
    }

    /// Check that the facts describe a plausible property
    pub fn validate(&self) -> Result<()> {
        if self.city.trim().is_empty() {
            return Err(Error::InvalidRequest("city must not be empty".to_string()));
        }
        if self.locality.trim().is_empty() {
            return Err(Error::InvalidRequest("locality must not be empty".to_string()));
        }
        if !self.size_sqft.is_finite() || self.size_sqft <= 0.0 {
            return Err(Error::InvalidRequest(format!(
                "size_sqft must be positive, got {}",
                self.size_sqft
            )));
        }
        if let Some(distance) = self.distance_to_transit_km {
            if !distance.is_finite() || distance < 0.0 {
                return Err(Error::InvalidRequest(format!(
                    "distance_to_transit_km must be non-negative, got {distance}"
                )));
            }
        }
        Ok(())
    }
}

/// What the investor is primarily after
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentGoal {
    Appreciation,
    Rental,
    Both,
}

impl fmt::Display for InvestmentGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InvestmentGoal::Appreciation => "appreciation",
            InvestmentGoal::Rental => "rental",
            InvestmentGoal::Both => "both",
        })
    }
}

impl std::str::FromStr for InvestmentGoal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "appreciation" => Ok(InvestmentGoal::Appreciation),
            "rental" => Ok(InvestmentGoal::Rental),
            "both" => Ok(InvestmentGoal::Both),
            other => Err(Error::InvalidRequest(format!("unknown investment goal '{other}'"))),
        }
    }
}

/// Investor preferences for a single request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentContext {
    pub investment_horizon_years: u32,
    pub primary_goal: InvestmentGoal,
    pub risk_tolerance: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_range_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_range_max: Option<f64>,
}

impl InvestmentContext {
    /// Longest supported holding horizon
    pub const MAX_HORIZON_YEARS: u32 = 30;

    pub fn validate(&self) -> Result<()> {
        if !(1..=Self::MAX_HORIZON_YEARS).contains(&self.investment_horizon_years) {
            return Err(Error::InvalidRequest(format!(
                "investment_horizon_years must be within 1..={}, got {}",
                Self::MAX_HORIZON_YEARS,
                self.investment_horizon_years
            )));
        }
        for bound in [self.budget_range_min, self.budget_range_max].into_iter().flatten() {
            if !bound.is_finite() || bound < 0.0 {
                return Err(Error::InvalidRequest(format!(
                    "budget bounds must be non-negative, got {bound}"
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.budget_range_min, self.budget_range_max) {
            if min > max {
                return Err(Error::InvalidRequest(format!(
                    "budget_range_min ({min}) exceeds budget_range_max ({max})"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn andheri() -> PropertyFacts {
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
            amenities: Vec::new(),
        }
    }

    #[test]
    fn test_property_deserializes_metro_alias() {
        let facts: PropertyFacts = serde_json::from_value(json!({
            "city": "Mumbai",
            "locality": "Andheri",
            "property_type": "Independent House",
            "size_sqft": 1800.0,
            "bedrooms": 3,
            "bathrooms": 2,
            "property_age": 12,
            "distance_to_metro_km": 4.0
        }))
        .unwrap();

        assert_eq!(facts.property_type, PropertyType::IndependentHouse);
        assert_eq!(facts.distance_to_transit_km, Some(4.0));
        assert!(!facts.has_parking);
    }

    #[test]
    fn test_transit_distance_default() {
        let mut facts = andheri();
        assert_eq!(facts.transit_distance_or(10.0), 1.5);
        facts.distance_to_transit_km = None;
        assert_eq!(facts.transit_distance_or(10.0), 10.0);
    }

    #[test]
    fn test_property_validation() {
        assert!(andheri().validate().is_ok());

        let mut facts = andheri();
        facts.size_sqft = 0.0;
        assert!(facts.validate().is_err());

        let mut facts = andheri();
        facts.city = "  ".to_string();
        assert!(facts.validate().is_err());
    }

    #[test]
    fn test_property_type_parsing() {
        assert_eq!("villa".parse::<PropertyType>().unwrap(), PropertyType::Villa);
        assert_eq!(
            "independent-house".parse::<PropertyType>().unwrap(),
            PropertyType::IndependentHouse
        );
        assert!("castle".parse::<PropertyType>().is_err());
    }

    #[test]
    fn test_context_validation() {
        let context = InvestmentContext {
            investment_horizon_years: 5,
            primary_goal: InvestmentGoal::Both,
            risk_tolerance: RiskLevel::Medium,
            budget_range_min: Some(10_000_000.0),
            budget_range_max: Some(15_000_000.0),
        };
        assert!(context.validate().is_ok());

        let inverted = InvestmentContext {
            budget_range_min: Some(2.0),
            budget_range_max: Some(1.0),
            ..context.clone()
        };
        assert!(inverted.validate().is_err());

        let too_long = InvestmentContext {
            investment_horizon_years: 0,
            ..context
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_goal_rejects_unknown() {
        let result: std::result::Result<InvestmentGoal, _> =
            serde_json::from_value(json!("invalid_goal"));
        assert!(result.is_err());
        assert_eq!("Rental".parse::<InvestmentGoal>().unwrap(), InvestmentGoal::Rental);
    }
}
