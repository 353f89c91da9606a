//! Synthesized investment analysis
//!
//! [`AnalysisResult`] is the validated, always well-formed shape of the
//! narrative stage's output. The enums here accept only their exact wire
//! spellings; anything else is repaired by the validator rather than parsed
//! leniently.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Investment recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Recommendation {
    Buy,
    #[default]
    Hold,
    Avoid,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Buy => "Buy",
            Recommendation::Hold => "Hold",
            Recommendation::Avoid => "Avoid",
        }
    }

    /// Parse the exact wire spelling, rejecting case variants
    pub fn parse_exact(s: &str) -> Option<Self> {
        match s {
            "Buy" => Some(Recommendation::Buy),
            "Hold" => Some(Recommendation::Hold),
            "Avoid" => Some(Recommendation::Avoid),
            _ => None,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-level risk scale shared by risk tolerance and assessed risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn parse_exact(s: &str) -> Option<Self> {
        match s {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = crate::Error;

    /// Case-insensitive parse for user input
    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse_exact(&s.trim().to_lowercase())
            .ok_or_else(|| crate::Error::InvalidRequest(format!("unknown risk level '{s}'")))
    }
}

/// Market mood reported by the synthesis stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MarketSentiment {
    Bullish,
    #[default]
    Neutral,
    Bearish,
}

impl MarketSentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketSentiment::Bullish => "Bullish",
            MarketSentiment::Neutral => "Neutral",
            MarketSentiment::Bearish => "Bearish",
        }
    }

    pub fn parse_exact(s: &str) -> Option<Self> {
        match s {
            "Bullish" => Some(MarketSentiment::Bullish),
            "Neutral" => Some(MarketSentiment::Neutral),
            "Bearish" => Some(MarketSentiment::Bearish),
            _ => None,
        }
    }
}

impl fmt::Display for MarketSentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated narrative analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub recommendation: Recommendation,
    /// Always within [0, 1]
    pub confidence_score: f64,
    pub reasoning: String,
    pub positive_drivers: Vec<String>,
    pub negative_drivers: Vec<String>,
    pub risk_factors: Vec<String>,
    pub mitigation_strategies: Vec<String>,
    pub market_sentiment: MarketSentiment,
    /// 0-10
    pub location_score: f64,
    /// 0-10
    pub infrastructure_score: f64,
    /// 0-1
    pub regulatory_compliance_score: f64,
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_appreciation_3yr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_appreciation_5yr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_roi: Option<f64>,
    pub assumptions: Vec<String>,
    pub limitations: Vec<String>,
}

impl AnalysisResult {
    /// Union `extra` into `risk_factors`, dropping duplicates
    ///
    /// The first occurrence of each string wins, so existing entries keep
    /// their position and new ones are appended in the order given.
    pub fn merge_risk_factors<I, S>(&mut self, extra: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let merged = std::mem::take(&mut self.risk_factors)
            .into_iter()
            .chain(extra.into_iter().map(Into::into))
            .filter(|risk| seen.insert(risk.clone()))
            .collect();
        self.risk_factors = merged;
    }
}
