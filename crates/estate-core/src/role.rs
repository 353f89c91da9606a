//! Worker roles used both as routing addresses and worker identities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of participants in the analysis pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Price and rent estimation
    Valuation,
    /// Market document retrieval
    MarketIntelligence,
    /// Regulatory retrieval and rule-based risk scan
    RiskCompliance,
    /// Narrative synthesis
    Narrative,
    /// Sequences the workers and aggregates their replies
    Orchestrator,
}

impl Role {
    /// The four worker roles, in pipeline order
    pub const WORKERS: [Role; 4] = [
        Role::Valuation,
        Role::MarketIntelligence,
        Role::RiskCompliance,
        Role::Narrative,
    ];

    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Valuation => "valuation",
            Role::MarketIntelligence => "market_intelligence",
            Role::RiskCompliance => "risk_compliance",
            Role::Narrative => "narrative",
            Role::Orchestrator => "orchestrator",
        }
    }

    /// Whether this role is served by a worker
    pub fn is_worker(&self) -> bool {
        !matches!(self, Role::Orchestrator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        let json = serde_json::to_string(&Role::MarketIntelligence).unwrap();
        assert_eq!(json, "\"market_intelligence\"");
        assert_eq!(Role::RiskCompliance.to_string(), "risk_compliance");
    }

    #[test]
    fn test_worker_roles() {
        assert!(Role::WORKERS.iter().all(Role::is_worker));
        assert!(!Role::Orchestrator.is_worker());
    }
}
