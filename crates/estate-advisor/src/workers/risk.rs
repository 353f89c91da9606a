//! Risk and compliance worker

use estate_core::protocol::{RiskAssessmentRequest, RiskAssessmentResponse, kinds};
use estate_core::{Envelope, MessageLog, PropertyFacts};
use std::sync::Arc;
use tracing::info;

use crate::collaborators::{DocumentRetriever, SearchFilter};
use crate::config::AdvisorConfig;
use crate::error::Result;

/// Older properties carry higher maintenance costs
pub const AGE_THRESHOLD_YEARS: u32 = 20;
/// Transit distance above which liquidity suffers
pub const TRANSIT_THRESHOLD_KM: f64 = 5.0;
/// Distance assumed when the request carries none
pub const ASSUMED_TRANSIT_KM: f64 = 10.0;
/// Size above which the buyer pool narrows
pub const SIZE_THRESHOLD_SQFT: f64 = 3000.0;

pub const AGE_RISK: &str = "Property age exceeds 20 years - maintenance costs may be higher";
pub const TRANSIT_RISK: &str = "Distance to metro > 5km - may impact liquidity and rental demand";
pub const SIZE_RISK: &str = "Large property size - limited buyer pool, higher holding costs";

/// Fetches regulatory documents and runs the rule-based risk scan
pub struct RiskComplianceWorker {
    retriever: Arc<dyn DocumentRetriever>,
    config: Arc<AdvisorConfig>,
    pub(crate) history: MessageLog,
}

impl RiskComplianceWorker {
    pub fn new(retriever: Arc<dyn DocumentRetriever>, config: Arc<AdvisorConfig>) -> Self {
        Self {
            retriever,
            config,
            history: MessageLog::new(),
        }
    }

    pub(crate) async fn respond(&self, envelope: &Envelope) -> Result<Envelope> {
        let request: RiskAssessmentRequest = envelope.parse_payload()?;
        let property = &request.property_data;
        info!("Assessing regulatory risk for {}", property.city);

        let query = format!(
            "RERA compliance, stamp duty, building regulations, legal requirements for {}",
            property.city
        );
        let regulatory_documents = self
            .retriever
            .search(
                &query,
                self.config.regulatory_top_k,
                &SearchFilter::category(&self.config.regulatory_category),
            )
            .await?;

        let identified_risks = identify_risks(property);
        info!(
            "Found {} regulatory documents and {} rule-based risks",
            regulatory_documents.len(),
            identified_risks.len()
        );

        Ok(envelope.typed_reply(
            kinds::RISK_ASSESSMENT_RESPONSE,
            &RiskAssessmentResponse {
                regulatory_documents,
                identified_risks,
            },
        )?)
    }
}

/// Fixed advisory strings for each rule the property trips
pub fn identify_risks(property: &PropertyFacts) -> Vec<String> {
    let mut risks = Vec::new();

    if property.property_age > AGE_THRESHOLD_YEARS {
        risks.push(AGE_RISK.to_string());
    }
    if property.transit_distance_or(ASSUMED_TRANSIT_KM) > TRANSIT_THRESHOLD_KM {
        risks.push(TRANSIT_RISK.to_string());
    }
    if property.size_sqft > SIZE_THRESHOLD_SQFT {
        risks.push(SIZE_RISK.to_string());
    }

    risks
}
