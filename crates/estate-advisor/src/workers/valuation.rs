//! Valuation worker

use chrono::Utc;
use estate_core::envelope::keys;
use estate_core::protocol::{ValuationRequest, ValuationResponse, kinds};
use estate_core::{Envelope, MessageLog};
use std::sync::Arc;
use tracing::info;

use crate::collaborators::PricePredictor;
use crate::config::AdvisorConfig;
use crate::error::Result;

/// Estimates price and rent through the prediction collaborator
pub struct ValuationWorker {
    predictor: Arc<dyn PricePredictor>,
    config: Arc<AdvisorConfig>,
    pub(crate) history: MessageLog,
}

impl ValuationWorker {
    pub fn new(predictor: Arc<dyn PricePredictor>, config: Arc<AdvisorConfig>) -> Self {
        Self {
            predictor,
            config,
            history: MessageLog::new(),
        }
    }

    /// Stamps the result with the request's timestamp and model version,
    /// falling back to the current time and the configured version.
    pub(crate) async fn respond(&self, envelope: &Envelope) -> Result<Envelope> {
        let request: ValuationRequest = envelope.parse_payload()?;
        let property = &request.property_data;
        info!("Valuing {} in {}, {}", property.property_type, property.locality, property.city);

        let mut predictions = self.predictor.predict(property).await?;
        predictions.valuation_timestamp = Some(
            envelope
                .meta_str(keys::TIMESTAMP)
                .map_or_else(|| Utc::now().to_rfc3339(), str::to_string),
        );
        predictions.model_version = Some(
            envelope
                .meta_str(keys::MODEL_VERSION)
                .unwrap_or(&self.config.model_version)
                .to_string(),
        );

        Ok(envelope.typed_reply(kinds::VALUATION_RESPONSE, &ValuationResponse { predictions })?)
    }
}
