//! LLM-backed analysis drafting

use async_trait::async_trait;
use estate_core::Payload;
use estate_core::protocol::NarrativeRequest;
use estate_llm::providers::{OpenAIConfig, OpenAIProvider};
use estate_llm::{CompletionRequest, LLMProvider, Message};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::Synthesizer;
use crate::config::AdvisorConfig;
use crate::error::{AdvisorError, Result};
use crate::prompts::{SYSTEM_PROMPT, investment_analysis_prompt};

/// Drafts the analysis with a chat-completion model
pub struct LlmSynthesizer {
    provider: Arc<dyn LLMProvider>,
    config: Arc<AdvisorConfig>,
}

impl LlmSynthesizer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: Arc<AdvisorConfig>) -> Self {
        Self { provider, config }
    }

    /// Build an OpenAI or Azure OpenAI backed synthesizer from configuration
    pub fn from_config(config: Arc<AdvisorConfig>) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AdvisorError::SynthesisUnavailable)?;

        let mut provider_config =
            OpenAIConfig::new(api_key).with_timeout(config.request_timeout.as_secs());
        if let Some(base) = &config.api_base {
            provider_config = provider_config.with_api_base(base.clone());
        }
        if let Some(version) = &config.azure_api_version {
            provider_config = provider_config.with_api_version(version.clone());
        }

        let provider = OpenAIProvider::with_config(provider_config)?;
        info!("Narrative synthesis via {} model {}", provider.name(), config.model);
        Ok(Self::new(Arc::new(provider), config))
    }

    /// Call the provider, retrying transient failures with capped exponential backoff
    async fn complete_with_retry(&self, prompt: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            let request = CompletionRequest::builder(&self.config.model)
                .system(SYSTEM_PROMPT)
                .add_message(Message::user(prompt))
                .max_tokens(self.config.max_tokens)
                .temperature(self.config.temperature)
                .json_output()
                .build();

            match self.provider.complete(request).await {
                Ok(response) => {
                    debug!(
                        "Completion received ({} tokens, stop: {:?})",
                        response.usage.total(),
                        response.stop_reason
                    );
                    return Ok(response.message.content);
                }
                Err(e) if e.is_retryable() && attempt + 1 < self.config.max_retries => {
                    let backoff = self.config.retry_backoff(attempt);
                    warn!(
                        "Completion attempt {} failed: {}; retrying in {:?}",
                        attempt + 1,
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl Synthesizer for LlmSynthesizer {
    async fn synthesize(&self, request: &NarrativeRequest) -> Result<Payload> {
        let prompt = investment_analysis_prompt(request)?;
        info!("Generating investment analysis");
        let text = self.complete_with_retry(&prompt).await?;
        extract_json_object(&text).inspect_err(|e| {
            let preview: String = text.chars().take(200).collect();
            warn!("Unparseable completion ({}): {}", e, preview);
        })
    }
}

/// Synthesizer used when no LLM is configured; always fails
///
/// The narrative stage turns the failure into its deterministic fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSynthesizer;

#[async_trait]
impl Synthesizer for OfflineSynthesizer {
    async fn synthesize(&self, _request: &NarrativeRequest) -> Result<Payload> {
        Err(AdvisorError::SynthesisUnavailable)
    }
}

/// Pull the JSON object out of a completion
///
/// Accepts a bare object, an object inside a fenced code block, or an object
/// surrounded by prose (outermost braces win).
pub fn extract_json_object(text: &str) -> Result<Payload> {
    let trimmed = text.trim();

    let candidate = if let Some(fenced) = fenced_block(trimmed) {
        fenced
    } else {
        match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(start), Some(end)) if start < end => &trimmed[start..=end],
            _ => {
                return Err(AdvisorError::Synthesis(
                    "completion contains no JSON object".to_string(),
                ));
            }
        }
    };

    match serde_json::from_str::<serde_json::Value>(candidate)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(AdvisorError::Synthesis("completion is not a JSON object".to_string())),
    }
}

fn fenced_block(text: &str) -> Option<&str> {
    let re = Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*\})\s*```").ok()?;
    re.captures(text)?.get(1).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::{
        InvestmentContext, InvestmentGoal, PredictionResult, PropertyFacts, PropertyType, RiskLevel,
    };
    use estate_llm::{CompletionResponse, LLMError, StopReason, TokenUsage};
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Provider that replays scripted outcomes
    struct ScriptedProvider {
        outcomes: Mutex<VecDeque<estate_llm::Result<String>>>,
        calls: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn new(outcomes: Vec<estate_llm::Result<String>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(&self, request: CompletionRequest) -> estate_llm::Result<CompletionResponse> {
            self.calls.lock().await.push(request);
            let outcome = self
                .outcomes
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(LLMError::RequestFailed("script exhausted".to_string())));
            outcome.map(|text| CompletionResponse {
                message: Message::assistant(text),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn fast_config() -> Arc<AdvisorConfig> {
        Arc::new(
            AdvisorConfig::builder()
                .retry_backoff_base(Duration::from_millis(1))
                .build()
                .unwrap(),
        )
    }

    fn request() -> NarrativeRequest {
        NarrativeRequest {
            property_data: PropertyFacts {
                city: "Pune".to_string(),
                locality: "Baner".to_string(),
                property_type: PropertyType::Apartment,
                size_sqft: 950.0,
                bedrooms: 2,
                bathrooms: 2,
                property_age: 3,
                distance_to_transit_km: Some(2.0),
                has_parking: true,
                floor: Some(4),
                amenities: Vec::new(),
            },
            predictions: PredictionResult {
                predicted_price: 5_500_000.0,
                price_range_min: 4_950_000.0,
                price_range_max: 6_050_000.0,
                predicted_rent: 16_500.0,
                predicted_rental_yield: 3.6,
                price_confidence: 0.85,
                model_used: "baseline-heuristic".to_string(),
                valuation_timestamp: None,
                model_version: None,
            },
            investment_context: InvestmentContext {
                investment_horizon_years: 7,
                primary_goal: InvestmentGoal::Rental,
                risk_tolerance: RiskLevel::Low,
                budget_range_min: None,
                budget_range_max: None,
            },
            retrieved_documents: Vec::new(),
        }
    }

    #[test]
    fn test_extract_bare_object() {
        let map = extract_json_object(r#"{"recommendation": "Buy"}"#).unwrap();
        assert_eq!(map["recommendation"], "Buy");
    }

    #[test]
    fn test_extract_fenced_object() {
        let text = "Here you go:\n```json\n{\"risk_level\": \"low\"}\n```\nThanks";
        let map = extract_json_object(text).unwrap();
        assert_eq!(map["risk_level"], "low");
    }

    #[test]
    fn test_extract_embedded_object() {
        let map = extract_json_object("Analysis: {\"confidence_score\": 0.7} end").unwrap();
        assert_eq!(map["confidence_score"], 0.7);
    }

    #[test]
    fn test_extract_rejects_non_objects() {
        assert!(extract_json_object("no json here").is_err());
        assert!(extract_json_object("{not valid}").is_err());
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(LLMError::RateLimitExceeded("slow down".to_string())),
            Ok(r#"{"recommendation": "Hold"}"#.to_string()),
        ]));
        let synthesizer = LlmSynthesizer::new(provider.clone(), fast_config());

        let draft = synthesizer.synthesize(&request()).await.unwrap();
        assert_eq!(draft["recommendation"], "Hold");

        let calls = provider.calls.lock().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].response_format, Some(estate_llm::ResponseFormat::JsonObject));
        assert!(calls[0].messages[0].content.contains("Locality: Baner"));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let synthesizer = LlmSynthesizer::new(provider.clone(), fast_config());

        let result = synthesizer.synthesize(&request()).await;
        assert!(matches!(result, Err(AdvisorError::Llm(_))));
        assert_eq!(provider.calls.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_auth_failures() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(LLMError::AuthenticationFailed)]));
        let synthesizer = LlmSynthesizer::new(provider.clone(), fast_config());

        assert!(synthesizer.synthesize(&request()).await.is_err());
        assert_eq!(provider.calls.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_offline_synthesizer_fails() {
        let result = OfflineSynthesizer.synthesize(&request()).await;
        assert!(matches!(result, Err(AdvisorError::SynthesisUnavailable)));
    }

    #[test]
    fn test_from_config_requires_key() {
        let result = LlmSynthesizer::from_config(Arc::new(AdvisorConfig::default()));
        assert!(matches!(result, Err(AdvisorError::SynthesisUnavailable)));
    }
}
