//! Configuration for the analysis pipeline
//!
//! Built once at process start and shared by `Arc` with the orchestrator and
//! the collaborators. Nothing in the pipeline reads ambient global state.

use crate::error::{AdvisorError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the analysis pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Chat model (deployment name on Azure)
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Completion token budget
    pub max_tokens: usize,

    /// LLM API key; synthesis is unavailable without one
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// OpenAI base URL or Azure resource endpoint
    pub api_base: Option<String>,

    /// Azure API version; selects the Azure dialect when set
    pub azure_api_version: Option<String>,

    /// LLM request timeout
    pub request_timeout: Duration,

    /// Attempts per completion call
    pub max_retries: u32,

    /// Initial backoff between completion attempts
    pub retry_backoff_base: Duration,

    /// Upper bound for a single backoff
    pub retry_backoff_max: Duration,

    /// Hits per city-scoped market query
    pub market_top_k: usize,

    /// Hits per free-text context query
    pub context_top_k: usize,

    /// Hits per regulatory query
    pub regulatory_top_k: usize,

    /// Cap on market documents after merging both market queries
    pub market_document_cap: usize,

    /// Corpus category searched by the regulatory query
    pub regulatory_category: String,

    /// Documents carried in the transport response
    pub response_document_limit: usize,

    /// Run market intelligence and risk assessment concurrently
    pub parallel_stages: bool,

    /// Version tag stamped onto valuations
    pub model_version: String,

    /// JSON corpus backing the keyword index
    pub documents_path: PathBuf,

    /// Output directory for rendered reports
    pub reports_dir: PathBuf,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            api_key: None,
            api_base: None,
            azure_api_version: None,
            request_timeout: Duration::from_secs(120),
            max_retries: 3,
            retry_backoff_base: Duration::from_secs(2),
            retry_backoff_max: Duration::from_secs(10),
            market_top_k: 3,
            context_top_k: 3,
            regulatory_top_k: 3,
            market_document_cap: 5,
            regulatory_category: "rera_compliance".to_string(),
            response_document_limit: 5,
            parallel_stages: true,
            model_version: "1.0.0".to_string(),
            documents_path: PathBuf::from("data/documents.json"),
            reports_dir: PathBuf::from("reports"),
        }
    }
}

impl AdvisorConfig {
    /// Create a new configuration builder
    pub fn builder() -> AdvisorConfigBuilder {
        AdvisorConfigBuilder::default()
    }

    /// Defaults overridden by environment variables, validated
    ///
    /// Reads `OPENAI_API_KEY`, `OPENAI_ENDPOINT`, `OPENAI_API_VERSION`,
    /// `LLM_MODEL`, `OPENAI_TEMPERATURE`, `OPENAI_MAX_TOKENS`,
    /// `DOCUMENTS_PATH` and `REPORTS_DIR`.
    pub fn from_env() -> Result<Self> {
        Self::builder().with_env().build()
    }

    /// Whether an LLM key is configured
    pub fn has_llm_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AdvisorError::Config(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }

        if self.max_tokens == 0 {
            return Err(AdvisorError::Config("max_tokens must be greater than 0".to_string()));
        }

        if self.max_retries == 0 {
            return Err(AdvisorError::Config("max_retries must be greater than 0".to_string()));
        }

        for (name, value) in [
            ("market_top_k", self.market_top_k),
            ("context_top_k", self.context_top_k),
            ("regulatory_top_k", self.regulatory_top_k),
            ("market_document_cap", self.market_document_cap),
            ("response_document_limit", self.response_document_limit),
        ] {
            if value == 0 {
                return Err(AdvisorError::Config(format!("{name} must be greater than 0")));
            }
        }

        if self.regulatory_category.trim().is_empty() {
            return Err(AdvisorError::Config("regulatory_category must not be empty".to_string()));
        }

        Ok(())
    }

    /// Get retry backoff duration for attempt number, capped at `retry_backoff_max`
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff_base
            .saturating_mul(2_u32.saturating_pow(attempt))
            .min(self.retry_backoff_max)
    }
}

/// Builder for AdvisorConfig
#[derive(Debug, Default)]
pub struct AdvisorConfigBuilder {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
    api_key: Option<String>,
    api_base: Option<String>,
    azure_api_version: Option<String>,
    request_timeout: Option<Duration>,
    max_retries: Option<u32>,
    retry_backoff_base: Option<Duration>,
    market_top_k: Option<usize>,
    context_top_k: Option<usize>,
    regulatory_top_k: Option<usize>,
    market_document_cap: Option<usize>,
    response_document_limit: Option<usize>,
    parallel_stages: Option<bool>,
    model_version: Option<String>,
    documents_path: Option<PathBuf>,
    reports_dir: Option<PathBuf>,
    env_error: Option<AdvisorError>,
}

impl AdvisorConfigBuilder {
    /// Set the chat model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the completion token budget
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the LLM API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the OpenAI base URL or Azure endpoint
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Use Azure OpenAI with the given API version
    pub fn azure_api_version(mut self, version: impl Into<String>) -> Self {
        self.azure_api_version = Some(version.into());
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set maximum completion attempts
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set retry backoff base duration
    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    /// Set hits per market query
    pub fn market_top_k(mut self, k: usize) -> Self {
        self.market_top_k = Some(k);
        self
    }

    /// Set hits per context query
    pub fn context_top_k(mut self, k: usize) -> Self {
        self.context_top_k = Some(k);
        self
    }

    /// Set hits per regulatory query
    pub fn regulatory_top_k(mut self, k: usize) -> Self {
        self.regulatory_top_k = Some(k);
        self
    }

    /// Set the merged market document cap
    pub fn market_document_cap(mut self, cap: usize) -> Self {
        self.market_document_cap = Some(cap);
        self
    }

    /// Set the number of documents carried in responses
    pub fn response_document_limit(mut self, limit: usize) -> Self {
        self.response_document_limit = Some(limit);
        self
    }

    /// Run stages 2 and 3 concurrently or sequentially
    pub fn parallel_stages(mut self, parallel: bool) -> Self {
        self.parallel_stages = Some(parallel);
        self
    }

    /// Set the valuation model version tag
    pub fn model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = Some(version.into());
        self
    }

    /// Set the corpus path
    pub fn documents_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.documents_path = Some(path.into());
        self
    }

    /// Set the report output directory
    pub fn reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = Some(dir.into());
        self
    }

    /// Override unset fields from environment variables
    ///
    /// Unparseable numeric values are reported by [`build`](Self::build).
    pub fn with_env(mut self) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(key) = var("OPENAI_API_KEY") {
            self.api_key.get_or_insert(key);
        }
        if let Some(endpoint) = var("OPENAI_ENDPOINT") {
            self.api_base.get_or_insert(endpoint);
        }
        if let Some(version) = var("OPENAI_API_VERSION") {
            self.azure_api_version.get_or_insert(version);
        }
        if let Some(model) = var("LLM_MODEL") {
            self.model.get_or_insert(model);
        }
        if let Some(path) = var("DOCUMENTS_PATH") {
            self.documents_path.get_or_insert(PathBuf::from(path));
        }
        if let Some(dir) = var("REPORTS_DIR") {
            self.reports_dir.get_or_insert(PathBuf::from(dir));
        }

        match var("OPENAI_TEMPERATURE").map(|v| parse_env::<f32>("OPENAI_TEMPERATURE", &v)) {
            Some(Ok(t)) => {
                self.temperature.get_or_insert(t);
            }
            Some(Err(e)) => self.env_error = Some(e),
            None => {}
        }
        match var("OPENAI_MAX_TOKENS").map(|v| parse_env::<usize>("OPENAI_MAX_TOKENS", &v)) {
            Some(Ok(n)) => {
                self.max_tokens.get_or_insert(n);
            }
            Some(Err(e)) => self.env_error = Some(e),
            None => {}
        }

        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AdvisorConfig> {
        if let Some(err) = self.env_error {
            return Err(err);
        }

        let defaults = AdvisorConfig::default();

        let config = AdvisorConfig {
            model: self.model.unwrap_or(defaults.model),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            api_key: self.api_key,
            api_base: self.api_base,
            azure_api_version: self.azure_api_version,
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
            retry_backoff_max: defaults.retry_backoff_max,
            market_top_k: self.market_top_k.unwrap_or(defaults.market_top_k),
            context_top_k: self.context_top_k.unwrap_or(defaults.context_top_k),
            regulatory_top_k: self.regulatory_top_k.unwrap_or(defaults.regulatory_top_k),
            market_document_cap: self.market_document_cap.unwrap_or(defaults.market_document_cap),
            regulatory_category: defaults.regulatory_category,
            response_document_limit: self
                .response_document_limit
                .unwrap_or(defaults.response_document_limit),
            parallel_stages: self.parallel_stages.unwrap_or(defaults.parallel_stages),
            model_version: self.model_version.unwrap_or(defaults.model_version),
            documents_path: self.documents_path.unwrap_or(defaults.documents_path),
            reports_dir: self.reports_dir.unwrap_or(defaults.reports_dir),
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AdvisorError::Config(format!("{name} has an invalid value: '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AdvisorConfig::default();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.market_document_cap, 5);
        assert_eq!(config.regulatory_category, "rera_compliance");
        assert!(!config.has_llm_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = AdvisorConfig::builder()
            .model("gpt-4o-mini")
            .max_retries(5)
            .parallel_stages(false)
            .api_key("sk-test")
            .build()
            .unwrap();

        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_retries, 5);
        assert!(!config.parallel_stages);
        assert!(config.has_llm_credentials());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(AdvisorConfig::builder().temperature(2.5).build().is_err());
        assert!(AdvisorConfig::builder().max_retries(0).build().is_err());
        assert!(AdvisorConfig::builder().market_top_k(0).build().is_err());
        assert!(AdvisorConfig::builder().max_tokens(0).build().is_err());
    }

    #[test]
    fn test_retry_backoff_is_capped() {
        let config = AdvisorConfig::default();
        assert_eq!(config.retry_backoff(0), Duration::from_secs(2));
        assert_eq!(config.retry_backoff(1), Duration::from_secs(4));
        assert_eq!(config.retry_backoff(2), Duration::from_secs(8));
        assert_eq!(config.retry_backoff(3), Duration::from_secs(10));
        assert_eq!(config.retry_backoff(40), Duration::from_secs(10));
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = AdvisorConfig::builder().api_key("sk-secret").build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn test_parse_env_reports_name() {
        let err = parse_env::<f32>("OPENAI_TEMPERATURE", "warm").unwrap_err();
        assert!(err.to_string().contains("OPENAI_TEMPERATURE"));
    }
}
