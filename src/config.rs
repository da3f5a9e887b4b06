//! Configuration for the two-stage pipeline.
//!
//! Everything a run needs (credential, model identifiers, sampling knobs,
//! the simulated-save delay) lives in one [`FacilitatorConfig`],
//! built via [`FacilitatorConfigBuilder`]. The credential is read from the
//! process environment exactly once (in [`FacilitatorConfig::from_env`] or by
//! the CLI) and then *injected* into the model client at construction; no
//! component reads global state afterwards.

use crate::error::FacilitatorError;
use crate::model::GenerativeModel;
use crate::progress::RunObserver;
use std::fmt;
use std::sync::Arc;

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

/// Default model for both stages.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default Gemini REST endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for a facilitator session.
///
/// # Example
/// ```rust
/// use medical_facilitator::FacilitatorConfig;
///
/// let config = FacilitatorConfig::builder()
///     .api_key("test-key")
///     .save_delay_ms(0)
///     .build()
///     .unwrap();
/// assert_eq!(config.extraction_model, "gemini-2.5-flash");
/// ```
#[derive(Clone)]
pub struct FacilitatorConfig {
    /// Static API credential for the Gemini backend.
    pub api_key: Option<String>,

    /// Gemini REST base URL. Overridable for proxies and tests.
    pub base_url: String,

    /// Model used by the extraction stage. Default: `gemini-2.5-flash`.
    pub extraction_model: String,

    /// Model used by the synthesis stage. Must accept image input.
    /// Default: `gemini-2.5-flash`.
    pub synthesis_model: String,

    /// Use an `edgequake_llm` provider (e.g. "openai", "anthropic", "ollama")
    /// instead of the native Gemini client.
    pub provider_name: Option<String>,

    /// Pre-constructed backend. Takes precedence over everything else.
    pub provider: Option<Arc<dyn GenerativeModel>>,

    /// Sampling temperature. `None` keeps the model default.
    pub temperature: Option<f32>,

    /// Output token cap per call. `None` keeps the model default.
    pub max_output_tokens: Option<u32>,

    /// Per-call timeout in seconds. `None` waits indefinitely.
    pub api_timeout_secs: Option<u64>,

    /// Length of the simulated save step in milliseconds. Default: 1500.
    pub save_delay_ms: u64,

    /// Timeout for downloading an image given as a URL. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives status and stage events for every run.
    pub progress_callback: Option<Arc<dyn RunObserver>>,
}

impl Default for FacilitatorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: GEMINI_BASE_URL.to_string(),
            extraction_model: DEFAULT_MODEL.to_string(),
            synthesis_model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            provider: None,
            temperature: None,
            max_output_tokens: None,
            api_timeout_secs: None,
            save_delay_ms: 1500,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for FacilitatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacilitatorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("extraction_model", &self.extraction_model)
            .field("synthesis_model", &self.synthesis_model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("save_delay_ms", &self.save_delay_ms)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl FacilitatorConfig {
    /// Create a new builder for `FacilitatorConfig`.
    pub fn builder() -> FacilitatorConfigBuilder {
        FacilitatorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Default configuration with the API key taken from the environment.
    ///
    /// Fails with [`FacilitatorError::MissingApiKey`] when none of
    /// [`API_KEY_ENV_VARS`] is set.
    pub fn from_env() -> Result<Self, FacilitatorError> {
        let mut builder = Self::builder();
        if let Some(key) = api_key_from_env() {
            builder = builder.api_key(key);
        }
        builder.build()
    }

    /// Whether the native Gemini client will be used.
    pub fn uses_gemini(&self) -> bool {
        self.provider.is_none() && self.provider_name.is_none()
    }
}

/// First non-empty value among [`API_KEY_ENV_VARS`].
pub fn api_key_from_env() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
}

/// Builder for [`FacilitatorConfig`].
pub struct FacilitatorConfigBuilder {
    config: FacilitatorConfig,
}

impl fmt::Debug for FacilitatorConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FacilitatorConfigBuilder")
            .field(&self.config)
            .finish()
    }
}

impl FacilitatorConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use the same model for both stages.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.config.extraction_model = model.clone();
        self.config.synthesis_model = model;
        self
    }

    pub fn extraction_model(mut self, model: impl Into<String>) -> Self {
        self.config.extraction_model = model.into();
        self
    }

    pub fn synthesis_model(mut self, model: impl Into<String>) -> Self {
        self.config.synthesis_model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn GenerativeModel>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = Some(n);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn save_delay_ms(mut self, ms: u64) -> Self {
        self.config.save_delay_ms = ms;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn RunObserver>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// The API key is only required when the native Gemini client will be
    /// used; other providers read their own credentials.
    pub fn build(self) -> Result<FacilitatorConfig, FacilitatorError> {
        let c = &self.config;
        if c.extraction_model.trim().is_empty() || c.synthesis_model.trim().is_empty() {
            return Err(FacilitatorError::InvalidConfig(
                "model identifiers must not be empty".into(),
            ));
        }
        if c.max_output_tokens == Some(0) {
            return Err(FacilitatorError::InvalidConfig(
                "max output tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(FacilitatorError::InvalidConfig(
                "API timeout must be ≥ 1s".into(),
            ));
        }
        if c.uses_gemini() && c.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            return Err(FacilitatorError::MissingApiKey {
                vars: API_KEY_ENV_VARS.join(" or "),
            });
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = FacilitatorConfig::default();
        assert_eq!(c.extraction_model, DEFAULT_MODEL);
        assert_eq!(c.synthesis_model, DEFAULT_MODEL);
        assert_eq!(c.save_delay_ms, 1500);
        assert_eq!(c.temperature, None);
        assert_eq!(c.api_timeout_secs, None);
    }

    #[test]
    fn missing_key_is_fatal_for_gemini() {
        let err = FacilitatorConfig::builder().build().unwrap_err();
        assert!(matches!(err, FacilitatorError::MissingApiKey { .. }));
        assert!(err.to_string().contains("API_KEY"));
    }

    #[test]
    fn blank_key_is_rejected() {
        let err = FacilitatorConfig::builder().api_key("  ").build().unwrap_err();
        assert!(matches!(err, FacilitatorError::MissingApiKey { .. }));
    }

    #[test]
    fn named_provider_does_not_need_key() {
        let c = FacilitatorConfig::builder()
            .provider_name("openai")
            .model("gpt-4.1-mini")
            .build()
            .unwrap();
        assert!(!c.uses_gemini());
        assert_eq!(c.synthesis_model, "gpt-4.1-mini");
    }

    #[test]
    fn temperature_is_clamped() {
        let c = FacilitatorConfig::builder()
            .api_key("k")
            .temperature(9.0)
            .build()
            .unwrap();
        assert_eq!(c.temperature, Some(2.0));
    }

    #[test]
    fn zero_timeout_is_invalid() {
        let err = FacilitatorConfig::builder()
            .api_key("k")
            .api_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, FacilitatorError::InvalidConfig(_)));
    }

    #[test]
    fn debug_redacts_key() {
        let c = FacilitatorConfig::builder().api_key("secret-123").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-123"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let c = FacilitatorConfig::builder()
            .api_key("k")
            .base_url("http://localhost:1234/")
            .build()
            .unwrap();
        assert_eq!(c.base_url, "http://localhost:1234");
    }
}
