//! Backend selection and the `edgequake_llm` adapter.
//!
//! The pipeline talks to a [`GenerativeModel`]. Which one it gets is decided
//! once, when the orchestrator is built:
//!
//! 1. **Pre-built model** (`config.provider`) used as-is. This is how tests
//!    inject a scripted fake and how callers add middleware.
//! 2. **Named provider** (`config.provider_name`) built through
//!    [`ProviderFactory::create_llm_provider`], which reads that provider's
//!    own credential variable (`OPENAI_API_KEY`, …).
//! 3. **Native Gemini** ([`GeminiClient`]) with the injected API key. This is
//!    the default.

use crate::config::{FacilitatorConfig, API_KEY_ENV_VARS};
use crate::error::{FacilitatorError, UpstreamError};
use crate::gemini::GeminiClient;
use crate::model::{ContentPart, GenerationRequest, GenerationResponse, GenerativeModel};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::{debug, info};

/// Wraps an `edgequake_llm` provider as a [`GenerativeModel`].
///
/// The provider is created for one model; the request's `model` field is
/// only used for logging. See [`ModelRouter`] for per-stage models.
pub struct LlmProviderModel {
    provider_name: String,
    inner: Arc<dyn LLMProvider>,
}

impl LlmProviderModel {
    pub fn new(provider_name: impl Into<String>, inner: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider_name: provider_name.into(),
            inner,
        }
    }
}

#[async_trait]
impl GenerativeModel for LlmProviderModel {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, UpstreamError> {
        let images: Vec<ImageData> = request
            .parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::InlineData { mime_type, data } => {
                    Some(ImageData::new(data.clone(), mime_type.as_str()))
                }
                ContentPart::Text(_) => None,
            })
            .collect();

        let text = request.joined_text();
        let messages = vec![ChatMessage::user_with_images(text.as_str(), images)];

        let options = CompletionOptions {
            temperature: request.temperature,
            max_tokens: request.max_output_tokens.map(|n| n as usize),
            ..Default::default()
        };

        debug!(
            provider = %self.provider_name,
            model = %request.model,
            attachments = request.attachment_count(),
            "Sending chat request"
        );

        let response = self
            .inner
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| UpstreamError::Provider(e.to_string()))?;

        if response.content.trim().is_empty() {
            return Err(UpstreamError::EmptyResponse);
        }

        Ok(GenerationResponse {
            text: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

/// Instantiate a named `edgequake_llm` provider for `model`.
fn create_named_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn GenerativeModel>, FacilitatorError> {
    let inner = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        FacilitatorError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok(Arc::new(LlmProviderModel::new(provider_name, inner)))
}

/// Sends each request to the backend built for its `model`.
///
/// `edgequake_llm` providers are bound to one model at creation, so a config
/// with different extraction and synthesis models needs one per stage.
pub struct ModelRouter {
    name: String,
    routes: Vec<(String, Arc<dyn GenerativeModel>)>,
}

impl ModelRouter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            routes: Vec::new(),
        }
    }

    /// Route requests for `model` to `backend`. The first route added wins
    /// on duplicates.
    pub fn route(mut self, model: impl Into<String>, backend: Arc<dyn GenerativeModel>) -> Self {
        self.routes.push((model.into(), backend));
        self
    }
}

#[async_trait]
impl GenerativeModel for ModelRouter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, UpstreamError> {
        let (_, backend) = self
            .routes
            .iter()
            .find(|(model, _)| *model == request.model)
            .ok_or_else(|| {
                UpstreamError::Provider(format!("no backend for model '{}'", request.model))
            })?;
        backend.generate(request).await
    }
}

/// Pick the backend for `config`, from most specific to least specific.
pub fn resolve_model(config: &FacilitatorConfig) -> Result<Arc<dyn GenerativeModel>, FacilitatorError> {
    if let Some(ref model) = config.provider {
        debug!("Using injected model backend '{}'", model.name());
        return Ok(Arc::clone(model));
    }

    if let Some(ref name) = config.provider_name {
        if config.extraction_model == config.synthesis_model {
            info!("Using provider '{}' with model '{}'", name, config.synthesis_model);
            return create_named_provider(name, &config.synthesis_model);
        }
        info!(
            "Using provider '{}' with models '{}' (extraction) and '{}' (synthesis)",
            name, config.extraction_model, config.synthesis_model
        );
        let router = ModelRouter::new(name.as_str())
            .route(
                config.extraction_model.as_str(),
                create_named_provider(name, &config.extraction_model)?,
            )
            .route(
                config.synthesis_model.as_str(),
                create_named_provider(name, &config.synthesis_model)?,
            );
        return Ok(Arc::new(router));
    }

    let api_key = config
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| FacilitatorError::MissingApiKey {
            vars: API_KEY_ENV_VARS.join(" or "),
        })?;

    let client = GeminiClient::new(api_key, config.base_url.as_str(), config.api_timeout_secs)
        .map_err(|e| FacilitatorError::ProviderNotConfigured {
            provider: "gemini".to_string(),
            hint: e.to_string(),
        })?;
    Ok(Arc::new(client))
}
