//! Extraction stage: document text → structured summary.
//!
//! One text-only call to the extraction model. The prompt is fixed (see
//! [`crate::prompts::extraction_prompt`]) and the reply is returned exactly
//! as received. Every failure becomes [`RunError::Extraction`]; the upstream
//! cause is logged here and kept as the error's source.

use super::StageOutput;
use crate::config::FacilitatorConfig;
use crate::error::RunError;
use crate::model::{GenerationRequest, GenerativeModel};
use crate::prompts;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Calls the Data Retriever Agent.
#[derive(Clone)]
pub struct ExtractionClient {
    model: Arc<dyn GenerativeModel>,
    model_id: String,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl ExtractionClient {
    pub fn new(model: Arc<dyn GenerativeModel>, config: &FacilitatorConfig) -> Self {
        Self {
            model,
            model_id: config.extraction_model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }

    /// The request sent for `document_text`.
    pub fn request(&self, document_text: &str) -> GenerationRequest {
        GenerationRequest::new(self.model_id.as_str())
            .text(prompts::extraction_prompt(document_text))
            .temperature(self.temperature)
            .max_output_tokens(self.max_output_tokens)
    }

    /// Extract structured data from `document_text`.
    pub async fn extract(&self, document_text: &str) -> Result<StageOutput, RunError> {
        let start = Instant::now();
        info!(
            "Extracting structured data with {} ({} chars of text)",
            self.model_id,
            document_text.len()
        );

        let response = self
            .model
            .generate(&self.request(document_text))
            .await
            .map_err(|cause| {
                error!(backend = self.model.name(), error = %cause, "Error extracting data");
                RunError::Extraction { cause }
            })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            "Extraction: {} input tokens, {} output tokens, {}ms",
            response.input_tokens, response.output_tokens, duration_ms
        );

        Ok(StageOutput {
            text: response.text,
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use crate::model::GenerationResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Echo {
        reply: Result<String, UpstreamError>,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    #[async_trait]
    impl GenerativeModel for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GenerationResponse, UpstreamError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone().map(GenerationResponse::new)
        }
    }

    fn client(reply: Result<String, UpstreamError>) -> (ExtractionClient, Arc<Echo>) {
        let model = Arc::new(Echo {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        let config = FacilitatorConfig::builder()
            .provider(model.clone())
            .extraction_model("extract-model")
            .build()
            .unwrap();
        (ExtractionClient::new(model.clone(), &config), model)
    }

    #[tokio::test]
    async fn returns_text_unmodified() {
        let raw = "  **Patient Information:**\n- Jane Doe\n\n";
        let (c, _) = client(Ok(raw.to_string()));
        assert_eq!(c.extract("Patient: Jane Doe").await.unwrap().text, raw);
    }

    #[tokio::test]
    async fn sends_single_text_part_to_extraction_model() {
        let (c, model) = client(Ok("ok".into()));
        c.extract("Chief complaint: cough").await.unwrap();

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "extract-model");
        assert_eq!(seen[0].attachment_count(), 0);
        assert!(seen[0].joined_text().contains("Chief complaint: cough"));
    }

    #[tokio::test]
    async fn failure_is_generic_extraction_error() {
        let (c, _) = client(Err(UpstreamError::Network("connection reset".into())));
        let err = c.extract("x").await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to process document text."));
        assert_eq!(
            err.cause(),
            Some(&UpstreamError::Network("connection reset".into()))
        );
    }
}
