//! Synthesis stage: structured summary + image → final report.
//!
//! The request has two parts in a fixed order: the instruction text with the
//! structured data embedded, then the image as inline base64.

use super::StageOutput;
use crate::config::FacilitatorConfig;
use crate::error::RunError;
use crate::model::{GenerationRequest, GenerativeModel};
use crate::pipeline::encode::EncodedFile;
use crate::prompts;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Calls the Medical Facilitator Agent.
#[derive(Clone)]
pub struct SynthesisClient {
    model: Arc<dyn GenerativeModel>,
    model_id: String,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl SynthesisClient {
    pub fn new(model: Arc<dyn GenerativeModel>, config: &FacilitatorConfig) -> Self {
        Self {
            model,
            model_id: config.synthesis_model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }

    pub fn request(&self, structured_data: &str, image: &EncodedFile) -> GenerationRequest {
        GenerationRequest::new(self.model_id.as_str())
            .text(prompts::synthesis_prompt(structured_data))
            .inline(image)
            .temperature(self.temperature)
            .max_output_tokens(self.max_output_tokens)
    }

    /// Generate the final report. Content-policy refusals surface as the
    /// same [`RunError::Synthesis`] as any other failure.
    pub async fn synthesize(
        &self,
        structured_data: &str,
        image: &EncodedFile,
    ) -> Result<StageOutput, RunError> {
        let start = Instant::now();
        info!(
            "Generating final report with {} (image '{}', {})",
            self.model_id, image.name, image.mime_type
        );

        let response = self
            .model
            .generate(&self.request(structured_data, image))
            .await
            .map_err(|cause| {
                error!(backend = self.model.name(), error = %cause, "Error generating final report");
                RunError::Synthesis { cause }
            })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            "Synthesis: {} input tokens, {} output tokens, {}ms",
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
