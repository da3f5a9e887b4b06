//! The run state machine.
//!
//! ```text
//! Idle ──guard──► RetrievingData ──ok──► GeneratingReport ──ok──► SavingReport ──delay──► Done
//!                      │ err                   │ err
//!                      ▼                       ▼
//!                    Idle                    Idle
//! ```
//!
//! The guard (image present, document text non-empty) is checked when a
//! [`RunRequest`] is built, so [`Orchestrator::run`] only ever sees valid
//! input. Events reach the caller's [`RunObserver`] and, when configured,
//! [`FacilitatorConfig::progress_callback`] in the same order.

use crate::config::FacilitatorConfig;
use crate::error::{FacilitatorError, RunError};
use crate::model::GenerativeModel;
use crate::output::{RunOutput, RunStats};
use crate::pipeline::encode::EncodedFile;
use crate::pipeline::extract::ExtractionClient;
use crate::pipeline::sections::find_sections;
use crate::pipeline::synthesize::SynthesisClient;
use crate::progress::{RunObserver, Tee};
use crate::provider::resolve_model;
use crate::status::AgentStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Validated inputs for one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    image: Arc<EncodedFile>,
    document_text: String,
}

impl RunRequest {
    /// Fails with [`FacilitatorError::MissingInput`] unless an image is given
    /// and `document_text` is non-empty.
    pub fn new(
        image: Option<impl Into<Arc<EncodedFile>>>,
        document_text: impl Into<String>,
    ) -> Result<Self, FacilitatorError> {
        let document_text = document_text.into();
        match image {
            Some(image) if !document_text.is_empty() => Ok(Self {
                image: image.into(),
                document_text,
            }),
            _ => Err(FacilitatorError::MissingInput),
        }
    }

    pub fn image(&self) -> &EncodedFile {
        &self.image
    }

    pub fn document_text(&self) -> &str {
        &self.document_text
    }
}

/// Runs the two stages in sequence.
#[derive(Clone)]
pub struct Orchestrator {
    extraction: ExtractionClient,
    synthesis: SynthesisClient,
    save_delay: Duration,
    progress: Option<Arc<dyn RunObserver>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("save_delay", &self.save_delay)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Build with the backend selected by `config` (see [`resolve_model`]).
    pub fn new(config: &FacilitatorConfig) -> Result<Self, FacilitatorError> {
        let model = resolve_model(config)?;
        Ok(Self::with_model(model, config))
    }

    /// Build around an explicit backend; `config.provider` is ignored.
    pub fn with_model(model: Arc<dyn GenerativeModel>, config: &FacilitatorConfig) -> Self {
        Self {
            extraction: ExtractionClient::new(Arc::clone(&model), config),
            synthesis: SynthesisClient::new(model, config),
            save_delay: Duration::from_millis(config.save_delay_ms),
            progress: config.progress_callback.clone(),
        }
    }

    /// Execute one run to `Done` or to the first failure.
    ///
    /// On failure `on_run_failed` is called and no further status follows;
    /// the caller's view returns to `Idle`. Dropping the future cancels the
    /// run at its next await point without emitting anything more.
    pub async fn run(
        &self,
        request: &RunRequest,
        observer: &dyn RunObserver,
    ) -> Result<RunOutput, RunError> {
        let events = Tee {
            first: observer,
            second: self.progress.as_deref(),
        };

        let result = self.run_stages(request, &events).await;
        match &result {
            Ok(output) => {
                info!(
                    "Run complete: {} report sections, {} in / {} out tokens, {}ms",
                    output.report_sections.len(),
                    output.stats.input_tokens,
                    output.stats.output_tokens,
                    output.stats.total_ms
                );
                events.on_run_complete(output);
            }
            Err(e) => {
                warn!("Run failed: {}", e);
                events.on_run_failed(e);
            }
        }
        result
    }

    async fn run_stages(
        &self,
        request: &RunRequest,
        events: &dyn RunObserver,
    ) -> Result<RunOutput, RunError> {
        let start = Instant::now();

        // ── Stage 1: extraction ──────────────────────────────────────────
        events.on_status(AgentStatus::RetrievingData);
        let extracted = self.extraction.extract(request.document_text()).await?;
        events.on_structured_data(&extracted.text);

        // ── Stage 2: synthesis ───────────────────────────────────────────
        events.on_status(AgentStatus::GeneratingReport);
        let report = self
            .synthesis
            .synthesize(&extracted.text, request.image())
            .await?;
        events.on_final_report(&report.text);

        // ── Stage 3: simulated save ──────────────────────────────────────
        events.on_status(AgentStatus::SavingReport);
        debug!("Saving report ({}ms)", self.save_delay.as_millis());
        tokio::time::sleep(self.save_delay).await;
        events.on_status(AgentStatus::Done);

        let stats = RunStats {
            input_tokens: extracted.input_tokens + report.input_tokens,
            output_tokens: extracted.output_tokens + report.output_tokens,
            extraction_ms: extracted.duration_ms,
            synthesis_ms: report.duration_ms,
            total_ms: start.elapsed().as_millis() as u64,
        };

        Ok(RunOutput {
            extracted_sections: find_sections(&extracted.text),
            report_sections: find_sections(&report.text),
            structured_data: extracted.text,
            final_report: report.text,
            stats,
        })
    }
}
