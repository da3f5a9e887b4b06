//! One-shot entry points.
//!
//! For callers that have both inputs up front and just want the report,
//! without managing a [`crate::session::Session`]. Each call builds its own
//! orchestrator, runs once, and returns.

use crate::config::FacilitatorConfig;
use crate::error::FacilitatorError;
use crate::export;
use crate::orchestrator::{Orchestrator, RunRequest};
use crate::output::RunOutput;
use crate::pipeline::input::{self, DocumentSource};
use crate::progress::NoopObserver;
use std::path::{Path, PathBuf};
use tracing::info;

/// Generate a report from an image (path or URL) and a document.
///
/// # Errors
/// Input errors (missing/invalid image, unreadable document, empty text)
/// and backend setup errors are returned before any model call. A failed
/// stage is returned as [`FacilitatorError::Run`].
///
/// # Example
/// ```rust,no_run
/// use medical_facilitator::{generate_report, DocumentSource, FacilitatorConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = FacilitatorConfig::from_env()?;
/// let doc = DocumentSource::Inline("Patient: Jane Doe, Age 45, Chief complaint: cough".into());
/// let output = generate_report("chest-xray.jpg", &doc, &config).await?;
/// println!("{}", output.final_report);
/// # Ok(())
/// # }
/// ```
pub async fn generate_report(
    image: impl AsRef<str>,
    document: &DocumentSource,
    config: &FacilitatorConfig,
) -> Result<RunOutput, FacilitatorError> {
    let image = image.as_ref();
    info!("Generating report for {}", image);

    let file = input::resolve_image(image, config.download_timeout_secs).await?;
    let text = document.load().await?;
    let request = RunRequest::new(Some(file), text)?;

    let orchestrator = Orchestrator::new(config)?;
    Ok(orchestrator.run(&request, &NoopObserver).await?)
}

/// Generate a report and write it to `output_path` (a file or directory).
///
/// Returns the path written and the run output.
pub async fn generate_report_to_file(
    image: impl AsRef<str>,
    document: &DocumentSource,
    output_path: impl AsRef<Path>,
    config: &FacilitatorConfig,
) -> Result<(PathBuf, RunOutput), FacilitatorError> {
    let output = generate_report(image, document, config).await?;
    let path = export::write_report(output_path, &output.final_report).await?;
    Ok((path, output))
}

/// Synchronous wrapper around [`generate_report`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_report_sync(
    image: impl AsRef<str>,
    document: &DocumentSource,
    config: &FacilitatorConfig,
) -> Result<RunOutput, FacilitatorError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| FacilitatorError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(generate_report(image, document, config))
}
