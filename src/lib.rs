//! # medical-facilitator
//!
//! Turn a medical document and an X-ray image into an integrated report with
//! two calls to a multimodal model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document text ──┐
//!                 ├─ 1. Extract     Data Retriever Agent → structured summary (text only)
//! X-ray image ────┤
//!                 ├─ 2. Synthesize  Medical Facilitator Agent → final report (summary + image)
//!                 └─ 3. Save        simulated delay, then Done
//! ```
//!
//! A run moves through `Idle → RetrievingData → GeneratingReport →
//! SavingReport → Done` and falls back to `Idle` with an error message on
//! any failure. Model output is never rewritten.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medical_facilitator::{DocumentSource, FacilitatorConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key from API_KEY or GEMINI_API_KEY
//!     let config = FacilitatorConfig::from_env()?;
//!     let mut session = Session::new(&config)?;
//!     session.select_image("chest-xray.jpg").await?;
//!     session.set_document_text(DocumentSource::from_arg("notes.txt").load().await?);
//!
//!     let output = session.start_run()?.wait().await?;
//!     println!("{}", output.final_report);
//!     session.export_report(".").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Backends
//!
//! The native Gemini client is the default. Any `edgequake_llm` provider with
//! vision support can be used instead via
//! [`FacilitatorConfigBuilder::provider_name`], and tests inject their own
//! [`GenerativeModel`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `medfac` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod facilitate;
pub mod gemini;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod session;
pub mod status;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FacilitatorConfig, FacilitatorConfigBuilder};
pub use error::{FacilitatorError, RunError, UpstreamError};
pub use export::{write_report, REPORT_CONTENT_TYPE, REPORT_FILE_NAME};
pub use facilitate::{generate_report, generate_report_sync, generate_report_to_file};
pub use gemini::GeminiClient;
pub use model::{ContentPart, GenerationRequest, GenerationResponse, GenerativeModel};
pub use orchestrator::{Orchestrator, RunRequest};
pub use output::{RunOutput, RunStats};
pub use pipeline::encode::{encode_bytes, encode_file, EncodedFile};
pub use pipeline::input::DocumentSource;
pub use progress::{NoopObserver, ProgressCallback, RunObserver};
pub use session::{RunHandle, Session, SessionSnapshot};
pub use status::{AgentStatus, RunState};
