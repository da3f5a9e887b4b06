//! Error types for the medical-facilitator library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`FacilitatorError`] — **Fatal / pre-run**: something outside a run went
//!   wrong (no API key at startup, unreadable image, missing input, export
//!   write failure). Returned directly from constructors and session methods.
//!
//! * [`RunError`] — **Run-terminating**: a run started but did not reach
//!   `Done`. Its `Display` output is the flat, user-facing message shown by
//!   the front end; nothing more.
//!
//! * [`UpstreamError`] — **Cause**: the structured reason a remote model call
//!   failed (rate limit, content block, auth, network …). It is attached to a
//!   [`RunError`] as its `source()` and logged, but never part of the
//!   user-visible message.

use std::path::PathBuf;
use thiserror::Error;

/// Message shown when a run is started without both inputs.
pub const MISSING_INPUT_MESSAGE: &str =
    "Please upload an X-ray image and provide the document text.";

/// All non-run errors returned by the medical-facilitator library.
#[derive(Debug, Error)]
pub enum FacilitatorError {
    // ── Startup errors ────────────────────────────────────────────────────
    /// No API credential was found in the process configuration.
    #[error("API key not set.\nExport {vars} or pass --api-key.")]
    MissingApiKey { vars: String },

    /// A non-default provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Reading the file failed for another reason.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The selected file is zero bytes long.
    #[error("File '{name}' is empty")]
    EmptyFile { name: String },

    /// The file is not a PNG, JPEG or WEBP image.
    #[error("'{name}' is not a supported image ({detected}). Use PNG, JPG, or WEBP.")]
    UnsupportedImage { name: String, detected: String },

    /// Magic bytes matched but the image data does not decode.
    #[error("Image '{name}' is corrupt: {detail}")]
    CorruptImage { name: String, detail: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// Either the image or the document text is missing at run start.
    #[error("{}", MISSING_INPUT_MESSAGE)]
    MissingInput,

    // ── Output errors ─────────────────────────────────────────────────────
    /// Export requested before any report was generated.
    #[error("No final report to export yet")]
    NoReport,

    /// Could not create or write the exported report.
    #[error("Failed to write report '{path}': {source}")]
    ExportFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Wrapped ───────────────────────────────────────────────────────────
    /// A run started by a one-shot entry point failed.
    #[error(transparent)]
    Run(#[from] RunError),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a run stopped before reaching `Done`.
///
/// `Display` is deliberately generic; use [`RunError::cause`] (or
/// `std::error::Error::source`) to inspect what actually happened.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    /// The extraction stage failed.
    #[error("Failed to process document text. Please check the logs for details.")]
    Extraction {
        #[source]
        cause: UpstreamError,
    },

    /// The synthesis stage failed (including content-policy refusals).
    #[error(
        "Failed to generate the final report. The model may have refused the content. \
Please check the logs for details."
    )]
    Synthesis {
        #[source]
        cause: UpstreamError,
    },

    /// A newer run was started and this one was cancelled.
    #[error("Run was superseded by a newer run")]
    Superseded,

    /// The run task ended abnormally (panic inside a model implementation).
    #[error("Run aborted unexpectedly: {0}")]
    Aborted(String),
}

impl RunError {
    /// The upstream failure behind a stage error, if any.
    pub fn cause(&self) -> Option<&UpstreamError> {
        match self {
            RunError::Extraction { cause } | RunError::Synthesis { cause } => Some(cause),
            RunError::Superseded | RunError::Aborted(_) => None,
        }
    }
}

/// Structured reason a remote model call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// HTTP 429 / RESOURCE_EXHAUSTED.
    #[error("rate limited by provider{}: {detail}", retry_hint(.retry_after_secs))]
    RateLimited {
        retry_after_secs: Option<u64>,
        detail: String,
    },

    /// The model refused the prompt or its output was filtered.
    #[error("content blocked by provider: {reason}")]
    ContentBlocked { reason: String },

    /// HTTP 401 / 403.
    #[error("authentication failed ({status}): {detail}")]
    Auth { status: u16, detail: String },

    /// The configured per-call timeout elapsed.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Connection-level failure before any HTTP status was received.
    #[error("network error: {0}")]
    Network(String),

    /// Any other non-success HTTP status.
    #[error("API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    /// The response parsed but carried no text.
    #[error("model returned no text")]
    EmptyResponse,

    /// The response body was not the expected JSON shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Error reported by an `edgequake_llm` provider.
    #[error("provider error: {0}")]
    Provider(String),
}

fn retry_hint(secs: &Option<u64>) -> String {
    secs.map(|s| format!(" (retry after {s}s)")).unwrap_or_default()
}
