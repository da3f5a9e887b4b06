//! Internal pipeline stages.
//!
//! ```text
//! inputs ─ input ─► encode ─► EncodedFile ───────────┐
//!                                                    ▼
//! document text ─► extract ─► StructuredData ─► synthesize ─► FinalReport
//! ```
//!
//! `sections` only inspects model output; nothing here rewrites it.

pub mod encode;
pub mod extract;
pub mod input;
pub mod sections;
pub mod synthesize;

/// What one model-backed stage produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutput {
    /// Model text, unmodified.
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
}
