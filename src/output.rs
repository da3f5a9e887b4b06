//! Result types for a completed run.

use serde::{Deserialize, Serialize};

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutput {
    /// Extraction-stage text, exactly as returned by the model.
    pub structured_data: String,
    /// Synthesis-stage text, exactly as returned by the model.
    pub final_report: String,
    /// Section titles found in `structured_data`.
    pub extracted_sections: Vec<String>,
    /// Section titles found in `final_report`.
    pub report_sections: Vec<String>,
    pub stats: RunStats,
}

/// Token and timing totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub extraction_ms: u64,
    pub synthesis_ms: u64,
    /// Wall-clock time including the save delay.
    pub total_ms: u64,
}
