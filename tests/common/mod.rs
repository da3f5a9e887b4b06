//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use medical_facilitator::{
    encode_bytes, AgentStatus, EncodedFile, FacilitatorConfig, GenerationRequest,
    GenerationResponse, GenerativeModel, RunError, RunObserver, RunOutput, UpstreamError,
};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// What the scripted model does on its next call.
pub enum Step {
    Reply(String),
    Fail(UpstreamError),
    /// Never answer (for cancellation tests).
    Hang,
}

/// A `GenerativeModel` that plays back a script and records every request.
#[derive(Default)]
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, UpstreamError> {
        self.requests.lock().unwrap().push(request.clone());
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(text)) => Ok(GenerationResponse {
                text,
                input_tokens: 100,
                output_tokens: 40,
            }),
            Some(Step::Fail(e)) => Err(e),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(UpstreamError::EmptyResponse),
        }
    }
}

/// Records every observer event as a short string.
#[derive(Default)]
pub struct EventLog(Mutex<Vec<String>>);

impl EventLog {
    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<AgentStatus> {
        self.events()
            .iter()
            .filter_map(|e| match e.as_str() {
                "RetrievingData" => Some(AgentStatus::RetrievingData),
                "GeneratingReport" => Some(AgentStatus::GeneratingReport),
                "SavingReport" => Some(AgentStatus::SavingReport),
                "Done" => Some(AgentStatus::Done),
                _ => None,
            })
            .collect()
    }
}

impl RunObserver for EventLog {
    fn on_status(&self, status: AgentStatus) {
        self.0.lock().unwrap().push(format!("{status:?}"));
    }
    fn on_structured_data(&self, _structured: &str) {
        self.0.lock().unwrap().push("structured_data".into());
    }
    fn on_final_report(&self, _report: &str) {
        self.0.lock().unwrap().push("final_report".into());
    }
    fn on_run_failed(&self, _error: &RunError) {
        self.0.lock().unwrap().push("failed".into());
    }
    fn on_run_complete(&self, _output: &RunOutput) {
        self.0.lock().unwrap().push("complete".into());
    }
}

/// Route library logs through the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Config wired to `model` and `log`, with no save delay.
pub fn config(model: Arc<ScriptedModel>, log: Arc<EventLog>) -> FacilitatorConfig {
    init_tracing();
    FacilitatorConfig::builder()
        .provider(model)
        .progress_callback(log)
        .save_delay_ms(0)
        .build()
        .expect("valid test config")
}

pub fn image_bytes(format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([120, 120, 120])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)
        .expect("encode test image");
    buf
}

pub fn jpeg() -> EncodedFile {
    encode_bytes("chest-xray.jpg", &image_bytes(ImageFormat::Jpeg)).expect("valid jpeg")
}

pub const JANE_DOE: &str = "Patient: Jane Doe, Age 45, Chief complaint: cough";

pub const STRUCTURED: &str = "### Patient Information\n- Name: Jane Doe\n- Age: 45\n\n\
### Chief Complaint / Reason for Visit\n- Cough\n";

pub const REPORT: &str = "## Final Integrated Report\n\n### Patient Summary\n45-year-old \
female presenting with cough.\n\n### Imaging Analysis\nNo acute findings.\n";
