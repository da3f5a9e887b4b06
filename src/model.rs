//! The seam between the pipeline and a remote generative model.
//!
//! Both stages speak one request shape (a model identifier plus an ordered
//! list of content parts: text, optionally an inline base64 attachment) and
//! expect one response shape: the generated text. Anything that can answer
//! such a request implements [`GenerativeModel`]: the native Gemini client,
//! the `edgequake_llm` adapter, or a scripted fake in tests.

use crate::error::UpstreamError;
use crate::pipeline::encode::EncodedFile;
use async_trait::async_trait;
use serde::Serialize;

/// One piece of a multi-part request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ContentPart {
    /// Plain prompt text.
    Text(String),
    /// Binary attachment already encoded as base64.
    InlineData { mime_type: String, data: String },
}

impl ContentPart {
    /// Wrap an [`EncodedFile`] as an inline attachment.
    pub fn inline(file: &EncodedFile) -> Self {
        ContentPart::InlineData {
            mime_type: file.mime_type.clone(),
            data: file.payload.clone(),
        }
    }

    /// The text of a `Text` part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(t) => Some(t),
            ContentPart::InlineData { .. } => None,
        }
    }
}

/// A single generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    /// Model identifier, e.g. `gemini-2.5-flash`.
    pub model: String,
    /// Parts in the order they are sent.
    pub parts: Vec<ContentPart>,
    /// Sampling temperature. `None` leaves the provider default.
    pub temperature: Option<f32>,
    /// Output token cap. `None` leaves the provider default.
    pub max_output_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            parts: Vec::new(),
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(ContentPart::Text(text.into()));
        self
    }

    pub fn inline(mut self, file: &EncodedFile) -> Self {
        self.parts.push(ContentPart::inline(file));
        self
    }

    pub fn temperature(mut self, t: Option<f32>) -> Self {
        self.temperature = t;
        self
    }

    pub fn max_output_tokens(mut self, n: Option<u32>) -> Self {
        self.max_output_tokens = n;
        self
    }

    /// All text parts joined with blank lines.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Number of inline attachments.
    pub fn attachment_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, ContentPart::InlineData { .. }))
            .count()
    }
}

/// What a model sends back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResponse {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl GenerationResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A remote (or fake) text/vision generation backend.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Short backend name for logs, e.g. `"gemini"`.
    fn name(&self) -> &str;

    /// Run one generation call.
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GenerationResponse, UpstreamError>;
}
