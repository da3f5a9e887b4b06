//! Native client for the Google Generative Language API.
//!
//! One endpoint is used: `POST {base}/models/{model}:generateContent`. The
//! API key travels in the `x-goog-api-key` header and is injected at
//! construction; this module never reads the environment.
//!
//! ## Error mapping
//!
//! | Upstream signal                              | [`UpstreamError`]  |
//! |----------------------------------------------|--------------------|
//! | HTTP 429 (or 402)                            | `RateLimited`      |
//! | HTTP 401 / 403                               | `Auth`             |
//! | other non-2xx                                | `Api`              |
//! | `promptFeedback.blockReason`                 | `ContentBlocked`   |
//! | no text + safety-type `finishReason`         | `ContentBlocked`   |
//! | no text otherwise                            | `EmptyResponse`    |
//! | transport timeout                            | `Timeout`          |
//! | other transport failure                      | `Network`          |

use crate::error::UpstreamError;
use crate::model::{ContentPart, GenerationRequest, GenerationResponse, GenerativeModel};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Finish reasons that mean the output was withheld by a policy filter.
const BLOCKING_FINISH_REASONS: [&str; 6] = [
    "SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "RECITATION",
    "IMAGE_SAFETY",
];

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    timeout_secs: Option<u64>,
    client: Client,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client for `base_url` authenticated with `api_key`.
    ///
    /// `timeout_secs = None` means calls are never cut short.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, UpstreamError> {
        let mut builder = Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| UpstreamError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs,
            client,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn map_transport_error(&self, e: &reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout {
                secs: self.timeout_secs.unwrap_or_default(),
            }
        } else {
            UpstreamError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, UpstreamError> {
        let body = GeminiRequest::from(request);
        debug!(
            model = %request.model,
            parts = request.parts.len(),
            attachments = request.attachment_count(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to Gemini API");
                self.map_transport_error(&e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %detail, "Gemini API returned error status");
            return Err(classify_status(status, retry_after_secs, detail));
        }

        let parsed: GeminiResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Gemini API response");
            if e.is_timeout() {
                self.map_transport_error(&e)
            } else {
                UpstreamError::Malformed(e.to_string())
            }
        })?;

        parsed.into_generation()
    }
}

/// Map a non-success HTTP status onto an [`UpstreamError`].
fn classify_status(status: StatusCode, retry_after_secs: Option<u64>, detail: String) -> UpstreamError {
    match status.as_u16() {
        402 | 429 => UpstreamError::RateLimited {
            retry_after_secs,
            detail,
        },
        401 | 403 => UpstreamError::Auth {
            status: status.as_u16(),
            detail,
        },
        code => UpstreamError::Api {
            status: code,
            detail,
        },
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

impl From<&GenerationRequest> for GeminiRequest {
    fn from(req: &GenerationRequest) -> Self {
        let parts = req
            .parts
            .iter()
            .map(|p| match p {
                ContentPart::Text(text) => GeminiPart::Text { text: text.clone() },
                ContentPart::InlineData { mime_type, data } => GeminiPart::InlineData {
                    inline_data: GeminiInlineData {
                        mime_type: mime_type.clone(),
                        data: data.clone(),
                    },
                },
            })
            .collect();

        let generation_config = (req.temperature.is_some() || req.max_output_tokens.is_some())
            .then(|| GeminiGenerationConfig {
                temperature: req.temperature,
                max_output_tokens: req.max_output_tokens,
            });

        Self {
            contents: vec![GeminiContent { role: "user", parts }],
            generation_config,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u64>,
    #[serde(default)]
    candidates_token_count: Option<u64>,
}

impl GeminiResponse {
    /// Concatenate the first candidate's text parts, like the SDK's `.text`.
    fn into_generation(self) -> Result<GenerationResponse, UpstreamError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            warn!(reason = %reason, "Prompt was blocked by Gemini safety filters");
            return Err(UpstreamError::ContentBlocked { reason });
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(UpstreamError::EmptyResponse);
        };

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|p| p.thought != Some(true))
            .filter_map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            return Err(match candidate.finish_reason {
                Some(reason) if BLOCKING_FINISH_REASONS.contains(&reason.as_str()) => {
                    warn!(reason = %reason, "Candidate withheld by Gemini safety filters");
                    UpstreamError::ContentBlocked { reason }
                }
                _ => UpstreamError::EmptyResponse,
            });
        }

        let usage = self.usage_metadata.unwrap_or_default();
        Ok(GenerationResponse {
            text,
            input_tokens: usage.prompt_token_count.unwrap_or(0),
            output_tokens: usage.candidates_token_count.unwrap_or(0),
        })
    }
}
