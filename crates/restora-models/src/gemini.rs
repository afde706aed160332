//! Google Gemini image model implementation.
//!
//! This module provides an implementation of the `RestorationService` trait for
//! Gemini's image-capable `generateContent` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use restora_abstraction::{
    ContentPart, EncodedImage, ResponseModality, RestorationRequest, RestorationResponse,
    RestorationService, ServiceError,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Model used when none is configured.
pub const DEFAULT_MODEL_ID: &str = "gemini-2.5-flash-image-preview";

/// Public Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Google Gemini image model implementation.
#[derive(Clone)]
pub struct GeminiImageModel {
    /// The model ID (e.g., "gemini-2.5-flash-image-preview").
    model_id: String,
    /// The API key for authentication, if configured.
    api_key: Option<String>,
    /// The base URL for the Gemini API.
    base_url: String,
    /// Per-request timeout.
    timeout: Option<Duration>,
    /// HTTP client for making requests.
    client: Client,
}

impl std::fmt::Debug for GeminiImageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiImageModel")
            .field("model_id", &self.model_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiImageModel {
    /// Creates a new `GeminiImageModel`.
    ///
    /// An empty or whitespace-only key is treated as absent.
    pub fn new(model_id: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            model_id: model_id.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            client: Client::new(),
        }
    }

    /// Creates a new `GeminiImageModel` with the API key taken from the environment.
    ///
    /// A missing key is not an error here; the session controller reports it
    /// before any request is attempted.
    pub fn from_env(model_id: impl Into<String>) -> Self {
        let api_key = API_KEY_ENV_VARS.iter().find_map(|name| env::var(name).ok());
        Self::new(model_id, api_key)
    }

    /// Points the model at a different API root (proxy or test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets a per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the API root currently in use.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the request body sent to `generateContent`.
    fn build_request(request: &RestorationRequest) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![
                    GeminiPart {
                        text: None,
                        inline_data: Some(GeminiInlineData {
                            mime_type: request.image.mime_type.clone(),
                            data: request.image.data.clone(),
                        }),
                    },
                    GeminiPart { text: Some(request.instruction.clone()), inline_data: None },
                ],
            }],
            generation_config: GeminiGenerationConfig {
                response_modalities: request.modalities.clone(),
            },
        }
    }

    /// Converts the API response into ordered content parts.
    fn parse_response(&self, response: GeminiResponse) -> RestorationResponse {
        let block_reason = response.prompt_feedback.and_then(|feedback| feedback.block_reason);

        let Some(candidate) = response.candidates.into_iter().next() else {
            warn!(
                model_id = %self.model_id,
                block_reason = ?block_reason,
                "Gemini API returned no candidates"
            );
            return RestorationResponse {
                parts: Vec::new(),
                model_id: Some(self.model_id.clone()),
                finish_reason: block_reason,
            };
        };

        let parts: Vec<ContentPart> = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .map(|part| ContentPart {
                text: part.text,
                inline_data: part
                    .inline_data
                    .map(|inline| EncodedImage::new(inline.data, inline.mime_type)),
            })
            .collect();

        if parts.iter().all(|p| p.inline_data.is_none()) {
            warn!(
                model_id = %self.model_id,
                finish_reason = ?candidate.finish_reason,
                part_count = parts.len(),
                "Gemini API response contains no image"
            );
        }

        RestorationResponse {
            parts,
            model_id: Some(self.model_id.clone()),
            finish_reason: candidate.finish_reason.or(block_reason),
        }
    }

    /// Maps a non-success HTTP status and body to a `ServiceError`.
    fn map_error_status(status: reqwest::StatusCode, body: &str) -> ServiceError {
        let message = serde_json::from_str::<GeminiErrorEnvelope>(body)
            .ok()
            .and_then(|envelope| envelope.error.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("API error ({})", status)
                } else {
                    body.trim().to_string()
                }
            });

        match status.as_u16() {
            402 | 429 => ServiceError::QuotaExceeded { message: Some(message) },
            401 | 403 => ServiceError::Response {
                status: Some(status.as_u16()),
                message: format!("Authentication failed: {}", message),
            },
            code => ServiceError::Response { status: Some(code), message },
        }
    }
}

#[async_trait]
impl RestorationService for GeminiImageModel {
    async fn restore(
        &self,
        request: &RestorationRequest,
    ) -> Result<RestorationResponse, ServiceError> {
        let Some(api_key) = self.api_key.as_deref() else {
            error!(model_id = %self.model_id, "Gemini API key is not configured");
            return Err(ServiceError::MissingCredential);
        };

        debug!(
            model_id = %self.model_id,
            mime_type = %request.image.mime_type,
            payload_bytes = request.image.byte_len(),
            instruction_len = request.instruction.len(),
            "GeminiImageModel sending restoration request"
        );

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model_id);
        let body = Self::build_request(request);

        let mut builder = self.client.post(&url).query(&[("key", api_key)]).json(&body);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            let e = e.without_url();
            error!(error = %e, "Failed to send request to Gemini API");
            if e.is_timeout() {
                ServiceError::Request("Request to the image service timed out".to_string())
            } else {
                ServiceError::Request(format!("Network error: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                error = %error_text,
                "Gemini API returned error status"
            );
            return Err(Self::map_error_status(status, &error_text));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!(error = %e.without_url(), "Failed to parse Gemini API response");
            ServiceError::Serialization("Failed to parse the image service response".to_string())
        })?;

        Ok(self.parse_response(gemini_response))
    }

    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API request/response structures

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, alias = "inline_data", skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_modalities: Vec<ResponseModality>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: Option<String>,
}
