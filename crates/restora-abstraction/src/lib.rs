//! Restoration service abstraction layer for Restora.
//!
//! This module defines the core traits and types shared between the session
//! controller and the hosted image models that perform the actual restoration.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents an error that can occur when calling a restoration service.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceError {
    /// No API credential is configured for the service.
    #[error("API key is not configured")]
    MissingCredential,

    /// An error occurred while sending the request (e.g., network issues, timeouts).
    #[error("{0}")]
    Request(String),

    /// The service answered with an error status or an error body.
    #[error("{message}")]
    Response {
        /// HTTP status code, when one was received.
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        /// Error message reported by the service.
        message: String,
    },

    /// Provider quota exceeded or rate limit hit.
    #[error("Quota exceeded{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    QuotaExceeded {
        /// Optional error message from the provider.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// An error occurred during serialization or deserialization.
    #[error("{0}")]
    Serialization(String),

    /// An image payload could not be decoded.
    #[error("Invalid image data: {0}")]
    InvalidImage(String),
}

impl ServiceError {
    /// Returns the failure detail suitable for showing to a user verbatim.
    ///
    /// Returns `None` when the error carries no usable detail, in which case
    /// callers fall back to a generic message.
    pub fn detail(&self) -> Option<String> {
        let detail = match self {
            Self::MissingCredential | Self::QuotaExceeded { .. } | Self::InvalidImage(_) => {
                self.to_string()
            }
            Self::Request(message) | Self::Serialization(message) => message.clone(),
            Self::Response { message, .. } => message.clone(),
        };
        let trimmed = detail.trim();
        if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
    }
}

/// A base64-encoded image together with its media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    /// Base64 (standard alphabet, padded) encoding of the image bytes.
    pub data: String,
    /// Media type of the image, e.g. `image/png`.
    pub mime_type: String,
}

impl EncodedImage {
    /// Creates an `EncodedImage` from an already base64-encoded payload.
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self { data: data.into(), mime_type: mime_type.into() }
    }

    /// Encodes raw image bytes.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        let engine = base64::engine::general_purpose::STANDARD;
        Self { data: engine.encode(bytes), mime_type: mime_type.into() }
    }

    /// Decodes the payload back into raw bytes.
    ///
    /// # Errors
    /// Returns `ServiceError::InvalidImage` if the payload is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, ServiceError> {
        let engine = base64::engine::general_purpose::STANDARD;
        engine.decode(self.data.as_bytes()).map_err(|e| ServiceError::InvalidImage(e.to_string()))
    }

    /// Renders the image as a `data:` URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Parses a `data:<mime>;base64,<payload>` URL.
    ///
    /// # Errors
    /// Returns `ServiceError::InvalidImage` if the URL is not a base64 data URL.
    pub fn from_data_url(url: &str) -> Result<Self, ServiceError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| ServiceError::InvalidImage("missing data: prefix".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| ServiceError::InvalidImage("missing payload separator".to_string()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| ServiceError::InvalidImage("payload is not base64".to_string()))?;
        Ok(Self::new(payload, mime_type))
    }

    /// Estimated size of the decoded payload in bytes.
    pub fn byte_len(&self) -> usize {
        let padding = self.data.bytes().rev().take_while(|b| *b == b'=').count();
        (self.data.len() / 4 * 3).saturating_sub(padding)
    }
}

/// One unit of a structured model response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPart {
    /// Text carried by this part, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Inline image data carried by this part, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<EncodedImage>,
}

impl ContentPart {
    /// A part carrying only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), inline_data: None }
    }

    /// A part carrying only an image.
    pub fn image(image: EncodedImage) -> Self {
        Self { text: None, inline_data: Some(image) }
    }
}

/// Output modalities requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    /// Image output.
    Image,
    /// Text output.
    Text,
}

/// A single restoration request: one image plus one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorationRequest {
    /// The image to restore.
    pub image: EncodedImage,
    /// Natural-language instruction steering the model.
    pub instruction: String,
    /// Requested response modalities.
    pub modalities: Vec<ResponseModality>,
}

impl RestorationRequest {
    /// Creates a request asking for both image and text output.
    pub fn new(image: EncodedImage, instruction: impl Into<String>) -> Self {
        Self {
            image,
            instruction: instruction.into(),
            modalities: vec![ResponseModality::Image, ResponseModality::Text],
        }
    }
}

/// The structured response of a restoration service.
///
/// An empty or text-only `parts` list is a valid response: the model declined
/// to produce an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorationResponse {
    /// Content parts in the order the service returned them.
    pub parts: Vec<ContentPart>,
    /// Optional: the ID of the model that produced the response.
    pub model_id: Option<String>,
    /// Optional: finish or block reason reported by the service.
    pub finish_reason: Option<String>,
}

impl RestorationResponse {
    /// Creates a response from parts.
    pub fn from_parts(parts: Vec<ContentPart>) -> Self {
        Self { parts, model_id: None, finish_reason: None }
    }

    /// Returns the image of the first part carrying inline image data.
    pub fn first_image(&self) -> Option<&EncodedImage> {
        self.parts.iter().find_map(|part| part.inline_data.as_ref())
    }

    /// Joins all text parts, or `None` if there are none.
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self.parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if texts.is_empty() { None } else { Some(texts.join("\n")) }
    }
}

/// A trait for services that restore images.
///
/// All services must be `Send + Sync` so a controller can share them across tasks.
#[async_trait]
pub trait RestorationService: Send + Sync {
    /// Sends one restoration request and returns the structured response.
    ///
    /// # Errors
    /// Returns a `ServiceError` if the request could not be completed. A response
    /// without image parts is not an error.
    async fn restore(
        &self,
        request: &RestorationRequest,
    ) -> Result<RestorationResponse, ServiceError>;

    /// Whether an API credential is available to authorize requests.
    fn has_credential(&self) -> bool;

    /// Returns the ID of the model.
    fn model_id(&self) -> &str;
}
