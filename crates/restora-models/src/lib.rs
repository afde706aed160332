//! Restoration service implementations for Restora.
//!
//! This crate provides concrete implementations of the `RestorationService` trait.
//!
//! # Supported Providers
//!
//! - **Mock**: Testing and offline development
//! - **Gemini**: Google's Gemini image models (API key required)

pub mod gemini;
pub mod mime;

use async_trait::async_trait;
use parking_lot::Mutex;
use restora_abstraction::{
    ContentPart, EncodedImage, RestorationRequest, RestorationResponse, RestorationService,
    ServiceError,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

pub use gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL_ID, GeminiImageModel};

/// One scripted answer of a [`MockRestorationService`].
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Return this response.
    Respond(RestorationResponse),
    /// Fail with this error.
    Fail(ServiceError),
}

/// A mock implementation of the `RestorationService` trait for testing and demonstration.
///
/// Outcomes are served in the order they were scripted. Once the script runs
/// out, the mock echoes the request image back as a single image part.
#[derive(Debug)]
pub struct MockRestorationService {
    id: String,
    credential: bool,
    delay: Option<Duration>,
    gate: Option<Arc<Notify>>,
    outcomes: Mutex<VecDeque<MockOutcome>>,
    requests: Mutex<Vec<RestorationRequest>>,
}

impl Default for MockRestorationService {
    fn default() -> Self {
        Self::new("mock")
    }
}

impl MockRestorationService {
    /// Creates a new `MockRestorationService` with the given ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            credential: true,
            delay: None,
            gate: None,
            outcomes: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reports no configured credential.
    #[must_use]
    pub fn without_credential(mut self) -> Self {
        self.credential = false;
        self
    }

    /// Sleeps before answering each request.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Holds each request until the gate is notified.
    ///
    /// The request is recorded before waiting, so callers can observe the
    /// in-flight state through [`Self::call_count`].
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Queues a successful response.
    #[must_use]
    pub fn respond_with(self, response: RestorationResponse) -> Self {
        self.outcomes.lock().push_back(MockOutcome::Respond(response));
        self
    }

    /// Queues a response carrying a single image.
    #[must_use]
    pub fn respond_with_image(self, image: EncodedImage) -> Self {
        self.respond_with(RestorationResponse::from_parts(vec![ContentPart::image(image)]))
    }

    /// Queues a text-only response, as the model produces when it declines.
    #[must_use]
    pub fn refuse(self, text: impl Into<String>) -> Self {
        self.respond_with(RestorationResponse::from_parts(vec![ContentPart::text(text)]))
    }

    /// Queues a failure.
    #[must_use]
    pub fn fail_with(self, error: ServiceError) -> Self {
        self.outcomes.lock().push_back(MockOutcome::Fail(error));
        self
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RestorationRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl RestorationService for MockRestorationService {
    async fn restore(
        &self,
        request: &RestorationRequest,
    ) -> Result<RestorationResponse, ServiceError> {
        debug!(
            model_id = %self.id,
            mime_type = %request.image.mime_type,
            "MockRestorationService restoring image"
        );

        self.requests.lock().push(request.clone());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self.outcomes.lock().pop_front();
        match outcome {
            Some(MockOutcome::Respond(mut response)) => {
                response.model_id.get_or_insert_with(|| self.id.clone());
                Ok(response)
            }
            Some(MockOutcome::Fail(error)) => Err(error),
            None => Ok(RestorationResponse {
                parts: vec![ContentPart::image(request.image.clone())],
                model_id: Some(self.id.clone()),
                finish_reason: Some("STOP".to_string()),
            }),
        }
    }

    fn has_credential(&self) -> bool {
        self.credential
    }

    fn model_id(&self) -> &str {
        &self.id
    }
}
