//! Session state and its pure transition function.
//!
//! The controller owns a single `SessionState` and replaces it on every
//! intent by calling [`SessionState::apply`]. Keeping transitions pure makes
//! the lifecycle testable without any I/O or rendering surface.

use restora_abstraction::EncodedImage;
use serde::Serialize;

/// Lifecycle phase derived from a `SessionState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No image uploaded.
    Empty,
    /// An image is uploaded and can be restored.
    Ready,
    /// A restoration request is in flight.
    Restoring,
    /// A restored image is available.
    Restored,
    /// The last restoration attempt failed.
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Ready => "ready",
            Self::Restoring => "restoring",
            Self::Restored => "restored",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A new file was selected; everything from the previous upload is dropped.
    UploadStarted,
    /// The selected file was decoded.
    UploadSucceeded {
        /// Encoded file contents.
        image: EncodedImage,
        /// Display name of the file.
        file_name: String,
    },
    /// The selected file could not be decoded.
    UploadFailed {
        /// Banner message.
        message: String,
    },
    /// Restoration preconditions were not met; nothing was sent.
    RestoreRejected {
        /// Banner message.
        message: String,
    },
    /// A restoration request is about to be dispatched.
    RestoreStarted,
    /// The service returned an image.
    RestoreSucceeded {
        /// First image returned by the service.
        image: EncodedImage,
    },
    /// The service failed or returned no image.
    RestoreFailed {
        /// Banner message.
        message: String,
    },
    /// The in-flight request was dropped before it completed.
    RestoreAbandoned,
    /// The user started over.
    Reset,
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// The uploaded image.
    pub original_image: Option<EncodedImage>,
    /// The restored image; only set while `original_image` is set.
    pub restored_image: Option<EncodedImage>,
    /// Display name of the uploaded file. Advisory only.
    pub file_name: Option<String>,
    /// True strictly between dispatching a restoration and its completion.
    pub is_loading: bool,
    /// Last failure, replaced on every new failure.
    pub error: Option<String>,
    /// True when the last dispatched request ended without an image.
    ///
    /// A rejected precondition sets `error` but never this flag.
    pub request_failed: bool,
}

impl SessionState {
    /// Derives the lifecycle phase.
    pub fn phase(&self) -> Phase {
        if self.is_loading {
            Phase::Restoring
        } else if self.original_image.is_none() {
            Phase::Empty
        } else if self.restored_image.is_some() {
            Phase::Restored
        } else if self.request_failed {
            Phase::Failed
        } else {
            Phase::Ready
        }
    }

    /// Whether this is the initial empty state.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns the state that follows `event`.
    #[must_use]
    pub fn apply(&self, event: Event) -> Self {
        match event {
            Event::UploadStarted | Event::Reset => Self::default(),
            Event::UploadSucceeded { image, file_name } => Self {
                original_image: Some(image),
                restored_image: None,
                file_name: Some(file_name),
                is_loading: false,
                error: None,
                request_failed: false,
            },
            Event::UploadFailed { message } => Self { error: Some(message), ..Self::default() },
            Event::RestoreRejected { message } => Self { error: Some(message), ..self.clone() },
            Event::RestoreStarted => Self {
                restored_image: None,
                is_loading: true,
                error: None,
                request_failed: false,
                ..self.clone()
            },
            Event::RestoreSucceeded { image } => Self {
                // An image can only be restored while its original is still present.
                restored_image: self.original_image.as_ref().map(|_| image),
                is_loading: false,
                error: None,
                request_failed: false,
                ..self.clone()
            },
            Event::RestoreFailed { message } => Self {
                restored_image: None,
                is_loading: false,
                error: Some(message),
                request_failed: true,
                ..self.clone()
            },
            Event::RestoreAbandoned => Self { is_loading: false, ..self.clone() },
        }
    }
}
