//! Error types for Restora Core.

use crate::file_reader::FileReadError;
use restora_abstraction::ServiceError;
use std::path::PathBuf;
use thiserror::Error;

/// User-facing banner messages.
pub mod messages {
    /// The selected file could not be read.
    pub const FILE_READ_FAILED: &str = "Failed to read the image file.";

    /// Restoration was requested without an image or without a credential.
    pub const PRECONDITION_FAILED: &str =
        "Please upload an image and ensure your API key is configured.";

    /// The service answered without any image part.
    pub const NO_IMAGE_RETURNED: &str =
        "The model did not return an image. It may have refused the request.";

    /// The service failed without any usable detail.
    pub const RESTORE_FAILED: &str = "Failed to restore the image.";

    /// A restoration is already in flight.
    pub const BUSY: &str = "A restoration is already in progress.";

    /// A late result no longer matches the session.
    pub const SUPERSEDED: &str = "The result was discarded because the session changed.";
}

/// Core error type for session operations.
///
/// The `Display` output of every variant is the banner text shown to the user.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The uploaded file could not be read.
    #[error("{}", messages::FILE_READ_FAILED)]
    FileRead(#[source] FileReadError),

    /// Restoration requested before an image was uploaded.
    #[error("{}", messages::PRECONDITION_FAILED)]
    MissingImage,

    /// Restoration requested without a configured API key.
    #[error("{}", messages::PRECONDITION_FAILED)]
    MissingCredential,

    /// The service responded without an image.
    #[error("{}", messages::NO_IMAGE_RETURNED)]
    Refused {
        /// Finish reason or model text explaining the refusal, if any.
        reason: Option<String>,
    },

    /// The service call failed.
    #[error("{}", .0.detail().unwrap_or_else(|| messages::RESTORE_FAILED.to_string()))]
    Service(#[source] ServiceError),

    /// Another restoration is still in flight.
    #[error("{}", messages::BUSY)]
    Busy,

    /// The session changed while the operation was suspended.
    #[error("{}", messages::SUPERSEDED)]
    Superseded,

    /// The restored image could not be written.
    #[error("Failed to save the restored image to {}: {source}", path.display())]
    Download {
        /// Destination that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl SessionError {
    /// The message shown in the error banner.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
