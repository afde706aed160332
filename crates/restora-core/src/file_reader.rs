//! Reading user-selected files into encoded images.

use async_trait::async_trait;
use restora_abstraction::EncodedImage;
use restora_models::mime::{detect_mime_type, is_supported_image_type};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Media type used when nothing better can be determined.
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Errors that can occur while reading a selected file.
#[derive(Debug, Error)]
pub enum FileReadError {
    /// The file could not be read from disk.
    #[error("Failed to read {name}: {source}")]
    Io {
        /// Display name of the file.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file contains no data.
    #[error("File {name} is empty")]
    Empty {
        /// Display name of the file.
        name: String,
    },
}

/// Where the contents of a selected file come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// A file on the local filesystem.
    Path(PathBuf),
    /// Contents already held in memory (pasted or piped input).
    Bytes(Vec<u8>),
}

/// A file the user selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Display name, used to derive the download name.
    pub name: String,
    /// The file contents.
    pub source: FileSource,
    /// Media type claimed by the selection surface, if any.
    pub declared_type: Option<String>,
}

impl SelectedFile {
    /// Selects a file on disk. The display name is the final path component.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self { name, source: FileSource::Path(path), declared_type: None }
    }

    /// Selects in-memory contents under a display name.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), source: FileSource::Bytes(bytes), declared_type: None }
    }

    /// Sets the media type claimed by the selection surface.
    #[must_use]
    pub fn with_declared_type(mut self, mime_type: impl Into<String>) -> Self {
        self.declared_type = Some(mime_type.into());
        self
    }
}

/// Converts a selected file into an encoded image.
#[async_trait]
pub trait FileReader: Send + Sync {
    /// Reads and encodes the file.
    ///
    /// # Errors
    /// Returns a `FileReadError` if the contents cannot be read. There is no
    /// partial result.
    async fn read(&self, file: &SelectedFile) -> Result<EncodedImage, FileReadError>;
}

/// Reads files from the local filesystem without blocking the runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileReader;

impl LocalFileReader {
    /// Picks the media type: declared type, then magic bytes, then extension.
    fn resolve_mime_type(file: &SelectedFile, bytes: &[u8]) -> String {
        if let Some(declared) = file.declared_type.as_deref().filter(|t| !t.trim().is_empty()) {
            return declared.trim().to_string();
        }
        if let Some(detected) = detect_mime_type(bytes) {
            return detected.to_string();
        }
        mime_guess::from_path(&file.name)
            .first()
            .filter(|m| m.type_() == mime_guess::mime::IMAGE)
            .map_or_else(|| FALLBACK_MIME_TYPE.to_string(), |m| m.essence_str().to_string())
    }
}

#[async_trait]
impl FileReader for LocalFileReader {
    async fn read(&self, file: &SelectedFile) -> Result<EncodedImage, FileReadError> {
        let bytes = match &file.source {
            FileSource::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|source| FileReadError::Io { name: file.name.clone(), source })?,
            FileSource::Bytes(bytes) => bytes.clone(),
        };

        if bytes.is_empty() {
            return Err(FileReadError::Empty { name: file.name.clone() });
        }

        let mime_type = Self::resolve_mime_type(file, &bytes);
        if !is_supported_image_type(&mime_type) {
            warn!(
                file = %file.name,
                mime_type = %mime_type,
                "Selected file is not a PNG, JPEG or WEBP image; sending it anyway"
            );
        }

        debug!(file = %file.name, mime_type = %mime_type, bytes = bytes.len(), "Read selected file");
        Ok(EncodedImage::from_bytes(&bytes, mime_type))
    }
}
