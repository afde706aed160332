//! Download naming and writing of restored images.

use crate::error::{Result, SessionError};
use restora_abstraction::EncodedImage;
use restora_models::mime::extension_for;
use std::path::{Path, PathBuf};
use tracing::info;

/// Base name used when the original file name is unknown.
pub const DEFAULT_BASE_NAME: &str = "photo";

/// Suffix appended to the base name.
pub const RESTORED_SUFFIX: &str = "-restored";

/// Suggested file name for a restored image.
///
/// The base is the original name without its last extension; the extension
/// follows the media type the service returned.
pub fn download_file_name(original: Option<&str>, mime_type: &str) -> String {
    let base = original
        .map(str::trim)
        .map(|name| match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        })
        .map(|base| base.replace(['/', '\\'], "_"))
        .filter(|base| !base.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_NAME.to_string());

    format!("{}{}.{}", base, RESTORED_SUFFIX, extension_for(mime_type))
}

/// Decodes `image` and writes it to `dir/file_name`, creating `dir` if needed.
pub async fn write_download(dir: &Path, file_name: &str, image: &EncodedImage) -> Result<PathBuf> {
    let bytes = image.decode().map_err(SessionError::Service)?;
    let path = dir.join(file_name);

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| SessionError::Download { path: dir.to_path_buf(), source })?;
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|source| SessionError::Download { path: path.clone(), source })?;

    info!(path = %path.display(), bytes = bytes.len(), "Saved restored image");
    Ok(path)
}
