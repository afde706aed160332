//! MIME type detection for image payloads.

/// Image MIME types the upload surface advertises.
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

/// Detect MIME type from file content using magic bytes.
///
/// # Returns
/// `Some(mime_type)` if detected, `None` if unknown
pub fn detect_mime_type(data: &[u8]) -> Option<&'static str> {
    // PNG: \x89PNG\r\n\x1a\n
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    }
    // JPEG: \xff\xd8\xff
    else if data.starts_with(b"\xff\xd8\xff") {
        Some("image/jpeg")
    }
    // WebP: RIFF....WEBP
    else if data.starts_with(b"RIFF") && data.len() >= 12 && &data[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Check if a MIME type is one of the advertised image types.
pub fn is_supported_image_type(mime_type: &str) -> bool {
    SUPPORTED_IMAGE_TYPES.contains(&essence(mime_type).as_str())
}

/// File extension (without dot) for an image MIME type.
///
/// Unknown types map to `png`.
pub fn extension_for(mime_type: &str) -> &'static str {
    match essence(mime_type).as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

/// Lower-cased type and subtype, without parameters.
fn essence(mime_type: &str) -> String {
    mime_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}
