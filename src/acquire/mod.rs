/// Image acquisition
///
/// Reads a user-chosen file into an encoded payload (a base64 data URI).
/// The file is read once, in full. Empty or unreadable files yield `None`,
/// which the caller treats as a silent no-op.

use base64::Engine;
use std::path::PathBuf;

use crate::state::Payload;

/// Mime type used when the bytes are not a recognised image
const FALLBACK_MIME: &str = "application/octet-stream";

/// Raster formats offered by the file picker
pub const IMAGE_EXTENSIONS: [&str; 9] = [
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "ico", "tif", "tiff",
];

/// Read a file into a payload
pub async fn read_payload(path: PathBuf) -> Option<Payload> {
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let payload = payload_from_bytes(&bytes);
            if payload.is_none() {
                log::debug!("Ignoring empty file: {}", path.display());
            }
            payload
        }
        Err(e) => {
            log::warn!("⚠️  Could not read {}: {}", path.display(), e);
            None
        }
    }
}

/// Wrap raw file bytes as a data URI payload
pub fn payload_from_bytes(bytes: &[u8]) -> Option<Payload> {
    if bytes.is_empty() {
        return None;
    }

    let mime = image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MIME);
    let data = base64::engine::general_purpose::STANDARD.encode(bytes);

    Some(Payload::new(format!("data:{mime};base64,{data}")))
}
