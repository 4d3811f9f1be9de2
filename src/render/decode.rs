/// Payload decoding
///
/// Turns a `data:<mime>;base64,...` payload into RGBA pixels the canvas can
/// draw. Decoding is CPU-bound, so the async entry point runs it on the
/// blocking pool.

use base64::Engine;
use iced::widget::image::Handle;

use crate::state::{Payload, PayloadKey};

/// Errors that can occur while decoding a payload
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The payload is not a `data:` URI
    #[error("payload is not a data URI")]
    NotDataUri,

    /// The payload is a data URI but not base64 encoded
    #[error("data URI is not base64 encoded")]
    NotBase64,

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("decode task failed: {0}")]
    Join(String),
}

/// Pixel data ready for drawing
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub key: PayloadKey,
    pub width: u32,
    pub height: u32,
    pub handle: Handle,
}

/// Split a data URI into its mime type and raw bytes
pub fn parse_data_uri(uri: &str) -> Result<(&str, Vec<u8>), DecodeError> {
    let rest = uri.strip_prefix("data:").ok_or(DecodeError::NotDataUri)?;
    let (header, data) = rest.split_once(',').ok_or(DecodeError::NotDataUri)?;
    let mime = header.strip_suffix(";base64").ok_or(DecodeError::NotBase64)?;
    let bytes = base64::engine::general_purpose::STANDARD.decode(data.trim())?;
    Ok((mime, bytes))
}

/// Decode a payload into RGBA pixels (blocking)
pub fn decode_payload(payload: &Payload) -> Result<DecodedImage, DecodeError> {
    let (_mime, bytes) = parse_data_uri(payload.as_str())?;

    // Let the image crate sniff the format; the declared mime type can lie
    let rgba = image::load_from_memory(&bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(DecodedImage {
        key: payload.key(),
        width,
        height,
        handle: Handle::from_rgba(width, height, rgba.into_raw()),
    })
}

/// Decode a payload on the blocking pool
pub async fn decode_async(payload: Payload) -> Result<DecodedImage, DecodeError> {
    tokio::task::spawn_blocking(move || decode_payload(&payload))
        .await
        .map_err(|e| DecodeError::Join(e.to_string()))?
}
