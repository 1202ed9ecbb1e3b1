//! Lossless transport encoding for image payloads (base64 and data URLs).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use payguide_core::ImageBuffer;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("not a data URL")]
    NotDataUrl,

    #[error("data URL is not base64-encoded")]
    NotBase64,

    #[error("invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, TransportError> {
    Ok(STANDARD.decode(encoded.trim())?)
}

/// `data:<mime>;base64,<payload>`
pub fn to_data_url(image: &ImageBuffer) -> String {
    format!("data:{};base64,{}", image.mime_type, encode_base64(&image.data))
}

/// Parse a base64 data URL, as produced by a browser canvas capture.
pub fn from_data_url(url: &str, source: &str) -> Result<ImageBuffer, TransportError> {
    let rest = url.trim().strip_prefix("data:").ok_or(TransportError::NotDataUrl)?;
    let (meta, payload) = rest.split_once(',').ok_or(TransportError::NotDataUrl)?;
    let mime = meta.strip_suffix(";base64").ok_or(TransportError::NotBase64)?;
    let data = decode_base64(payload)?;
    Ok(ImageBuffer::new(data, mime.to_ascii_lowercase(), source))
}
