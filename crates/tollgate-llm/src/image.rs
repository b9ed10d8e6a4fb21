//! Inline image data URIs

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::LlmError;
use crate::types::ImageData;

/// Decode a `data:<mime>;base64,<payload>` URI
///
/// The URI must split into exactly two comma-delimited parts and its header
/// into exactly two semicolon-delimited parts.
pub fn parse_data_uri(uri: &str) -> Result<ImageData, LlmError> {
    let parts: Vec<&str> = uri.split(',').collect();
    let [header, payload] = parts.as_slice() else {
        return Err(LlmError::InvalidImageFormat("expected `data:<mime>;base64,<payload>`".to_owned()));
    };

    let header_parts: Vec<&str> = header.split(';').collect();
    let [mime, _encoding] = header_parts.as_slice() else {
        return Err(LlmError::InvalidImageFormat(format!("malformed data URI header `{header}`")));
    };

    let mime_type = mime.strip_prefix("data:").unwrap_or(mime);
    if mime_type.is_empty() {
        return Err(LlmError::InvalidImageFormat("data URI has no MIME type".to_owned()));
    }

    let data = STANDARD
        .decode(payload)
        .map_err(|e| LlmError::InvalidImageEncoding(e.to_string()))?;

    Ok(ImageData {
        mime_type: mime_type.to_owned(),
        data,
    })
}

/// Base64 payload of an image
pub fn to_base64(image: &ImageData) -> String {
    STANDARD.encode(&image.data)
}

/// Encode an image back into a data URI
pub fn to_data_uri(image: &ImageData) -> String {
    format!("data:{};base64,{}", image.mime_type, to_base64(image))
}
