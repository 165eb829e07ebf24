//! Mark image payloads.
//!
//! Images reach MarkGuard as base64 text, as `data:` URLs, or as
//! PostgreSQL-style `\x`-prefixed hex. They are normalised to raw bytes and
//! sent to vision models as data URLs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::LlmError;
use crate::LlmResult;

/// Decode a textual image payload into bytes.
pub fn decode_image_payload(payload: &str) -> LlmResult<Vec<u8>> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(LlmError::InvalidImage("empty payload".into()));
    }
    if let Some(hex_digits) = payload.strip_prefix("\\x") {
        return hex::decode(hex_digits).map_err(|e| LlmError::InvalidImage(e.to_string()));
    }
    let encoded = match payload.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| LlmError::InvalidImage("data URL without payload".into()))?,
        None => payload,
    };
    STANDARD
        .decode(encoded)
        .map_err(|e| LlmError::InvalidImage(e.to_string()))
}

/// Base64 encoding used when an image is written back out.
pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// MIME type from magic bytes, PNG when unknown.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/png",
    }
}

/// `data:` URL for a vision request.
pub fn data_url(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", sniff_mime(bytes), STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn decodes_base64_hex_and_data_urls() {
        let b64 = STANDARD.encode(PNG_HEADER);
        assert_eq!(decode_image_payload(&b64).unwrap(), PNG_HEADER);
        assert_eq!(
            decode_image_payload(&format!("\\x{}", hex::encode(PNG_HEADER))).unwrap(),
            PNG_HEADER
        );
        assert_eq!(
            decode_image_payload(&format!("data:image/png;base64,{b64}")).unwrap(),
            PNG_HEADER
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_image_payload("").is_err());
        assert!(decode_image_payload("\\xzz").is_err());
        assert!(decode_image_payload("data:image/png;base64").is_err());
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_mime(&PNG_HEADER), "image/png");
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_mime(b"GIF89a"), "image/gif");
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime(b"??"), "image/png");
        assert!(data_url(&[0xFF, 0xD8, 0xFF]).starts_with("data:image/jpeg;base64,"));
    }
}
