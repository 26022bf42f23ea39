//! Helpers for moving images between vendors as base64 payloads.

use crate::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::ImageFormat;

/// Remove a leading `data:image/<subtype>;base64,` prefix.
///
/// Only lowercase alphabetic subtypes are recognised; anything else is returned
/// unchanged. Applying this twice is the same as applying it once.
pub fn strip_data_url_prefix(data: &str) -> &str {
    let Some(rest) = data.strip_prefix("data:image/") else {
        return data;
    };
    let Some(idx) = rest.find(";base64,") else {
        return data;
    };
    let subtype = &rest[..idx];
    if subtype.is_empty() || !subtype.chars().all(|c| c.is_ascii_lowercase()) {
        return data;
    }
    &rest[idx + ";base64,".len()..]
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64 image data, tolerating a data-URL prefix.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(strip_data_url_prefix(data).trim())?)
}

pub fn detect_image_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    match detect_image_format(bytes) {
        Some(format) => format.to_mime_type(),
        None => {
            tracing::warn!(
                "Unrecognized image format (first 4 bytes: {:02X?}), falling back to image/png",
                &bytes[..bytes.len().min(4)]
            );
            "image/png"
        }
    }
}

/// File extension for the detected format, `png` when unknown.
pub fn detect_extension(bytes: &[u8]) -> &'static str {
    detect_image_format(bytes)
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("png")
}

/// Sniff the MIME type of base64 data by decoding only its first bytes.
pub fn sniff_base64_mime(data: &str) -> &'static str {
    let raw = strip_data_url_prefix(data);
    // 32 chars decode to 24 bytes, enough for every signature we care about
    let head: Vec<u8> = raw.bytes().take(32).collect();
    let usable = head.len() - head.len() % 4;
    match STANDARD.decode(&head[..usable]) {
        Ok(bytes) => detect_image_mime(&bytes),
        Err(_) => "image/png",
    }
}

/// Build a `data:` URL, leaving values that already are one untouched.
pub fn to_data_url(data: &str) -> String {
    if data.starts_with("data:") {
        return data.to_string();
    }
    format!("data:{};base64,{}", sniff_base64_mime(data), data)
}

/// Only URLs and data URLs can be forwarded to a vendor as an input image.
pub fn is_image_reference(value: &str) -> bool {
    value.starts_with("https://")
        || value.starts_with("http://")
        || value.starts_with("data:image/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_HEAD: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_data_url_prefix("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_url_prefix("data:image/jpeg;base64,QUJD"), "QUJD");
    }

    #[test]
    fn test_strip_prefix_is_idempotent() {
        let once = strip_data_url_prefix("data:image/webp;base64,QUJD");
        assert_eq!(strip_data_url_prefix(once), once);
        assert_eq!(strip_data_url_prefix("QUJD"), "QUJD");
    }

    #[test]
    fn test_strip_prefix_ignores_other_schemes() {
        assert_eq!(
            strip_data_url_prefix("data:image/svg+xml;base64,QUJD"),
            "data:image/svg+xml;base64,QUJD"
        );
        assert_eq!(
            strip_data_url_prefix("https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn test_image_reference_needs_url_or_data_url() {
        assert!(is_image_reference("https://inspiration/neon.png"));
        assert!(is_image_reference("data:image/png;base64,QUJD"));
        assert!(!is_image_reference("Neon Dreams"));
        assert!(!is_image_reference("QUJD"));
    }

    #[test]
    fn test_decode_accepts_prefixed_and_bare() {
        let bare = encode_base64(&PNG_SIGNATURE);
        let prefixed = format!("data:image/png;base64,{}", bare);

        assert_eq!(decode_base64(&bare).unwrap(), PNG_SIGNATURE.to_vec());
        assert_eq!(decode_base64(&prefixed).unwrap(), PNG_SIGNATURE.to_vec());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_base64("!!!not-base64!!!").is_err());
    }

    #[test]
    fn test_detect_mime() {
        assert_eq!(detect_image_mime(&PNG_SIGNATURE), "image/png");
        assert_eq!(detect_image_mime(&JPEG_HEAD), "image/jpeg");
        assert_eq!(
            detect_image_mime(&[
                0x52, 0x49, 0x46, 0x46, 0x00, 0x00, 0x00, 0x00, 0x57, 0x45, 0x42, 0x50
            ]),
            "image/webp"
        );
    }

    #[test]
    fn test_unknown_falls_back_to_png() {
        assert_eq!(detect_image_mime(&[0x00, 0x01, 0x02, 0x03]), "image/png");
        assert_eq!(detect_image_mime(&[]), "image/png");
        assert_eq!(detect_extension(&[]), "png");
    }

    #[test]
    fn test_detect_extension() {
        assert_eq!(detect_extension(&JPEG_HEAD), "jpg");
        assert_eq!(detect_extension(&PNG_SIGNATURE), "png");
    }

    #[test]
    fn test_to_data_url_sniffs_jpeg() {
        let b64 = encode_base64(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46]);
        let url = to_data_url(&b64);
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert_eq!(to_data_url(&url), url);
    }
}
