//! QR code rendering for pairing
//!
//! Only absolute `http`/`https` URLs are ever encoded; anything else could
//! make a scanning device run a script or open an arbitrary app scheme.

use std::io::Cursor;

use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use url::Url;

use crate::error::{RelayError, Result};

/// Default rendered size in pixels
pub const DEFAULT_QR_SIZE: u32 = 256;

/// Validate a user-supplied pairing target
pub fn sanitize_target(target: &str) -> Result<Url> {
    let target = target.trim();
    if target.is_empty() {
        return Err(RelayError::invalid_input("invalid target: empty"));
    }

    let url = Url::parse(target)
        .map_err(|e| RelayError::invalid_input(format!("invalid target: {}", e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RelayError::invalid_input(format!(
            "invalid target: unsupported scheme {}",
            other
        ))),
    }
}

/// Encode `content` as a PNG QR code (medium error correction)
pub fn render_png(content: &str, size: u32) -> Result<Vec<u8>> {
    let code = QrCode::with_error_correction_level(content.as_bytes(), EcLevel::M)
        .map_err(|e| RelayError::QrEncode(e.to_string()))?;

    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(size, size)
        .build();

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| RelayError::QrEncode(e.to_string()))?;

    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_web_urls() {
        assert_eq!(
            sanitize_target("http://192.168.1.4:4000").unwrap().scheme(),
            "http"
        );
        assert_eq!(
            sanitize_target("  HTTPS://example.com/app  ").unwrap().scheme(),
            "https"
        );
    }

    #[test]
    fn test_rejects_other_schemes() {
        for target in [
            "javascript:alert(1)",
            "file:///etc/passwd",
            "data:text/html,<script>1</script>",
            "ftp://example.com",
            "intent://scan#Intent;end",
        ] {
            let err = sanitize_target(target).unwrap_err();
            assert!(matches!(err, RelayError::InvalidInput(_)), "accepted {}", target);
        }
    }

    #[test]
    fn test_rejects_malformed() {
        for target in ["", "   ", "not a url", "/relative/path", "http://"] {
            assert!(sanitize_target(target).is_err(), "accepted {:?}", target);
        }
    }

    #[test]
    fn test_render_png_size() {
        let png = render_png("http://localhost:4000", DEFAULT_QR_SIZE).unwrap();
        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .unwrap()
            .to_luma8();

        assert!(decoded.width() >= DEFAULT_QR_SIZE);
        assert_eq!(decoded.width(), decoded.height());
    }

    #[test]
    fn test_render_too_long_is_encode_error() {
        let huge = format!("http://example.com/{}", "a".repeat(8000));
        let err = render_png(&huge, DEFAULT_QR_SIZE).unwrap_err();
        assert!(matches!(err, RelayError::QrEncode(_)));
    }
}
