//! Embedded image parsing
//!
//! Screenshots arrive inline as data URLs:
//! ```text
//! data:image/<png|jpeg>;base64,<body>
//! ```
//! Only PNG and JPEG are accepted. The body must be standard (padded) base64.

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use regex::Regex;

use crate::error::{RelayError, Result};

const FORMAT_HINT: &str = "expected data:image/(png|jpeg);base64,... format";

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^data:image/(png|jpeg);base64,(.+)$").expect("data URL pattern is valid")
    })
}

/// Accepted image encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    fn from_subtype(subtype: &str) -> Option<Self> {
        match subtype {
            "png" => Some(ImageKind::Png),
            "jpeg" => Some(ImageKind::Jpeg),
            _ => None,
        }
    }

    /// File extension for stored files (`jpeg` is normalized to `jpg`)
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
        }
    }

    /// MIME subtype as it appears in the data URL
    pub fn subtype(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpeg",
        }
    }
}

/// Decoded embedded image
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    pub kind: ImageKind,
    pub data: Bytes,
}

impl EmbeddedImage {
    /// Parse and decode a data URL
    pub fn parse(input: &str) -> Result<Self> {
        let captures = pattern()
            .captures(input)
            .ok_or_else(|| RelayError::invalid_input(format!("invalid image: {}", FORMAT_HINT)))?;

        let kind = captures
            .get(1)
            .and_then(|m| ImageKind::from_subtype(m.as_str()))
            .ok_or_else(|| RelayError::invalid_input(format!("invalid image: {}", FORMAT_HINT)))?;
        let body = captures.get(2).map(|m| m.as_str()).unwrap_or_default();

        let data = STANDARD
            .decode(body)
            .map_err(|e| RelayError::invalid_input(format!("invalid image: decode: {}", e)))?;

        Ok(Self {
            kind,
            data: Bytes::from(data),
        })
    }

    /// Encode raw image bytes as a data URL
    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/{};base64,{}",
            self.kind.subtype(),
            STANDARD.encode(&self.data)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_png() {
        let image = EmbeddedImage::parse("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(image.kind, ImageKind::Png);
        assert_eq!(&image.data[..], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_jpeg_normalized_to_jpg() {
        let image = EmbeddedImage::parse("data:image/jpeg;base64,/9j/4A==").unwrap();
        assert_eq!(image.kind, ImageKind::Jpeg);
        assert_eq!(image.kind.extension(), "jpg");
        assert_eq!(ImageKind::Png.extension(), "png");
    }

    #[test]
    fn test_reject_wrong_shapes() {
        let cases = [
            "",
            "iVBORw0KGgo=",
            "http://example.com/a.png",
            "data:image/gif;base64,R0lGODlh",
            "data:image/png,iVBORw0KGgo=",
            "data:image/png;base64,",
            "data:text/plain;base64,aGVsbG8=",
            "DATA:image/png;base64,iVBORw0KGgo=",
        ];

        for case in cases {
            let err = EmbeddedImage::parse(case).unwrap_err();
            assert!(matches!(err, RelayError::InvalidInput(_)), "accepted {:?}", case);
        }
    }

    #[test]
    fn test_reject_bad_base64() {
        let err = EmbeddedImage::parse("data:image/png;base64,not*base64!").unwrap_err();
        match err {
            RelayError::InvalidInput(msg) => assert!(msg.contains("decode")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_data_url_roundtrip() {
        let image = EmbeddedImage {
            kind: ImageKind::Jpeg,
            data: Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]),
        };
        let url = image.to_data_url();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert_eq!(EmbeddedImage::parse(&url).unwrap(), image);
    }
}
