//! # Image Format Detection
//!
//! Identifies the container format of raw image bytes from their leading
//! signature, then confirms it by reading the image header with the `image`
//! crate. The detected format's extension names the output file.
//!
//! | Format | Signature                        | Extension |
//! |--------|----------------------------------|-----------|
//! | PNG    | `89 50 4E 47 0D 0A 1A 0A`        | `png`     |
//! | JPEG   | `FF D8 FF`                       | `jpeg`    |
//! | GIF    | `GIF87a` / `GIF89a`              | `gif`     |
//! | BMP    | `BM`                             | `bmp`     |
//! | WebP   | `RIFF` + 4 size bytes + `WEBP`   | `webp`    |

use image::ImageFormat;
use std::io::Cursor;

use super::error::DecodeError;

/// A byte signature: every `(offset, magic)` pair must match.
struct Signature {
    parts: &'static [(usize, &'static [u8])],
    format: ImageFormat,
    extension: &'static str,
}

impl Signature {
    fn matches(&self, bytes: &[u8]) -> bool {
        self.parts.iter().all(|(offset, magic)| {
            bytes
                .get(*offset..offset + magic.len())
                .map_or(false, |window| window == *magic)
        })
    }
}

const SIGNATURES: &[Signature] = &[
    Signature {
        parts: &[(0, b"\x89PNG\r\n\x1a\n")],
        format: ImageFormat::Png,
        extension: "png",
    },
    Signature {
        parts: &[(0, &[0xFF, 0xD8, 0xFF])],
        format: ImageFormat::Jpeg,
        extension: "jpeg",
    },
    Signature {
        parts: &[(0, b"GIF87a")],
        format: ImageFormat::Gif,
        extension: "gif",
    },
    Signature {
        parts: &[(0, b"GIF89a")],
        format: ImageFormat::Gif,
        extension: "gif",
    },
    Signature {
        parts: &[(0, b"BM")],
        format: ImageFormat::Bmp,
        extension: "bmp",
    },
    Signature {
        parts: &[(0, b"RIFF"), (8, b"WEBP")],
        format: ImageFormat::WebP,
        extension: "webp",
    },
];

/// Result of a successful detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedImage {
    pub format: ImageFormat,
    /// Canonical file extension, without the dot
    pub extension: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Detect the image format of `bytes`.
///
/// # Errors
/// - [`DecodeError::UnknownFormat`]: no known signature matches
/// - [`DecodeError::CorruptImage`]: the signature matches but the header
///   cannot be read
pub fn detect(bytes: &[u8]) -> Result<DetectedImage, DecodeError> {
    let signature = SIGNATURES
        .iter()
        .find(|s| s.matches(bytes))
        .ok_or(DecodeError::UnknownFormat)?;

    let (width, height) = image::io::Reader::with_format(Cursor::new(bytes), signature.format)
        .into_dimensions()
        .map_err(|source| DecodeError::CorruptImage {
            format: signature.extension,
            source,
        })?;

    Ok(DetectedImage {
        format: signature.format,
        extension: signature.extension,
        width,
        height,
    })
}
