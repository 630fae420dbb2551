// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decoding of raw camera bytes into frames

use image::{DynamicImage, ImageFormat};
use thiserror::Error;

/// Frames larger than this are rejected before decoding (10MB)
const MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

/// Errors from the frame decode path
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Frame is empty")]
    Empty,

    #[error("Frame is {0} bytes, over the {MAX_FRAME_BYTES} byte limit")]
    Oversized(usize),

    #[error("Frame bytes are not a recognized image format")]
    UnknownFormat,

    #[error("Frame failed to decode as {format:?}: {message}")]
    Undecodable {
        format: ImageFormat,
        message: String,
    },
}

/// Dimensions and provenance of a decoded frame
#[derive(Debug, Clone)]
pub struct FrameInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Encoded format the camera delivered
    pub format: ImageFormat,
    /// Encoded size in bytes
    pub size_bytes: usize,
}

/// Decode one fetched camera frame
///
/// The format is sniffed from the leading magic bytes rather than trusted
/// from the camera's content type; empty, oversized and unrecognized
/// payloads are rejected before the decoder runs.
pub fn decode_frame(bytes: &[u8]) -> Result<(DynamicImage, FrameInfo), FrameError> {
    if bytes.is_empty() {
        return Err(FrameError::Empty);
    }
    if bytes.len() > MAX_FRAME_BYTES {
        return Err(FrameError::Oversized(bytes.len()));
    }

    let format = sniff_format(bytes).ok_or(FrameError::UnknownFormat)?;

    let frame = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        FrameError::Undecodable {
            format,
            message: e.to_string(),
        }
    })?;

    let info = FrameInfo {
        width: frame.width(),
        height: frame.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok((frame, info))
}

/// Identify the encoded format from the frame's leading bytes
///
/// JPEG first: it is what ESP32-CAM class devices produce.
fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some(ImageFormat::Png)
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        Some(ImageFormat::WebP)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(ImageFormat::Gif)
    } else if bytes.starts_with(b"BM") {
        Some(ImageFormat::Bmp)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Encode a small solid frame in the given format
    fn encoded_frame(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(width, height);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format)
            .expect("encoding failed");
        bytes
    }

    #[test]
    fn test_decode_frame_png() {
        let bytes = encoded_frame(4, 3, ImageFormat::Png);
        let (frame, info) = decode_frame(&bytes).expect("PNG frame should decode");

        assert_eq!((frame.width(), frame.height()), (4, 3));
        assert_eq!(info.width, 4);
        assert_eq!(info.height, 3);
        assert_eq!(info.format, ImageFormat::Png);
        assert_eq!(info.size_bytes, bytes.len());
    }

    #[test]
    fn test_decode_frame_jpeg() {
        let bytes = encoded_frame(8, 8, ImageFormat::Jpeg);
        let (_, info) = decode_frame(&bytes).expect("JPEG frame should decode");
        assert_eq!(info.format, ImageFormat::Jpeg);
    }

    #[test]
    fn test_decode_frame_rejects_empty() {
        assert!(matches!(decode_frame(&[]), Err(FrameError::Empty)));
    }

    #[test]
    fn test_decode_frame_rejects_oversized() {
        let bytes = vec![0u8; MAX_FRAME_BYTES + 1];
        assert!(matches!(
            decode_frame(&bytes),
            Err(FrameError::Oversized(_))
        ));
    }

    #[test]
    fn test_decode_frame_rejects_unknown_bytes() {
        let result = decode_frame(&[0x00, 0x01, 0x02, 0x03, 0x04, 0x05]);
        assert!(matches!(result, Err(FrameError::UnknownFormat)));
    }

    #[test]
    fn test_decode_frame_rejects_truncated_payload() {
        // A valid prefix cut off mid-stream sniffs fine but fails to decode
        let mut bytes = encoded_frame(16, 16, ImageFormat::Png);
        bytes.truncate(bytes.len() / 2);

        let result = decode_frame(&bytes);
        assert!(matches!(result, Err(FrameError::Undecodable { .. })));
    }

    #[test]
    fn test_sniff_format_magic_bytes() {
        assert_eq!(
            sniff_format(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            sniff_format(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A]),
            Some(ImageFormat::Png)
        );
        assert_eq!(sniff_format(b"GIF87a..."), Some(ImageFormat::Gif));
        assert_eq!(sniff_format(b"GIF89a..."), Some(ImageFormat::Gif));
        assert_eq!(
            sniff_format(b"RIFF\x00\x00\x00\x00WEBPVP8 "),
            Some(ImageFormat::WebP)
        );
        assert_eq!(sniff_format(b"BMxxxx"), Some(ImageFormat::Bmp));
    }

    #[test]
    fn test_sniff_format_rejects_short_or_unknown() {
        assert_eq!(sniff_format(&[]), None);
        assert_eq!(sniff_format(b"RIFF1234"), None); // RIFF but not WEBP
        assert_eq!(sniff_format(&[0x00, 0x00, 0x00, 0x00]), None);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(FrameError::Empty.to_string(), "Frame is empty");
        assert!(FrameError::Oversized(99).to_string().contains("99 bytes"));
    }
}
