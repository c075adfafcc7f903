//! Conversions between decoded images, encoded bytes, base64 payloads and
//! raw capture frames. No network or disk access except [`save_image`].

use crate::config::SourceEncoding;
use crate::error::{DecodeError, RenderError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Tightly packed BGRA8 pixels as handed over by a view capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    fn expected_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(4)
    }
}

pub fn encode_bytes(image: &DynamicImage, encoding: SourceEncoding, quality: u8) -> Result<Vec<u8>> {
    let mut bytes: Vec<u8> = Vec::new();
    match encoding {
        SourceEncoding::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = image.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
            encoder
                .encode_image(&rgb)
                .map_err(|e| RenderError::Encode(e.to_string()))?;
        }
        SourceEncoding::Png => {
            image
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                .map_err(|e| RenderError::Encode(e.to_string()))?;
        }
    }
    Ok(bytes)
}

pub fn encode_base64(image: &DynamicImage, encoding: SourceEncoding, quality: u8) -> Result<String> {
    let bytes = encode_bytes(image, encoding, quality)?;
    Ok(STANDARD.encode(bytes))
}

pub fn decode_bytes(bytes: &[u8]) -> std::result::Result<DynamicImage, DecodeError> {
    image::load_from_memory(bytes).map_err(|e| DecodeError::Image(e.to_string()))
}

/// Decodes a base64 PNG/JPEG payload. Accepts a `data:` URI prefix and
/// embedded line breaks.
pub fn decode_base64(data: &str) -> std::result::Result<DynamicImage, DecodeError> {
    let payload = match data.trim().strip_prefix("data:") {
        Some(uri) => uri.split_once(',').map(|(_, rest)| rest).unwrap_or(""),
        None => data,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    decode_bytes(&bytes)
}

/// Capture side to display side. Fails when the buffer size does not match
/// the frame dimensions.
pub fn frame_to_image(frame: &RawFrame) -> std::result::Result<DynamicImage, DecodeError> {
    let size_error = || DecodeError::FrameSize {
        width: frame.width,
        height: frame.height,
        expected: frame.expected_len().unwrap_or(usize::MAX),
        actual: frame.pixels.len(),
    };
    if frame.expected_len() != Some(frame.pixels.len()) {
        return Err(size_error());
    }

    let mut rgba = frame.pixels.clone();
    for px in rgba.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    RgbaImage::from_raw(frame.width, frame.height, rgba)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(size_error)
}

/// Display side back to a capture frame.
pub fn image_to_frame(image: &DynamicImage) -> RawFrame {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixels = rgba.into_raw();
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    RawFrame::new(width, height, pixels)
}

/// JPEG for `.jpg`/`.jpeg`, PNG for anything else.
pub fn encoding_for_path(path: &Path) -> SourceEncoding {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => SourceEncoding::Jpeg,
        _ => SourceEncoding::Png,
    }
}

pub fn save_image(image: &DynamicImage, path: &Path) -> Result<()> {
    let bytes = encode_bytes(image, encoding_for_path(path), 95)?;
    std::fs::write(path, bytes)
        .map_err(|e| RenderError::Io(format!("failed to write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let original = gradient(37, 21);
        let encoded = encode_base64(&original, SourceEncoding::Png, 90).unwrap();
        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded.to_rgb8(), original.to_rgb8());
    }

    #[test]
    fn jpeg_round_trip_keeps_dimensions() {
        let original = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            800,
            600,
            Rgba([10, 200, 30, 255]),
        ));
        let bytes = encode_bytes(&original, SourceEncoding::Jpeg, 90).unwrap();
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);

        let decoded = decode_base64(&STANDARD.encode(&bytes)).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 600));
    }

    #[test]
    fn malformed_base64_is_a_decode_error() {
        let err = decode_base64("not*base64!").unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn unknown_container_is_a_decode_error() {
        let err = decode_base64(&STANDARD.encode(b"plain text, not an image")).unwrap_err();
        assert!(matches!(err, DecodeError::Image(_)));
        assert!(matches!(decode_bytes(&[]), Err(DecodeError::Image(_))));
    }

    #[test]
    fn data_uri_and_line_breaks_are_accepted() {
        let encoded = encode_base64(&gradient(4, 4), SourceEncoding::Png, 90).unwrap();
        let (head, tail) = encoded.split_at(10);
        let wrapped = format!("data:image/png;base64,{}\n{}", head, tail);
        let decoded = decode_base64(&wrapped).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
    }

    #[test]
    fn frame_conversion_is_lossless_for_opaque_pixels() {
        let original = DynamicImage::ImageRgba8(RgbaImage::from_fn(5, 3, |x, y| {
            Rgba([x as u8 * 40, y as u8 * 70, 200, 255])
        }));
        let frame = image_to_frame(&original);
        assert_eq!((frame.width, frame.height), (5, 3));
        // First pixel is (0, 0, 200) in RGB, stored as BGRA.
        assert_eq!(&frame.pixels[..4], &[200, 0, 0, 255]);

        let back = frame_to_image(&frame).unwrap();
        assert_eq!(back.to_rgba8(), original.to_rgba8());
    }

    #[test]
    fn short_frame_buffer_is_rejected() {
        let frame = RawFrame::new(10, 10, vec![0; 10 * 10 * 4 - 1]);
        match frame_to_image(&frame) {
            Err(DecodeError::FrameSize {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 400);
                assert_eq!(actual, 399);
            }
            other => panic!("expected FrameSize error, got {:?}", other),
        }
    }

    #[test]
    fn save_picks_container_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let image = gradient(16, 8);

        let jpg = dir.path().join("result.JPG");
        save_image(&image, &jpg).unwrap();
        let bytes = std::fs::read(&jpg).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);

        let png = dir.path().join("result.png");
        save_image(&image, &png).unwrap();
        let bytes = std::fs::read(&png).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);

        let other = dir.path().join("result.bin");
        save_image(&image, &other).unwrap();
        let bytes = std::fs::read(&other).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }
}
