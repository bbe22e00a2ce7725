//! Image codec contract and the default `image`-crate implementation.
//!
//! The action layer only talks to [`ImageCodec`], so the decode/resize/
//! encode machinery can be swapped (or stubbed in tests) without touching
//! the workflow.

use bytes::Bytes;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use larder_core::config::OutputFormat;
use std::io::Cursor;
use thiserror::Error;

/// A payload failed to decode or encode.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CodecError(pub String);

/// A decoded image together with its source encoding and the orientation
/// its metadata asked for.
pub struct DecodedImage {
    pub image: DynamicImage,
    /// Source format, mapped onto a storable output format when possible.
    pub format: Option<OutputFormat>,
    /// Pending orientation correction; `NoTransforms` once applied.
    pub orientation: Orientation,
}

impl DecodedImage {
    /// Longer edge of the image in pixels.
    pub fn longer_edge(&self) -> u32 {
        self.image.width().max(self.image.height())
    }
}

/// Image decode/transform/encode capability.
pub trait ImageCodec: Send + Sync {
    /// Decode payload bytes, reading the embedded orientation if present.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, CodecError>;

    /// Apply the pending orientation so the pixels are canonically upright.
    fn orient(&self, decoded: &mut DecodedImage);

    /// Resize to fit within `max_edge` on the longer side, preserving the
    /// aspect ratio.
    fn resize(&self, image: &DynamicImage, max_edge: u32) -> DynamicImage;

    /// Encode to the target format. The output carries no metadata, so no
    /// orientation tag survives re-encoding.
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Bytes, CodecError>;
}

/// Default codec built on the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

fn storable_format(format: ImageFormat) -> Option<OutputFormat> {
    match format {
        ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
        ImageFormat::Png => Some(OutputFormat::Png),
        ImageFormat::WebP => Some(OutputFormat::WebP),
        _ => None,
    }
}

impl ImageCodec for RustCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, CodecError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CodecError(e.to_string()))?;
        let format = reader.format();
        let mut decoder = reader
            .into_decoder()
            .map_err(|e| CodecError(e.to_string()))?;
        // Orientation is best-effort; images without EXIF simply need no
        // correction.
        let orientation = decoder
            .orientation()
            .unwrap_or(Orientation::NoTransforms);
        let image =
            DynamicImage::from_decoder(decoder).map_err(|e| CodecError(e.to_string()))?;
        Ok(DecodedImage {
            image,
            format: format.and_then(storable_format),
            orientation,
        })
    }

    fn orient(&self, decoded: &mut DecodedImage) {
        decoded.image.apply_orientation(decoded.orientation);
        decoded.orientation = Orientation::NoTransforms;
    }

    fn resize(&self, image: &DynamicImage, max_edge: u32) -> DynamicImage {
        image.resize(max_edge, max_edge, FilterType::Lanczos3)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Bytes, CodecError> {
        let mut cursor = Cursor::new(Vec::new());
        match format {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel.
                let encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
                image
                    .to_rgb8()
                    .write_with_encoder(encoder)
                    .map_err(|e| CodecError(e.to_string()))?;
            }
            OutputFormat::Png => {
                image
                    .write_to(&mut cursor, ImageFormat::Png)
                    .map_err(|e| CodecError(e.to_string()))?;
            }
            OutputFormat::WebP => {
                let encoder = image::codecs::webp::WebPEncoder::new_lossless(&mut cursor);
                image
                    .to_rgba8()
                    .write_with_encoder(encoder)
                    .map_err(|e| CodecError(e.to_string()))?;
            }
        }
        Ok(Bytes::from(cursor.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn test_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageFormat::Jpeg)
            .unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_decode_jpeg_reports_format_and_dimensions() {
        let codec = RustCodec::new();
        let decoded = codec.decode(&test_jpeg(200, 150)).unwrap();
        assert_eq!(decoded.image.width(), 200);
        assert_eq!(decoded.image.height(), 150);
        assert_eq!(decoded.format, Some(OutputFormat::Jpeg));
        assert_eq!(decoded.orientation, Orientation::NoTransforms);
        assert_eq!(decoded.longer_edge(), 200);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let codec = RustCodec::new();
        assert!(codec.decode(b"definitely not an image").is_err());
    }

    #[test]
    fn test_resize_preserves_aspect_ratio() {
        let codec = RustCodec::new();
        let decoded = codec.decode(&test_jpeg(400, 300)).unwrap();
        let resized = codec.resize(&decoded.image, 100);
        assert_eq!(resized.width(), 100);
        assert_eq!(resized.height(), 75);
    }

    #[test]
    fn test_encode_roundtrip() {
        let codec = RustCodec::new();
        let decoded = codec.decode(&test_jpeg(64, 48)).unwrap();
        for format in [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::WebP] {
            let encoded = codec.encode(&decoded.image, format, 90).unwrap();
            let reparsed = codec.decode(&encoded).unwrap();
            assert_eq!(reparsed.image.width(), 64, "{format:?}");
            assert_eq!(reparsed.image.height(), 48, "{format:?}");
            assert_eq!(reparsed.format, Some(format));
        }
    }

    #[test]
    fn test_orient_rotates_and_clears_tag() {
        let codec = RustCodec::new();
        let mut decoded = codec.decode(&test_jpeg(200, 100)).unwrap();
        decoded.orientation = Orientation::Rotate90;
        codec.orient(&mut decoded);
        assert_eq!(decoded.image.width(), 100);
        assert_eq!(decoded.image.height(), 200);
        assert_eq!(decoded.orientation, Orientation::NoTransforms);
    }
}
