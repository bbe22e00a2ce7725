//! Synthetic image fixtures.

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;

/// A small valid JPEG with a color gradient.
#[allow(dead_code)]
pub fn make_jpeg(width: u32, height: u32) -> Bytes {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, ImageFormat::Jpeg)
        .unwrap();
    Bytes::from(cursor.into_inner())
}

/// A small valid PNG.
#[allow(dead_code)]
pub fn make_png(width: u32, height: u32) -> Bytes {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, 64, (y % 256) as u8])
    });
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    Bytes::from(cursor.into_inner())
}

/// A JPEG carrying an EXIF orientation tag.
///
/// Splices a minimal APP1 Exif segment (TIFF header + one IFD with the
/// Orientation entry) right after the SOI marker. Orientation values follow
/// the EXIF spec; 6 means "rotate 90° clockwise to display".
#[allow(dead_code)]
pub fn jpeg_with_orientation(width: u32, height: u32, orientation: u16) -> Bytes {
    let base = make_jpeg(width, height);

    let mut exif = Vec::new();
    exif.extend_from_slice(b"Exif\0\0");
    // TIFF header, little-endian, IFD0 at offset 8
    exif.extend_from_slice(b"II");
    exif.extend_from_slice(&42u16.to_le_bytes());
    exif.extend_from_slice(&8u32.to_le_bytes());
    // IFD0: one entry, tag 0x0112 (Orientation), type SHORT, count 1
    exif.extend_from_slice(&1u16.to_le_bytes());
    exif.extend_from_slice(&0x0112u16.to_le_bytes());
    exif.extend_from_slice(&3u16.to_le_bytes());
    exif.extend_from_slice(&1u32.to_le_bytes());
    exif.extend_from_slice(&orientation.to_le_bytes());
    exif.extend_from_slice(&0u16.to_le_bytes()); // value padding
    exif.extend_from_slice(&0u32.to_le_bytes()); // no next IFD

    let mut out = Vec::with_capacity(base.len() + exif.len() + 4);
    out.extend_from_slice(&base[..2]); // SOI
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((exif.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&exif);
    out.extend_from_slice(&base[2..]);
    Bytes::from(out)
}
