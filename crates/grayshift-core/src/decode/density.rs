//! Pixel density declared by the container itself.
//!
//! PNG `pHYs`, JFIF APP0 density and TIFF X/YResolution are read here. EXIF
//! resolution is the caller's fallback when the container declares none.

use std::io::Cursor;

use image::ImageFormat;
use tiff::decoder::ifd::Value;
use tiff::decoder::Decoder as TiffDecoder;
use tiff::tags::Tag;

const INCHES_PER_METER: f64 = 0.0254;
const CM_PER_INCH: f64 = 2.54;

/// Horizontal DPI from the container header, if it declares one.
pub fn container_dpi(bytes: &[u8], format: ImageFormat) -> Option<f64> {
    match format {
        ImageFormat::Png => png_dpi(bytes),
        ImageFormat::Jpeg => jfif_dpi(bytes),
        ImageFormat::Tiff => tiff_dpi(bytes),
        _ => None,
    }
}

/// `pHYs` in pixels per metre; an unspecified unit is only an aspect ratio.
fn png_dpi(bytes: &[u8]) -> Option<f64> {
    let reader = png::Decoder::new(Cursor::new(bytes)).read_info().ok()?;
    let dims = reader.info().pixel_dims?;
    match dims.unit {
        png::Unit::Meter => Some(dims.xppu as f64 * INCHES_PER_METER),
        png::Unit::Unspecified => None,
    }
}

/// Walk the JPEG marker segments up to the scan and read the JFIF density.
fn jfif_dpi(bytes: &[u8]) -> Option<f64> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut pos = 2;
    while pos + 4 <= bytes.len() && bytes[pos] == 0xFF {
        let marker = bytes[pos + 1];
        // SOS: entropy-coded data follows
        if marker == 0xDA {
            return None;
        }
        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        let segment = bytes.get(pos + 4..pos + 2 + len)?;
        if marker == 0xE0 && segment.len() >= 12 && segment.starts_with(b"JFIF\0") {
            let x_density = u16::from_be_bytes([segment[8], segment[9]]) as f64;
            return match segment[7] {
                1 => Some(x_density),
                2 => Some(x_density * CM_PER_INCH),
                _ => None,
            };
        }
        pos += 2 + len;
    }
    None
}

/// XResolution with ResolutionUnit, where a missing unit means inches.
fn tiff_dpi(bytes: &[u8]) -> Option<f64> {
    let mut decoder = TiffDecoder::new(Cursor::new(bytes)).ok()?;
    let resolution = match decoder.get_tag(Tag::XResolution).ok()? {
        Value::Rational(n, d) if d != 0 => n as f64 / d as f64,
        _ => return None,
    };
    match decoder.get_tag_u32(Tag::ResolutionUnit).unwrap_or(2) {
        2 => Some(resolution),
        3 => Some(resolution * CM_PER_INCH),
        _ => None,
    }
}
