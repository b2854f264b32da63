//! JPEG, WebP and BMP writers built on the `image` crate encoders, plus PNG
//! through the `png` encoder for its `pHYs` support.

use std::borrow::Cow;
use std::io::Cursor;

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, GrayImage, ImageEncoder};

use super::{EncodeError, Embedding};
use crate::settings::ChromaSubsampling;

const METERS_PER_INCH: f64 = 0.0254;

fn failed(e: impl std::fmt::Display) -> EncodeError {
    EncodeError::EncodingFailed(e.to_string())
}

/// Hand the ICC profile to an encoder, dropping it if the encoder refuses.
fn attach_icc(encoder: &mut impl ImageEncoder, embed: &Embedding<'_>) {
    if let Some(icc) = embed.icc_profile {
        if let Err(e) = encoder.set_icc_profile(icc.to_vec()) {
            log::debug!("ICC profile dropped: {}", e);
        }
    }
}

/// Encode single-channel 8-bit luminance as baseline JPEG.
///
/// Quality is clamped to 1..=100. Subsampling only affects chroma planes,
/// which a grayscale JPEG does not have.
pub fn write_jpeg(
    img: &GrayImage,
    quality: u8,
    subsampling: ChromaSubsampling,
    embed: &Embedding<'_>,
) -> Result<Vec<u8>, EncodeError> {
    let quality = quality.clamp(1, 100);
    log::debug!(
        "JPEG quality {} (subsampling {} has no effect on a single channel)",
        quality,
        subsampling.ratio()
    );

    let mut buffer = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    if let Some(dpi) = embed.dpi {
        let density = u16::try_from(dpi)
            .map_err(|_| failed(format!("DPI {} does not fit the JFIF density field", dpi)))?;
        encoder.set_pixel_density(PixelDensity::dpi(density));
    }
    attach_icc(&mut encoder, embed);
    encoder
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::L8)
        .map_err(failed)?;

    Ok(buffer.into_inner())
}

/// Encode a gray, gray+alpha or RGBA16 raster as PNG, 8 or 16 bits per sample.
///
/// DPI goes into a `pHYs` chunk in pixels per metre, ICC into `iCCP`.
pub fn write_png(img: &DynamicImage, embed: &Embedding<'_>) -> Result<Vec<u8>, EncodeError> {
    use png::{BitDepth, ColorType};

    let (color, depth, data): (ColorType, BitDepth, Cow<'_, [u8]>) = match img {
        DynamicImage::ImageLuma8(b) => (ColorType::Grayscale, BitDepth::Eight, b.as_raw().into()),
        DynamicImage::ImageLumaA8(b) => {
            (ColorType::GrayscaleAlpha, BitDepth::Eight, b.as_raw().into())
        }
        DynamicImage::ImageLuma16(b) => {
            (ColorType::Grayscale, BitDepth::Sixteen, big_endian(b.as_raw()).into())
        }
        DynamicImage::ImageLumaA16(b) => {
            (ColorType::GrayscaleAlpha, BitDepth::Sixteen, big_endian(b.as_raw()).into())
        }
        DynamicImage::ImageRgba16(b) => {
            (ColorType::Rgba, BitDepth::Sixteen, big_endian(b.as_raw()).into())
        }
        other => {
            return Err(failed(format!(
                "PNG writer expects a gray or RGBA16 raster, got {:?}",
                other.color()
            )))
        }
    };

    let mut info = png::Info::with_size(img.width(), img.height());
    info.icc_profile = embed.icc_profile.map(Cow::Borrowed);

    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::with_info(&mut buffer, info).map_err(failed)?;
        encoder.set_color(color);
        encoder.set_depth(depth);
        encoder.set_pixel_dims(embed.dpi.map(|dpi| {
            let ppm = (dpi as f64 / METERS_PER_INCH).round() as u32;
            png::PixelDimensions {
                xppu: ppm,
                yppu: ppm,
                unit: png::Unit::Meter,
            }
        }));
        let mut writer = encoder.write_header().map_err(failed)?;
        writer.write_image_data(&data).map_err(failed)?;
        writer.finish().map_err(failed)?;
    }
    Ok(buffer)
}

/// PNG stores 16-bit samples most significant byte first.
fn big_endian(samples: &[u16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_be_bytes()).collect()
}

/// Encode an 8-bit raster as lossless WebP.
pub fn write_webp(img: &DynamicImage, embed: &Embedding<'_>) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Cursor::new(Vec::new());
    let mut encoder = WebPEncoder::new_lossless(&mut buffer);
    attach_icc(&mut encoder, embed);
    img.write_with_encoder(encoder).map_err(failed)?;
    Ok(buffer.into_inner())
}

/// Encode an 8-bit raster as BMP. ICC and DPI are not carried.
pub fn write_bmp(img: &DynamicImage, embed: &Embedding<'_>) -> Result<Vec<u8>, EncodeError> {
    if embed.icc_profile.is_some() {
        log::debug!("BMP output cannot carry an ICC profile, dropping it");
    }
    let mut buffer = Cursor::new(Vec::new());
    let encoder = BmpEncoder::new(&mut buffer);
    img.write_with_encoder(encoder).map_err(failed)?;
    Ok(buffer.into_inner())
}
