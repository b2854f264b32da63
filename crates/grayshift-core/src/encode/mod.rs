//! Capability-aware encoding of grayscale output.
//!
//! This module provides functionality for:
//! - Routing a (format, bit depth, alpha) key to a writer ([`route`])
//! - Resizing luminance and alpha with a Lanczos filter on the general path
//! - Merging luminance and alpha into the layout each container accepts
//! - Re-embedding the source ICC profile and the requested DPI
//!
//! # Capability table
//!
//! JPEG is always 8-bit single channel. WEBP and BMP are 8-bit with optional
//! alpha. PNG and TIFF keep 16-bit samples; combined with alpha they go
//! through the specialized writers ([`EncodePath::WidenedPng`],
//! [`EncodePath::StackedTiff`]) which do not resize. HEIF takes an 8 or
//! 10-bit plane and keeps alpha only at 8 bits.
//!
//! EXIF read at ingest is never written back.
//!
//! # Examples
//!
//! ```ignore
//! use grayshift_core::encode::encode;
//!
//! let bytes = encode(&gray.luminance, gray.alpha.as_ref(), &settings, &metadata)?;
//! ```

#[cfg(feature = "heif")]
mod heif;
mod raster;
mod resize;
mod route;
mod tiff;

pub use resize::{resize_alpha, resize_luminance, ResizeError};
pub use route::{route, EncodePath};

use image::{DynamicImage, GrayImage, ImageBuffer, LumaA, Rgba};
use thiserror::Error;

use crate::decode::ImageMetadata;
use crate::settings::{BitDepth, ConversionSettings, OutputFormat};
use crate::transform::{AlphaBuffer, Gray16Image, LuminanceBuffer};

/// Errors that can occur during encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// No writer exists for this format, depth and alpha combination.
    #[error("Unsupported combination: {format} at {bit_depth}-bit (alpha: {alpha})")]
    UnsupportedCombination {
        format: OutputFormat,
        bit_depth: u32,
        alpha: bool,
    },

    /// Luminance and alpha planes differ in size.
    #[error("Alpha size {alpha:?} does not match luminance size {luminance:?}")]
    AlphaMismatch {
        luminance: (u32, u32),
        alpha: (u32, u32),
    },

    /// The requested resize could not be performed.
    #[error(transparent)]
    Resize(#[from] ResizeError),

    /// The TIFF writer failed.
    #[error("TIFF encoding failed: {0}")]
    Tiff(#[from] ::tiff::TiffError),

    /// libheif failed.
    #[cfg(feature = "heif")]
    #[error("HEIF encoding failed: {0}")]
    Heif(#[from] libheif_rs::HeifError),

    /// An image crate encoder failed.
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
}

/// Metadata re-embedded into the output.
///
/// Empty when the request asks to strip metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Embedding<'a> {
    pub icc_profile: Option<&'a [u8]>,
    pub dpi: Option<u32>,
}

impl<'a> Embedding<'a> {
    pub fn new(settings: &ConversionSettings, metadata: &'a ImageMetadata) -> Self {
        if settings.strip_metadata {
            return Self::default();
        }
        Self {
            icc_profile: metadata.icc_profile.as_deref(),
            dpi: settings.dpi,
        }
    }
}

/// Encode a grayscale image into the container named by `settings.format`.
///
/// # Arguments
///
/// * `luminance` - Luminance at the requested depth
/// * `alpha` - Source alpha; ignored unless `settings.preserve_alpha` is set
/// * `settings` - Output format, quality, size, DPI and metadata options
/// * `metadata` - Source metadata, used for ICC passthrough
///
/// # Returns
///
/// Encoded file bytes.
///
/// # Errors
///
/// Returns `EncodeError::UnsupportedCombination` when HEIF support is not
/// compiled in, `EncodeError::Resize` for zero target dimensions, and a
/// writer error otherwise.
pub fn encode(
    luminance: &LuminanceBuffer,
    alpha: Option<&AlphaBuffer>,
    settings: &ConversionSettings,
    metadata: &ImageMetadata,
) -> Result<Vec<u8>, EncodeError> {
    let alpha = alpha.filter(|_| settings.preserve_alpha);
    if let Some(a) = alpha {
        if a.dimensions() != luminance.dimensions() {
            return Err(EncodeError::AlphaMismatch {
                luminance: luminance.dimensions(),
                alpha: a.dimensions(),
            });
        }
    }

    let path = route(settings.format, luminance.depth(), alpha.is_some());
    log::debug!(
        "encoding {} at {}-bit (alpha: {}) via {:?}",
        settings.format,
        luminance.depth().bits(),
        alpha.is_some(),
        path
    );
    let embed = Embedding::new(settings, metadata);
    let alpha = alpha.filter(|_| path.keeps_alpha());

    match path {
        EncodePath::General { wide, .. } => {
            let (luminance, alpha) = resized(luminance, alpha, settings)?;
            if settings.format == OutputFormat::Jpeg {
                let gray = luminance.to_eight();
                return raster::write_jpeg(&gray, settings.quality, settings.subsampling, &embed);
            }
            let pixels = general_raster(&luminance, alpha.as_ref(), wide, settings.format);
            match settings.format {
                OutputFormat::Png => raster::write_png(&pixels, &embed),
                OutputFormat::Tiff => tiff::write_tiff(&pixels, &embed),
                OutputFormat::Webp => raster::write_webp(&pixels, &embed),
                OutputFormat::Bmp => raster::write_bmp(&pixels, &embed),
                OutputFormat::Jpeg | OutputFormat::Heif => {
                    Err(unsupported(settings.format, luminance.depth(), alpha.is_some()))
                }
            }
        }
        EncodePath::StackedTiff => {
            let (image, alpha) = wide_pair(settings.format, luminance, alpha)?;
            tiff::write_stacked(image, &alpha.widened(), &embed)
        }
        EncodePath::WidenedPng => {
            let (image, alpha) = wide_pair(settings.format, luminance, alpha)?;
            let rgba = widened_rgba(image, &alpha.widened());
            raster::write_png(&DynamicImage::ImageRgba16(rgba), &embed)
        }
        EncodePath::Heif { ten_bit, .. } => {
            let (luminance, alpha) = resized(luminance, alpha, settings)?;
            write_heif(&luminance, alpha.as_ref(), ten_bit, settings, &embed)
        }
    }
}

fn unsupported(format: OutputFormat, depth: BitDepth, alpha: bool) -> EncodeError {
    EncodeError::UnsupportedCombination {
        format,
        bit_depth: depth.bits(),
        alpha,
    }
}

/// Apply the requested resize to luminance and alpha alike.
fn resized(
    luminance: &LuminanceBuffer,
    alpha: Option<&AlphaBuffer>,
    settings: &ConversionSettings,
) -> Result<(LuminanceBuffer, Option<AlphaBuffer>), EncodeError> {
    let Some(size) = settings.size else {
        return Ok((luminance.clone(), alpha.cloned()));
    };
    let luminance = resize_luminance(luminance, size)?;
    let alpha = alpha
        .map(|a| resize_alpha(a, size))
        .transpose()?;
    Ok((luminance, alpha))
}

/// Unpack the 16-bit luminance and the alpha a specialized path needs.
fn wide_pair<'a>(
    format: OutputFormat,
    luminance: &'a LuminanceBuffer,
    alpha: Option<&'a AlphaBuffer>,
) -> Result<(&'a Gray16Image, &'a AlphaBuffer), EncodeError> {
    match (luminance, alpha) {
        (LuminanceBuffer::Wide { image, .. }, Some(alpha)) => Ok((image, alpha)),
        _ => Err(unsupported(format, luminance.depth(), alpha.is_some())),
    }
}

/// Build the raster the general encoders take.
///
/// BMP has no gray+alpha layout, so alpha there goes out as RGBA with the
/// gray value replicated.
fn general_raster(
    luminance: &LuminanceBuffer,
    alpha: Option<&AlphaBuffer>,
    wide: bool,
    format: OutputFormat,
) -> DynamicImage {
    match (luminance, alpha) {
        (LuminanceBuffer::Wide { image, .. }, None) if wide => {
            DynamicImage::ImageLuma16(image.clone())
        }
        (LuminanceBuffer::Wide { image, .. }, Some(alpha)) if wide => {
            let alpha = alpha.widened();
            let (width, height) = image.dimensions();
            DynamicImage::ImageLumaA16(ImageBuffer::from_fn(width, height, |x, y| {
                LumaA([image.get_pixel(x, y)[0], alpha.get_pixel(x, y)[0]])
            }))
        }
        (_, None) => DynamicImage::ImageLuma8(luminance.to_eight()),
        (_, Some(alpha)) => {
            let gray = luminance.to_eight();
            if format == OutputFormat::Bmp {
                DynamicImage::ImageRgba8(merge_rgba8(&gray, alpha.image()))
            } else {
                let (width, height) = gray.dimensions();
                DynamicImage::ImageLumaA8(ImageBuffer::from_fn(width, height, |x, y| {
                    LumaA([gray.get_pixel(x, y)[0], alpha.image().get_pixel(x, y)[0]])
                }))
            }
        }
    }
}

fn merge_rgba8(gray: &GrayImage, alpha: &GrayImage) -> ImageBuffer<Rgba<u8>, Vec<u8>> {
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        Rgba([v, v, v, alpha.get_pixel(x, y)[0]])
    })
}

/// Replicate 16-bit gray into RGB and attach 16-bit alpha.
fn widened_rgba(gray: &Gray16Image, alpha: &Gray16Image) -> ImageBuffer<Rgba<u16>, Vec<u16>> {
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        Rgba([v, v, v, alpha.get_pixel(x, y)[0]])
    })
}

#[cfg(feature = "heif")]
fn write_heif(
    luminance: &LuminanceBuffer,
    alpha: Option<&AlphaBuffer>,
    ten_bit: bool,
    settings: &ConversionSettings,
    embed: &Embedding<'_>,
) -> Result<Vec<u8>, EncodeError> {
    use heif::HeifLuma;

    let (quality, subsampling) = (settings.quality, settings.subsampling);
    match luminance {
        LuminanceBuffer::Wide {
            depth: BitDepth::Ten,
            image,
        } if ten_bit => heif::write_heif(HeifLuma::Ten(image), None, quality, subsampling, embed),
        _ => {
            let gray = luminance.to_eight();
            let alpha = alpha.map(AlphaBuffer::image);
            heif::write_heif(HeifLuma::Eight(&gray), alpha, quality, subsampling, embed)
        }
    }
}

#[cfg(not(feature = "heif"))]
fn write_heif(
    luminance: &LuminanceBuffer,
    alpha: Option<&AlphaBuffer>,
    _ten_bit: bool,
    settings: &ConversionSettings,
    _embed: &Embedding<'_>,
) -> Result<Vec<u8>, EncodeError> {
    Err(unsupported(settings.format, luminance.depth(), alpha.is_some()))
}
