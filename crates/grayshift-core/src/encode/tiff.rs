//! TIFF output through the `tiff` crate.
//!
//! The `image` crate's TIFF encoder has no gray+alpha layout, so every TIFF
//! (plain gray, gray+alpha, 8 or 16 bits) is written here as a single
//! BlackIsZero directory with one or two samples per pixel.

use std::io::Cursor;

use image::DynamicImage;
use tiff::encoder::colortype::{ColorType, Gray16, Gray8};
use tiff::encoder::{Rational, TiffEncoder, TiffValue};
use tiff::tags::{PhotometricInterpretation, ResolutionUnit, SampleFormat, Tag};

use super::{EncodeError, Embedding};
use crate::transform::Gray16Image;

/// ExtraSamples value for unassociated (straight) alpha.
const UNASSOCIATED_ALPHA: u16 = 2;

/// Delta-encode interleaved samples of `channels` per pixel.
fn predict_interleaved<T>(row: &[T], result: &mut Vec<T>, channels: usize, sub: fn(T, T) -> T)
where
    T: Copy,
{
    let split = channels.min(row.len());
    result.extend_from_slice(&row[..split]);
    result.extend(
        row.iter()
            .zip(&row[split..])
            .map(|(prev, current)| sub(*current, *prev)),
    );
}

/// 8-bit gray plus 8-bit alpha.
pub struct GrayAlpha8;

impl ColorType for GrayAlpha8 {
    type Inner = u8;
    const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::BlackIsZero;
    const BITS_PER_SAMPLE: &'static [u16] = &[8, 8];
    const SAMPLE_FORMAT: &'static [SampleFormat] = &[SampleFormat::Uint, SampleFormat::Uint];

    fn horizontal_predict(row: &[u8], result: &mut Vec<u8>) {
        predict_interleaved(row, result, 2, u8::wrapping_sub);
    }
}

/// 16-bit gray plus 16-bit alpha.
pub struct GrayAlpha16;

impl ColorType for GrayAlpha16 {
    type Inner = u16;
    const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::BlackIsZero;
    const BITS_PER_SAMPLE: &'static [u16] = &[16, 16];
    const SAMPLE_FORMAT: &'static [SampleFormat] = &[SampleFormat::Uint, SampleFormat::Uint];

    fn horizontal_predict(row: &[u16], result: &mut Vec<u16>) {
        predict_interleaved(row, result, 2, u16::wrapping_sub);
    }
}

/// Write one directory with the given colortype and samples.
fn write_directory<C>(
    width: u32,
    height: u32,
    samples: &[C::Inner],
    embed: &Embedding<'_>,
) -> Result<Vec<u8>, EncodeError>
where
    C: ColorType,
    [C::Inner]: TiffValue,
{
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buffer)?;
        let mut image = encoder.new_image::<C>(width, height)?;
        let directory = image.encoder();

        if C::BITS_PER_SAMPLE.len() == 2 {
            directory.write_tag(Tag::ExtraSamples, UNASSOCIATED_ALPHA)?;
        }
        if let Some(dpi) = embed.dpi {
            let resolution = Rational { n: dpi, d: 1 };
            directory.write_tag(Tag::ResolutionUnit, ResolutionUnit::Inch.to_u16())?;
            directory.write_tag(Tag::XResolution, resolution.clone())?;
            directory.write_tag(Tag::YResolution, resolution)?;
        }
        if let Some(icc) = embed.icc_profile {
            directory.write_tag(Tag::IccProfile, icc)?;
        }

        image.write_data(samples)?;
    }
    Ok(buffer.into_inner())
}

/// Encode a gray or gray+alpha raster (8 or 16 bits) as TIFF.
pub fn write_tiff(img: &DynamicImage, embed: &Embedding<'_>) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = (img.width(), img.height());
    match img {
        DynamicImage::ImageLuma8(b) => write_directory::<Gray8>(width, height, b.as_raw(), embed),
        DynamicImage::ImageLumaA8(b) => {
            write_directory::<GrayAlpha8>(width, height, b.as_raw(), embed)
        }
        DynamicImage::ImageLuma16(b) => {
            write_directory::<Gray16>(width, height, b.as_raw(), embed)
        }
        DynamicImage::ImageLumaA16(b) => {
            write_directory::<GrayAlpha16>(width, height, b.as_raw(), embed)
        }
        other => Err(EncodeError::EncodingFailed(format!(
            "TIFF writer expects a gray raster, got {:?}",
            other.color()
        ))),
    }
}

/// Stack 16-bit luminance and 16-bit alpha planes into one two-sample TIFF.
///
/// # Errors
///
/// Returns `EncodeError::AlphaMismatch` if the planes differ in size.
pub fn write_stacked(
    luminance: &Gray16Image,
    alpha: &Gray16Image,
    embed: &Embedding<'_>,
) -> Result<Vec<u8>, EncodeError> {
    if luminance.dimensions() != alpha.dimensions() {
        return Err(EncodeError::AlphaMismatch {
            luminance: luminance.dimensions(),
            alpha: alpha.dimensions(),
        });
    }
    let stacked: Vec<u16> = luminance
        .as_raw()
        .iter()
        .zip(alpha.as_raw())
        .flat_map(|(&l, &a)| [l, a])
        .collect();
    let (width, height) = luminance.dimensions();
    write_directory::<GrayAlpha16>(width, height, &stacked, embed)
}
