//! HEIF output: a monochrome HEVC image through libheif.
//!
//! Luma is written as an 8-bit or 10-bit Y plane. Alpha is only carried
//! next to an 8-bit plane. HEIF output never carries DPI.

use image::GrayImage;
use libheif_rs::{
    color_profile_types, Channel, ColorProfileRaw, ColorSpace, CompressionFormat,
    EncoderParameterValue, EncoderQuality, HeifContext, Image, LibHeif,
};

use super::{EncodeError, Embedding};
use crate::settings::ChromaSubsampling;
use crate::transform::Gray16Image;

/// Luma plane handed to the HEIF writer.
#[derive(Debug, Clone, Copy)]
pub enum HeifLuma<'a> {
    Eight(&'a GrayImage),
    /// Samples in `0..=1023`.
    Ten(&'a Gray16Image),
}

impl HeifLuma<'_> {
    fn dimensions(&self) -> (u32, u32) {
        match self {
            HeifLuma::Eight(img) => img.dimensions(),
            HeifLuma::Ten(img) => img.dimensions(),
        }
    }

    fn bit_depth(&self) -> u8 {
        match self {
            HeifLuma::Eight(_) => 8,
            HeifLuma::Ten(_) => 10,
        }
    }
}

/// Copy tightly packed 8-bit rows into a strided plane.
fn copy_rows(src: &[u8], row_bytes: usize, dst: &mut [u8], stride: usize) {
    for (src_row, dst_row) in src.chunks_exact(row_bytes).zip(dst.chunks_mut(stride)) {
        dst_row[..row_bytes].copy_from_slice(src_row);
    }
}

/// Encode luma and optional 8-bit alpha as HEIF.
///
/// # Errors
///
/// Returns `EncodeError::Heif` when libheif has no HEVC encoder or rejects
/// the image, and `EncodeError::AlphaMismatch` when the alpha size differs.
pub fn write_heif(
    luma: HeifLuma<'_>,
    alpha: Option<&GrayImage>,
    quality: u8,
    subsampling: ChromaSubsampling,
    embed: &Embedding<'_>,
) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = luma.dimensions();
    if let Some(a) = alpha {
        if a.dimensions() != (width, height) {
            return Err(EncodeError::AlphaMismatch {
                luminance: (width, height),
                alpha: a.dimensions(),
            });
        }
    }
    if embed.dpi.is_some() {
        log::debug!("HEIF output does not carry DPI, ignoring it");
    }

    let mut image = Image::new(width, height, ColorSpace::Monochrome)?;
    image.create_plane(Channel::Y, width, height, luma.bit_depth())?;
    if alpha.is_some() {
        image.create_plane(Channel::Alpha, width, height, 8)?;
    }

    {
        let planes = image.planes_mut();
        let y = planes
            .y
            .ok_or_else(|| EncodeError::EncodingFailed("libheif created no Y plane".to_string()))?;
        match luma {
            HeifLuma::Eight(img) => copy_rows(img.as_raw(), width as usize, y.data, y.stride),
            HeifLuma::Ten(img) => {
                let packed: Vec<u8> = img.as_raw().iter().flat_map(|s| s.to_ne_bytes()).collect();
                copy_rows(&packed, width as usize * 2, y.data, y.stride);
            }
        }
        if let (Some(src), Some(a)) = (alpha, planes.a) {
            copy_rows(src.as_raw(), width as usize, a.data, a.stride);
        }
    }

    if let Some(icc) = embed.icc_profile {
        image.set_color_profile_raw(&ColorProfileRaw::new(color_profile_types::PROF, icc.to_vec()))?;
    }

    let lib = LibHeif::new();
    let mut encoder = lib.encoder_for_format(CompressionFormat::Hevc)?;
    encoder.set_quality(EncoderQuality::Lossy(quality.clamp(1, 100)))?;
    let chroma = EncoderParameterValue::String(subsampling.ratio().to_string());
    if let Err(e) = encoder.set_parameter_value("chroma", chroma) {
        log::debug!("HEVC encoder ignored chroma {}: {}", subsampling.ratio(), e);
    }

    let mut context = HeifContext::new()?;
    context.encode_image(&image, &mut encoder, None)?;
    Ok(context.write_to_bytes()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    const NO_EMBED: Embedding<'static> = Embedding {
        icc_profile: None,
        dpi: None,
    };

    #[test]
    fn test_copy_rows_respects_stride() {
        let src = [1u8, 2, 3, 4, 5, 6];
        let mut dst = [0u8; 8];
        copy_rows(&src, 3, &mut dst, 4);
        assert_eq!(dst, [1, 2, 3, 0, 4, 5, 6, 0]);
    }

    #[test]
    fn test_heif_eight_bit_with_alpha() {
        let luma = GrayImage::from_fn(64, 64, |x, _| Luma([x as u8 * 4]));
        let alpha = GrayImage::from_pixel(64, 64, Luma([128]));
        let bytes = write_heif(
            HeifLuma::Eight(&luma),
            Some(&alpha),
            80,
            ChromaSubsampling::Quarter,
            &NO_EMBED,
        )
        .unwrap();
        assert_eq!(&bytes[4..8], b"ftyp");
    }

    #[test]
    fn test_heif_ten_bit() {
        let luma = Gray16Image::from_fn(64, 64, |x, _| Luma([x as u16 * 16]));
        let bytes =
            write_heif(HeifLuma::Ten(&luma), None, 90, ChromaSubsampling::Full, &NO_EMBED).unwrap();
        assert_eq!(&bytes[4..8], b"ftyp");
    }

    #[test]
    fn test_heif_alpha_mismatch() {
        let luma = GrayImage::new(8, 8);
        let alpha = GrayImage::new(4, 8);
        assert!(matches!(
            write_heif(HeifLuma::Eight(&luma), Some(&alpha), 80, ChromaSubsampling::Full, &NO_EMBED),
            Err(EncodeError::AlphaMismatch { .. })
        ));
    }
}
