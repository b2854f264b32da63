//! HEIF/HEIC input through libheif.
//!
//! The primary image is decoded to interleaved RGB(A). Sources deeper than
//! 8 bits are rescaled into 16-bit samples.

use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

use super::{ChannelLayout, DecodeError, PixelBuffer, PixelData, SampleType};

/// Pixels and container facts of a decoded HEIF primary image.
pub struct HeifSource {
    pub pixels: PixelBuffer,
    pub color_mode: String,
    pub sample_type: SampleType,
    pub icc_profile: Option<Vec<u8>>,
}

/// True when the `ftyp` box names a HEIF brand.
pub fn is_heif(bytes: &[u8]) -> bool {
    bytes.len() >= 12
        && &bytes[4..8] == b"ftyp"
        && matches!(
            &bytes[8..12],
            b"heic" | b"heix" | b"heim" | b"heis" | b"hevc" | b"hevx" | b"mif1" | b"msf1"
        )
}

fn corrupted(e: impl std::fmt::Display) -> DecodeError {
    DecodeError::CorruptedFile(e.to_string())
}

/// Decode the primary image of a HEIF container.
///
/// # Errors
///
/// Returns `DecodeError::CorruptedFile` when libheif cannot read the
/// container or decode the image.
pub fn decode_heif(bytes: &[u8]) -> Result<HeifSource, DecodeError> {
    let context = HeifContext::read_from_bytes(bytes).map_err(corrupted)?;
    let handle = context.primary_image_handle().map_err(corrupted)?;
    let (width, height) = (handle.width(), handle.height());
    let has_alpha = handle.has_alpha_channel();
    let wide = handle.luma_bits_per_pixel() > 8;

    let chroma = match (wide, has_alpha) {
        (false, false) => RgbChroma::Rgb,
        (false, true) => RgbChroma::Rgba,
        (true, false) => RgbChroma::HdrRgbLe,
        (true, true) => RgbChroma::HdrRgbaLe,
    };
    let image = LibHeif::new()
        .decode(&handle, ColorSpace::Rgb(chroma), None)
        .map_err(corrupted)?;
    let planes = image.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| corrupted("libheif returned no interleaved plane"))?;

    let layout = if has_alpha {
        ChannelLayout::Rgba
    } else {
        ChannelLayout::Rgb
    };
    let row_samples = width as usize * layout.channels();
    let rows = plane.data.chunks(plane.stride).take(height as usize);

    let data = if wide {
        let max = (1u32 << plane.bit_depth) - 1;
        let mut samples = Vec::with_capacity(row_samples * height as usize);
        for row in rows {
            let row = row.get(..row_samples * 2).ok_or_else(|| corrupted("short HEIF row"))?;
            samples.extend(row.chunks_exact(2).map(|b| {
                let v = u32::from(u16::from_le_bytes([b[0], b[1]])).min(max);
                ((v * 65535 + max / 2) / max) as u16
            }));
        }
        PixelData::U16(samples)
    } else {
        let mut samples = Vec::with_capacity(row_samples * height as usize);
        for row in rows {
            let row = row.get(..row_samples).ok_or_else(|| corrupted("short HEIF row"))?;
            samples.extend_from_slice(row);
        }
        PixelData::U8(samples)
    };

    let (color_mode, sample_type) = match (wide, has_alpha) {
        (false, false) => ("RGB", SampleType::U8),
        (false, true) => ("RGBA", SampleType::U8),
        (true, false) => ("RGB;16", SampleType::U16),
        (true, true) => ("RGBA;16", SampleType::U16),
    };

    Ok(HeifSource {
        pixels: PixelBuffer::new(width, height, layout, data)?,
        color_mode: color_mode.to_string(),
        sample_type,
        icc_profile: handle.color_profile_raw().map(|profile| profile.data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_image;
    use crate::{convert, ConversionSettings, OutputFormat};
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn heif_from_png(preserve_alpha: bool) -> Vec<u8> {
        let img = RgbaImage::from_fn(64, 48, |x, y| Rgba([x as u8 * 4, y as u8 * 5, 90, 180]));
        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img).write_to(&mut png, ImageFormat::Png).unwrap();
        let settings = ConversionSettings {
            format: OutputFormat::Heif,
            preserve_alpha,
            ..Default::default()
        };
        convert(&png.into_inner(), &settings).unwrap().bytes
    }

    #[test]
    fn test_brand_detection() {
        assert!(is_heif(b"\0\0\0\x18ftypheic\0\0\0\0"));
        assert!(is_heif(b"\0\0\0\x18ftypmif1\0\0\0\0"));
        assert!(!is_heif(b"\0\0\0\x18ftypisom\0\0\0\0"));
        assert!(!is_heif(b"ftyp"));
    }

    #[test]
    fn test_decode_heif_round_trip() {
        let bytes = heif_from_png(false);
        assert!(is_heif(&bytes));

        let (pixels, meta) = decode_image(&bytes).unwrap();
        assert_eq!(pixels.dimensions(), (64, 48));
        assert_eq!(pixels.layout(), ChannelLayout::Rgb);
        assert_eq!(meta.summary(), "64x48 | RGB | 8-bit");
    }

    #[test]
    fn test_decode_heif_with_alpha() {
        let (pixels, meta) = decode_image(&heif_from_png(true)).unwrap();
        assert_eq!(pixels.layout(), ChannelLayout::Rgba);
        assert_eq!(meta.color_mode, "RGBA");
    }

    #[test]
    fn test_truncated_heif_is_corrupted() {
        let bytes = heif_from_png(false);
        let result = decode_image(&bytes[..40]);
        assert!(matches!(result, Err(DecodeError::CorruptedFile(_))));
    }
}
