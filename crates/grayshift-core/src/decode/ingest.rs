//! Decoding of arbitrary input containers with metadata extraction.

use std::io::Cursor;

use exif::{In, Reader, Tag, Value};
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageError, ImageReader};

#[cfg(feature = "heif")]
use super::heif;
use super::{density, DecodeError, ImageMetadata, PixelBuffer, SampleType};

/// Decode an encoded image into a pixel buffer plus its metadata.
///
/// The pixel data is fully materialized before returning; palette,
/// low-bit and CMYK sources come back as plain RGB(A).
///
/// # Arguments
///
/// * `bytes` - Raw file bytes of any supported container
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` if the container is not recognized,
/// `DecodeError::CorruptedFile` if decoding fails part way.
pub fn decode_image(bytes: &[u8]) -> Result<(PixelBuffer, ImageMetadata), DecodeError> {
    let source = decode_source(bytes)?;
    let (width, height) = source.pixels.dimensions();

    let (exif, exif_dpi) = read_exif(bytes);
    let dpi = source.container_dpi.or(exif_dpi);
    let bit_depth = detect_bit_depth(source.sample_type, &source.color_mode);
    log::debug!(
        "decoded {}x{} {} source ({}-bit, icc: {}, exif: {}, dpi: {:?})",
        width,
        height,
        source.color_mode,
        bit_depth,
        source.icc_profile.is_some(),
        exif.is_some(),
        dpi
    );

    let metadata = ImageMetadata {
        width,
        height,
        color_mode: source.color_mode,
        bit_depth,
        icc_profile: source.icc_profile,
        exif,
        dpi,
    };
    Ok((source.pixels, metadata))
}

/// What the container decoder yields before EXIF is consulted.
struct Source {
    pixels: PixelBuffer,
    color_mode: String,
    sample_type: Option<SampleType>,
    icc_profile: Option<Vec<u8>>,
    container_dpi: Option<f64>,
}

#[cfg(feature = "heif")]
fn decode_source(bytes: &[u8]) -> Result<Source, DecodeError> {
    if !heif::is_heif(bytes) {
        return decode_raster(bytes);
    }
    let decoded = heif::decode_heif(bytes)?;
    Ok(Source {
        pixels: decoded.pixels,
        color_mode: decoded.color_mode,
        sample_type: Some(decoded.sample_type),
        icc_profile: decoded.icc_profile,
        container_dpi: None,
    })
}

#[cfg(not(feature = "heif"))]
fn decode_source(bytes: &[u8]) -> Result<Source, DecodeError> {
    decode_raster(bytes)
}

/// Everything the `image` crate can sniff and decode.
fn decode_raster(bytes: &[u8]) -> Result<Source, DecodeError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::IoError(e.to_string()))?;
    let Some(format) = reader.format() else {
        return Err(DecodeError::InvalidFormat);
    };

    let mut decoder = reader.into_decoder().map_err(map_image_error)?;
    let (color_mode, sample_type) = describe_color_type(decoder.original_color_type());
    let icc_profile = decoder.icc_profile().ok().flatten();

    let img = DynamicImage::from_decoder(decoder).map_err(map_image_error)?;
    Ok(Source {
        pixels: PixelBuffer::from_dynamic(img)?,
        color_mode,
        sample_type,
        icc_profile,
        container_dpi: density::container_dpi(bytes, format),
    })
}

/// Bit depth of a source image: 16 for 16-bit samples, 32 for float
/// samples, 8 otherwise.
///
/// When the sample type is unknown the color-mode tag decides, and the
/// `"I;16"` family counts as 16-bit.
pub fn detect_bit_depth(sample_type: Option<SampleType>, color_mode: &str) -> u8 {
    match sample_type {
        Some(SampleType::U16) => 16,
        Some(SampleType::F32) => 32,
        Some(SampleType::U8) => 8,
        None if color_mode.starts_with("I;16") => 16,
        None if color_mode == "I" || color_mode == "F" => 32,
        None => 8,
    }
}

/// Map the container's native color type to a mode tag and sample type.
fn describe_color_type(color: ExtendedColorType) -> (String, Option<SampleType>) {
    let (mode, sample) = match color {
        ExtendedColorType::L1 => ("1", Some(SampleType::U8)),
        ExtendedColorType::A8 => ("A", Some(SampleType::U8)),
        ExtendedColorType::L2 | ExtendedColorType::L4 | ExtendedColorType::L8 => {
            ("L", Some(SampleType::U8))
        }
        ExtendedColorType::La1
        | ExtendedColorType::La2
        | ExtendedColorType::La4
        | ExtendedColorType::La8 => ("LA", Some(SampleType::U8)),
        ExtendedColorType::Rgb1
        | ExtendedColorType::Rgb2
        | ExtendedColorType::Rgb4
        | ExtendedColorType::Rgba1
        | ExtendedColorType::Rgba2
        | ExtendedColorType::Rgba4 => ("P", Some(SampleType::U8)),
        ExtendedColorType::Rgb8 | ExtendedColorType::Bgr8 => ("RGB", Some(SampleType::U8)),
        ExtendedColorType::Rgba8 | ExtendedColorType::Bgra8 => ("RGBA", Some(SampleType::U8)),
        ExtendedColorType::L16 => ("I;16", Some(SampleType::U16)),
        ExtendedColorType::La16 => ("LA;16", Some(SampleType::U16)),
        ExtendedColorType::Rgb16 => ("RGB;16", Some(SampleType::U16)),
        ExtendedColorType::Rgba16 => ("RGBA;16", Some(SampleType::U16)),
        ExtendedColorType::Rgb32F => ("RGB;32F", Some(SampleType::F32)),
        ExtendedColorType::Rgba32F => ("RGBA;32F", Some(SampleType::F32)),
        ExtendedColorType::Cmyk8 => ("CMYK", Some(SampleType::U8)),
        ExtendedColorType::Cmyk16 => ("CMYK;16", Some(SampleType::U16)),
        ExtendedColorType::Unknown(16) => ("I;16", None),
        _ => ("unknown", None),
    };
    (mode.to_string(), sample)
}

/// Read the EXIF block, returning the raw bytes and the declared DPI.
fn read_exif(bytes: &[u8]) -> (Option<Vec<u8>>, Option<f64>) {
    let exif = match Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(e) => {
            log::debug!("no EXIF block: {}", e);
            return (None, None);
        }
    };
    let dpi = exif_dpi(&exif);
    (Some(exif.buf().to_vec()), dpi)
}

/// Horizontal resolution in dots per inch from XResolution/ResolutionUnit.
fn exif_dpi(exif: &exif::Exif) -> Option<f64> {
    let field = exif.get_field(Tag::XResolution, In::PRIMARY)?;
    let resolution = match &field.value {
        Value::Rational(v) => v.first().filter(|r| r.denom != 0)?.to_f64(),
        other => other.get_uint(0)? as f64,
    };
    let unit = exif
        .get_field(Tag::ResolutionUnit, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(2);
    match unit {
        2 => Some(resolution),
        3 => Some(resolution * 2.54),
        _ => None,
    }
}

fn map_image_error(e: ImageError) -> DecodeError {
    match e {
        ImageError::Unsupported(_) => DecodeError::InvalidFormat,
        ImageError::IoError(io) => DecodeError::IoError(io.to_string()),
        other => DecodeError::CorruptedFile(other.to_string()),
    }
}
