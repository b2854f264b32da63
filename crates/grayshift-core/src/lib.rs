//! Grayshift Core - enhanced grayscale conversion
//!
//! This crate turns color images into grayscale under several colorimetric
//! models (CIE L*, HSV value, HSL lightness, Rec.601/709/2100 luma and
//! gamma-correct luma), at 8, 10 or 16 bits, and writes the result to
//! JPEG, PNG, TIFF, WebP, BMP or HEIF.
//!
//! The pipeline is ingest → transform → encode:
//! - [`decode::decode_image`] materializes pixels and metadata
//! - [`transform::to_grayscale`] produces luminance plus optional alpha
//! - [`encode::encode`] routes to the writer the container needs
//!
//! Every call works on freshly allocated buffers and shares no state, so the
//! functions are safe to call from several threads at once.

pub mod batch;
pub mod decode;
pub mod encode;
pub mod luminance;
pub mod settings;
pub mod transform;

pub use batch::{convert_batch, convert_each, output_name, ArchiveSink, BatchInput, BatchReport};
pub use decode::{decode_image, DecodeError, ImageMetadata, PixelBuffer};
pub use encode::{encode, EncodeError, EncodePath, ResizeError};
pub use settings::{
    parse_dpi, BitDepth, ChromaSubsampling, ConversionMode, ConversionSettings, LumaStandard,
    OutputFormat, RequestFields, SettingsError, TargetSize,
};
pub use transform::{to_grayscale, AlphaBuffer, GrayscaleImage, LuminanceBuffer};

use thiserror::Error;

/// Any failure of a single conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Output of a single conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// Encoded output file.
    pub bytes: Vec<u8>,
    /// Metadata of the source image.
    pub metadata: ImageMetadata,
}

impl Conversion {
    /// `"WxH | mode | N-bit"` description of the source image.
    pub fn summary(&self) -> String {
        self.metadata.summary()
    }
}

/// Run the whole pipeline on one encoded image.
///
/// # Arguments
///
/// * `bytes` - Encoded source image
/// * `settings` - Conversion settings for this request
///
/// # Errors
///
/// Returns `ConvertError::Decode` for unreadable input and
/// `ConvertError::Encode` when the output cannot be written. No partial
/// output is produced.
pub fn convert(bytes: &[u8], settings: &ConversionSettings) -> Result<Conversion, ConvertError> {
    let (pixels, metadata) = decode_image(bytes)?;
    let gray = to_grayscale(&pixels, settings.mode, settings.bit_depth);
    let bytes = encode(&gray.luminance, gray.alpha.as_ref(), settings, &metadata)?;
    Ok(Conversion { bytes, metadata })
}
