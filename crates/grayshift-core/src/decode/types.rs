//! Core types for image decoding.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for image decoding operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file format is not recognized or supported.
    #[error("Invalid or unsupported image format")]
    InvalidFormat,

    /// The image file is corrupted or incomplete.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),

    /// I/O error during reading.
    #[error("I/O error: {0}")]
    IoError(String),

    /// The image decoded to zero pixels.
    #[error("Image has no pixels")]
    EmptyImage,

    /// Sample count does not match the declared dimensions and layout.
    #[error("Invalid pixel data: expected {expected} samples, got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },
}

/// Storage type of a single decoded sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    U8,
    U16,
    /// Floating point samples, nominally 0.0 to 1.0.
    F32,
}

/// Channel arrangement of a decoded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelLayout {
    Gray,
    GrayAlpha,
    Rgb,
    Rgba,
}

impl ChannelLayout {
    /// Samples per pixel.
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::Gray => 1,
            ChannelLayout::GrayAlpha => 2,
            ChannelLayout::Rgb => 3,
            ChannelLayout::Rgba => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, ChannelLayout::GrayAlpha | ChannelLayout::Rgba)
    }
}

/// Interleaved sample storage.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

impl PixelData {
    pub fn sample_type(&self) -> SampleType {
        match self {
            PixelData::U8(_) => SampleType::U8,
            PixelData::U16(_) => SampleType::U16,
            PixelData::F32(_) => SampleType::F32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelData::U8(v) => v.len(),
            PixelData::U16(v) => v.len(),
            PixelData::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fully materialized decoded image.
///
/// Construction validates that the sample count matches
/// `width * height * channels`; the buffer is read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    layout: ChannelLayout,
    data: PixelData,
}

impl PixelBuffer {
    /// Create a buffer from interleaved samples.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::EmptyImage` for zero-sized images and
    /// `DecodeError::InvalidPixelData` when the sample count is wrong.
    pub fn new(
        width: u32,
        height: u32,
        layout: ChannelLayout,
        data: PixelData,
    ) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::EmptyImage);
        }
        let expected = width as usize * height as usize * layout.channels();
        if data.len() != expected {
            return Err(DecodeError::InvalidPixelData {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            layout,
            data,
        })
    }

    /// Take ownership of a decoded `DynamicImage`, keeping its native sample width.
    ///
    /// Layouts the pipeline does not model directly are normalized to
    /// 8-bit RGB or RGBA.
    pub fn from_dynamic(img: DynamicImage) -> Result<Self, DecodeError> {
        let (width, height) = (img.width(), img.height());
        let (layout, data) = match img {
            DynamicImage::ImageLuma8(b) => (ChannelLayout::Gray, PixelData::U8(b.into_raw())),
            DynamicImage::ImageLumaA8(b) => {
                (ChannelLayout::GrayAlpha, PixelData::U8(b.into_raw()))
            }
            DynamicImage::ImageRgb8(b) => (ChannelLayout::Rgb, PixelData::U8(b.into_raw())),
            DynamicImage::ImageRgba8(b) => (ChannelLayout::Rgba, PixelData::U8(b.into_raw())),
            DynamicImage::ImageLuma16(b) => (ChannelLayout::Gray, PixelData::U16(b.into_raw())),
            DynamicImage::ImageLumaA16(b) => {
                (ChannelLayout::GrayAlpha, PixelData::U16(b.into_raw()))
            }
            DynamicImage::ImageRgb16(b) => (ChannelLayout::Rgb, PixelData::U16(b.into_raw())),
            DynamicImage::ImageRgba16(b) => {
                (ChannelLayout::Rgba, PixelData::U16(b.into_raw()))
            }
            DynamicImage::ImageRgb32F(b) => (ChannelLayout::Rgb, PixelData::F32(b.into_raw())),
            DynamicImage::ImageRgba32F(b) => {
                (ChannelLayout::Rgba, PixelData::F32(b.into_raw()))
            }
            other if other.color().has_alpha() => {
                (ChannelLayout::Rgba, PixelData::U8(other.into_rgba8().into_raw()))
            }
            other => (ChannelLayout::Rgb, PixelData::U8(other.into_rgb8().into_raw())),
        };
        Self::new(width, height, layout, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn sample_type(&self) -> SampleType {
        self.data.sample_type()
    }

    pub fn data(&self) -> &PixelData {
        &self.data
    }

    /// Sample at interleaved `index`, normalized to 0.0..=1.0.
    ///
    /// 8-bit samples divide by 255, 16-bit by 65535. Float samples are
    /// clamped since HDR sources may exceed the nominal range.
    #[inline]
    pub fn normalized(&self, index: usize) -> f32 {
        match &self.data {
            PixelData::U8(v) => v[index] as f32 / 255.0,
            PixelData::U16(v) => v[index] as f32 / 65535.0,
            PixelData::F32(v) => {
                let s = v[index];
                if s.is_nan() {
                    0.0
                } else {
                    s.clamp(0.0, 1.0)
                }
            }
        }
    }
}

/// Metadata extracted from an image file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Color mode tag of the source (e.g. "RGB", "LA", "I;16", "CMYK").
    pub color_mode: String,
    /// Detected source bit depth: 8, 16 or 32.
    pub bit_depth: u8,
    /// Embedded ICC profile, passed through verbatim.
    #[serde(skip)]
    pub icc_profile: Option<Vec<u8>>,
    /// Raw EXIF block. Read for inspection only, never re-emitted.
    #[serde(skip)]
    pub exif: Option<Vec<u8>>,
    /// Source resolution in dots per inch, when the EXIF block declares one.
    pub dpi: Option<f64>,
}

impl ImageMetadata {
    /// One-line description: `"WxH | mode | N-bit"`.
    pub fn summary(&self) -> String {
        format!(
            "{}x{} | {} | {}-bit",
            self.width, self.height, self.color_mode, self.bit_depth
        )
    }
}
