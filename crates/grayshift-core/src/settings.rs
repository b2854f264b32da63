//! Per-request conversion settings.
//!
//! A [`ConversionSettings`] value is built once per request, either from
//! raw form-style fields via [`ConversionSettings::from_request`] or from a
//! serialized settings document, and is never mutated afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::luminance::{REC2100_COEFFICIENTS, REC601_COEFFICIENTS, REC709_COEFFICIENTS};

/// Errors raised while validating request settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// The conversion mode label is not one of the known models.
    #[error("Unknown conversion mode: {0}")]
    UnknownMode(String),

    /// The output format is not one of the supported containers.
    #[error("Unknown output format: {0}")]
    UnknownFormat(String),

    /// Only 8, 10 and 16 bit output is defined.
    #[error("Unsupported bit depth: {0} (expected 8, 10 or 16)")]
    UnsupportedBitDepth(u32),

    /// Chroma subsampling code outside 0..=2.
    #[error("Unknown chroma subsampling code: {0}")]
    UnknownSubsampling(u32),

    /// DPI beyond what the JFIF density field can hold.
    #[error("DPI {0} is out of range (at most 65535)")]
    DpiOutOfRange(u32),
}

/// Largest DPI every DPI-carrying container can record.
pub const MAX_DPI: u32 = u16::MAX as u32;

/// Validate a raw DPI field, where 0 means "not set".
pub fn parse_dpi(value: u32) -> Result<Option<u32>, SettingsError> {
    match value {
        0 => Ok(None),
        v if v > MAX_DPI => Err(SettingsError::DpiOutOfRange(v)),
        v => Ok(Some(v)),
    }
}

/// Published luma coefficient sets for the weighted model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LumaStandard {
    /// ITU-R BT.601.
    Rec601,
    /// ITU-R BT.709.
    #[default]
    Rec709,
    /// ITU-R BT.2100.
    Rec2100,
}

impl LumaStandard {
    /// Red, green and blue weights of this standard.
    pub fn coefficients(self) -> [f32; 3] {
        match self {
            LumaStandard::Rec601 => REC601_COEFFICIENTS,
            LumaStandard::Rec709 => REC709_COEFFICIENTS,
            LumaStandard::Rec2100 => REC2100_COEFFICIENTS,
        }
    }
}

/// The colorimetric model used to derive a gray value from RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ConversionMode {
    /// CIE L\*a\*b\* lightness (L\*).
    LabLightness,
    /// HSV value: the largest of R, G and B.
    HsvValue,
    /// HSL lightness: midpoint of the largest and smallest channel.
    HslLightness,
    /// Weighted sum of gamma-encoded channels.
    Luma(LumaStandard),
    /// Rec.709 weighted sum computed in linear light, re-encoded to sRGB.
    GammaCorrect,
}

impl Default for ConversionMode {
    fn default() -> Self {
        ConversionMode::Luma(LumaStandard::Rec709)
    }
}

impl ConversionMode {
    /// Every selectable mode, in menu order.
    pub const ALL: [ConversionMode; 7] = [
        ConversionMode::LabLightness,
        ConversionMode::HsvValue,
        ConversionMode::HslLightness,
        ConversionMode::Luma(LumaStandard::Rec601),
        ConversionMode::Luma(LumaStandard::Rec709),
        ConversionMode::Luma(LumaStandard::Rec2100),
        ConversionMode::GammaCorrect,
    ];

    /// Human-readable label, as shown in the conversion form.
    pub fn label(self) -> &'static str {
        match self {
            ConversionMode::LabLightness => "L*a*b* (L*)",
            ConversionMode::HsvValue => "HSV (Value)",
            ConversionMode::HslLightness => "HSL (Lightness)",
            ConversionMode::Luma(LumaStandard::Rec601) => "Rec. 601",
            ConversionMode::Luma(LumaStandard::Rec709) => "Rec. 709",
            ConversionMode::Luma(LumaStandard::Rec2100) => "Rec. 2100",
            ConversionMode::GammaCorrect => "Gamma",
        }
    }

    /// Short command-line name.
    pub fn short_name(self) -> &'static str {
        match self {
            ConversionMode::LabLightness => "lab",
            ConversionMode::HsvValue => "hsv",
            ConversionMode::HslLightness => "hsl",
            ConversionMode::Luma(LumaStandard::Rec601) => "rec601",
            ConversionMode::Luma(LumaStandard::Rec709) => "rec709",
            ConversionMode::Luma(LumaStandard::Rec2100) => "rec2100",
            ConversionMode::GammaCorrect => "gamma",
        }
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ConversionMode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        ConversionMode::ALL
            .into_iter()
            .find(|mode| {
                mode.label().eq_ignore_ascii_case(needle)
                    || mode.short_name().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| SettingsError::UnknownMode(s.to_string()))
    }
}

impl TryFrom<String> for ConversionMode {
    type Error = SettingsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConversionMode> for String {
    fn from(mode: ConversionMode) -> Self {
        mode.label().to_string()
    }
}

/// Requested output sample depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BitDepth {
    #[default]
    Eight,
    /// 10-bit values carried in a 16-bit container.
    Ten,
    Sixteen,
}

impl BitDepth {
    /// Number of significant bits.
    pub fn bits(self) -> u32 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Ten => 10,
            BitDepth::Sixteen => 16,
        }
    }

    /// Largest sample value, `2^bits - 1`.
    pub fn max_value(self) -> u16 {
        match self {
            BitDepth::Eight => 255,
            BitDepth::Ten => 1023,
            BitDepth::Sixteen => 65535,
        }
    }

    /// True when samples need a 16-bit container.
    pub fn is_wide(self) -> bool {
        !matches!(self, BitDepth::Eight)
    }
}

impl TryFrom<u32> for BitDepth {
    type Error = SettingsError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            8 => Ok(BitDepth::Eight),
            10 => Ok(BitDepth::Ten),
            16 => Ok(BitDepth::Sixteen),
            other => Err(SettingsError::UnsupportedBitDepth(other)),
        }
    }
}

impl From<BitDepth> for u32 {
    fn from(depth: BitDepth) -> Self {
        depth.bits()
    }
}

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutputFormat {
    Jpeg,
    #[default]
    Png,
    Tiff,
    Webp,
    Bmp,
    Heif,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 6] = [
        OutputFormat::Jpeg,
        OutputFormat::Png,
        OutputFormat::Tiff,
        OutputFormat::Webp,
        OutputFormat::Bmp,
        OutputFormat::Heif,
    ];

    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Webp => "webp",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Heif => "heic",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::Tiff => "TIFF",
            OutputFormat::Webp => "WEBP",
            OutputFormat::Bmp => "BMP",
            OutputFormat::Heif => "HEIF",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ext = s.trim().trim_start_matches('.').to_ascii_lowercase();
        if let Some(format) = OutputFormat::ALL.into_iter().find(|f| f.extension() == ext) {
            return Ok(format);
        }
        match ext.as_str() {
            "jpg" => Ok(OutputFormat::Jpeg),
            "tif" => Ok(OutputFormat::Tiff),
            "heif" => Ok(OutputFormat::Heif),
            _ => Err(SettingsError::UnknownFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for OutputFormat {
    type Error = SettingsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OutputFormat> for String {
    fn from(format: OutputFormat) -> Self {
        format.extension().to_string()
    }
}

/// Chroma subsampling request, passed through to encoders that take it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ChromaSubsampling {
    /// 4:4:4 (code 0).
    #[default]
    Full,
    /// 4:2:2 (code 1).
    Half,
    /// 4:2:0 (code 2).
    Quarter,
}

impl ChromaSubsampling {
    /// Ratio string understood by HEVC encoders.
    pub fn ratio(self) -> &'static str {
        match self {
            ChromaSubsampling::Full => "444",
            ChromaSubsampling::Half => "422",
            ChromaSubsampling::Quarter => "420",
        }
    }
}

impl TryFrom<u32> for ChromaSubsampling {
    type Error = SettingsError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ChromaSubsampling::Full),
            1 => Ok(ChromaSubsampling::Half),
            2 => Ok(ChromaSubsampling::Quarter),
            other => Err(SettingsError::UnknownSubsampling(other)),
        }
    }
}

impl From<ChromaSubsampling> for u32 {
    fn from(value: ChromaSubsampling) -> Self {
        match value {
            ChromaSubsampling::Full => 0,
            ChromaSubsampling::Half => 1,
            ChromaSubsampling::Quarter => 2,
        }
    }
}

/// Output dimensions requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Interpret form fields where a zero in either field means "keep the source size".
    pub fn from_request(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }
}

/// Everything the pipeline needs to know about one conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    /// Colorimetric model.
    pub mode: ConversionMode,
    /// Output sample depth.
    pub bit_depth: BitDepth,
    /// Output container.
    pub format: OutputFormat,
    /// Encoder quality (1 to 100) for lossy containers.
    pub quality: u8,
    /// Chroma subsampling passed to encoders that accept it.
    pub subsampling: ChromaSubsampling,
    /// Resize target; `None` keeps the source size.
    pub size: Option<TargetSize>,
    /// Output resolution in dots per inch.
    pub dpi: Option<u32>,
    /// Keep the source alpha channel where the container allows it.
    pub preserve_alpha: bool,
    /// Drop ICC profile and DPI from the output.
    pub strip_metadata: bool,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            mode: ConversionMode::default(),
            bit_depth: BitDepth::default(),
            format: OutputFormat::default(),
            quality: 100,
            subsampling: ChromaSubsampling::default(),
            size: None,
            dpi: None,
            preserve_alpha: false,
            strip_metadata: false,
        }
    }
}

/// Raw, form-style request fields prior to validation.
///
/// Numeric fields use 0 for "not set", matching how HTML forms submit them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFields<'a> {
    pub conversion_mode: &'a str,
    pub output_format: &'a str,
    pub bit_depth: u32,
    pub quality: u32,
    pub subsampling: u32,
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
    pub preserve_alpha: bool,
    pub strip_metadata: bool,
}

impl Default for RequestFields<'_> {
    fn default() -> Self {
        Self {
            conversion_mode: "Rec. 709",
            output_format: "png",
            bit_depth: 8,
            quality: 100,
            subsampling: 0,
            width: 0,
            height: 0,
            dpi: 0,
            preserve_alpha: false,
            strip_metadata: false,
        }
    }
}

impl ConversionSettings {
    /// Validate raw request fields and build settings from them.
    pub fn from_request(fields: &RequestFields<'_>) -> Result<Self, SettingsError> {
        Ok(Self {
            mode: fields.conversion_mode.parse()?,
            bit_depth: BitDepth::try_from(fields.bit_depth)?,
            format: fields.output_format.parse()?,
            quality: fields.quality.clamp(1, 100) as u8,
            subsampling: ChromaSubsampling::try_from(fields.subsampling)?,
            size: TargetSize::from_request(fields.width, fields.height),
            dpi: parse_dpi(fields.dpi)?,
            preserve_alpha: fields.preserve_alpha,
            strip_metadata: fields.strip_metadata,
        })
    }
}
