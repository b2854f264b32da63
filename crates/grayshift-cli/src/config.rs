//! Conversion settings from a JSON file plus command-line overrides.
//!
//! The file holds a serialized `ConversionSettings`. Any field it omits keeps
//! its default, and any flag given on the command line wins over the file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use grayshift_core::{
    parse_dpi, BitDepth, ChromaSubsampling, ConversionMode, ConversionSettings, OutputFormat,
    TargetSize,
};

#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// JSON settings file; flags below override its fields
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Conversion model: lab, hsv, hsl, rec601, rec709, rec2100, gamma
    /// (the long labels such as "Rec. 709" are accepted too)
    #[arg(short, long)]
    pub mode: Option<ConversionMode>,

    /// Output format: jpeg, png, tiff, webp, bmp, heif
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Output bit depth: 8, 10 or 16
    #[arg(short, long)]
    pub bit_depth: Option<u32>,

    /// JPEG/HEIF quality (1-100)
    #[arg(short, long)]
    pub quality: Option<u32>,

    /// Chroma subsampling code: 0 = 4:4:4, 1 = 4:2:2, 2 = 4:2:0
    #[arg(long)]
    pub subsampling: Option<u32>,

    /// Target width in pixels (0 keeps the source size)
    #[arg(long)]
    pub width: Option<u32>,

    /// Target height in pixels (0 keeps the source size)
    #[arg(long)]
    pub height: Option<u32>,

    /// Output DPI (0 leaves it unset)
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Keep the alpha channel where the format allows it
    #[arg(long, overrides_with = "no_preserve_alpha")]
    pub preserve_alpha: bool,

    /// Flatten alpha even if the settings file keeps it
    #[arg(long, overrides_with = "preserve_alpha")]
    pub no_preserve_alpha: bool,

    /// Drop ICC profile and DPI from the output
    #[arg(long, overrides_with = "no_strip_metadata")]
    pub strip_metadata: bool,

    /// Keep ICC profile and DPI even if the settings file strips them
    #[arg(long, overrides_with = "strip_metadata")]
    pub no_strip_metadata: bool,
}

impl SettingsArgs {
    /// Load the settings file, if any, then apply the flags on top.
    pub fn resolve(&self) -> Result<ConversionSettings> {
        let mut settings = match &self.config {
            Some(path) => load_settings(path)?,
            None => ConversionSettings::default(),
        };
        self.apply(&mut settings)?;
        settings.dpi = settings.dpi.map(parse_dpi).transpose()?.flatten();
        Ok(settings)
    }

    fn apply(&self, settings: &mut ConversionSettings) -> Result<()> {
        if let Some(mode) = self.mode {
            settings.mode = mode;
        }
        if let Some(format) = self.format {
            settings.format = format;
        }
        if let Some(bits) = self.bit_depth {
            settings.bit_depth = BitDepth::try_from(bits)?;
        }
        if let Some(quality) = self.quality {
            settings.quality = quality.clamp(1, 100) as u8;
        }
        if let Some(code) = self.subsampling {
            settings.subsampling = ChromaSubsampling::try_from(code)?;
        }
        if self.width.is_some() || self.height.is_some() {
            let width = self.width.or(settings.size.map(|s| s.width)).unwrap_or(0);
            let height = self.height.or(settings.size.map(|s| s.height)).unwrap_or(0);
            settings.size = TargetSize::from_request(width, height);
        }
        if let Some(dpi) = self.dpi {
            settings.dpi = parse_dpi(dpi)?;
        }
        if self.preserve_alpha {
            settings.preserve_alpha = true;
        } else if self.no_preserve_alpha {
            settings.preserve_alpha = false;
        }
        if self.strip_metadata {
            settings.strip_metadata = true;
        } else if self.no_strip_metadata {
            settings.strip_metadata = false;
        }
        Ok(())
    }
}

/// Read a `ConversionSettings` JSON document.
pub fn load_settings(path: &Path) -> Result<ConversionSettings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {:?}", path))
}
