//! Image ingest for the grayscale pipeline.
//!
//! This module turns encoded bytes into:
//! - A [`PixelBuffer`] holding every sample at its native width (8-bit,
//!   16-bit or float)
//! - An [`ImageMetadata`] record with the color-mode tag, detected bit
//!   depth, ICC profile, EXIF block and DPI
//!
//! HEIF/HEIC input is decoded through libheif when the `heif` feature is
//! enabled; everything else goes through the `image` crate.
//!
//! # Examples
//!
//! ```ignore
//! use grayshift_core::decode::decode_image;
//!
//! let bytes = std::fs::read("photo.png").unwrap();
//! let (pixels, metadata) = decode_image(&bytes).unwrap();
//! println!("{}", metadata.summary());
//! ```

mod density;
#[cfg(feature = "heif")]
mod heif;
mod ingest;
mod types;

pub use ingest::{decode_image, detect_bit_depth};
pub use types::{ChannelLayout, DecodeError, ImageMetadata, PixelBuffer, PixelData, SampleType};
