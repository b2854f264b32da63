//! Grayscale transform: one colorimetric model applied per pixel.
//!
//! Every model consumes normalized 3-channel RGB. Single-channel sources
//! are expanded by replicating the gray value, and 16-bit or float
//! samples are normalized before the model runs. The model output is
//! clamped to `[0, 1]` and quantized to the requested bit depth with
//! rounding.
//!
//! Alpha, when present, is pulled out independently of the luminance and
//! always carried at 8-bit; widening happens at encode time.

mod buffer;

pub use buffer::{quantize, AlphaBuffer, Gray16Image, LuminanceBuffer};

use image::{GrayImage, ImageBuffer, Luma};

use crate::decode::{ChannelLayout, PixelBuffer, PixelData};
use crate::luminance::{
    cie_lightness, gamma_correct_luma, hsl_lightness, hsv_value, weighted_luma,
};
use crate::settings::{BitDepth, ConversionMode};

/// Result of the transform: luminance plus the optional source alpha.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayscaleImage {
    pub luminance: LuminanceBuffer,
    pub alpha: Option<AlphaBuffer>,
}

/// Evaluate a conversion model on normalized RGB.
#[inline]
pub fn evaluate(mode: ConversionMode, rgb: [f32; 3]) -> f32 {
    match mode {
        ConversionMode::LabLightness => cie_lightness(rgb),
        ConversionMode::HsvValue => hsv_value(rgb),
        ConversionMode::HslLightness => hsl_lightness(rgb),
        ConversionMode::Luma(standard) => weighted_luma(rgb, standard.coefficients()),
        ConversionMode::GammaCorrect => gamma_correct_luma(rgb),
    }
}

/// Convert a decoded image to grayscale.
///
/// # Arguments
///
/// * `pixels` - Decoded source image
/// * `mode` - Colorimetric model
/// * `depth` - Output bit depth
///
/// # Returns
///
/// Luminance at `depth` and, when the source has one, its alpha at 8-bit.
pub fn to_grayscale(pixels: &PixelBuffer, mode: ConversionMode, depth: BitDepth) -> GrayscaleImage {
    let (width, height) = pixels.dimensions();
    let max = depth.max_value();
    let value_at = |x: u32, y: u32| -> u16 {
        let rgb = source_rgb(pixels, pixel_index(pixels, x, y));
        quantize(evaluate(mode, rgb), max)
    };

    let luminance = match depth {
        BitDepth::Eight => {
            LuminanceBuffer::Eight(ImageBuffer::from_fn(width, height, |x, y| {
                Luma([value_at(x, y) as u8])
            }))
        }
        BitDepth::Ten | BitDepth::Sixteen => LuminanceBuffer::Wide {
            depth,
            image: ImageBuffer::from_fn(width, height, |x, y| Luma([value_at(x, y)])),
        },
    };

    GrayscaleImage {
        luminance,
        alpha: extract_alpha(pixels),
    }
}

/// Pull the alpha channel out as an 8-bit buffer.
///
/// 16-bit alpha is narrowed with rounding; float alpha is clamped first.
pub fn extract_alpha(pixels: &PixelBuffer) -> Option<AlphaBuffer> {
    let layout = pixels.layout();
    if !layout.has_alpha() {
        return None;
    }
    let offset = layout.channels() - 1;
    let image: GrayImage = ImageBuffer::from_fn(pixels.width(), pixels.height(), |x, y| {
        let i = pixel_index(pixels, x, y) + offset;
        let a = match pixels.data() {
            PixelData::U8(v) => v[i],
            PixelData::U16(v) => ((v[i] as u32 + 128) / 257) as u8,
            PixelData::F32(_) => quantize(pixels.normalized(i), 255) as u8,
        };
        Luma([a])
    });
    Some(AlphaBuffer::new(image))
}

/// Index of the first sample of pixel `(x, y)`.
#[inline]
fn pixel_index(pixels: &PixelBuffer, x: u32, y: u32) -> usize {
    (y as usize * pixels.width() as usize + x as usize) * pixels.layout().channels()
}

/// Normalized RGB at sample index `base`, expanding gray to three channels.
#[inline]
fn source_rgb(pixels: &PixelBuffer, base: usize) -> [f32; 3] {
    match pixels.layout() {
        ChannelLayout::Gray | ChannelLayout::GrayAlpha => {
            let v = pixels.normalized(base);
            [v, v, v]
        }
        ChannelLayout::Rgb | ChannelLayout::Rgba => [
            pixels.normalized(base),
            pixels.normalized(base + 1),
            pixels.normalized(base + 2),
        ],
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::luminance::{REC2100_COEFFICIENTS, REC601_COEFFICIENTS, REC709_COEFFICIENTS};
    use crate::settings::LumaStandard;
    use proptest::prelude::*;

    fn weighted_mode() -> impl Strategy<Value = ConversionMode> {
        prop_oneof![
            Just(ConversionMode::Luma(LumaStandard::Rec601)),
            Just(ConversionMode::Luma(LumaStandard::Rec709)),
            Just(ConversionMode::Luma(LumaStandard::Rec2100)),
            Just(ConversionMode::GammaCorrect),
        ]
    }

    fn depth() -> impl Strategy<Value = BitDepth> {
        prop_oneof![
            Just(BitDepth::Eight),
            Just(BitDepth::Ten),
            Just(BitDepth::Sixteen),
        ]
    }

    fn expected(mode: ConversionMode, rgb: [f32; 3]) -> f32 {
        match mode {
            ConversionMode::Luma(LumaStandard::Rec601) => weighted_luma(rgb, REC601_COEFFICIENTS),
            ConversionMode::Luma(LumaStandard::Rec709) => weighted_luma(rgb, REC709_COEFFICIENTS),
            ConversionMode::Luma(LumaStandard::Rec2100) => weighted_luma(rgb, REC2100_COEFFICIENTS),
            _ => gamma_correct_luma(rgb),
        }
    }

    proptest! {
        #[test]
        fn prop_eight_bit_matches_formula(
            r in any::<u8>(),
            g in any::<u8>(),
            b in any::<u8>(),
            mode in weighted_mode(),
        ) {
            let px = PixelBuffer::new(1, 1, ChannelLayout::Rgb, PixelData::U8(vec![r, g, b])).unwrap();
            let out = to_grayscale(&px, mode, BitDepth::Eight);
            let rgb = [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0];
            let want = (expected(mode, rgb).clamp(0.0, 1.0) * 255.0).round() as u16;
            prop_assert_eq!(out.luminance.sample(0, 0), want);
        }

        #[test]
        fn prop_achromatic_identity(v in any::<u8>(), mode in weighted_mode()) {
            let px = PixelBuffer::new(1, 1, ChannelLayout::Rgb, PixelData::U8(vec![v, v, v])).unwrap();
            let out = to_grayscale(&px, mode, BitDepth::Eight);
            let got = out.luminance.sample(0, 0) as i32;
            prop_assert!((got - v as i32).abs() <= 1, "{} -> {}", v, got);
        }

        #[test]
        fn prop_output_within_depth(
            r in any::<u16>(),
            g in any::<u16>(),
            b in any::<u16>(),
            mode in proptest::sample::select(ConversionMode::ALL.to_vec()),
            depth in depth(),
        ) {
            let px = PixelBuffer::new(1, 1, ChannelLayout::Rgb, PixelData::U16(vec![r, g, b])).unwrap();
            let out = to_grayscale(&px, mode, depth);
            prop_assert!(out.luminance.sample(0, 0) <= depth.max_value());
            prop_assert_eq!(out.luminance.depth(), depth);
        }

        #[test]
        fn prop_alpha_carried_per_pixel(
            alphas in proptest::collection::vec(any::<u8>(), 1..32),
        ) {
            let width = alphas.len() as u32;
            let data: Vec<u8> = alphas.iter().flat_map(|&a| [7, 77, 177, a]).collect();
            let px = PixelBuffer::new(width, 1, ChannelLayout::Rgba, PixelData::U8(data)).unwrap();
            let alpha = to_grayscale(&px, ConversionMode::default(), BitDepth::Eight).alpha.unwrap();
            for (x, &a) in alphas.iter().enumerate() {
                prop_assert_eq!(alpha.image().get_pixel(x as u32, 0)[0], a);
            }
        }
    }
}
