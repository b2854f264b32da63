//! Colorimetric primitives shared by every grayscale model.
//!
//! All functions take normalized RGB channels (0.0 to 1.0) and return a
//! normalized gray value. Quantization to a sample width happens in
//! [`crate::transform`].

/// ITU-R BT.601 red, green and blue luma weights.
pub const REC601_COEFFICIENTS: [f32; 3] = [0.299, 0.587, 0.114];

/// ITU-R BT.709 red, green and blue luma weights.
pub const REC709_COEFFICIENTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// ITU-R BT.2100 red, green and blue luma weights.
pub const REC2100_COEFFICIENTS: [f32; 3] = [0.2627, 0.6780, 0.0593];

/// Relative luminance weights for linear sRGB (D65), used for CIE Y.
const SRGB_TO_Y: [f32; 3] = [0.212_672_9, 0.715_152_2, 0.072_175];

/// CIE constants for the L* companding function.
const LAB_EPSILON: f32 = 216.0 / 24389.0;
const LAB_KAPPA: f32 = 24389.0 / 27.0;

/// Weighted dot product of RGB with a set of luma coefficients.
///
/// # Arguments
/// * `rgb` - Normalized red, green and blue values
/// * `coefficients` - Weights for red, green and blue
///
/// # Returns
/// Unclamped luma value
#[inline]
pub fn weighted_luma(rgb: [f32; 3], coefficients: [f32; 3]) -> f32 {
    coefficients[0] * rgb[0] + coefficients[1] * rgb[1] + coefficients[2] * rgb[2]
}

/// sRGB electro-optical transfer function (gamma-encoded to linear).
#[inline]
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Inverse of [`srgb_to_linear`].
#[inline]
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Rec.709 luma computed in linear light and re-encoded with the sRGB curve.
///
/// Averaging gamma-encoded values darkens saturated colors; linearizing
/// first avoids that bias.
#[inline]
pub fn gamma_correct_luma(rgb: [f32; 3]) -> f32 {
    let linear = rgb.map(srgb_to_linear);
    linear_to_srgb(weighted_luma(linear, REC709_COEFFICIENTS))
}

/// CIE L* of an sRGB color, rescaled from 0..100 to 0..1.
///
/// L* depends only on the Y tristimulus value, so the a* and b* axes are
/// never computed.
#[inline]
pub fn cie_lightness(rgb: [f32; 3]) -> f32 {
    let y = weighted_luma(rgb.map(srgb_to_linear), SRGB_TO_Y);
    let l = if y > LAB_EPSILON {
        116.0 * y.cbrt() - 16.0
    } else {
        LAB_KAPPA * y
    };
    l / 100.0
}

/// HSV value: the largest channel.
#[inline]
pub fn hsv_value(rgb: [f32; 3]) -> f32 {
    rgb[0].max(rgb[1]).max(rgb[2])
}

/// HSL lightness: midpoint of the largest and smallest channel.
#[inline]
pub fn hsl_lightness(rgb: [f32; 3]) -> f32 {
    let max = rgb[0].max(rgb[1]).max(rgb[2]);
    let min = rgb[0].min(rgb[1]).min(rgb[2]);
    (max + min) / 2.0
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_transfer_round_trip(c in 0.0f32..=1.0) {
            let back = linear_to_srgb(srgb_to_linear(c));
            prop_assert!((back - c).abs() < 1e-4, "{} -> {}", c, back);
        }

        #[test]
        fn prop_models_stay_in_unit_range(r in 0.0f32..=1.0, g in 0.0f32..=1.0, b in 0.0f32..=1.0) {
            let rgb = [r, g, b];
            for v in [
                weighted_luma(rgb, REC601_COEFFICIENTS),
                weighted_luma(rgb, REC709_COEFFICIENTS),
                weighted_luma(rgb, REC2100_COEFFICIENTS),
                gamma_correct_luma(rgb),
                cie_lightness(rgb),
                hsv_value(rgb),
                hsl_lightness(rgb),
            ] {
                prop_assert!((-1e-4..=1.0 + 1e-4).contains(&v), "out of range: {}", v);
            }
        }

        #[test]
        fn prop_hsl_between_min_and_max(r in 0.0f32..=1.0, g in 0.0f32..=1.0, b in 0.0f32..=1.0) {
            let l = hsl_lightness([r, g, b]);
            prop_assert!(l <= hsv_value([r, g, b]) + 1e-6);
            prop_assert!(l >= r.min(g).min(b) - 1e-6);
        }
    }
}
