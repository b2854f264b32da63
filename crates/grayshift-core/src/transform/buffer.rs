//! Output buffers of the grayscale transform.

use image::{GrayImage, ImageBuffer, Luma};

use crate::settings::BitDepth;

/// Single-channel 16-bit image.
pub type Gray16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Quantize a normalized value to `0..=max`, rounding to nearest.
#[inline]
pub fn quantize(value: f32, max: u16) -> u16 {
    let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    (v * max as f32).round() as u16
}

/// Single-channel luminance at the requested bit depth.
///
/// Every sample lies in `0..=depth.max_value()`. 10-bit values are carried
/// in a 16-bit container without rescaling.
#[derive(Debug, Clone, PartialEq)]
pub enum LuminanceBuffer {
    Eight(GrayImage),
    Wide { depth: BitDepth, image: Gray16Image },
}

impl LuminanceBuffer {
    pub fn depth(&self) -> BitDepth {
        match self {
            LuminanceBuffer::Eight(_) => BitDepth::Eight,
            LuminanceBuffer::Wide { depth, .. } => *depth,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            LuminanceBuffer::Eight(img) => img.dimensions(),
            LuminanceBuffer::Wide { image, .. } => image.dimensions(),
        }
    }

    /// Narrow to 8-bit, rescaling by `255 / max` with rounding.
    pub fn to_eight(&self) -> GrayImage {
        match self {
            LuminanceBuffer::Eight(img) => img.clone(),
            LuminanceBuffer::Wide { depth, image } => {
                let max = depth.max_value() as u32;
                ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
                    let v = image.get_pixel(x, y)[0] as u32;
                    Luma([((v.min(max) * 255 + max / 2) / max) as u8])
                })
            }
        }
    }

    /// Sample at `(x, y)` as a raw integer at the buffer's own depth.
    #[cfg(test)]
    pub(crate) fn sample(&self, x: u32, y: u32) -> u16 {
        match self {
            LuminanceBuffer::Eight(img) => img.get_pixel(x, y)[0] as u16,
            LuminanceBuffer::Wide { image, .. } => image.get_pixel(x, y)[0],
        }
    }
}

/// 8-bit alpha channel extracted from the source, same size as the luminance.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaBuffer(GrayImage);

impl AlphaBuffer {
    pub fn new(image: GrayImage) -> Self {
        Self(image)
    }

    pub fn image(&self) -> &GrayImage {
        &self.0
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    /// Widen to 16-bit by multiplying by 257 (0xFF becomes 0xFFFF).
    pub fn widened(&self) -> Gray16Image {
        ImageBuffer::from_fn(self.0.width(), self.0.height(), |x, y| {
            Luma([self.0.get_pixel(x, y)[0] as u16 * 257])
        })
    }
}
