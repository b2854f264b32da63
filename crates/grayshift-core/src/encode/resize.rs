//! Resizing of luminance and alpha buffers ahead of encoding.
//!
//! Both buffers go through the same filter so alpha stays aligned with the
//! luminance it masks. Results are new buffers; inputs are never modified.

use image::imageops;
use thiserror::Error;

use crate::settings::TargetSize;
use crate::transform::{AlphaBuffer, LuminanceBuffer};

/// Errors that can occur while resizing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResizeError {
    /// Width or height is zero.
    #[error("Invalid target dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Filter shared by luminance and alpha so both stay aligned.
const FILTER: imageops::FilterType = imageops::FilterType::Lanczos3;

fn check_target(size: TargetSize) -> Result<(), ResizeError> {
    if size.width == 0 || size.height == 0 {
        return Err(ResizeError::InvalidDimensions {
            width: size.width,
            height: size.height,
        });
    }
    Ok(())
}

/// Resize a luminance buffer to exact dimensions.
///
/// # Arguments
///
/// * `buffer` - The luminance to resize
/// * `size` - Target width and height in pixels
///
/// # Errors
///
/// Returns `ResizeError::InvalidDimensions` if either target dimension is zero.
pub fn resize_luminance(
    buffer: &LuminanceBuffer,
    size: TargetSize,
) -> Result<LuminanceBuffer, ResizeError> {
    check_target(size)?;

    // Fast path: if dimensions match, just clone
    if buffer.dimensions() == (size.width, size.height) {
        return Ok(buffer.clone());
    }

    Ok(match buffer {
        LuminanceBuffer::Eight(img) => {
            LuminanceBuffer::Eight(imageops::resize(img, size.width, size.height, FILTER))
        }
        LuminanceBuffer::Wide { depth, image } => {
            let mut resized = imageops::resize(image, size.width, size.height, FILTER);
            // Lanczos ringing can overshoot a 10-bit range held in 16 bits
            let max = depth.max_value();
            for px in resized.pixels_mut() {
                px[0] = px[0].min(max);
            }
            LuminanceBuffer::Wide {
                depth: *depth,
                image: resized,
            }
        }
    })
}

/// Resize an alpha buffer to exact dimensions.
///
/// # Errors
///
/// Returns `ResizeError::InvalidDimensions` if either target dimension is zero.
pub fn resize_alpha(buffer: &AlphaBuffer, size: TargetSize) -> Result<AlphaBuffer, ResizeError> {
    check_target(size)?;

    if buffer.dimensions() == (size.width, size.height) {
        return Ok(buffer.clone());
    }

    let (width, height) = (size.width, size.height);
    Ok(AlphaBuffer::new(imageops::resize(buffer.image(), width, height, FILTER)))
}
