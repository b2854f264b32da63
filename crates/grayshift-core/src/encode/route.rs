//! Capability routing: which writer handles a (format, depth, alpha) key.

use crate::settings::{BitDepth, OutputFormat};

/// The writer chosen for one encode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodePath {
    /// The `image` crate encoders (and the plain TIFF directory writer).
    /// `wide` keeps 16-bit samples, `alpha` merges a second channel.
    /// Resizing applies on this path.
    General { wide: bool, alpha: bool },
    /// 16-bit gray + 16-bit alpha (widened from 8-bit) as a two-sample TIFF.
    StackedTiff,
    /// 16-bit gray replicated into RGB plus widened alpha, as RGBA16 PNG.
    WidenedPng,
    /// HEVC-in-HEIF through libheif. Resizing applies.
    Heif { ten_bit: bool, alpha: bool },
}

impl EncodePath {
    pub fn keeps_alpha(self) -> bool {
        match self {
            EncodePath::General { alpha, .. } | EncodePath::Heif { alpha, .. } => alpha,
            EncodePath::StackedTiff | EncodePath::WidenedPng => true,
        }
    }
}

/// Select the encoding path for a format, luminance depth and alpha presence.
///
/// | Format     | 8-bit            | 10/16-bit          | alpha                        |
/// |------------|------------------|--------------------|------------------------------|
/// | JPEG       | general          | narrowed to 8      | dropped                      |
/// | HEIF       | heif             | heif (10-bit flag) | kept at 8-bit only           |
/// | TIFF       | general          | general            | stacked writer when wide     |
/// | PNG        | general          | general            | widened RGBA writer when wide|
/// | WEBP, BMP  | general          | narrowed to 8      | kept at 8-bit                |
pub fn route(format: OutputFormat, depth: BitDepth, has_alpha: bool) -> EncodePath {
    use BitDepth::{Eight, Sixteen, Ten};
    use OutputFormat::{Bmp, Heif, Jpeg, Png, Tiff, Webp};

    match (format, depth, has_alpha) {
        (Jpeg, _, _) => EncodePath::General {
            wide: false,
            alpha: false,
        },
        (Heif, Eight, alpha) => EncodePath::Heif {
            ten_bit: false,
            alpha,
        },
        (Heif, Ten, _) => EncodePath::Heif {
            ten_bit: true,
            alpha: false,
        },
        (Heif, Sixteen, _) => EncodePath::Heif {
            ten_bit: false,
            alpha: false,
        },
        (Tiff, Ten | Sixteen, true) => EncodePath::StackedTiff,
        (Png, Ten | Sixteen, true) => EncodePath::WidenedPng,
        (Tiff | Png, depth, alpha) => EncodePath::General {
            wide: depth.is_wide(),
            alpha,
        },
        (Webp | Bmp, _, alpha) => EncodePath::General { wide: false, alpha },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPTHS: [BitDepth; 3] = [BitDepth::Eight, BitDepth::Ten, BitDepth::Sixteen];

    #[test]
    fn test_jpeg_always_eight_bit_no_alpha() {
        for depth in DEPTHS {
            for alpha in [false, true] {
                assert_eq!(
                    route(OutputFormat::Jpeg, depth, alpha),
                    EncodePath::General {
                        wide: false,
                        alpha: false
                    }
                );
            }
        }
    }

    #[test]
    fn test_specialized_paths() {
        assert_eq!(
            route(OutputFormat::Tiff, BitDepth::Sixteen, true),
            EncodePath::StackedTiff
        );
        assert_eq!(
            route(OutputFormat::Png, BitDepth::Sixteen, true),
            EncodePath::WidenedPng
        );
        assert_eq!(
            route(OutputFormat::Tiff, BitDepth::Ten, true),
            EncodePath::StackedTiff
        );
        assert!(EncodePath::StackedTiff.keeps_alpha());
        assert!(EncodePath::WidenedPng.keeps_alpha());
    }

    #[test]
    fn test_wide_without_alpha_is_general() {
        assert_eq!(
            route(OutputFormat::Png, BitDepth::Sixteen, false),
            EncodePath::General {
                wide: true,
                alpha: false
            }
        );
        assert_eq!(
            route(OutputFormat::Tiff, BitDepth::Ten, false),
            EncodePath::General {
                wide: true,
                alpha: false
            }
        );
    }

    #[test]
    fn test_eight_bit_alpha_is_general() {
        for format in [OutputFormat::Png, OutputFormat::Tiff, OutputFormat::Webp, OutputFormat::Bmp] {
            assert_eq!(
                route(format, BitDepth::Eight, true),
                EncodePath::General {
                    wide: false,
                    alpha: true
                }
            );
        }
    }

    #[test]
    fn test_webp_bmp_never_wide() {
        for format in [OutputFormat::Webp, OutputFormat::Bmp] {
            for depth in DEPTHS {
                let path = route(format, depth, false);
                assert_eq!(
                    path,
                    EncodePath::General {
                        wide: false,
                        alpha: false
                    }
                );
            }
        }
    }

    #[test]
    fn test_heif_alpha_only_at_eight_bit() {
        assert_eq!(
            route(OutputFormat::Heif, BitDepth::Eight, true),
            EncodePath::Heif {
                ten_bit: false,
                alpha: true
            }
        );
        assert_eq!(
            route(OutputFormat::Heif, BitDepth::Ten, true),
            EncodePath::Heif {
                ten_bit: true,
                alpha: false
            }
        );
        assert!(!route(OutputFormat::Heif, BitDepth::Sixteen, true).keeps_alpha());
    }

    #[test]
    fn test_full_table_never_keeps_alpha_without_source_alpha() {
        for format in OutputFormat::ALL {
            for depth in DEPTHS {
                assert!(!route(format, depth, false).keeps_alpha());
            }
        }
    }
}
