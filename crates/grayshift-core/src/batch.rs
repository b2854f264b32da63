//! Batch conversion with per-item failure isolation.
//!
//! Each input runs through the full pipeline independently. A failed item is
//! logged with its filename and left out; the rest of the batch proceeds.
//! Outputs are handed to an [`ArchiveSink`] one at a time as they are
//! produced, so a batch never holds every encoded file in memory at once.

use std::collections::HashSet;
use std::convert::Infallible;
use std::path::Path;

use crate::settings::{ConversionSettings, OutputFormat};
use crate::{convert, ConvertError};

/// Suffix appended to the source stem of every batch entry.
pub const OUTPUT_SUFFIX: &str = "_grayscale";

/// Receives named output blobs incrementally.
pub trait ArchiveSink {
    type Error;

    /// Append one named entry.
    fn append(&mut self, name: &str, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Collects entries in memory, in append order.
impl ArchiveSink for Vec<(String, Vec<u8>)> {
    type Error = Infallible;

    fn append(&mut self, name: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        self.push((name.to_string(), bytes.to_vec()));
        Ok(())
    }
}

/// One encoded input file of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInput {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl BatchInput {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// A converted batch item, named for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutput {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A batch item that failed to convert.
#[derive(Debug)]
pub struct BatchFailure {
    pub filename: String,
    pub error: ConvertError,
}

/// Outcome of a whole batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Archive entry names, in order.
    pub written: Vec<String>,
    /// Items left out of the archive.
    pub failed: Vec<BatchFailure>,
}

/// Archive entry name for a source file: `<stem>_grayscale.<ext>`.
///
/// Falls back to `image` when the filename has no usable stem.
pub fn output_name(filename: &str, format: OutputFormat) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    format!("{}{}.{}", stem, OUTPUT_SUFFIX, format.extension())
}

/// Convert each input lazily, yielding one result per item in input order.
pub fn convert_each<'a, I>(
    inputs: I,
    settings: &'a ConversionSettings,
) -> impl Iterator<Item = Result<BatchOutput, BatchFailure>> + 'a
where
    I: IntoIterator<Item = BatchInput>,
    I::IntoIter: 'a,
{
    inputs.into_iter().map(move |input| {
        convert(&input.bytes, settings)
            .map(|conversion| BatchOutput {
                name: output_name(&input.filename, settings.format),
                bytes: conversion.bytes,
            })
            .map_err(|error| BatchFailure {
                filename: input.filename,
                error,
            })
    })
}

/// Convert every input and append the successes to `sink`.
///
/// # Errors
///
/// Only a failing sink aborts the batch. Conversion failures are recorded in
/// the report and skipped.
pub fn convert_batch<I, S>(
    inputs: I,
    settings: &ConversionSettings,
    sink: &mut S,
) -> Result<BatchReport, S::Error>
where
    I: IntoIterator<Item = BatchInput>,
    S: ArchiveSink,
{
    let mut report = BatchReport::default();
    let mut taken = HashSet::new();

    for outcome in convert_each(inputs, settings) {
        match outcome {
            Ok(output) => {
                let name = unique_name(output.name, &mut taken);
                sink.append(&name, &output.bytes)?;
                report.written.push(name);
            }
            Err(failure) => {
                log::warn!("Skipping {}: {}", failure.filename, failure.error);
                report.failed.push(failure);
            }
        }
    }

    log::info!(
        "Batch finished: {} converted, {} skipped",
        report.written.len(),
        report.failed.len()
    );
    Ok(report)
}

/// Disambiguate repeated entry names with a `_<n>` counter before the extension.
fn unique_name(name: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.clone()) {
        return name;
    }
    let (base, ext) = match name.rsplit_once('.') {
        Some((base, ext)) => (base.to_string(), format!(".{}", ext)),
        None => (name.clone(), String::new()),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}{}", base, n, ext);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 90]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    /// Sink that fails on a chosen entry.
    struct FailingSink {
        fail_on: usize,
        seen: usize,
    }

    impl ArchiveSink for FailingSink {
        type Error = String;

        fn append(&mut self, name: &str, _bytes: &[u8]) -> Result<(), Self::Error> {
            self.seen += 1;
            if self.seen == self.fail_on {
                return Err(format!("disk full at {}", name));
            }
            Ok(())
        }
    }

    #[test]
    fn test_output_name() {
        assert_eq!(output_name("holiday.jpg", OutputFormat::Png), "holiday_grayscale.png");
        assert_eq!(output_name("dir/scan.v2.tif", OutputFormat::Jpeg), "scan.v2_grayscale.jpeg");
        assert_eq!(output_name("", OutputFormat::Heif), "image_grayscale.heic");
    }

    #[test]
    fn test_batch_skips_corrupt_item() {
        let inputs = vec![
            BatchInput::new("a.png", png(4, 4)),
            BatchInput::new("broken.png", b"not an image at all".to_vec()),
            BatchInput::new("c.png", png(3, 2)),
        ];
        let mut sink: Vec<(String, Vec<u8>)> = Vec::new();
        let report = convert_batch(inputs, &ConversionSettings::default(), &mut sink).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(report.written, vec!["a_grayscale.png", "c_grayscale.png"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].filename, "broken.png");
        assert!(sink.iter().all(|(name, _)| !name.starts_with("broken")));
    }

    #[test]
    fn test_batch_outputs_decode() {
        let settings = ConversionSettings {
            format: OutputFormat::Bmp,
            ..Default::default()
        };
        let mut sink: Vec<(String, Vec<u8>)> = Vec::new();
        convert_batch(vec![BatchInput::new("x.png", png(5, 7))], &settings, &mut sink).unwrap();

        let (name, bytes) = &sink[0];
        assert_eq!(name, "x_grayscale.bmp");
        let decoded = image::load_from_memory(bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 7));
    }

    #[test]
    fn test_batch_dedupes_names() {
        let inputs = vec![
            BatchInput::new("a/photo.png", png(2, 2)),
            BatchInput::new("b/photo.png", png(2, 2)),
            BatchInput::new("c/photo.png", png(2, 2)),
        ];
        let mut sink: Vec<(String, Vec<u8>)> = Vec::new();
        let report = convert_batch(inputs, &ConversionSettings::default(), &mut sink).unwrap();
        assert_eq!(
            report.written,
            vec![
                "photo_grayscale.png",
                "photo_grayscale_2.png",
                "photo_grayscale_3.png"
            ]
        );
    }

    #[test]
    fn test_sink_failure_aborts() {
        let inputs = vec![
            BatchInput::new("a.png", png(2, 2)),
            BatchInput::new("b.png", png(2, 2)),
        ];
        let mut sink = FailingSink { fail_on: 2, seen: 0 };
        let err = convert_batch(inputs, &ConversionSettings::default(), &mut sink).unwrap_err();
        assert_eq!(err, "disk full at b_grayscale.png");
    }

    #[test]
    fn test_convert_each_is_ordered() {
        let inputs = vec![
            BatchInput::new("bad", vec![0; 16]),
            BatchInput::new("good.png", png(2, 2)),
        ];
        let settings = ConversionSettings::default();
        let results: Vec<_> = convert_each(inputs, &settings).collect();
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap().name, "good_grayscale.png");
    }

    #[test]
    fn test_empty_batch() {
        let mut sink: Vec<(String, Vec<u8>)> = Vec::new();
        let report = convert_batch(Vec::new(), &ConversionSettings::default(), &mut sink).unwrap();
        assert!(report.written.is_empty());
        assert!(report.failed.is_empty());
    }
}
