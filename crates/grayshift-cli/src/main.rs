mod archive;
mod config;
mod store;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use grayshift_core::{convert, convert_batch, BatchInput, BatchReport, ConversionSettings};
use serde::Serialize;

use archive::ZipArchiveSink;
use config::SettingsArgs;
use store::{TempStore, DEFAULT_STORE};

/// Default archive written by `batch`.
const DEFAULT_ARCHIVE: &str = "grayscale_batch.zip";

#[derive(Parser)]
#[command(
    name = "grayshift",
    version,
    about = "Convert images to grayscale with selectable colorimetric models"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert one image into the temp store and print a JSON response
    Convert {
        /// Source image
        input: PathBuf,

        /// Store directory for the converted file
        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,

        /// Empty the store before converting
        #[arg(long)]
        sweep: bool,

        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Convert many images into one ZIP archive
    Batch {
        /// Source images
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Archive to write
        #[arg(short, long, default_value = DEFAULT_ARCHIVE)]
        output: PathBuf,

        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Remove everything from the temp store except .gitkeep
    Sweep {
        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
    },
}

/// JSON line printed by `convert`.
#[derive(Debug, Serialize, PartialEq)]
struct ConvertResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    original_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ConvertResponse {
    fn ok(output: &Path, original_info: String) -> Self {
        Self {
            success: true,
            output: Some(output.display().to_string()),
            original_info: Some(original_info),
            error: None,
        }
    }

    fn failed(error: &anyhow::Error) -> Self {
        Self {
            success: false,
            output: None,
            original_info: None,
            error: Some(format!("{:#}", error)),
        }
    }

    fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    match Cli::parse().command {
        Command::Convert {
            input,
            store,
            sweep,
            settings,
        } => {
            let store = TempStore::new(store);
            if sweep {
                let removed = store.sweep();
                log::info!("Swept {} entries from {:?}", removed, store.dir());
            }
            let response = match settings
                .resolve()
                .and_then(|settings| convert_file(&input, &settings, &store))
            {
                Ok(response) => response,
                Err(e) => {
                    log::error!("Conversion of {:?} failed: {:#}", input, e);
                    ConvertResponse::failed(&e)
                }
            };
            response.emit();
            Ok(if response.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Batch {
            inputs,
            output,
            settings,
        } => {
            let settings = settings.resolve()?;
            let report = batch_files(&inputs, &settings, &output)?;
            println!(
                "{}",
                serde_json::json!({
                    "success": true,
                    "output": output.display().to_string(),
                    "converted": report.written.len(),
                    "skipped": report.failed.iter().map(|f| &f.filename).collect::<Vec<_>>(),
                })
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Sweep { store } => {
            let store = TempStore::new(store);
            let removed = store.sweep();
            log::info!("Swept {} entries from {:?}", removed, store.dir());
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Convert one file and place the result in the store.
fn convert_file(
    input: &Path,
    settings: &ConversionSettings,
    store: &TempStore,
) -> Result<ConvertResponse> {
    let bytes = fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let conversion = convert(&bytes, settings)?;
    let path = store.write(settings.format.extension(), &conversion.bytes)?;
    log::info!(
        "Converted {:?} ({}) to {:?}",
        input,
        conversion.summary(),
        path
    );
    Ok(ConvertResponse::ok(&path, conversion.summary()))
}

/// Convert every readable input into a ZIP archive at `output`.
///
/// Inputs are read one at a time as the batch pulls them. Unreadable files
/// are logged and left out, like files that fail to convert.
fn batch_files(
    inputs: &[PathBuf],
    settings: &ConversionSettings,
    output: &Path,
) -> Result<BatchReport> {
    let file = File::create(output).with_context(|| format!("Failed to create {:?}", output))?;
    let mut sink = ZipArchiveSink::new(BufWriter::new(file));

    let sources = inputs.iter().filter_map(|path| match fs::read(path) {
        Ok(bytes) => Some(BatchInput::new(path.display().to_string(), bytes)),
        Err(e) => {
            log::warn!("Skipping {:?}: {}", path, e);
            None
        }
    });

    let report = convert_batch(sources, settings, &mut sink)
        .with_context(|| format!("Failed to write archive {:?}", output))?;
    sink.finish()
        .with_context(|| format!("Failed to finish archive {:?}", output))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use grayshift_core::OutputFormat;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("grayshift-cli-{}-{}", std::process::id(), name));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let img = RgbaImage::from_fn(6, 4, |x, y| Rgba([x as u8 * 40, y as u8 * 60, 10, 200]));
        let path = dir.join(name);
        DynamicImage::ImageRgba8(img)
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();
        path
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert_flags() {
        let cli = Cli::parse_from([
            "grayshift", "convert", "in.png", "--mode", "Rec. 601", "--format", ".tif",
            "--bit-depth", "16", "--preserve-alpha",
        ]);
        match cli.command {
            Command::Convert {
                input,
                store,
                settings,
                ..
            } => {
                assert_eq!(input, PathBuf::from("in.png"));
                assert_eq!(store, PathBuf::from(DEFAULT_STORE));
                let resolved = settings.resolve().unwrap();
                assert_eq!(resolved.format, OutputFormat::Tiff);
                assert_eq!(resolved.bit_depth.bits(), 16);
                assert!(resolved.preserve_alpha);
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["grayshift", "convert", "in.png", "--mode", "sepia"]).is_err());
    }

    #[test]
    fn test_convert_file_writes_into_store() {
        let dir = scratch("convert");
        let input = write_png(&dir, "photo.png");
        let store = TempStore::new(dir.join("store"));
        let settings = ConversionSettings {
            format: OutputFormat::Jpeg,
            ..Default::default()
        };

        let response = convert_file(&input, &settings, &store).unwrap();
        assert!(response.success);
        assert_eq!(response.original_info.as_deref(), Some("6x4 | RGBA | 8-bit"));

        let output = PathBuf::from(response.output.unwrap());
        assert_eq!(output.extension().unwrap(), "jpeg");
        let decoded = image::open(&output).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_convert_file_missing_input() {
        let store = TempStore::new(scratch("missing"));
        let err = convert_file(
            Path::new("/no/such/image.png"),
            &ConversionSettings::default(),
            &store,
        )
        .unwrap_err();
        let response = ConvertResponse::failed(&err);
        assert!(!response.success);
        assert!(response.error.unwrap().contains("Failed to read"));
    }

    #[test]
    fn test_response_json_shape() {
        let ok = ConvertResponse::ok(Path::new("temp_output/ab.png"), "1x1 | L | 8-bit".into());
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({
                "success": true,
                "output": "temp_output/ab.png",
                "original_info": "1x1 | L | 8-bit"
            })
        );

        let failed = ConvertResponse::failed(&anyhow::anyhow!("bad input"));
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({ "success": false, "error": "bad input" })
        );
    }

    #[test]
    fn test_batch_files_builds_archive() {
        let dir = scratch("batch");
        let good = write_png(&dir, "one.png");
        let corrupt = dir.join("two.png");
        fs::write(&corrupt, b"definitely not a png").unwrap();
        let missing = dir.join("three.png");
        let archive_path = dir.join("out.zip");

        let report = batch_files(
            &[good, corrupt, missing],
            &ConversionSettings::default(),
            &archive_path,
        )
        .unwrap();
        assert_eq!(report.written, vec!["one_grayscale.png"]);
        assert_eq!(report.failed.len(), 1);

        let archive = zip::ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.file_names().collect::<Vec<_>>(), vec!["one_grayscale.png"]);

        fs::remove_dir_all(&dir).ok();
    }
}
