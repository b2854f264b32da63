//! ZIP archive sink for batch conversion.

use std::io::{Seek, Write};

use grayshift_core::ArchiveSink;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Streams each batch entry into a deflated ZIP as it arrives.
pub struct ZipArchiveSink<W: Write + Seek> {
    writer: ZipWriter<W>,
}

impl<W: Write + Seek> ZipArchiveSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: ZipWriter::new(inner),
        }
    }

    /// Write the central directory and hand back the underlying writer.
    pub fn finish(self) -> Result<W, ZipError> {
        self.writer.finish()
    }
}

impl<W: Write + Seek> ArchiveSink for ZipArchiveSink<W> {
    type Error = ZipError;

    fn append(&mut self, name: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer.start_file(name, options)?;
        self.writer.write_all(bytes)?;
        Ok(())
    }
}
