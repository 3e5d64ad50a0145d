//! CLI enum types shared by `predict` and `review`: output format and tag writer.

use clap::ValueEnum;
use tagsmith_core::config::WriterKind;
use tagsmith_core::OutputFormat as CoreOutputFormat;

/// Supported output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Where accepted tags are written.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum WriterChoice {
    /// EXIF ImageDescription inside the image (JPEG, PNG)
    Exif,
    /// `<file name>.txt` next to the image (`a.png` → `a.png.txt`)
    Sidecar,
}

impl From<WriterChoice> for WriterKind {
    fn from(choice: WriterChoice) -> Self {
        match choice {
            WriterChoice::Exif => WriterKind::Exif,
            WriterChoice::Sidecar => WriterKind::Sidecar,
        }
    }
}
