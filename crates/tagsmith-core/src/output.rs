//! Exporting batch results as JSON or JSON Lines.

use indexmap::IndexMap;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

use crate::tagging::ImageRecord;
use crate::types::{Rating, RatingScores, TagSource};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// One exported image: the committed tag string plus the model's view of it.
#[derive(Debug, Serialize)]
pub struct TaggedImage<'a> {
    pub file_path: &'a Path,
    pub file_name: String,
    /// Committed tags, exactly as a tag writer would store them
    pub tags: String,
    pub rating: Rating,
    pub rating_scores: RatingScores,
    pub character_tags: &'a IndexMap<String, TagSource>,
    pub general_tags: &'a IndexMap<String, TagSource>,
    pub all_tags: &'a IndexMap<String, f32>,
}

impl<'a> From<&'a ImageRecord> for TaggedImage<'a> {
    fn from(record: &'a ImageRecord) -> Self {
        Self {
            file_path: &record.path,
            file_name: record.file_name(),
            tags: record.state.commit(),
            rating: record.result.rating.argmax(),
            rating_scores: record.result.rating,
            character_tags: &record.result.character_tags,
            general_tags: &record.result.threshold_tags,
            all_tags: &record.result.all_tags,
        }
    }
}

/// A writer that serializes items to JSON or JSONL format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new output writer.
    ///
    /// `pretty` only affects the JSON format; JSONL is always one object per line.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write a single item.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)?;
        self.items_written += 1;
        Ok(())
    }

    /// Write multiple items: a JSON array, or one line per item for JSONL.
    pub fn write_all<T: Serialize>(&mut self, items: &[T]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, items)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, items).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.items_written += items.len();
            }
            OutputFormat::JsonLines => {
                for item in items {
                    self.write(item)?;
                }
            }
        }
        Ok(())
    }

    /// Export session records.
    pub fn write_records(&mut self, records: &[ImageRecord]) -> io::Result<()> {
        let rows: Vec<TaggedImage<'_>> = records.iter().map(TaggedImage::from).collect();
        self.write_all(&rows)
    }

    /// Get the number of items written.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
