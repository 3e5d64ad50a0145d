//! Persisting committed tag strings.
//!
//! A [`TagWriter`] stores one plain-text tag string per image and reads it
//! back unchanged. Two backends exist:
//! - **exif**: the EXIF `ImageDescription` field inside JPEG and PNG files
//! - **sidecar**: a `.txt` file next to the image

pub mod exif;
pub mod sidecar;

use std::path::{Path, PathBuf};

use crate::config::WriterKind;
use crate::error::PipelineError;

pub use self::exif::ExifTagWriter;
pub use self::sidecar::SidecarTagWriter;

/// Stores and retrieves the tag string of an image.
pub trait TagWriter: Send + Sync {
    /// Replace the stored tag string of `path` with `text`.
    fn write(&self, path: &Path, text: &str) -> Result<(), PipelineError>;

    /// The stored tag string, or `None` if the image carries none.
    fn read(&self, path: &Path) -> Result<Option<String>, PipelineError>;
}

/// The writer configured by `[writer] kind`.
pub fn writer_for(kind: WriterKind) -> Box<dyn TagWriter> {
    match kind {
        WriterKind::Exif => Box::new(ExifTagWriter::new()),
        WriterKind::Sidecar => Box::new(SidecarTagWriter::new()),
    }
}

/// Replace `path` with `bytes` via a sibling temp file and a rename.
pub(crate) fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let tmp = temp_sibling(path);
    std::fs::write(&tmp, bytes)
        .and_then(|()| std::fs::rename(&tmp, path))
        .map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            PipelineError::Metadata {
                path: path.to_path_buf(),
                message: format!("Cannot write file: {e}"),
            }
        })
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tagsmith-tmp"))
}
