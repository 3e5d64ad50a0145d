//! Tag strings in `<file name>.txt` files next to the images.

use std::path::{Path, PathBuf};

use crate::error::PipelineError;

use super::{replace_file, TagWriter};

/// Stores tags in a sidecar text file named after the image's full file name.
///
/// `a.png` is paired with `a.png.txt`, so `a.png` and `a.jpg` in one folder
/// never share a sidecar.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarTagWriter;

impl SidecarTagWriter {
    pub fn new() -> Self {
        Self
    }

    /// Sidecar file paired with an image.
    pub fn sidecar_path(image: &Path) -> PathBuf {
        let mut name = image.file_name().unwrap_or_default().to_os_string();
        name.push(".txt");
        image.with_file_name(name)
    }
}

impl TagWriter for SidecarTagWriter {
    fn write(&self, path: &Path, text: &str) -> Result<(), PipelineError> {
        if !path.is_file() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        replace_file(&Self::sidecar_path(path), text.as_bytes())
    }

    fn read(&self, path: &Path) -> Result<Option<String>, PipelineError> {
        let sidecar = Self::sidecar_path(path);
        match std::fs::read_to_string(&sidecar) {
            Ok(content) => Ok(Some(
                content
                    .trim_end_matches(|c| c == '\r' || c == '\n')
                    .to_string(),
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PipelineError::Metadata {
                path: sidecar,
                message: format!("Cannot read sidecar: {e}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            SidecarTagWriter::sidecar_path(Path::new("/pics/a.png")),
            PathBuf::from("/pics/a.png.txt")
        );
        assert_eq!(
            SidecarTagWriter::sidecar_path(Path::new("/pics/a.b.jpg")),
            PathBuf::from("/pics/a.b.jpg.txt")
        );
    }

    #[test]
    fn test_images_sharing_a_stem_keep_separate_tags() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("a.png");
        let jpg = dir.path().join("a.jpg");
        std::fs::write(&png, b"png bytes").unwrap();
        std::fs::write(&jpg, b"jpeg bytes").unwrap();

        let writer = SidecarTagWriter::new();
        writer.write(&png, "cat").unwrap();
        writer.write(&jpg, "dog").unwrap();

        assert_eq!(writer.read(&png).unwrap().as_deref(), Some("cat"));
        assert_eq!(writer.read(&jpg).unwrap().as_deref(), Some("dog"));
    }

    #[test]
    fn test_roundtrip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.jpg");
        std::fs::write(&image, b"jpeg bytes").unwrap();

        let writer = SidecarTagWriter::new();
        assert_eq!(writer.read(&image).unwrap(), None);

        writer.write(&image, "smile, rating:safe").unwrap();
        assert_eq!(writer.read(&image).unwrap().as_deref(), Some("smile, rating:safe"));

        writer.write(&image, "hat").unwrap();
        assert_eq!(writer.read(&image).unwrap().as_deref(), Some("hat"));
        // the image itself is untouched
        assert_eq!(std::fs::read(&image).unwrap(), b"jpeg bytes");
    }

    #[test]
    fn test_read_ignores_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("b.png");
        std::fs::write(dir.path().join("b.png.txt"), "smile, hat\n").unwrap();

        let text = SidecarTagWriter::new().read(&image).unwrap();
        assert_eq!(text.as_deref(), Some("smile, hat"));
    }

    #[test]
    fn test_write_requires_image() {
        let dir = tempfile::tempdir().unwrap();
        let err = SidecarTagWriter::new()
            .write(&dir.path().join("missing.png"), "smile")
            .unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
    }
}
