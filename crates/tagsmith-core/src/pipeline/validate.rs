//! Cheap checks before a file is handed to the decoder.

use std::io::Read;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Leading bytes of the container formats the decoder accepts.
const SIGNATURES: &[(&str, &[u8])] = &[
    ("jpeg", &[0xFF, 0xD8, 0xFF]),
    ("png", &[0x89, b'P', b'N', b'G']),
    ("gif", b"GIF8"),
    ("bmp", b"BM"),
    ("tiff", &[b'I', b'I', 0x2A, 0x00]),
    ("tiff", &[b'M', b'M', 0x00, 0x2A]),
];

/// Validates files before decoding.
#[derive(Debug, Clone)]
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Check existence, size limit and magic bytes.
    pub fn validate(&self, path: &Path) -> Result<(), PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        let metadata = std::fs::metadata(path).map_err(|e| PipelineError::ImageDecode {
            path: path.to_path_buf(),
            message: format!("Cannot read metadata: {}", e),
        })?;

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        let mut header = [0u8; 12];
        let bytes_read = std::fs::File::open(path)
            .and_then(|mut file| file.read(&mut header))
            .map_err(|e| PipelineError::ImageDecode {
                path: path.to_path_buf(),
                message: format!("Cannot open file: {}", e),
            })?;

        if detect_container(&header[..bytes_read]).is_none() {
            return Err(PipelineError::ImageDecode {
                path: path.to_path_buf(),
                message: "Unrecognized image format (invalid magic bytes)".to_string(),
            });
        }

        Ok(())
    }
}

/// Name of the container format whose signature opens `header`.
fn detect_container(header: &[u8]) -> Option<&'static str> {
    if header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP" {
        return Some("webp");
    }
    SIGNATURES
        .iter()
        .find(|(_, magic)| header.starts_with(magic))
        .map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_jpeg_and_png() {
        assert_eq!(
            detect_container(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]),
            Some("jpeg")
        );
        assert_eq!(
            detect_container(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
            Some("png")
        );
    }

    #[test]
    fn test_detect_webp_needs_full_header() {
        let header = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'E', b'B', b'P'];
        assert_eq!(detect_container(&header), Some("webp"));
        let wav = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'A', b'V', b'E'];
        assert_eq!(detect_container(&wav), None);
    }

    #[test]
    fn test_detect_rejects_bare_tiff_prefix() {
        assert_eq!(detect_container(&[b'I', b'I', 0x00, 0x00]), None);
        assert_eq!(detect_container(&[b'M', b'M', 0x00, 0x2A]), Some("tiff"));
    }

    #[test]
    fn test_validate_missing_file() {
        let validator = Validator::new(LimitsConfig::default());
        let err = validator
            .validate(Path::new("/nonexistent/tagsmith/a.png"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
    }

    #[test]
    fn test_validate_rejects_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"hello world, not an image").unwrap();

        let err = Validator::new(LimitsConfig::default())
            .validate(&path)
            .unwrap_err();
        assert!(err.to_string().contains("magic bytes"));
    }

    #[test]
    fn test_validate_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        let mut bytes = vec![0x89, b'P', b'N', b'G'];
        bytes.resize(1024 * 1024 + 1, 0);
        std::fs::write(&path, bytes).unwrap();

        let limits = LimitsConfig {
            max_file_size_mb: 1,
            ..LimitsConfig::default()
        };
        let err = Validator::new(limits).validate(&path).unwrap_err();
        assert!(matches!(err, PipelineError::FileTooLarge { max_mb: 1, .. }));
    }
}
