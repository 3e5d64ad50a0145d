//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::types::{ThresholdPercent, Thresholds};

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the classifier weights and label files
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.tagsmith/models/deepdanbooru-v3"),
        }
    }
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of images preprocessed concurrently
    pub parallel_workers: usize,

    /// Images stacked into one classifier call
    pub batch_size: usize,

    /// Supported input formats (by extension)
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            batch_size: 16,
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "gif".to_string(),
                "bmp".to_string(),
                "tif".to_string(),
                "tiff".to_string(),
            ],
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 20000,
            decode_timeout_ms: 10000,
        }
    }
}

/// Classifier distribution layout.
///
/// DeepDanbooru ships its weights next to two plain-text label files; only the
/// file names and the square input size vary between releases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Classifier weights exported to ONNX
    pub weights_file: String,

    /// General labels, one per line, in classifier output order
    pub general_labels_file: String,

    /// Character labels, one per line
    pub character_labels_file: String,

    /// Square input side in pixels, used when the model's input size is dynamic
    pub input_size: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            weights_file: "model-resnet_custom_v3.onnx".to_string(),
            general_labels_file: "tags.txt".to_string(),
            character_labels_file: "tags-character.txt".to_string(),
            input_size: 512,
        }
    }
}

/// Default acceptance thresholds, as integer percentages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// General-tag threshold (1..=100)
    pub general: u8,

    /// Character-tag threshold (1..=100)
    pub character: u8,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            general: 50,
            character: 85,
        }
    }
}

impl ThresholdsConfig {
    /// Convert the percentages into probability cutoffs.
    pub fn to_thresholds(&self) -> Result<Thresholds, ConfigError> {
        let general = ThresholdPercent::new(self.general).map_err(|e| {
            ConfigError::ValidationError(format!("thresholds.general: {e}"))
        })?;
        let character = ThresholdPercent::new(self.character).map_err(|e| {
            ConfigError::ValidationError(format!("thresholds.character: {e}"))
        })?;
        Ok(Thresholds::from_percent(general, character))
    }
}

/// Where accepted tags are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WriterKind {
    /// EXIF ImageDescription inside the image file
    #[default]
    Exif,
    /// `<image>.txt` next to the image
    Sidecar,
}

/// Tag persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WriterConfig {
    /// Writer backend
    pub kind: WriterKind,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_kind_serde() {
        let config: WriterConfig = toml::from_str("kind = \"sidecar\"").unwrap();
        assert_eq!(config.kind, WriterKind::Sidecar);
        assert_eq!(WriterConfig::default().kind, WriterKind::Exif);
    }

    #[test]
    fn test_threshold_percent_out_of_range() {
        let config = ThresholdsConfig {
            general: 101,
            character: 85,
        };
        let err = config.to_thresholds().unwrap_err();
        assert!(err.to_string().contains("thresholds.general"));
    }
}
