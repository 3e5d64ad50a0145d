//! Error types for the Tagsmith tagging pipeline.
//!
//! Errors are organized by stage to provide clear, actionable error messages
//! that include relevant context (file paths, stage names, specific issues).
//!
//! Two families matter to callers of the prediction pipeline:
//! - per-item resource failures (`ImageDecode`, `ResourceNotFound`, ...) which
//!   the batch predictor logs and skips;
//! - programmer errors (`PreconditionViolation`, `InvalidImageFormat`) which are
//!   never collapsed into "nothing passed the threshold".

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Tagsmith operations.
#[derive(Error, Debug)]
pub enum TaggerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A model resource (weights, label file) is missing
    #[error("Resource not found: {0}")]
    ResourceNotFound(PathBuf),

    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    ImageDecode { path: PathBuf, message: String },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// The classifier was handed input it cannot accept (not preprocessed,
    /// wrong size) or returned output that does not match the vocabulary.
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// Image tensor does not have exactly three color channels
    #[error("Invalid image format: expected 3 channels, got {channels}")]
    InvalidImageFormat { channels: usize },

    /// Classifier session failed to load or run
    #[error("Classifier error for {path}: {message}")]
    Classifier { path: PathBuf, message: String },

    /// Reading or writing tag metadata failed
    #[error("Metadata error for {path}: {message}")]
    Metadata { path: PathBuf, message: String },

    /// No general labels were loaded, so classifier output cannot be named
    #[error("No labels loaded; check the label files in the model directory")]
    EmptyVocabulary,

    /// The batch was cancelled before completion
    #[error("Batch cancelled")]
    Cancelled,

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

impl PipelineError {
    /// Whether this error signals a bug in the caller rather than bad input data.
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            PipelineError::PreconditionViolation(_) | PipelineError::InvalidImageFormat { .. }
        )
    }
}

/// Convenience type alias for Tagsmith results.
pub type Result<T> = std::result::Result<T, TaggerError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
