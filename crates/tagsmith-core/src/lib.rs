//! Tagsmith Core - headless bulk image tagging.
//!
//! Tagsmith runs a DeepDanbooru-style multi-label classifier over a folder of
//! images, lets the caller curate the accepted tags of each image, and stores
//! the accepted tag string in the image's metadata.
//!
//! # Architecture
//!
//! ```text
//! Folder → Discover → Decode → Fit/Pad/Normalize → Classify (stacked) → Partition
//!        → ImageRecord (TagState) → edit → commit → TagWriter
//! ```
//!
//! Everything here is a plain library call; no UI is required.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tagsmith_core::{BatchProgress, Config, ModelLoader, Session};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = Config::load()?;
//! let model = ModelLoader::new(config.model.clone()).load(config.model_dir()).await?;
//! let mut session = Session::new(model);
//!
//! let outcome = session
//!     .predictor(&config)
//!     .run(dir, config.thresholds()?, &Arc::new(BatchProgress::new()), &CancellationToken::new())
//!     .await?;
//! session.replace_batch(outcome);
//!
//! let writer = tagsmith_core::metadata::writer_for(config.writer.kind);
//! session.write_record(0, writer.as_ref())?;
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod metadata;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod prediction;
pub mod session;
pub mod tagging;
pub mod types;

pub use classifier::{Classifier, OnnxClassifier};
pub use config::Config;
pub use error::{ConfigError, PipelineError, PipelineResult, Result, TaggerError};
pub use metadata::{writer_for, ExifTagWriter, SidecarTagWriter, TagWriter};
pub use model::{LabelStore, LoadedModel, ModelLoader};
pub use output::{OutputFormat, OutputWriter, TaggedImage};
pub use pipeline::{ImagePreprocessor, NormalizedImage};
pub use prediction::{
    partition, predict, predict_batch, BatchOutcome, BatchPredictor, BatchProgress,
    ProgressSnapshot,
};
pub use session::Session;
pub use tagging::{ImageRecord, LabelVocabulary, TagFrequencyHistogram, TagState};
pub use types::{
    BatchStats, PredictionResult, Rating, RatingScores, TagSource, ThresholdPercent, Thresholds,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
