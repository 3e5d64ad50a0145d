//! Prediction: from normalized images to bucketed tags.
//!
//! - **engine**: partitioning a probability vector, single and stacked prediction
//! - **batch**: whole-folder runs with progress and cancellation

pub mod batch;
pub mod engine;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{BatchOutcome, BatchPredictor, BatchProgress, ProgressSnapshot, SkippedImage};
pub use engine::{partition, predict, predict_batch};
