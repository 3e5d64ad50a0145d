//! Multi-label image classifier contract.
//!
//! The network itself is a black box. Tagsmith only relies on its I/O shape:
//! a stacked batch of normalized `[N, H, W, 3]` images goes in, and one
//! probability vector per image comes out, aligned to the general label
//! vocabulary with three rating probabilities appended at the end.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tagsmith_core::classifier::{Classifier, OnnxClassifier};
//!
//! let classifier = OnnxClassifier::load(&model_path, 512)?;
//! let batch = stack_batch(&[&normalized])?;
//! let probabilities = classifier.classify(batch.view())?;
//! ```

pub(crate) mod onnx;

use ndarray::{Array4, ArrayView4, Axis};

use crate::error::PipelineError;
use crate::pipeline::NormalizedImage;

pub use self::onnx::OnnxClassifier;

/// Number of trailing rating scores in every classifier output vector.
pub const RATING_COUNT: usize = 3;

/// A classifier that maps image batches to per-label probabilities.
///
/// Implementations must be deterministic for identical input and safe to
/// share across threads; the batch predictor calls `classify` from blocking
/// worker threads.
pub trait Classifier: Send + Sync {
    /// Required input size as `(height, width)`.
    fn input_size(&self) -> (u32, u32);

    /// Run the classifier on a `[N, H, W, 3]` batch.
    ///
    /// Returns `N` vectors of `labels + RATING_COUNT` probabilities.
    fn classify(&self, batch: ArrayView4<'_, f32>) -> Result<Vec<Vec<f32>>, PipelineError>;
}

/// Stack normalized images into one `[N, H, W, 3]` batch.
///
/// All images must share the same spatial size.
pub fn stack_batch(images: &[&NormalizedImage]) -> Result<Array4<f32>, PipelineError> {
    if images.is_empty() {
        return Err(PipelineError::PreconditionViolation(
            "cannot stack an empty batch".to_string(),
        ));
    }
    let views: Vec<_> = images.iter().map(|img| img.view()).collect();
    ndarray::stack(Axis(0), &views).map_err(|e| {
        PipelineError::PreconditionViolation(format!("images in a batch differ in shape: {e}"))
    })
}
