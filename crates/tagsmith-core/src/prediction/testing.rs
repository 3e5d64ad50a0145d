//! In-process classifier stand-in for pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{Array3, ArrayView4, Axis};

use crate::classifier::Classifier;
use crate::error::PipelineError;
use crate::pipeline::NormalizedImage;

type Respond = dyn Fn(f32) -> Vec<f32> + Send + Sync;

/// Answers each image with a vector chosen from its mean pixel value.
pub(crate) struct FakeClassifier {
    size: (u32, u32),
    respond: Box<Respond>,
    calls: AtomicUsize,
}

impl FakeClassifier {
    pub(crate) fn new(
        size: (u32, u32),
        respond: impl Fn(f32) -> Vec<f32> + Send + Sync + 'static,
    ) -> Self {
        Self {
            size,
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn fixed(size: (u32, u32), probabilities: Vec<f32>) -> Self {
        Self::new(size, move |_| probabilities.clone())
    }

    /// Number of `classify` calls so far.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for FakeClassifier {
    fn input_size(&self) -> (u32, u32) {
        self.size
    }

    fn classify(&self, batch: ArrayView4<'_, f32>) -> Result<Vec<Vec<f32>>, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(batch
            .axis_iter(Axis(0))
            .map(|image| (self.respond)(image.mean().unwrap_or(0.0)))
            .collect())
    }
}

/// A square image filled with one value.
pub(crate) fn uniform_image(side: usize, value: f32) -> NormalizedImage {
    NormalizedImage::new(Array3::from_elem((side, side, 3), value)).unwrap()
}
