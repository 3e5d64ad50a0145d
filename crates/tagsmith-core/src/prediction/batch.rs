//! Whole-folder prediction with bounded preprocessing concurrency.
//!
//! Files are preprocessed on spawned tasks bounded by a semaphore, then
//! classified in stacked batches on the blocking pool. Results come back in
//! discovery order; images where nothing passed a threshold are dropped.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::classifier::Classifier;
use crate::config::{LimitsConfig, ProcessingConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{FileDiscovery, ImagePreprocessor, NormalizedImage};
use crate::tagging::{LabelVocabulary, TagFrequencyHistogram};
use crate::types::{BatchStats, PredictionResult, Thresholds};

use super::engine::predict_batch;

/// Progress counters shared with whoever is displaying the run.
///
/// Both counters only grow during a run and end at `total` when the run
/// completes. Images that fail preprocessing advance both.
#[derive(Debug, Default)]
pub struct BatchProgress {
    total: AtomicUsize,
    preprocessed: AtomicUsize,
    predicted: AtomicUsize,
}

/// A point-in-time copy of [`BatchProgress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub preprocessed: usize,
    pub predicted: usize,
}

impl BatchProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn preprocessed(&self) -> usize {
        self.preprocessed.load(Ordering::Relaxed)
    }

    pub fn predicted(&self) -> usize {
        self.predicted.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total(),
            preprocessed: self.preprocessed(),
            predicted: self.predicted(),
        }
    }

    fn start(&self, total: usize) {
        self.preprocessed.store(0, Ordering::Relaxed);
        self.predicted.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    fn advance_preprocessed(&self, n: usize) {
        self.preprocessed.fetch_add(n, Ordering::Relaxed);
    }

    fn advance_predicted(&self, n: usize) {
        self.predicted.fetch_add(n, Ordering::Relaxed);
    }
}

/// An image that was discovered but produced no result.
#[derive(Debug, Clone)]
pub struct SkippedImage {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a batch run produces.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Retained images with their predictions, in discovery order
    pub records: Vec<(PathBuf, PredictionResult)>,
    pub histogram: TagFrequencyHistogram,
    pub skipped: Vec<SkippedImage>,
    pub stats: BatchStats,
}

impl BatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Runs the classifier over every image in a folder.
pub struct BatchPredictor {
    classifier: Arc<dyn Classifier>,
    vocab: Arc<LabelVocabulary>,
    processing: ProcessingConfig,
    limits: LimitsConfig,
}

impl BatchPredictor {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        vocab: Arc<LabelVocabulary>,
        processing: ProcessingConfig,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            classifier,
            vocab,
            processing,
            limits,
        }
    }

    /// Predict tags for every supported image directly inside `dir`.
    ///
    /// Per-image read, decode and classifier failures are logged and skipped.
    /// Precondition violations abort the run, as does cancellation. An empty
    /// vocabulary returns [`PipelineError::EmptyVocabulary`] before any image
    /// is read.
    pub async fn run(
        &self,
        dir: &Path,
        thresholds: Thresholds,
        progress: &Arc<BatchProgress>,
        cancel: &CancellationToken,
    ) -> PipelineResult<BatchOutcome> {
        if self.vocab.is_empty() {
            tracing::warn!("Label vocabulary is empty; not predicting {:?}", dir);
            return Err(PipelineError::EmptyVocabulary);
        }

        let start = Instant::now();
        let files = FileDiscovery::new(self.processing.clone()).discover(dir);
        progress.start(files.len());

        let mut outcome = BatchOutcome {
            stats: BatchStats {
                discovered: files.len(),
                ..Default::default()
            },
            ..Default::default()
        };

        if files.is_empty() {
            tracing::info!("No supported images in {:?}", dir);
            return Ok(outcome);
        }
        tracing::info!(
            "Predicting {} images from {:?} (workers: {}, batch size: {})",
            files.len(),
            dir,
            self.processing.parallel_workers,
            self.processing.batch_size
        );

        let paths = files.iter().map(|f| f.path.clone());
        let loaded = self
            .preprocess_all(paths, progress, cancel, &mut outcome)
            .await?;

        let batch_size = self.processing.batch_size.max(1);
        let mut loaded = loaded.into_iter();
        loop {
            let chunk: Vec<(PathBuf, NormalizedImage)> =
                loaded.by_ref().take(batch_size).collect();
            if chunk.is_empty() {
                break;
            }
            if cancel.is_cancelled() {
                tracing::info!("Batch cancelled before prediction finished");
                return Err(PipelineError::Cancelled);
            }
            self.predict_chunk(chunk, thresholds, progress, &mut outcome)
                .await?;
        }

        outcome.histogram =
            TagFrequencyHistogram::build(outcome.records.iter().map(|(_, result)| result));
        outcome.stats.retained = outcome.records.len();
        outcome.stats.total_seconds = start.elapsed().as_secs_f64();

        tracing::info!(
            "Batch complete: {} retained, {} below threshold, {} failed in {:.1}s",
            outcome.stats.retained,
            outcome.stats.below_threshold,
            outcome.stats.preprocess_failed + outcome.stats.classify_failed,
            outcome.stats.total_seconds
        );
        Ok(outcome)
    }

    /// Preprocess files concurrently; returns the successes in input order.
    async fn preprocess_all(
        &self,
        paths: impl Iterator<Item = PathBuf>,
        progress: &Arc<BatchProgress>,
        cancel: &CancellationToken,
        outcome: &mut BatchOutcome,
    ) -> PipelineResult<Vec<(PathBuf, NormalizedImage)>> {
        let preprocessor = Arc::new(ImagePreprocessor::new(
            self.limits.clone(),
            self.classifier.input_size(),
        ));
        let semaphore = Arc::new(Semaphore::new(self.processing.parallel_workers.max(1)));
        let mut handles = Vec::new();

        for path in paths {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => permit,
            };
            let Ok(permit) = permit else {
                tracing::warn!("Preprocessing semaphore closed unexpectedly, stopping batch");
                break;
            };

            let preprocessor = preprocessor.clone();
            let progress = progress.clone();
            let task_path = path.clone();
            let handle = tokio::spawn(async move {
                let result = preprocessor.load(&task_path).await;
                drop(permit);
                progress.advance_preprocessed(1);
                result
            });
            handles.push((path, handle));
        }

        let mut loaded = Vec::with_capacity(handles.len());
        for (path, handle) in handles {
            let failure = match handle.await {
                Ok(Ok(image)) => {
                    tracing::debug!("Preprocessed {:?}", path);
                    loaded.push((path, image));
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(e) => format!("Preprocessing task panicked: {e}"),
            };
            tracing::warn!("Skipping {:?}: {}", path, failure);
            outcome.stats.preprocess_failed += 1;
            progress.advance_predicted(1);
            outcome.skipped.push(SkippedImage {
                path,
                reason: failure,
            });
        }

        if cancel.is_cancelled() {
            tracing::info!("Batch cancelled during preprocessing");
            return Err(PipelineError::Cancelled);
        }
        Ok(loaded)
    }

    /// Classify one stacked chunk and fold the results into the outcome.
    async fn predict_chunk(
        &self,
        chunk: Vec<(PathBuf, NormalizedImage)>,
        thresholds: Thresholds,
        progress: &Arc<BatchProgress>,
        outcome: &mut BatchOutcome,
    ) -> PipelineResult<()> {
        let (paths, images): (Vec<PathBuf>, Vec<NormalizedImage>) = chunk.into_iter().unzip();
        let classifier = self.classifier.clone();
        let vocab = self.vocab.clone();

        let predicted = tokio::task::spawn_blocking(move || {
            let refs: Vec<&NormalizedImage> = images.iter().collect();
            predict_batch(classifier.as_ref(), &vocab, &refs, thresholds)
        })
        .await;
        progress.advance_predicted(paths.len());

        let failure = match predicted {
            Ok(Ok(results)) => {
                for (path, result) in paths.into_iter().zip(results) {
                    match result {
                        Some(result) => {
                            tracing::debug!("{:?}: {}", path, result.text);
                            outcome.records.push((path, result));
                        }
                        None => {
                            tracing::debug!("{:?}: nothing above threshold", path);
                            outcome.stats.below_threshold += 1;
                        }
                    }
                }
                return Ok(());
            }
            Ok(Err(e)) if e.is_programmer_error() => return Err(e),
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("Classifier task panicked: {e}"),
        };

        tracing::error!("Classifier failed for {} images: {}", paths.len(), failure);
        outcome.stats.classify_failed += paths.len();
        outcome
            .skipped
            .extend(paths.into_iter().map(|path| SkippedImage {
                path,
                reason: failure.clone(),
            }));
        Ok(())
    }
}
