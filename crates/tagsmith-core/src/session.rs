//! The working set of one tagging session.
//!
//! A [`Session`] owns the loaded model and the records of the most recent
//! batch. Model reloads and batch runs replace their part wholesale; tag edits
//! go through `&mut Session`, so nothing is ever half applied.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::PipelineError;
use crate::metadata::TagWriter;
use crate::model::LoadedModel;
use crate::prediction::{BatchOutcome, BatchPredictor};
use crate::tagging::{filter_records, ImageRecord, LabelVocabulary, TagFrequencyHistogram};

pub struct Session {
    model: LoadedModel,
    records: Vec<ImageRecord>,
    histogram: TagFrequencyHistogram,
}

impl Session {
    pub fn new(model: LoadedModel) -> Self {
        Self {
            model,
            records: Vec::new(),
            histogram: TagFrequencyHistogram::default(),
        }
    }

    pub fn model(&self) -> &LoadedModel {
        &self.model
    }

    pub fn vocab(&self) -> &LabelVocabulary {
        &self.model.vocab
    }

    /// Swap in a newly loaded model. Existing records are kept.
    pub fn replace_model(&mut self, model: LoadedModel) {
        tracing::info!("Session model replaced with {:?}", model.model_dir);
        self.model = model;
    }

    /// A batch predictor bound to the current model.
    pub fn predictor(&self, config: &Config) -> BatchPredictor {
        BatchPredictor::new(
            self.model.classifier.clone(),
            self.model.vocab.clone(),
            config.processing.clone(),
            config.limits.clone(),
        )
    }

    /// Replace the current records and histogram with a finished batch.
    pub fn replace_batch(&mut self, outcome: BatchOutcome) {
        self.records = outcome
            .records
            .into_iter()
            .map(|(path, result)| ImageRecord::new(path, result))
            .collect();
        self.histogram = outcome.histogram;
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&ImageRecord> {
        self.records.get(index)
    }

    pub fn record_mut(&mut self, index: usize) -> Option<&mut ImageRecord> {
        self.records.get_mut(index)
    }

    pub fn histogram(&self) -> &TagFrequencyHistogram {
        &self.histogram
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add a custom tag to one record, classified against the current vocabulary.
    pub fn add_custom_tag(&mut self, index: usize, tag: &str) -> bool {
        let vocab = self.model.vocab.clone();
        match self.records.get_mut(index) {
            Some(record) => record.add_custom_tag(tag, &vocab),
            None => false,
        }
    }

    /// Indices of records whose accepted tags include all of `selected`.
    pub fn filter<S: AsRef<str>>(&self, selected: &[S]) -> Vec<usize> {
        filter_records(&self.records, selected)
    }

    /// Persist one record's committed tags.
    pub fn write_record(&self, index: usize, writer: &dyn TagWriter) -> Result<(), PipelineError> {
        let record = self.records.get(index).ok_or_else(|| {
            PipelineError::PreconditionViolation(format!(
                "record index {index} out of range ({} records)",
                self.records.len()
            ))
        })?;
        writer.write(&record.path, &record.state.commit())
    }

    /// Persist several records, continuing past failures.
    ///
    /// Returns the number written and the failures.
    pub fn write_records(
        &self,
        indices: &[usize],
        writer: &dyn TagWriter,
    ) -> (usize, Vec<(PathBuf, PipelineError)>) {
        let mut written = 0;
        let mut failures = Vec::new();
        for &index in indices {
            match self.write_record(index, writer) {
                Ok(()) => written += 1,
                Err(e) => {
                    let path = self
                        .records
                        .get(index)
                        .map(|r| r.path.clone())
                        .unwrap_or_default();
                    tracing::error!("Failed to write tags for {:?}: {}", path, e);
                    failures.push((path, e));
                }
            }
        }
        (written, failures)
    }

    /// Index of the record for `path`, if it was retained.
    pub fn position(&self, path: &Path) -> Option<usize> {
        self.records.iter().position(|r| r.path == path)
    }
}
