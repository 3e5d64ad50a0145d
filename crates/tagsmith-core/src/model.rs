//! Loading a classifier and its label vocabulary from a model directory.
//!
//! Loads run on the blocking pool and are serialized: a second load waits for
//! the first to finish. Callers either await [`ModelLoader::load`] or hand a
//! completion callback to [`ModelLoader::spawn_load`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::classifier::{Classifier, OnnxClassifier};
use crate::config::ModelConfig;
use crate::error::PipelineError;
use crate::tagging::LabelVocabulary;

/// A classifier together with the vocabulary its outputs are aligned to.
#[derive(Clone)]
pub struct LoadedModel {
    pub classifier: Arc<dyn Classifier>,
    pub vocab: Arc<LabelVocabulary>,
    pub model_dir: PathBuf,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("model_dir", &self.model_dir)
            .field("labels", &self.vocab.len())
            .field("characters", &self.vocab.character_count())
            .finish()
    }
}

/// Reads a DeepDanbooru-style model directory.
pub struct LabelStore;

impl LabelStore {
    /// Load weights and both label files from `model_dir`.
    ///
    /// A missing weights file is an error; missing label files only produce
    /// an empty vocabulary and a warning.
    pub fn load(model_dir: &Path, config: &ModelConfig) -> Result<LoadedModel, PipelineError> {
        let weights = model_dir.join(&config.weights_file);
        if !weights.exists() {
            return Err(PipelineError::ResourceNotFound(weights));
        }

        let vocab = LabelVocabulary::load(model_dir, config);
        if vocab.is_empty() {
            tracing::warn!(
                "No general labels found in {:?}; prediction is refused until {} is present",
                model_dir,
                config.general_labels_file
            );
        }

        let classifier = OnnxClassifier::load(&weights, config.input_size)?;
        tracing::info!("Classifier loaded from {:?}", weights);

        Ok(LoadedModel {
            classifier: Arc::new(classifier),
            vocab: Arc::new(vocab),
            model_dir: model_dir.to_path_buf(),
        })
    }
}

type LoadFn = dyn Fn(&Path) -> Result<LoadedModel, PipelineError> + Send + Sync;

/// Serializes model loads and runs them off the async runtime.
pub struct ModelLoader {
    gate: Mutex<()>,
    load_fn: Arc<LoadFn>,
}

impl ModelLoader {
    /// A loader reading ONNX models laid out as `config` describes.
    pub fn new(config: ModelConfig) -> Self {
        Self::with_loader(move |dir| LabelStore::load(dir, &config))
    }

    /// A loader using a custom load function.
    pub fn with_loader(
        load_fn: impl Fn(&Path) -> Result<LoadedModel, PipelineError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            gate: Mutex::new(()),
            load_fn: Arc::new(load_fn),
        }
    }

    /// Load a model, waiting for any load already in progress.
    pub async fn load(&self, model_dir: PathBuf) -> Result<LoadedModel, PipelineError> {
        let _guard = self.gate.lock().await;
        tracing::debug!("Loading model from {:?}", model_dir);

        let load_fn = self.load_fn.clone();
        let dir = model_dir.clone();
        tokio::task::spawn_blocking(move || load_fn(&dir))
            .await
            .map_err(|e| PipelineError::Classifier {
                path: model_dir,
                message: format!("Model load task failed: {e}"),
            })?
    }

    /// Load in the background and hand the result to `on_complete`.
    pub fn spawn_load<F>(self: &Arc<Self>, model_dir: PathBuf, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<LoadedModel, PipelineError>) + Send + 'static,
    {
        let loader = self.clone();
        tokio::spawn(async move {
            let result = loader.load(model_dir).await;
            on_complete(result);
        })
    }
}
