//! ONNX Runtime backend for DeepDanbooru-style classifiers.
//!
//! Loads a classifier exported to ONNX (NHWC float input, sigmoid outputs)
//! and runs stacked batch inference.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::ArrayView4;
use ort::session::Session;
use ort::value::Value;

use crate::error::PipelineError;

use super::{Classifier, RATING_COUNT};

/// Wraps an ONNX Runtime session for multi-label classification.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
    /// `(height, width)` the network expects.
    input_size: (u32, u32),
    model_path: PathBuf,
}

impl OnnxClassifier {
    /// Load a classifier from an ONNX file.
    ///
    /// The input height and width are read from the model's `[N, H, W, 3]`
    /// input. `fallback_size` (512 for the DeepDanbooru v3/v4 releases) is
    /// used only for dimensions the model leaves dynamic.
    pub fn load(model_path: &Path, fallback_size: u32) -> Result<Self, PipelineError> {
        if !model_path.exists() {
            return Err(PipelineError::ResourceNotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e| PipelineError::Classifier {
                path: model_path.to_path_buf(),
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| PipelineError::Classifier {
                path: model_path.to_path_buf(),
                message: format!("Failed to load ONNX model: {e}"),
            })?;

        let input = session.inputs().first();
        let input_name = input
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "input_1".to_string());
        let dims = input
            .and_then(|i| i.dtype().tensor_shape())
            .map(|shape| shape.to_vec())
            .unwrap_or_default();
        let input_size = input_size_from_dims(&dims, fallback_size);
        if input_size != (fallback_size, fallback_size) {
            tracing::info!(
                "Model input is {}x{}; configured size {} is ignored",
                input_size.1,
                input_size.0,
                fallback_size
            );
        }

        tracing::debug!(
            "Loaded classifier from {:?} (input: {:?} {:?}, outputs: {:?})",
            model_path,
            input_name,
            dims,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            input_size,
            model_path: model_path.to_path_buf(),
        })
    }

    fn error(&self, message: String) -> PipelineError {
        PipelineError::Classifier {
            path: self.model_path.clone(),
            message,
        }
    }
}

/// `(height, width)` from an NHWC input shape.
///
/// Dynamic (negative or zero) dimensions, or a shape that is not rank 4,
/// fall back to `fallback` for the missing side.
fn input_size_from_dims(dims: &[i64], fallback: u32) -> (u32, u32) {
    let side = |index: usize| {
        dims.get(index)
            .filter(|_| dims.len() == 4)
            .and_then(|&d| u32::try_from(d).ok())
            .filter(|&d| d > 0)
            .unwrap_or(fallback)
    };
    (side(1), side(2))
}

impl Classifier for OnnxClassifier {
    fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    fn classify(&self, batch: ArrayView4<'_, f32>) -> Result<Vec<Vec<f32>>, PipelineError> {
        let batch_size = batch.shape()[0];
        if batch_size == 0 {
            return Ok(vec![]);
        }

        // Convert ndarray to (shape, flat_data) for ort.
        let shape: Vec<i64> = batch.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = batch.iter().copied().collect();

        let input_value = Value::from_array((shape, flat_data))
            .map_err(|e| self.error(format!("Failed to create input tensor: {e}")))?;

        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self
            .session
            .lock()
            .map_err(|e| self.error(format!("Session lock poisoned: {e}")))?;

        let outputs = session
            .run(inputs)
            .map_err(|e| self.error(format!("ONNX inference failed: {e}")))?;

        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| self.error("Model produced no outputs".to_string()))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| self.error(format!("Failed to extract output tensor: {e}")))?;

        // Output is [N, labels + 3].
        let width = match shape.len() {
            1 => data.len() / batch_size,
            2 => shape[1] as usize,
            _ => {
                return Err(self.error(format!("Unexpected output shape: {:?}", shape)));
            }
        };
        if width <= RATING_COUNT {
            return Err(self.error(format!(
                "Output width {width} leaves no room for general labels"
            )));
        }

        Ok(data
            .chunks(width)
            .take(batch_size)
            .map(<[f32]>::to_vec)
            .collect())
    }
}
