use std::path::{Path, PathBuf};

use ndarray::Array4;
use thiserror::Error;
use tract_core::prelude::Tensor;
use tract_onnx::prelude::*;

use crate::preprocess::TensorLayout;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to load model from {}: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("expected {expected} class scores, model returned {actual}")]
    OutputShape { expected: usize, actual: usize },
}

/// Forward pass of a pre-trained classifier.
///
/// Implementations take a batch of one and return the class probabilities for
/// that single image. They are shared between workers, so `classify` must not
/// need exclusive access.
pub trait Classifier: Send + Sync {
    fn classify(&self, batch: Array4<f32>) -> Result<Vec<f32>, ModelError>;
}

/// ONNX model optimized and planned once at startup.
pub struct OnnxClassifier {
    plan: TypedRunnableModel<TypedModel>,
    layout: TensorLayout,
}

impl OnnxClassifier {
    pub fn load(path: &Path, layout: TensorLayout) -> Result<Self, ModelError> {
        if !path.is_file() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }

        let load_error = |e: TractError| ModelError::Load {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        };

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(load_error)?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), layout.input_shape()),
            )
            .map_err(load_error)?
            .into_optimized()
            .map_err(load_error)?
            .into_runnable()
            .map_err(load_error)?;

        Ok(Self { plan, layout })
    }

    pub fn layout(&self) -> TensorLayout {
        self.layout
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, batch: Array4<f32>) -> Result<Vec<f32>, ModelError> {
        let inference_error = |e: TractError| ModelError::Inference(format!("{e:#}"));

        let shape = batch.shape().to_vec();
        let data = batch.into_raw_vec();
        let tensor = Tensor::from_shape(&shape, &data).map_err(inference_error)?;

        let outputs = self.plan.run(tvec!(tensor.into())).map_err(inference_error)?;
        let probabilities = outputs
            .first()
            .ok_or_else(|| ModelError::Inference("model produced no outputs".to_string()))?
            .to_array_view::<f32>()
            .map_err(inference_error)?;

        Ok(probabilities.iter().copied().collect())
    }
}
