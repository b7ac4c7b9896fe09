//! ONNX Runtime Classifier
//!
//! Wraps one exported ensemble member. The tabular and residual models take
//! the flat (1, 36) vector; the sequence model takes it reshaped to
//! (1, 3, 3, 4, 1). Output is either a single sigmoid unit or a two-column
//! class probability tensor, of which the positive column is read.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use ndarray::{ArrayD, IxDyn};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use parking_lot::Mutex;

use crate::features::FEATURE_COUNT;
use super::classifier::{check_probability, Classifier, ModelKind, ModelLoadError, ScoringError};

const FLAT_SHAPE: [usize; 2] = [1, FEATURE_COUNT];
const VOLUME_SHAPE: [usize; 5] = [1, 3, 3, 4, 1];

/// Input tensor shape expected by each ensemble member
pub fn input_shape(kind: ModelKind) -> &'static [usize] {
    match kind {
        ModelKind::Tabular | ModelKind::Residual => &FLAT_SHAPE,
        ModelKind::Sequence => &VOLUME_SHAPE,
    }
}

/// Positive-class probability from a model output buffer
pub fn positive_class(values: &[f32]) -> Option<f32> {
    match values {
        [single] => Some(*single),
        [_, positive] => Some(*positive),
        _ => None,
    }
}

pub struct OnnxClassifier {
    kind: ModelKind,
    path: PathBuf,
    output_name: String,
    // Session::run needs exclusive access
    session: Mutex<Session>,
}

impl OnnxClassifier {
    /// Load the model once at startup. Failure is fatal for the caller.
    pub fn load(kind: ModelKind, path: &Path) -> Result<Self, ModelLoadError> {
        log::info!("Loading {} model from: {}", kind, path.display());

        if !path.exists() {
            return Err(ModelLoadError::NotFound(path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e| runtime_error(path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| runtime_error(path, e))?
            .commit_from_file(path)
            .map_err(|e| runtime_error(path, e))?;

        // Probability tensor preferred over the label output of tree exports
        let output_name = session.outputs.iter()
            .find(|o| o.name.to_ascii_lowercase().contains("prob"))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .ok_or_else(|| ModelLoadError::InvalidArtifact {
                path: path.to_path_buf(),
                reason: "model defines no outputs".to_string(),
            })?;

        log::info!("{} model loaded (output: {})", kind, output_name);

        Ok(Self {
            kind,
            path: path.to_path_buf(),
            output_name,
            session: Mutex::new(session),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn failure(&self, message: impl Display) -> ScoringError {
        ScoringError::Classifier {
            model: self.kind,
            message: message.to_string(),
        }
    }
}

fn runtime_error(path: &Path, e: impl Display) -> ModelLoadError {
    ModelLoadError::Runtime {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

impl Classifier for OnnxClassifier {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn predict_proba(&self, scaled: &[f64; FEATURE_COUNT]) -> Result<f64, ScoringError> {
        let data: Vec<f32> = scaled.iter().map(|v| *v as f32).collect();
        let input = ArrayD::<f32>::from_shape_vec(IxDyn(input_shape(self.kind)), data)
            .map_err(|e| self.failure(format!("Array error: {}", e)))?;
        let tensor = Tensor::from_array(input)
            .map_err(|e| self.failure(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![tensor])
            .map_err(|e| self.failure(format!("Inference failed: {}", e)))?;

        let output = outputs.get(&self.output_name)
            .ok_or_else(|| self.failure(format!("missing output {}", self.output_name)))?;
        let (_, values) = output.try_extract_tensor::<f32>()
            .map_err(|e| self.failure(format!("Extract error: {}", e)))?;

        let probability = positive_class(values)
            .ok_or_else(|| self.failure(format!("unexpected output size {}", values.len())))?;

        check_probability(self.kind, probability as f64)
    }
}

impl Drop for OnnxClassifier {
    fn drop(&mut self) {
        log::info!("{} model released ({})", self.kind, self.path.display());
    }
}
