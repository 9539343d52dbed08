// Classifier model error types

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Error code range for model errors: 1201-1206
const CODE_LOAD_FAILED: i32 = 1201;
const CODE_SHAPE_MISMATCH: i32 = 1202;
const CODE_NOT_READY: i32 = 1203;
const CODE_INFERENCE_FAILED: i32 = 1204;

/// Log a model error with structured context
pub fn log_model_error(err: &ModelError, context: &str) {
    error!(
        "Model error in {}: code={}, component=EventClassifier, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Classifier model errors
///
/// These errors cover strategy initialization (loading external model
/// artifacts) and per-frame inference. Load-time errors are non-fatal to
/// the rest of the application: callers fall back to the heuristic
/// strategy. Inference errors are recovered per frame.
///
/// Error code range: 1201-1206
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Model artifact could not be read or parsed
    LoadFailed { reason: String },

    /// Model artifact has unexpected input/output dimensions
    ShapeMismatch { expected: String, actual: String },

    /// Strategy has not finished initializing
    NotReady,

    /// A single inference call failed; the frame should be skipped
    InferenceFailed { reason: String },
}

impl ErrorCode for ModelError {
    fn code(&self) -> i32 {
        match self {
            ModelError::LoadFailed { .. } => CODE_LOAD_FAILED,
            ModelError::ShapeMismatch { .. } => CODE_SHAPE_MISMATCH,
            ModelError::NotReady => CODE_NOT_READY,
            ModelError::InferenceFailed { .. } => CODE_INFERENCE_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            ModelError::LoadFailed { reason } => {
                format!("Failed to load classifier model: {}", reason)
            }
            ModelError::ShapeMismatch { expected, actual } => {
                format!(
                    "Model shape mismatch: expected {}, got {}",
                    expected, actual
                )
            }
            ModelError::NotReady => {
                "Classifier strategy is not ready. Load a model or fall back to the heuristic."
                    .to_string()
            }
            ModelError::InferenceFailed { reason } => {
                format!("Inference failed: {}", reason)
            }
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for ModelError {}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::LoadFailed {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::LoadFailed {
            reason: format!("invalid model JSON: {}", err),
        }
    }
}
