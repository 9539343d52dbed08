// Trained strategy - feed-forward classification over cepstral coefficients
//
// A small fixed-shape network: one ReLU hidden layer over the N cepstral
// coefficients, then a 4-way softmax in DrumHit::ALL order. The parameters
// are an external JSON artifact; this module owns loading, shape
// validation, and synchronous side-effect-free inference - never training.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ClassificationResult, ClassifierInput, ClassifierStrategy, DrumHit};
use crate::error::ModelError;

/// Serialized network parameters
///
/// Layout:
/// - `hidden[h]` is the weight row for hidden unit `h` (length = input_dim)
/// - `output[c]` is the weight row for class `c` in `DrumHit::ALL` order
///   (length = hidden unit count)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    pub input_dim: usize,
    pub hidden: Vec<Vec<f32>>,
    pub hidden_bias: Vec<f32>,
    pub output: Vec<Vec<f32>>,
    pub output_bias: Vec<f32>,
}

impl ModelParams {
    /// Validate internal shape consistency
    fn validate(&self) -> Result<(), ModelError> {
        if self.input_dim == 0 || self.hidden.is_empty() {
            return Err(ModelError::ShapeMismatch {
                expected: "non-empty input and hidden layer".to_string(),
                actual: format!(
                    "input_dim={}, hidden units={}",
                    self.input_dim,
                    self.hidden.len()
                ),
            });
        }
        if let Some(row) = self.hidden.iter().find(|row| row.len() != self.input_dim) {
            return Err(ModelError::ShapeMismatch {
                expected: format!("hidden rows of length {}", self.input_dim),
                actual: format!("row of length {}", row.len()),
            });
        }
        if self.hidden_bias.len() != self.hidden.len() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} hidden biases", self.hidden.len()),
                actual: format!("{}", self.hidden_bias.len()),
            });
        }
        if self.output.len() != DrumHit::ALL.len() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} output rows", DrumHit::ALL.len()),
                actual: format!("{}", self.output.len()),
            });
        }
        if let Some(row) = self.output.iter().find(|row| row.len() != self.hidden.len()) {
            return Err(ModelError::ShapeMismatch {
                expected: format!("output rows of length {}", self.hidden.len()),
                actual: format!("row of length {}", row.len()),
            });
        }
        if self.output_bias.len() != DrumHit::ALL.len() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} output biases", DrumHit::ALL.len()),
                actual: format!("{}", self.output_bias.len()),
            });
        }
        Ok(())
    }
}

/// Feed-forward classifier over the cepstral feature slice
pub struct TrainedClassifier {
    params: ModelParams,
}

impl TrainedClassifier {
    /// Load and validate a model artifact from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let params: ModelParams = serde_json::from_str(&contents)?;
        Self::from_params(params)
    }

    /// Build a classifier from in-memory parameters
    pub fn from_params(params: ModelParams) -> Result<Self, ModelError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Expected input length (number of cepstral coefficients)
    pub fn input_dim(&self) -> usize {
        self.params.input_dim
    }

    /// Forward pass: ReLU hidden layer, softmax output
    fn forward(&self, input: &[f32]) -> [f32; 4] {
        let hidden: Vec<f32> = self
            .params
            .hidden
            .iter()
            .zip(self.params.hidden_bias.iter())
            .map(|(weights, &bias)| {
                let sum: f32 = weights.iter().zip(input.iter()).map(|(&w, &x)| w * x).sum();
                (sum + bias).max(0.0)
            })
            .collect();

        let mut logits = [0.0_f32; 4];
        for (c, (weights, &bias)) in self
            .params
            .output
            .iter()
            .zip(self.params.output_bias.iter())
            .enumerate()
        {
            logits[c] = weights
                .iter()
                .zip(hidden.iter())
                .map(|(&w, &h)| w * h)
                .sum::<f32>()
                + bias;
        }

        // Numerically stable softmax
        let max_logit = logits.iter().fold(f32::NEG_INFINITY, |acc, &l| acc.max(l));
        let mut probs = [0.0_f32; 4];
        let mut sum = 0.0;
        for (p, &logit) in probs.iter_mut().zip(logits.iter()) {
            *p = (logit - max_logit).exp();
            sum += *p;
        }
        for p in probs.iter_mut() {
            *p /= sum;
        }
        probs
    }
}

impl ClassifierStrategy for TrainedClassifier {
    fn classify(&self, input: ClassifierInput<'_>) -> Result<ClassificationResult, ModelError> {
        let cepstra = &input.features.cepstra;
        if cepstra.len() != self.params.input_dim {
            return Err(ModelError::InferenceFailed {
                reason: format!(
                    "expected {} cepstral coefficients, got {}",
                    self.params.input_dim,
                    cepstra.len()
                ),
            });
        }
        if cepstra.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::InferenceFailed {
                reason: "non-finite value in feature vector".to_string(),
            });
        }

        // All-zero cepstra is the extractor's silence encoding; a softmax
        // would still emit ~uniform probabilities, so gate it out here
        if cepstra.iter().all(|&c| c == 0.0) {
            return Ok(ClassificationResult::none());
        }

        let probs = self.forward(cepstra);
        Ok(ClassificationResult::from_scores(
            probs,
            input.features.band_energy,
        ))
    }

    fn name(&self) -> &'static str {
        "trained"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::features::FeatureVector;

    /// A hand-wired model whose hidden layer copies input coefficients 0-3
    /// and whose output layer is the identity: class c wins when input c is
    /// the largest of the first four coefficients.
    fn identity_model(input_dim: usize) -> ModelParams {
        let mut hidden = vec![vec![0.0; input_dim]; 4];
        for (h, row) in hidden.iter_mut().enumerate() {
            row[h] = 1.0;
        }
        let mut output = vec![vec![0.0; 4]; 4];
        for (c, row) in output.iter_mut().enumerate() {
            row[c] = 4.0;
        }
        ModelParams {
            input_dim,
            hidden,
            hidden_bias: vec![0.0; 4],
            output,
            output_bias: vec![0.0; 4],
        }
    }

    fn features_with_cepstra(cepstra: Vec<f32>) -> FeatureVector {
        FeatureVector {
            band_energy: [0.0; 4],
            centroid: 0.0,
            rolloff: 0.0,
            zcr: 0.0,
            rms: 0.1,
            decay_time_ms: 0.0,
            cepstra,
        }
    }

    fn classify(
        classifier: &TrainedClassifier,
        features: &FeatureVector,
    ) -> ClassificationResult {
        let samples = [0.0_f32; 16];
        classifier
            .classify(ClassifierInput {
                samples: &samples,
                sample_rate: 48000,
                features,
            })
            .expect("inference should succeed")
    }

    #[test]
    fn test_shape_validation_accepts_consistent_params() {
        assert!(TrainedClassifier::from_params(identity_model(13)).is_ok());
    }

    #[test]
    fn test_shape_validation_rejects_bad_hidden_row() {
        let mut params = identity_model(13);
        params.hidden[2] = vec![0.0; 7];
        match TrainedClassifier::from_params(params) {
            Err(ModelError::ShapeMismatch { .. }) => {}
            other => panic!("Expected ShapeMismatch, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_shape_validation_rejects_wrong_class_count() {
        let mut params = identity_model(13);
        params.output.pop();
        assert!(matches!(
            TrainedClassifier::from_params(params),
            Err(ModelError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        match TrainedClassifier::load("/nonexistent/model.json") {
            Err(ModelError::LoadFailed { .. }) => {}
            other => panic!("Expected LoadFailed, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_argmax_follows_dominant_coefficient() {
        let classifier = TrainedClassifier::from_params(identity_model(13)).unwrap();

        for (idx, expected) in DrumHit::ALL.iter().enumerate() {
            let mut cepstra = vec![0.1; 13];
            cepstra[idx] = 5.0;
            let features = features_with_cepstra(cepstra);
            let result = classify(&classifier, &features);
            assert_eq!(result.label, Some(*expected), "coefficient {} should win", idx);
        }
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let classifier = TrainedClassifier::from_params(identity_model(13)).unwrap();
        let features = features_with_cepstra(vec![0.5; 13]);
        let result = classify(&classifier, &features);

        let sum: f32 = result.ranked.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-4, "Softmax should sum to 1, got {}", sum);
    }

    #[test]
    fn test_wrong_input_length_is_inference_error() {
        let classifier = TrainedClassifier::from_params(identity_model(13)).unwrap();
        let features = features_with_cepstra(vec![0.5; 8]);
        let samples = [0.0_f32; 16];
        let result = classifier.classify(ClassifierInput {
            samples: &samples,
            sample_rate: 48000,
            features: &features,
        });
        assert!(matches!(result, Err(ModelError::InferenceFailed { .. })));
    }

    #[test]
    fn test_silence_cepstra_yield_no_class() {
        let classifier = TrainedClassifier::from_params(identity_model(13)).unwrap();
        let features = features_with_cepstra(vec![0.0; 13]);
        let result = classify(&classifier, &features);
        assert_eq!(result.label, None);
    }

    #[test]
    fn test_inference_is_deterministic() {
        let classifier = TrainedClassifier::from_params(identity_model(13)).unwrap();
        let features = features_with_cepstra(vec![0.3, -0.2, 1.5, 0.9, 0.0, 0.1, -0.4, 0.2, 0.6, -1.0, 0.8, 0.05, 0.0]);
        let a = classify(&classifier, &features);
        let b = classify(&classifier, &features);
        assert_eq!(a, b);
    }

    #[test]
    fn test_params_json_roundtrip() {
        let params = identity_model(13);
        let json = serde_json::to_string(&params).unwrap();
        let parsed: ModelParams = serde_json::from_str(&json).unwrap();
        assert!(TrainedClassifier::from_params(parsed).is_ok());
    }
}
