// EventClassifier - strategy-polymorphic drum-hit classification
//
// This module defines the classification interface shared by every
// strategy, the drum-hit label space, and the strategy factory. Three
// strategies implement the interface:
//
// - heuristic: rule cascade over band-energy ratios and RMS thresholds
// - trained: feed-forward net over cepstral coefficients (external artifact)
// - pretrained: adapter around an opaque third-party audio model with a
//   label-remapping table
//
// Strategies are swappable at runtime behind `ClassifierStrategy`; the rest
// of the pipeline never looks past the trait.

pub mod heuristic;
pub mod pretrained;
pub mod trained;

pub use heuristic::HeuristicClassifier;
pub use pretrained::{ExternalModel, LabelMap, LabelScore, PretrainedClassifier};
pub use trained::{ModelParams, TrainedClassifier};

use crate::analysis::features::FeatureVector;
use crate::config::{ClassifierConfig, StrategyKind};
use crate::error::ModelError;

/// The four drum-hit classes the trainer recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DrumHit {
    /// Kick drum (low frequency, low ZCR)
    Kick,
    /// Snare drum (mid frequency)
    Snare,
    /// Closed hi-hat (high frequency, high ZCR, short decay)
    HiHat,
    /// Open hi-hat (high frequency, high ZCR, long decay)
    OpenHat,
}

impl DrumHit {
    /// All classes in fixed order; the index doubles as the softmax output
    /// position for the trained strategy
    pub const ALL: [DrumHit; 4] = [DrumHit::Kick, DrumHit::Snare, DrumHit::HiHat, DrumHit::OpenHat];

    /// Stable index of this class in `ALL`
    pub fn index(&self) -> usize {
        match self {
            DrumHit::Kick => 0,
            DrumHit::Snare => 1,
            DrumHit::HiHat => 2,
            DrumHit::OpenHat => 3,
        }
    }

    /// Instrument name used in Pattern rows
    pub fn instrument(&self) -> &'static str {
        match self {
            DrumHit::Kick => "kick",
            DrumHit::Snare => "snare",
            DrumHit::HiHat => "hihat",
            DrumHit::OpenHat => "openhat",
        }
    }

    /// Parse an instrument name back into a class
    pub fn from_instrument(name: &str) -> Option<DrumHit> {
        match name {
            "kick" => Some(DrumHit::Kick),
            "snare" => Some(DrumHit::Snare),
            "hihat" => Some(DrumHit::HiHat),
            "openhat" => Some(DrumHit::OpenHat),
            _ => None,
        }
    }
}

/// Outcome of classifying one frame
///
/// `ranked` lists every scored class best-first. `label` is the arg-max
/// class, or `None` when no class scored above the noise floor ("no
/// confident class" - never a crash, never a silent false positive).
/// `confidence` is the arg-max score normalized against the score sum.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassificationResult {
    pub ranked: Vec<(DrumHit, f32)>,
    pub label: Option<DrumHit>,
    pub confidence: f32,
}

impl ClassificationResult {
    /// The "no confident class" sentinel
    pub fn none() -> Self {
        Self {
            ranked: Vec::new(),
            label: None,
            confidence: 0.0,
        }
    }

    /// Build a result from per-class scores in `DrumHit::ALL` order
    ///
    /// Ties on score break toward the class listed earlier in `tiebreak`
    /// ordering, which callers seed with absolute band energy (louder band
    /// wins). Scores that sum to zero produce the sentinel.
    pub fn from_scores(scores: [f32; 4], tiebreak: [f32; 4]) -> Self {
        let sum: f32 = scores.iter().sum();
        if !(sum > 0.0) {
            return Self::none();
        }

        let mut ranked: Vec<(DrumHit, f32)> = DrumHit::ALL
            .iter()
            .map(|&hit| (hit, scores[hit.index()]))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    tiebreak[b.0.index()]
                        .partial_cmp(&tiebreak[a.0.index()])
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });

        let (label, top_score) = ranked[0];
        Self {
            ranked,
            label: Some(label),
            confidence: (top_score / sum).clamp(0.0, 1.0),
        }
    }
}

/// Per-frame input handed to a strategy
///
/// Strategies pick what they need: the heuristic and trained strategies
/// read the feature vector, the pretrained adapter hands raw samples to
/// its wrapped model.
pub struct ClassifierInput<'a> {
    pub samples: &'a [f32],
    pub sample_rate: u32,
    pub features: &'a FeatureVector,
}

/// The strategy interface every classifier implements
///
/// `classify` must be side-effect-free per call and must never panic on
/// malformed input; recoverable problems surface as `ModelError` and the
/// pipeline skips the frame.
pub trait ClassifierStrategy: Send {
    /// Classify one frame
    fn classify(&self, input: ClassifierInput<'_>) -> Result<ClassificationResult, ModelError>;

    /// Whether the strategy finished initializing (model loaded etc.)
    fn is_ready(&self) -> bool {
        true
    }

    /// Short strategy name for logs
    fn name(&self) -> &'static str;
}

/// Build the configured strategy
///
/// The pretrained adapter is not constructible from configuration alone
/// (its wrapped model is an injected dependency); callers wire it up with
/// `PretrainedClassifier::new` directly.
///
/// # Errors
/// `ModelError::LoadFailed` when the trained strategy is selected without
/// a model path, or the artifact cannot be read/validated. Callers treat
/// this as non-fatal and fall back to the heuristic.
pub fn build_strategy(config: &ClassifierConfig) -> Result<Box<dyn ClassifierStrategy>, ModelError> {
    match config.strategy {
        StrategyKind::Heuristic => Ok(Box::new(HeuristicClassifier::new(config.heuristic.clone()))),
        StrategyKind::Trained => {
            let path = config.model_path.as_ref().ok_or_else(|| ModelError::LoadFailed {
                reason: "trained strategy selected but no model_path configured".to_string(),
            })?;
            Ok(Box::new(TrainedClassifier::load(path)?))
        }
    }
}
