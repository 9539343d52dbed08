// Pretrained strategy - adapter around an opaque third-party audio model
//
// External audio-classification models ship label spaces that are not
// drum-specific ("Bass drum", "Cymbal", "Speech", ...). This adapter feeds
// raw samples to the wrapped model and remaps its labels onto the four
// drum classes through a configurable table. Unmapped labels are dropped,
// never an error: a model reporting "Speech" simply produces no detection.

use super::{ClassificationResult, ClassifierInput, ClassifierStrategy, DrumHit};
use crate::error::ModelError;

/// One scored label from the wrapped model
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// The opaque external model behind the adapter
///
/// Loading, format, and runtime of the model are entirely the
/// implementor's business; the adapter only needs scored labels per frame.
pub trait ExternalModel: Send {
    /// Score one frame of raw audio
    fn infer(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<LabelScore>, ModelError>;

    /// Whether the model finished loading
    fn is_ready(&self) -> bool {
        true
    }

    /// Model name for logs
    fn name(&self) -> &'static str {
        "external"
    }
}

/// Source label -> drum class remapping table
///
/// Matching is case-insensitive: an exact match wins, otherwise the first
/// entry whose key is a substring of the source label applies.
#[derive(Debug, Clone)]
pub struct LabelMap {
    entries: Vec<(String, DrumHit)>,
}

impl LabelMap {
    /// Build a map from (source label, drum class) pairs
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, DrumHit)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(label, hit)| (label.into().to_lowercase(), hit))
                .collect(),
        }
    }

    /// Default table covering the label vocabulary of common general-audio
    /// models
    pub fn default_drum_map() -> Self {
        Self::new([
            ("kick", DrumHit::Kick),
            ("bass drum", DrumHit::Kick),
            ("snare", DrumHit::Snare),
            ("clap", DrumHit::Snare),
            ("open hi-hat", DrumHit::OpenHat),
            ("open hihat", DrumHit::OpenHat),
            ("crash", DrumHit::OpenHat),
            ("hi-hat", DrumHit::HiHat),
            ("hihat", DrumHit::HiHat),
            ("cymbal", DrumHit::HiHat),
        ])
    }

    /// Resolve a source label to a drum class, if mapped
    pub fn resolve(&self, label: &str) -> Option<DrumHit> {
        let needle = label.to_lowercase();

        if let Some((_, hit)) = self.entries.iter().find(|(key, _)| *key == needle) {
            return Some(*hit);
        }
        self.entries
            .iter()
            .find(|(key, _)| needle.contains(key.as_str()))
            .map(|(_, hit)| *hit)
    }
}

/// Adapter exposing an external model as a ClassifierStrategy
pub struct PretrainedClassifier {
    model: Box<dyn ExternalModel>,
    map: LabelMap,
}

impl PretrainedClassifier {
    /// Wrap a model with a label map
    pub fn new(model: Box<dyn ExternalModel>, map: LabelMap) -> Self {
        Self { model, map }
    }

    /// Wrap a model with the default drum vocabulary
    pub fn with_default_map(model: Box<dyn ExternalModel>) -> Self {
        Self::new(model, LabelMap::default_drum_map())
    }
}

impl ClassifierStrategy for PretrainedClassifier {
    fn classify(&self, input: ClassifierInput<'_>) -> Result<ClassificationResult, ModelError> {
        let scored = self.model.infer(input.samples, input.sample_rate)?;

        // Fold remapped labels into per-class scores; several source labels
        // may land on one class, keep the strongest
        let mut scores = [0.0_f32; 4];
        let mut any_mapped = false;
        for LabelScore { label, score } in &scored {
            if let Some(hit) = self.map.resolve(label) {
                any_mapped = true;
                let slot = &mut scores[hit.index()];
                *slot = slot.max(score.clamp(0.0, 1.0));
            }
        }

        if !any_mapped {
            // Model spoke, but not about drums
            return Ok(ClassificationResult::none());
        }

        Ok(ClassificationResult::from_scores(
            scores,
            input.features.band_energy,
        ))
    }

    fn is_ready(&self) -> bool {
        self.model.is_ready()
    }

    fn name(&self) -> &'static str {
        "pretrained"
    }
}
