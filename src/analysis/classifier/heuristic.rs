// Heuristic strategy - rule cascade over band-energy ratios
//
// Classifies drum hits from DSP features alone, no model artifact needed.
// This is the always-available strategy and the fallback when a trained
// model fails to load.
//
// Decision cascade:
// 1. Frame RMS below the floor -> no confident class (silence gate)
// 2. Sub band dominant with low ZCR -> Kick
// 3. Low-mid/high-mid dominant -> Snare
// 4. High band dominant with high ZCR -> hat; closed vs. open split on
//    decay time, with spectral rolloff as the tiebreak for ambiguous decay
// Ties between classes break toward the louder band.

use super::{ClassificationResult, ClassifierInput, ClassifierStrategy};
use crate::analysis::features::FeatureVector;
use crate::config::HeuristicConfig;
use crate::error::ModelError;

/// Rule-based classifier using spectral and temporal features
pub struct HeuristicClassifier {
    config: HeuristicConfig,
}

impl HeuristicClassifier {
    /// Create a classifier with the given thresholds
    pub fn new(config: HeuristicConfig) -> Self {
        Self { config }
    }

    /// Score for Kick: sub band dominant, low ZCR, low centroid
    fn kick_score(&self, f: &FeatureVector) -> f32 {
        let sub_ratio = f.band_ratio(0);

        let energy_score = if sub_ratio > 0.5 {
            1.0
        } else if sub_ratio > 0.35 {
            0.8
        } else if sub_ratio > 0.25 {
            0.4
        } else {
            0.05
        };

        // Kicks are tonal thumps; noisy content pulls the score down
        let zcr_score = (1.0 - f.zcr / self.config.hihat_zcr).clamp(0.0, 1.0);

        let centroid_score = if f.centroid < 300.0 {
            1.0
        } else if f.centroid < 800.0 {
            0.6
        } else {
            0.2
        };

        energy_score * 0.6 + zcr_score * 0.2 + centroid_score * 0.2
    }

    /// Score for Snare: body + presence bands dominant, mid centroid
    fn snare_score(&self, f: &FeatureVector) -> f32 {
        let mid_ratio = f.band_ratio(1) + f.band_ratio(2);

        let energy_score = if mid_ratio > 0.6 {
            1.0
        } else if mid_ratio > 0.45 {
            0.75
        } else if mid_ratio > 0.3 {
            0.4
        } else {
            0.05
        };

        let centroid_score = if f.centroid > 400.0 && f.centroid < 4000.0 {
            1.0
        } else if f.centroid > 200.0 && f.centroid < 6000.0 {
            0.6
        } else {
            0.2
        };

        // Snares sit between kick (tonal) and hat (noise) on ZCR
        let zcr_score = if f.zcr > 0.05 && f.zcr < self.config.hihat_zcr * 1.5 {
            1.0
        } else {
            0.4
        };

        energy_score * 0.6 + centroid_score * 0.25 + zcr_score * 0.15
    }

    /// Shared hat evidence: shimmer band dominant with noisy content
    fn hat_evidence(&self, f: &FeatureVector) -> f32 {
        let high_ratio = f.band_ratio(3);

        let energy_score = if high_ratio > 0.5 {
            1.0
        } else if high_ratio > 0.35 {
            0.75
        } else if high_ratio > 0.2 {
            0.35
        } else {
            0.05
        };

        let zcr_score = (f.zcr / self.config.hihat_zcr).clamp(0.0, 1.0);

        energy_score * 0.7 + zcr_score * 0.3
    }

    /// Closed vs. open factor from the temporal envelope, with rolloff as
    /// the tiebreak when decay is ambiguous
    fn openness(&self, f: &FeatureVector) -> f32 {
        if f.decay_time_ms >= self.config.open_hat_decay_ms {
            1.0
        } else if f.decay_time_ms >= self.config.open_hat_decay_ms * 0.6
            && f.rolloff >= self.config.open_hat_rolloff_hz
        {
            0.8
        } else {
            0.0
        }
    }

    /// Classify from the feature vector alone
    pub fn classify_features(&self, features: &FeatureVector) -> ClassificationResult {
        if features.rms < self.config.rms_floor || features.band_total() < 1e-10 {
            // Silence gate: never a false positive on a quiet room, nor on
            // a frame whose spectral window caught no energy
            return ClassificationResult::none();
        }

        let hat = self.hat_evidence(features);
        let openness = self.openness(features);

        let scores = [
            self.kick_score(features),
            self.snare_score(features),
            hat * (1.0 - openness),
            hat * openness,
        ];

        // A cascade where nothing fires strongly yields the sentinel rather
        // than a coin-flip label
        let max = scores.iter().fold(0.0_f32, |acc, &s| acc.max(s));
        if max < 0.2 {
            return ClassificationResult::none();
        }

        let tiebreak = [
            features.band_energy[0],
            features.band_energy[1] + features.band_energy[2],
            features.band_energy[3],
            features.band_energy[3],
        ];

        ClassificationResult::from_scores(scores, tiebreak)
    }
}

impl ClassifierStrategy for HeuristicClassifier {
    fn classify(&self, input: ClassifierInput<'_>) -> Result<ClassificationResult, ModelError> {
        Ok(self.classify_features(input.features))
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new(HeuristicConfig::default())
    }
}

#[cfg(test)]
#[path = "heuristic_tests.rs"]
mod tests;
