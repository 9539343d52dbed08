// Types module - Data structures for audio features
//
// This module defines the feature vector shared by every classifier
// strategy.

/// Number of drum-tuned spectral bands
pub const BAND_COUNT: usize = 4;

/// Features extracted from one audio frame
///
/// These features are used for drum-hit classification (kick, snare,
/// closed/open hat). Each feature captures different acoustic properties
/// of the frame. All values are finite for any input, including silence.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    /// Mean spectral magnitude per drum-tuned band
    ///
    /// Band 0: sub-bass (kick fundament)
    /// Band 1: low-mid (snare body)
    /// Band 2: high-mid (snare/tom presence)
    /// Band 3: high (hat/cymbal shimmer)
    pub band_energy: [f32; BAND_COUNT],

    /// Spectral centroid in Hz (weighted mean frequency, brightness)
    pub centroid: f32,

    /// Spectral rolloff in Hz (85% energy threshold)
    pub rolloff: f32,

    /// Zero-crossing rate (0.0 to 1.0, normalized)
    pub zcr: f32,

    /// Root mean square amplitude of the frame (0.0 to 1.0 for sane input)
    pub rms: f32,

    /// Decay time in milliseconds (temporal envelope)
    ///
    /// Distinguishes short percussive sounds (closed hat) from sustained
    /// ones (open hat).
    pub decay_time_ms: f32,

    /// Cepstral coefficients over log-spaced band energies
    ///
    /// Fixed length set by configuration (default 13); input shape for the
    /// trained classifier strategy. All zeros for silent frames.
    pub cepstra: Vec<f32>,
}

impl FeatureVector {
    /// Sum of the four band energies
    pub fn band_total(&self) -> f32 {
        self.band_energy.iter().sum()
    }

    /// Share of total band energy held by band `index` (0.0 when silent)
    pub fn band_ratio(&self, index: usize) -> f32 {
        let total = self.band_total();
        if total > 1e-10 {
            self.band_energy[index] / total
        } else {
            0.0
        }
    }

    /// Index of the band with the highest energy
    pub fn dominant_band(&self) -> usize {
        self.band_energy
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// True when every feature is finite (no NaN/Inf leaked through)
    pub fn is_finite(&self) -> bool {
        self.band_energy.iter().all(|v| v.is_finite())
            && self.centroid.is_finite()
            && self.rolloff.is_finite()
            && self.zcr.is_finite()
            && self.rms.is_finite()
            && self.decay_time_ms.is_finite()
            && self.cepstra.iter().all(|v| v.is_finite())
    }
}
