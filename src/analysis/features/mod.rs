// FeatureExtractor - DSP feature extraction for drum-hit classification
//
// This module extracts the audio features used to distinguish drum hits
// (kick, snare, closed/open hat). Features are computed from time-domain
// and frequency-domain representations of a single audio frame.
//
// Module organization:
// - types: Data structures (FeatureVector)
// - fft: FFT computation with windowing
// - spectral: Frequency-domain features (band energies, centroid, rolloff)
// - temporal: Time-domain features (ZCR, RMS, decay time)
// - cepstrum: Cepstral coefficients for the trained classifier
// - mod.rs: Coordinator (FeatureExtractor)
//
// Extraction is a pure function of the input samples and sample rate:
// identical input always yields identical features, and every output value
// is finite even for all-zero frames.

pub mod cepstrum;
pub mod fft;
pub mod spectral;
pub mod temporal;
mod types;

pub use types::{FeatureVector, BAND_COUNT};

use cepstrum::CepstrumFeatures;
use fft::FftProcessor;
use spectral::SpectralFeatures;
use temporal::TemporalFeatures;

use crate::config::FeatureConfig;

/// FeatureExtractor coordinates the DSP feature extraction pipeline
///
/// Combines FFT processing, spectral features, temporal features, and
/// cepstral coefficients into a single unified interface consumed by every
/// classifier strategy.
pub struct FeatureExtractor {
    fft_processor: FftProcessor,
    spectral_features: SpectralFeatures,
    temporal_features: TemporalFeatures,
    cepstrum_features: CepstrumFeatures,
    fft_size: usize,
}

impl FeatureExtractor {
    /// Create a new FeatureExtractor for the given sample rate with the
    /// default band layout
    pub fn new(sample_rate: u32) -> Self {
        Self::with_config(sample_rate, &FeatureConfig::default())
    }

    /// Create an extractor with explicit configuration
    pub fn with_config(sample_rate: u32, config: &FeatureConfig) -> Self {
        let fft_size = config.fft_size.max(64);

        Self {
            fft_processor: FftProcessor::new(fft_size),
            spectral_features: SpectralFeatures::new(sample_rate, fft_size, config.band_edges_hz),
            temporal_features: TemporalFeatures::new(sample_rate),
            cepstrum_features: CepstrumFeatures::new(
                sample_rate,
                fft_size,
                config.cepstrum_bands,
                config.cepstral_coefficients,
            ),
            fft_size,
        }
    }

    /// Extract all features from one audio frame
    ///
    /// # Arguments
    /// * `audio` - Frame samples; input longer than the FFT size uses the
    ///   first `fft_size` samples for spectral features, shorter input is
    ///   zero-padded
    ///
    /// # Returns
    /// FeatureVector with every field finite
    pub fn extract(&self, audio: &[f32]) -> FeatureVector {
        let window = if audio.len() >= self.fft_size {
            &audio[..self.fft_size]
        } else {
            audio
        };

        let spectrum = self.fft_processor.magnitude_spectrum(window);

        let band_energy = self.spectral_features.band_energies(&spectrum);
        let centroid = self.spectral_features.centroid(&spectrum);
        let rolloff = self.spectral_features.rolloff(&spectrum);
        let cepstra = self.cepstrum_features.coefficients(&spectrum);

        // Temporal features see the whole frame, not just the FFT window,
        // so decay time can span the full hop
        let zcr = self.temporal_features.zcr(window);
        let rms = self.temporal_features.rms(audio);
        let decay_time_ms = self.temporal_features.decay_time_ms(audio);

        FeatureVector {
            band_energy,
            centroid,
            rolloff,
            zcr,
            rms,
            decay_time_ms,
            cepstra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Generate pure sine wave for testing
    fn generate_sine_wave(sample_rate: u32, frequency: f32, duration_samples: usize) -> Vec<f32> {
        (0..duration_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * frequency * t).sin()
            })
            .collect()
    }

    /// Generate white noise for testing
    fn generate_white_noise(duration_samples: usize) -> Vec<f32> {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        (0..duration_samples)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect()
    }

    #[test]
    fn test_silence_features_all_finite_and_zero() {
        let extractor = FeatureExtractor::new(48000);
        let features = extractor.extract(&vec![0.0; 2048]);

        assert!(features.is_finite(), "Silence must not produce NaN/Inf");
        assert_eq!(features.centroid, 0.0, "Centroid should be 0 for silence");
        assert_eq!(features.zcr, 0.0, "ZCR should be 0 for silence");
        assert_eq!(features.rms, 0.0, "RMS should be 0 for silence");
        assert_eq!(features.band_energy, [0.0; BAND_COUNT]);
        assert!(features.cepstra.iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_determinism() {
        let extractor = FeatureExtractor::new(48000);
        let signal = generate_sine_wave(48000, 440.0, 2048);

        let a = extractor.extract(&signal);
        let b = extractor.extract(&signal);
        assert_eq!(a, b, "Extraction must be deterministic");
    }

    #[test]
    fn test_low_tone_lands_in_sub_band() {
        let extractor = FeatureExtractor::new(48000);
        let signal = generate_sine_wave(48000, 60.0, 2048);
        let features = extractor.extract(&signal);

        assert_eq!(
            features.dominant_band(),
            0,
            "60 Hz tone should dominate the sub band: {:?}",
            features.band_energy
        );
        assert!(features.centroid < 500.0);
    }

    #[test]
    fn test_high_noise_lands_in_high_band() {
        let extractor = FeatureExtractor::new(48000);
        // High-passed noise approximation: difference of white noise
        let noise = generate_white_noise(2049);
        let signal: Vec<f32> = noise.windows(2).map(|w| (w[1] - w[0]) / 2.0).collect();
        let features = extractor.extract(&signal);

        assert_eq!(
            features.dominant_band(),
            3,
            "Differenced noise should dominate the high band: {:?}",
            features.band_energy
        );
        assert!(features.zcr > 0.3, "Noise should have high ZCR");
    }

    #[test]
    fn test_mid_tone_lands_in_mid_bands() {
        let extractor = FeatureExtractor::new(48000);
        let signal = generate_sine_wave(48000, 400.0, 2048);
        let features = extractor.extract(&signal);
        assert_eq!(features.dominant_band(), 1);
    }

    #[test]
    fn test_short_frame_zero_padded() {
        let extractor = FeatureExtractor::new(48000);
        let signal = generate_sine_wave(48000, 1000.0, 300);
        let features = extractor.extract(&signal);
        assert!(features.is_finite());
        assert!(features.centroid > 0.0);
    }

    #[test]
    fn test_cepstra_length_matches_config() {
        let config = FeatureConfig {
            cepstral_coefficients: 8,
            ..FeatureConfig::default()
        };
        let extractor = FeatureExtractor::with_config(48000, &config);
        let features = extractor.extract(&generate_white_noise(2048));
        assert_eq!(features.cepstra.len(), 8);
    }
}
