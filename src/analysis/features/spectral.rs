// Spectral module - frequency-domain feature extraction
//
// Computes drum-tuned band energies, spectral centroid, and rolloff from
// magnitude spectra. Every function treats an empty or silent spectrum as
// zero energy rather than producing NaN/Inf.

use super::types::BAND_COUNT;

/// Spectral rolloff threshold (85% of spectral energy)
const ROLLOFF_THRESHOLD: f32 = 0.85;

/// Spectral feature computation over a fixed band layout
pub struct SpectralFeatures {
    sample_rate: u32,
    fft_size: usize,
    /// Bin ranges per band, precomputed from the configured edges
    band_bins: [(usize, usize); BAND_COUNT],
}

impl SpectralFeatures {
    /// Create a new spectral features processor
    ///
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `fft_size` - FFT window size
    /// * `band_edges_hz` - Interior band edges; bands are
    ///   [0, e0), [e0, e1), [e1, e2), [e2, nyquist]
    pub fn new(sample_rate: u32, fft_size: usize, band_edges_hz: [f32; 3]) -> Self {
        let bin_count = fft_size / 2 + 1;
        let bin_width = sample_rate as f32 / fft_size as f32;
        let hz_to_bin = |hz: f32| ((hz / bin_width).round() as usize).min(bin_count);

        let e0 = hz_to_bin(band_edges_hz[0]);
        let e1 = hz_to_bin(band_edges_hz[1]).max(e0);
        let e2 = hz_to_bin(band_edges_hz[2]).max(e1);

        Self {
            sample_rate,
            fft_size,
            band_bins: [(0, e0), (e0, e1), (e1, e2), (e2, bin_count)],
        }
    }

    /// Mean magnitude per drum-tuned band
    ///
    /// A band with no bins (degenerate FFT sizes or extreme edges) reads as
    /// zero energy, not NaN.
    pub fn band_energies(&self, spectrum: &[f32]) -> [f32; BAND_COUNT] {
        let mut energies = [0.0_f32; BAND_COUNT];
        for (band, &(start, end)) in self.band_bins.iter().enumerate() {
            let end = end.min(spectrum.len());
            if start >= end {
                continue;
            }
            let sum: f32 = spectrum[start..end].iter().sum();
            energies[band] = sum / (end - start) as f32;
        }
        energies
    }

    /// Compute spectral centroid (weighted mean frequency)
    ///
    /// centroid = sum(f_i * |X[i]|) / sum(|X[i]|), 0.0 for silence.
    ///
    /// # Arguments
    /// * `spectrum` - Magnitude spectrum
    ///
    /// # Returns
    /// Spectral centroid in Hz
    pub fn centroid(&self, spectrum: &[f32]) -> f32 {
        let bin_width = self.sample_rate as f32 / self.fft_size as f32;

        let weighted_sum: f32 = spectrum
            .iter()
            .enumerate()
            .map(|(i, &mag)| i as f32 * bin_width * mag)
            .sum();
        let magnitude_sum: f32 = spectrum.iter().sum();

        if magnitude_sum > 1e-10 {
            weighted_sum / magnitude_sum
        } else {
            0.0
        }
    }

    /// Compute spectral rolloff (85% energy threshold frequency)
    ///
    /// Finds the frequency below which 85% of the spectral energy is
    /// contained. 0.0 for silence.
    ///
    /// # Arguments
    /// * `spectrum` - Magnitude spectrum
    ///
    /// # Returns
    /// Rolloff frequency in Hz
    pub fn rolloff(&self, spectrum: &[f32]) -> f32 {
        let total_energy: f32 = spectrum.iter().map(|&mag| mag * mag).sum();
        if total_energy < 1e-10 {
            return 0.0;
        }

        let threshold = ROLLOFF_THRESHOLD * total_energy;
        let bin_width = self.sample_rate as f32 / self.fft_size as f32;

        let mut cumulative = 0.0;
        for (i, &mag) in spectrum.iter().enumerate() {
            cumulative += mag * mag;
            if cumulative >= threshold {
                return i as f32 * bin_width;
            }
        }

        (spectrum.len().saturating_sub(1)) as f32 * bin_width
    }
}
