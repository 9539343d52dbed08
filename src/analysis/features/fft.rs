// FFT module - magnitude spectrum computation
//
// This module handles FFT computation with Hann windowing to reduce
// spectral leakage. The magnitude spectrum feeds every frequency-domain
// feature.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// FFT processor that computes magnitude spectra from audio windows
///
/// The transform is planned once at construction; per-call work is
/// windowing, the transform itself, and the magnitude fold.
pub struct FftProcessor {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    /// Hann window, pre-computed
    window: Vec<f32>,
}

impl FftProcessor {
    /// Create a new FFT processor
    ///
    /// # Arguments
    /// * `fft_size` - FFT window size (typically 1024 for feature extraction)
    pub fn new(fft_size: usize) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        let window = (0..fft_size)
            .map(|i| {
                0.5 * (1.0
                    - ((2.0 * std::f32::consts::PI * i as f32) / (fft_size as f32 - 1.0)).cos())
            })
            .collect();

        Self {
            fft,
            fft_size,
            window,
        }
    }

    /// FFT window size in samples
    pub fn size(&self) -> usize {
        self.fft_size
    }

    /// Number of magnitude bins produced (positive frequencies only)
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Compute magnitude spectrum using FFT
    ///
    /// Applies Hann windowing, zero-pads input shorter than the FFT size,
    /// and returns magnitudes for positive frequencies only.
    ///
    /// # Arguments
    /// * `audio` - Audio window; extra samples beyond `fft_size` are ignored
    ///
    /// # Returns
    /// Magnitude spectrum of size `fft_size / 2 + 1`
    pub fn magnitude_spectrum(&self, audio: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = audio
            .iter()
            .take(self.fft_size)
            .zip(self.window.iter())
            .map(|(&sample, &w)| Complex::new(sample * w, 0.0))
            .collect();
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        buffer[..self.bin_count()].iter().map(|c| c.norm()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_count() {
        let processor = FftProcessor::new(1024);
        assert_eq!(processor.bin_count(), 513);
        assert_eq!(processor.magnitude_spectrum(&[0.0; 1024]).len(), 513);
    }

    #[test]
    fn test_silence_gives_zero_spectrum() {
        let processor = FftProcessor::new(256);
        let spectrum = processor.magnitude_spectrum(&[0.0; 256]);
        assert!(spectrum.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let fft_size = 1024;
        let sample_rate = 48000.0;
        let frequency = 3000.0;
        let processor = FftProcessor::new(fft_size);

        let signal: Vec<f32> = (0..fft_size)
            .map(|i| {
                (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate).sin()
            })
            .collect();

        let spectrum = processor.magnitude_spectrum(&signal);
        let peak_bin = spectrum
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(i, _)| i)
            .unwrap();

        let peak_freq = peak_bin as f32 * sample_rate / fft_size as f32;
        assert!(
            (peak_freq - frequency).abs() < 100.0,
            "Peak at {} Hz, expected near {} Hz",
            peak_freq,
            frequency
        );
    }

    #[test]
    fn test_short_input_zero_padded() {
        let processor = FftProcessor::new(1024);
        let spectrum = processor.magnitude_spectrum(&[0.5; 100]);
        assert_eq!(spectrum.len(), 513);
        assert!(spectrum.iter().all(|m| m.is_finite()));
    }
}
