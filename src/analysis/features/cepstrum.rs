// Cepstrum module - cepstral coefficients for the trained classifier
//
// Computes a compact cepstral description of the frame: the magnitude
// spectrum is folded into log-spaced bands, log-compressed, and passed
// through a DCT-II. The first N coefficients form the fixed-size input of
// the trained classifier strategy.

/// Lowest band edge in Hz; below this is dominated by mic handling noise
const MIN_BAND_HZ: f32 = 20.0;

/// Cepstral coefficient computation over log-spaced bands
pub struct CepstrumFeatures {
    /// Bin ranges of the log-spaced bands
    band_bins: Vec<(usize, usize)>,
    /// Number of coefficients kept
    coefficients: usize,
}

impl CepstrumFeatures {
    /// Create a new cepstrum processor
    ///
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `fft_size` - FFT window size the spectra were computed with
    /// * `bands` - Number of log-spaced bands feeding the DCT
    /// * `coefficients` - Number of cepstral coefficients to keep
    pub fn new(sample_rate: u32, fft_size: usize, bands: usize, coefficients: usize) -> Self {
        let bands = bands.max(coefficients.max(1));
        let bin_count = fft_size / 2 + 1;
        let bin_width = sample_rate as f32 / fft_size as f32;
        let nyquist = sample_rate as f32 / 2.0;

        // Geometrically spaced edges from MIN_BAND_HZ to Nyquist
        let ratio = (nyquist / MIN_BAND_HZ).powf(1.0 / bands as f32);
        let mut band_bins = Vec::with_capacity(bands);
        let mut lo_hz = MIN_BAND_HZ;
        for _ in 0..bands {
            let hi_hz = lo_hz * ratio;
            let lo_bin = ((lo_hz / bin_width) as usize).min(bin_count);
            let hi_bin = (((hi_hz / bin_width) as usize) + 1).min(bin_count);
            band_bins.push((lo_bin, hi_bin.max(lo_bin)));
            lo_hz = hi_hz;
        }

        Self {
            band_bins,
            coefficients,
        }
    }

    /// Number of coefficients produced per call
    pub fn coefficient_count(&self) -> usize {
        self.coefficients
    }

    /// Compute cepstral coefficients from a magnitude spectrum
    ///
    /// Silent spectra yield an all-zero vector rather than the DCT of a
    /// log-of-epsilon plateau, keeping the trained classifier's input
    /// well-behaved.
    ///
    /// # Arguments
    /// * `spectrum` - Magnitude spectrum (positive frequencies)
    ///
    /// # Returns
    /// Vector of `coefficients` finite values
    pub fn coefficients(&self, spectrum: &[f32]) -> Vec<f32> {
        let total: f32 = spectrum.iter().sum();
        if total < 1e-10 {
            return vec![0.0; self.coefficients];
        }

        // Mean power per log-spaced band, log-compressed
        let log_energies: Vec<f32> = self
            .band_bins
            .iter()
            .map(|&(start, end)| {
                let end = end.min(spectrum.len());
                if start >= end {
                    return (1e-10_f32).ln();
                }
                let mean: f32 =
                    spectrum[start..end].iter().map(|&m| m * m).sum::<f32>() / (end - start) as f32;
                (mean + 1e-10).ln()
            })
            .collect();

        // DCT-II over the log energies
        let band_count = log_energies.len() as f32;
        (0..self.coefficients)
            .map(|n| {
                log_energies
                    .iter()
                    .enumerate()
                    .map(|(k, &log_e)| {
                        log_e
                            * (std::f32::consts::PI * n as f32 * (k as f32 + 0.5) / band_count)
                                .cos()
                    })
                    .sum::<f32>()
            })
            .collect()
    }
}
