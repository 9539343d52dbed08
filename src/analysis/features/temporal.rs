// Temporal module - time-domain feature extraction
//
// Computes features directly from the time-domain signal: zero-crossing
// rate, RMS level, and amplitude envelope decay time.

/// Temporal feature computation functions
pub struct TemporalFeatures {
    sample_rate: u32,
}

impl TemporalFeatures {
    /// Create a new temporal features processor
    ///
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Compute zero-crossing rate (ZCR)
    ///
    /// ZCR measures how often the signal changes sign. High ZCR indicates
    /// noise-like content (hats); low ZCR indicates tonal content (kicks).
    ///
    /// # Arguments
    /// * `audio` - Time-domain audio signal
    ///
    /// # Returns
    /// Zero-crossing rate (0.0 to 1.0)
    pub fn zcr(&self, audio: &[f32]) -> f32 {
        if audio.len() < 2 {
            return 0.0;
        }

        let mut crossings = 0;
        for i in 1..audio.len() {
            if (audio[i] >= 0.0 && audio[i - 1] < 0.0) || (audio[i] < 0.0 && audio[i - 1] >= 0.0) {
                crossings += 1;
            }
        }

        crossings as f32 / (audio.len() - 1) as f32
    }

    /// Compute RMS amplitude of the frame
    ///
    /// # Arguments
    /// * `audio` - Time-domain audio signal
    ///
    /// # Returns
    /// Root mean square level, 0.0 for an empty frame
    pub fn rms(&self, audio: &[f32]) -> f32 {
        if audio.is_empty() {
            return 0.0;
        }
        let sum_squares: f32 = audio.iter().map(|&x| x * x).sum();
        (sum_squares / audio.len() as f32).sqrt()
    }

    /// Compute temporal envelope decay time
    ///
    /// Measures time from the peak amplitude to the -20dB point (10% of
    /// peak). Distinguishes short percussive sounds (closed hat) from
    /// sustained ones (open hat).
    ///
    /// # Arguments
    /// * `audio` - Time-domain audio signal
    ///
    /// # Returns
    /// Decay time in milliseconds; 0.0 for silence
    pub fn decay_time_ms(&self, audio: &[f32]) -> f32 {
        if audio.is_empty() {
            return 0.0;
        }

        let (peak_idx, peak_amp) = audio
            .iter()
            .map(|x| x.abs())
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or((0, 0.0));

        if peak_amp < 1e-6 {
            return 0.0;
        }

        let decay_threshold = peak_amp * 0.1;

        for (i, sample) in audio[peak_idx..].iter().enumerate() {
            if sample.abs() < decay_threshold {
                return (i as f32 / self.sample_rate as f32) * 1000.0;
            }
        }

        // Never decayed inside the frame: report the remaining duration
        let remaining = (audio.len() - peak_idx) as f32;
        (remaining / self.sample_rate as f32) * 1000.0
    }
}
