//! StepAligner - timestamp quantization onto the sequencer grid
//!
//! Maps a detection's engine-timeline timestamp to the nearest sequencer
//! step for comparison against a target pattern. Alignment uses rounding,
//! not truncation, so a hit slightly before a step boundary still maps to
//! the intended step - and the timing offset keeps its sign.
//!
//! The offset is computed against the unwrapped step index, before the
//! modulo onto the pattern length. Computing it after the wrap would flip
//! the sign for early hits at pattern boundaries (a hit 5ms before step 0
//! of the next repetition must read as -5ms, not as +justUnderOnePattern).

use super::classifier::DrumHit;
use super::debounce::Detection;
use crate::pattern::Pattern;

/// One detection mapped onto the step grid
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AlignedStep {
    /// Step index in [0, pattern_length)
    pub step: usize,
    /// Signed distance from the nominal step time in milliseconds
    /// (negative = early, positive = late)
    pub offset_ms: f64,
}

/// Aligner for a fixed session start, tempo, and pattern length
#[derive(Debug, Clone)]
pub struct StepAligner {
    session_start_ms: u64,
    step_duration_ms: f64,
    pattern_length: usize,
}

impl StepAligner {
    /// Create an aligner
    ///
    /// # Panics
    /// Panics if `step_duration_ms` is not positive or `pattern_length`
    /// is 0; both would make the quantization arithmetic meaningless.
    pub fn new(session_start_ms: u64, step_duration_ms: f64, pattern_length: usize) -> Self {
        assert!(
            step_duration_ms > 0.0,
            "step duration must be positive"
        );
        assert!(pattern_length > 0, "pattern length must be greater than 0");
        Self {
            session_start_ms,
            step_duration_ms,
            pattern_length,
        }
    }

    /// Quantize a timestamp to the nearest step
    ///
    /// A timestamp exactly on `session_start + k * step_duration` yields
    /// step `k mod pattern_length` with offset 0. Hits slightly before the
    /// session start clamp to step 0 with a negative offset.
    pub fn align(&self, timestamp_ms: u64) -> AlignedStep {
        let elapsed = timestamp_ms as i64 - self.session_start_ms as i64;
        let elapsed_ms = elapsed as f64;

        // Unwrapped step first; the offset must be computed against it,
        // not against the wrapped index
        let unwrapped = (elapsed_ms / self.step_duration_ms).round().max(0.0);
        let offset_ms = elapsed_ms - unwrapped * self.step_duration_ms;

        let step = (unwrapped as u64 % self.pattern_length as u64) as usize;

        AlignedStep { step, offset_ms }
    }

    /// Fold detections onto a boolean grid in the Pattern shape
    ///
    /// This is the classifier core's "detected pattern" output: the same
    /// structure the sequencer and pattern editors consume. Every class
    /// gets a row, active wherever at least one detection aligned to that
    /// step.
    pub fn fold_detections(&self, detections: &[Detection]) -> Pattern {
        let mut rows: [Vec<bool>; 4] =
            std::array::from_fn(|_| vec![false; self.pattern_length]);

        for detection in detections {
            let aligned = self.align(detection.timestamp_ms);
            rows[detection.hit.index()][aligned.step] = true;
        }

        let mut pattern = Pattern::new(self.pattern_length);
        for (hit, row) in DrumHit::ALL.iter().zip(rows.into_iter()) {
            pattern
                .set_row(hit.instrument(), row)
                .expect("row length matches pattern length by construction");
        }
        pattern
    }
}
