//! PracticeScorer - accuracy and timing statistics for a practice session
//!
//! A PracticeSession freezes the target pattern, the step duration, and the
//! session start time, then accumulates Detections until the user stops.
//! Scoring is a pure function of that state: it can be recomputed on demand
//! (live display during the session, final stats afterwards) and never
//! mutates the session.

use serde::{Deserialize, Serialize};

use super::aligner::StepAligner;
use super::debounce::Detection;
use crate::pattern::{step_duration_ms, Pattern};

/// Timing classification for a correct hit relative to its step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimingClass {
    /// More than the tolerance before the step
    Early,
    /// Within the tolerance of the step boundary
    OnTime,
    /// More than the tolerance after the step
    Late,
}

/// Histogram of timing classifications over a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingHistogram {
    pub early: usize,
    pub on_time: usize,
    pub late: usize,
}

/// Derived statistics for a practice session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeStats {
    /// Number of active steps across all instruments in the target
    pub total_expected_beats: usize,
    /// Detections that landed on an active target step of their instrument
    pub correct_beats: usize,
    /// correct / expected in percent; 0.0 for an empty target, never NaN
    pub accuracy_pct: f32,
    /// Timing breakdown of the correct beats
    pub timing: TimingHistogram,
}

/// One practice run against a target pattern
///
/// Lifecycle: created at session start (capturing the engine-timeline start
/// time), accumulates Detections while the user plays, then is scored.
/// Reset by creating a new session.
#[derive(Debug, Clone)]
pub struct PracticeSession {
    started_at_ms: u64,
    target: Pattern,
    step_duration_ms: f64,
    tolerance_ms: f64,
    detections: Vec<Detection>,
}

impl PracticeSession {
    /// Start a session against `target` at the given tempo
    ///
    /// # Arguments
    /// * `target` - Target pattern (read-only; the session keeps its own copy)
    /// * `bpm` - Tempo; converted through the sequencer's step convention
    /// * `tolerance_ms` - Half-width of the on-time window
    /// * `started_at_ms` - Session start on the engine timeline
    pub fn new(target: Pattern, bpm: u32, tolerance_ms: f64, started_at_ms: u64) -> Self {
        Self::with_step_duration(target, step_duration_ms(bpm), tolerance_ms, started_at_ms)
    }

    /// Start a session with an explicit step duration
    pub fn with_step_duration(
        target: Pattern,
        step_duration_ms: f64,
        tolerance_ms: f64,
        started_at_ms: u64,
    ) -> Self {
        Self {
            started_at_ms,
            target,
            step_duration_ms,
            tolerance_ms,
            detections: Vec::new(),
        }
    }

    /// Session start on the engine timeline
    pub fn started_at_ms(&self) -> u64 {
        self.started_at_ms
    }

    /// The target pattern
    pub fn target(&self) -> &Pattern {
        &self.target
    }

    /// Record one accepted Detection
    pub fn record(&mut self, detection: Detection) {
        self.detections.push(detection);
    }

    /// Record a batch of Detections (e.g. a debouncer history snapshot)
    pub fn record_all(&mut self, detections: &[Detection]) {
        self.detections.extend_from_slice(detections);
    }

    /// Detections collected so far
    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    /// Classify a timing offset against the session tolerance
    fn classify_offset(&self, offset_ms: f64) -> TimingClass {
        if offset_ms.abs() <= self.tolerance_ms {
            TimingClass::OnTime
        } else if offset_ms < -self.tolerance_ms {
            TimingClass::Early
        } else {
            TimingClass::Late
        }
    }

    /// Score the session
    ///
    /// Each Detection is aligned to its nearest step; if the target has the
    /// Detection's instrument active there, it counts as correct and its
    /// timing is bucketed. A Detection with no matching active step is a
    /// false positive and contributes to neither count. An empty target
    /// yields accuracy 0.0, not NaN.
    pub fn score(&self) -> PracticeStats {
        let total_expected_beats = self.target.active_count();
        let aligner = StepAligner::new(
            self.started_at_ms,
            self.step_duration_ms,
            self.target.length(),
        );

        let mut correct_beats = 0;
        let mut timing = TimingHistogram::default();

        for detection in &self.detections {
            let aligned = aligner.align(detection.timestamp_ms);
            if !self.target.is_active(detection.hit.instrument(), aligned.step) {
                continue;
            }
            correct_beats += 1;
            match self.classify_offset(aligned.offset_ms) {
                TimingClass::Early => timing.early += 1,
                TimingClass::OnTime => timing.on_time += 1,
                TimingClass::Late => timing.late += 1,
            }
        }

        let accuracy_pct = if total_expected_beats > 0 {
            correct_beats as f32 / total_expected_beats as f32 * 100.0
        } else {
            0.0
        };

        PracticeStats {
            total_expected_beats,
            correct_beats,
            accuracy_pct,
            timing,
        }
    }
}
