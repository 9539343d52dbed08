//! Pattern - the step-sequencer grid shared with collaborators
//!
//! A `Pattern` maps instrument names to fixed-length boolean step rows.
//! It is produced by the pattern-import parsers and the step-editor UI and
//! consumed read-only by the classification core (target patterns for
//! practice scoring) and by the sequencer playback engine. The core also
//! produces patterns in the same shape as its "detected pattern" output.
//!
//! Patterns are timing-agnostic: they carry step indices only. The tempo
//! helpers below define the sequencer's convention for turning BPM into
//! step durations (two steps per beat, eight steps per 4/4 bar).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Validation errors raised while constructing a Pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// Pattern length must be at least one step
    LengthZero,
    /// An instrument row does not match the pattern length
    RowLengthMismatch {
        instrument: String,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::LengthZero => write!(f, "pattern length must be greater than 0"),
            PatternError::RowLengthMismatch {
                instrument,
                expected,
                actual,
            } => write!(
                f,
                "row '{}' has {} steps, pattern length is {}",
                instrument, actual, expected
            ),
        }
    }
}

impl std::error::Error for PatternError {}

/// Raw serde shape for Pattern, validated on conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PatternSpec {
    length: usize,
    rows: BTreeMap<String, Vec<bool>>,
}

/// A fixed-length step grid: instrument name -> boolean steps
///
/// Invariant: every row has exactly `length` entries. The invariant is
/// enforced at construction (`set_row`) and at deserialization, so
/// downstream consumers never need to re-check row lengths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PatternSpec", into = "PatternSpec")]
pub struct Pattern {
    length: usize,
    rows: BTreeMap<String, Vec<bool>>,
}

impl TryFrom<PatternSpec> for Pattern {
    type Error = PatternError;

    fn try_from(spec: PatternSpec) -> Result<Self, Self::Error> {
        if spec.length == 0 {
            return Err(PatternError::LengthZero);
        }
        for (instrument, row) in &spec.rows {
            if row.len() != spec.length {
                return Err(PatternError::RowLengthMismatch {
                    instrument: instrument.clone(),
                    expected: spec.length,
                    actual: row.len(),
                });
            }
        }
        Ok(Pattern {
            length: spec.length,
            rows: spec.rows,
        })
    }
}

impl From<Pattern> for PatternSpec {
    fn from(pattern: Pattern) -> Self {
        PatternSpec {
            length: pattern.length,
            rows: pattern.rows,
        }
    }
}

impl Pattern {
    /// Create an empty pattern with the given step count
    ///
    /// # Panics
    /// Panics if `length` is 0.
    pub fn new(length: usize) -> Self {
        assert!(length > 0, "pattern length must be greater than 0");
        Self {
            length,
            rows: BTreeMap::new(),
        }
    }

    /// Add or replace an instrument row
    ///
    /// # Errors
    /// Returns `PatternError::RowLengthMismatch` if the row length differs
    /// from the pattern length.
    pub fn set_row(
        &mut self,
        instrument: impl Into<String>,
        steps: Vec<bool>,
    ) -> Result<(), PatternError> {
        let instrument = instrument.into();
        if steps.len() != self.length {
            return Err(PatternError::RowLengthMismatch {
                instrument,
                expected: self.length,
                actual: steps.len(),
            });
        }
        self.rows.insert(instrument, steps);
        Ok(())
    }

    /// Pattern length in steps
    pub fn length(&self) -> usize {
        self.length
    }

    /// Instrument row, if present
    pub fn row(&self, instrument: &str) -> Option<&[bool]> {
        self.rows.get(instrument).map(|row| row.as_slice())
    }

    /// Whether the instrument is active at the given step
    ///
    /// Missing instruments and out-of-range steps read as inactive.
    pub fn is_active(&self, instrument: &str, step: usize) -> bool {
        self.rows
            .get(instrument)
            .and_then(|row| row.get(step))
            .copied()
            .unwrap_or(false)
    }

    /// Iterator over instrument names in deterministic order
    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(|name| name.as_str())
    }

    /// Total number of active steps across all instruments
    ///
    /// This is the `total_expected_beats` denominator for practice scoring.
    pub fn active_count(&self) -> usize {
        self.rows
            .values()
            .map(|row| row.iter().filter(|&&on| on).count())
            .sum()
    }

    /// True when no instrument has any active step
    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }
}

/// Duration of one sequencer step in milliseconds
///
/// The sequencer runs two steps per beat (eight steps per 4/4 bar), so at
/// 120 BPM a step lasts 250 ms / 2 = 125 ms.
pub fn step_duration_ms(bpm: u32) -> f64 {
    60_000.0 / bpm as f64 / 2.0
}

/// Number of audio samples spanned by one sequencer step
pub fn samples_per_step(bpm: u32, sample_rate: u32) -> u64 {
    (sample_rate as u64 * 30) / bpm as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_creation() {
        let pattern = Pattern::new(16);
        assert_eq!(pattern.length(), 16);
        assert_eq!(pattern.active_count(), 0);
        assert!(pattern.is_empty());
    }

    #[test]
    #[should_panic(expected = "pattern length must be greater than 0")]
    fn test_zero_length_panics() {
        Pattern::new(0);
    }

    #[test]
    fn test_set_row_validates_length() {
        let mut pattern = Pattern::new(4);
        assert!(pattern.set_row("kick", vec![true, false, true, false]).is_ok());

        let err = pattern.set_row("snare", vec![true, false]).unwrap_err();
        assert_eq!(
            err,
            PatternError::RowLengthMismatch {
                instrument: "snare".to_string(),
                expected: 4,
                actual: 2,
            }
        );
    }

    #[test]
    fn test_is_active() {
        let mut pattern = Pattern::new(4);
        pattern
            .set_row("kick", vec![true, false, false, true])
            .unwrap();

        assert!(pattern.is_active("kick", 0));
        assert!(!pattern.is_active("kick", 1));
        assert!(pattern.is_active("kick", 3));

        // Missing instrument and out-of-range step both read inactive
        assert!(!pattern.is_active("snare", 0));
        assert!(!pattern.is_active("kick", 99));
    }

    #[test]
    fn test_active_count_across_instruments() {
        let mut pattern = Pattern::new(4);
        pattern
            .set_row("kick", vec![true, false, true, false])
            .unwrap();
        pattern
            .set_row("hihat", vec![true, true, true, true])
            .unwrap();

        assert_eq!(pattern.active_count(), 6);
        assert!(!pattern.is_empty());
    }

    #[test]
    fn test_instruments_deterministic_order() {
        let mut pattern = Pattern::new(2);
        pattern.set_row("snare", vec![false, true]).unwrap();
        pattern.set_row("kick", vec![true, false]).unwrap();

        let names: Vec<&str> = pattern.instruments().collect();
        assert_eq!(names, vec!["kick", "snare"]);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut pattern = Pattern::new(4);
        pattern
            .set_row("kick", vec![true, false, false, false])
            .unwrap();
        pattern
            .set_row("snare", vec![false, false, true, false])
            .unwrap();

        let json = serde_json::to_string(&pattern).unwrap();
        let parsed: Pattern = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, pattern);
    }

    #[test]
    fn test_deserialize_rejects_mismatched_row() {
        let json = r#"{"length": 4, "rows": {"kick": [true, false]}}"#;
        let result: Result<Pattern, _> = serde_json::from_str(json);
        assert!(result.is_err(), "Mismatched row length must be rejected");
    }

    #[test]
    fn test_deserialize_rejects_zero_length() {
        let json = r#"{"length": 0, "rows": {}}"#;
        let result: Result<Pattern, _> = serde_json::from_str(json);
        assert!(result.is_err(), "Zero-length pattern must be rejected");
    }

    #[test]
    fn test_step_duration() {
        // 120 BPM: beat = 500ms, step = 250ms... the sequencer convention
        // is two steps per beat, so 60000 / 120 / 2 = 250
        assert_eq!(step_duration_ms(120), 250.0);
        assert_eq!(step_duration_ms(60), 500.0);
    }

    #[test]
    fn test_samples_per_step() {
        // 120 BPM at 48kHz: 0.25s per step = 12000 samples
        assert_eq!(samples_per_step(120, 48000), 12000);
        // 60 BPM at 44.1kHz: 0.5s per step = 22050 samples
        assert_eq!(samples_per_step(60, 44100), 22050);
    }
}
