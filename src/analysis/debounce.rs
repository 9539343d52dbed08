// DetectionDebouncer - one physical hit, one Detection
//
// A drum hit spans many audio frames, so the classifier fires repeatedly
// for a single physical event. This component turns that stream of
// per-frame classifications into discrete, de-duplicated Detections.
//
// Gates, applied in order:
// 1. Confidence threshold: weak classifications never reach the gates
// 2. Global gate: minimum spacing after the last accepted Detection of
//    ANY class
// 3. Per-class cooldown: minimum spacing after the last accepted Detection
//    of the SAME class, even when the global gate would allow it
//
// Accepted Detections live in a bounded rolling history, evicted by count
// and by age. All state is explicit and owned here; the analysis thread is
// the only writer.

use std::collections::VecDeque;

use super::classifier::{ClassificationResult, DrumHit};
use crate::config::DebounceConfig;

/// A debounced, time-stamped drum-hit event
///
/// Invariant: `confidence` was at or above the debouncer's configured
/// threshold when the Detection was created.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Detection {
    /// Milliseconds since capture started (engine timeline)
    pub timestamp_ms: u64,
    /// Classified drum hit
    pub hit: DrumHit,
    /// Classifier confidence at acceptance time
    pub confidence: f32,
}

/// Debouncer state machine with bounded rolling history
pub struct DetectionDebouncer {
    config: DebounceConfig,
    /// Timestamp of the last accepted Detection of any class
    last_accept_ms: Option<u64>,
    /// Timestamp of the last accepted Detection per class
    last_by_class: [Option<u64>; 4],
    /// Rolling history, oldest first
    history: VecDeque<Detection>,
}

impl DetectionDebouncer {
    /// Create a debouncer with the given gates and history bounds
    pub fn new(config: DebounceConfig) -> Self {
        let capacity = config.max_detections.max(1);
        Self {
            config,
            last_accept_ms: None,
            last_by_class: [None; 4],
            history: VecDeque::with_capacity(capacity),
        }
    }

    /// Observe one classification at the given engine-timeline timestamp
    ///
    /// Returns the accepted Detection, or None when a gate dropped it.
    pub fn observe(
        &mut self,
        result: &ClassificationResult,
        timestamp_ms: u64,
    ) -> Option<Detection> {
        let hit = result.label?;

        if result.confidence < self.config.min_confidence {
            return None;
        }

        if let Some(last) = self.last_accept_ms {
            if timestamp_ms.saturating_sub(last) < self.config.global_gap_ms {
                return None;
            }
        }

        if let Some(last) = self.last_by_class[hit.index()] {
            if timestamp_ms.saturating_sub(last) < self.config.class_cooldown_ms {
                return None;
            }
        }

        let detection = Detection {
            timestamp_ms,
            hit,
            confidence: result.confidence,
        };

        self.last_accept_ms = Some(timestamp_ms);
        self.last_by_class[hit.index()] = Some(timestamp_ms);
        self.history.push_back(detection);
        self.evict(timestamp_ms);

        Some(detection)
    }

    /// Evict history entries beyond the count bound or older than the
    /// retention window
    fn evict(&mut self, now_ms: u64) {
        while self.history.len() > self.config.max_detections {
            self.history.pop_front();
        }
        let horizon = now_ms.saturating_sub(self.config.retention_ms);
        while let Some(front) = self.history.front() {
            if front.timestamp_ms < horizon {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }

    /// Snapshot of the rolling history, oldest first
    pub fn history(&self) -> Vec<Detection> {
        self.history.iter().copied().collect()
    }

    /// Most recent accepted Detection
    pub fn latest(&self) -> Option<Detection> {
        self.history.back().copied()
    }

    /// Number of Detections currently retained
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Drop all history and reset the gate timestamps
    pub fn clear(&mut self) {
        self.history.clear();
        self.last_accept_ms = None;
        self.last_by_class = [None; 4];
    }
}
