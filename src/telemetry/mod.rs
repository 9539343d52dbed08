//! Diagnostics telemetry collector and helpers.
//!
//! The collector multiplexes detection, level, buffer occupancy, and error
//! events into a bounded history plus an async broadcast stream. Consumers
//! subscribe for live dashboards; the history snapshot serves one-shot
//! CLI reporting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use once_cell::sync::Lazy;
use std::collections::VecDeque;
use tokio::sync::broadcast;

use crate::analysis::debounce::Detection;

/// Global telemetry hub shared across the crate.
static HUB: Lazy<TelemetryHub> = Lazy::new(TelemetryHub::default);

/// Access the global telemetry hub.
pub fn hub() -> &'static TelemetryHub {
    &HUB
}

/// One telemetry event.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MetricEvent {
    /// An accepted drum-hit detection
    Detection {
        hit: crate::analysis::classifier::DrumHit,
        confidence: f32,
        timestamp_ms: u64,
    },
    /// Queue fill level of a named channel, in percent
    BufferOccupancy { channel: String, percent: f32 },
    /// A surfaced error with its numeric code
    Error { code: i32, context: String },
}

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer);
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = match self.history.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = match self.history.lock() {
            Ok(guard) => guard,
            Err(_) => {
                return TelemetrySnapshot {
                    recent: Vec::new(),
                    total_events: self.total_events.load(Ordering::Relaxed),
                    dropped_events: self.dropped_history.load(Ordering::Relaxed),
                }
            }
        };
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Top-level hub wrapping collector state plus gauge de-duplication.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    buffer_gauges: Mutex<HashMap<&'static str, f32>>,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
            buffer_gauges: Mutex::new(HashMap::new()),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.collector.snapshot()
    }

    pub fn record_detection(&self, detection: &Detection) {
        self.collector.publish(MetricEvent::Detection {
            hit: detection.hit,
            confidence: detection.confidence,
            timestamp_ms: detection.timestamp_ms,
        });
    }

    /// Publish a buffer occupancy gauge, suppressing sub-2.5% wiggle so the
    /// history is not flooded by steady-state noise.
    pub fn record_buffer_occupancy(&self, channel: &'static str, percent: f32) {
        let normalized = percent.clamp(0.0, 100.0);
        let mut gauges = match self.buffer_gauges.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };

        let should_emit = gauges
            .get(channel)
            .map(|last| (last - normalized).abs() >= 2.5)
            .unwrap_or(true);

        if should_emit {
            gauges.insert(channel, normalized);
            self.collector.publish(MetricEvent::BufferOccupancy {
                channel: channel.to_string(),
                percent: normalized,
            });
        }
    }

    pub fn record_error(&self, code: i32, context: impl Into<String>) {
        self.collector.publish(MetricEvent::Error {
            code,
            context: context.into(),
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64)
    }
}
