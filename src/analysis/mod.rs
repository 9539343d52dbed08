// Analysis module - the detection pipeline
//
// This module orchestrates the per-frame pipeline, processing hop buffers
// from the capture thread and turning them into debounced Detections for
// the UI timeline and the practice scorer.
//
// Architecture:
// - Pipeline: extract -> classify -> debounce for one frame, fully
//   sequential; one frame finishes before the next is accepted
// - spawn_analysis_thread: dedicated worker that feeds the Pipeline from
//   the lock-free data queue and fans results out over broadcast channels
// - Offline use (CLI, tests) drives the same Pipeline directly from a
//   sample buffer; live and offline runs share every line of the per-frame
//   path

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

use rtrb::PopError;
use tokio::sync::broadcast;

use crate::audio::buffer_pool::AnalysisThreadChannels;
use crate::config::AppConfig;
use crate::error::{log_model_error, ErrorCode, ModelError};
use crate::telemetry;

pub mod aligner;
pub mod classifier;
pub mod debounce;
pub mod features;
pub mod scorer;

use classifier::{build_strategy, ClassifierInput, ClassifierStrategy};
use debounce::{Detection, DetectionDebouncer};
use features::FeatureExtractor;

/// One fixed-size window of captured samples, tagged with its capture time
///
/// Immutable once produced; consumed exactly once by the pipeline.
pub struct AudioFrame<'a> {
    pub samples: &'a [f32],
    /// Milliseconds since capture started (engine timeline)
    pub timestamp_ms: u64,
    pub sample_rate: u32,
}

/// Per-frame DSP metrics for the level meter and debug display
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioMetrics {
    /// RMS amplitude of the frame (0.0 to 1.0)
    pub rms: f32,
    /// Spectral centroid in Hz
    pub spectral_centroid: f32,
    /// Sample index of the frame start
    pub frame_number: u64,
    /// Milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Everything the pipeline produced for one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameReport {
    /// Accepted Detection, if the frame produced one
    pub detection: Option<Detection>,
    pub metrics: AudioMetrics,
}

/// The per-frame pipeline: extract -> classify -> debounce
///
/// The debouncer sits behind an `Arc<RwLock>` so the facade can read the
/// rolling history and clear it while the pipeline runs; the pipeline is
/// the only writer on the processing timeline.
pub struct Pipeline {
    extractor: FeatureExtractor,
    strategy: Box<dyn ClassifierStrategy>,
    debouncer: Arc<RwLock<DetectionDebouncer>>,
    sample_rate: u32,
    hop_size: usize,
}

impl Pipeline {
    /// Build a pipeline with the configured strategy
    ///
    /// # Errors
    /// `ModelError` when the configured strategy fails to initialize
    /// (missing/invalid model artifact). Callers either surface it or fall
    /// back to the heuristic via `build_strategy` on a heuristic config.
    pub fn from_config(sample_rate: u32, config: &AppConfig) -> Result<Self, ModelError> {
        let strategy = build_strategy(&config.classifier)?;
        Ok(Self::new(sample_rate, config, strategy))
    }

    /// Build a pipeline around an explicit strategy
    pub fn new(
        sample_rate: u32,
        config: &AppConfig,
        strategy: Box<dyn ClassifierStrategy>,
    ) -> Self {
        Self::with_shared_debouncer(
            sample_rate,
            config,
            strategy,
            Arc::new(RwLock::new(DetectionDebouncer::new(config.debounce.clone()))),
        )
    }

    /// Build a pipeline writing into an externally owned debouncer
    pub fn with_shared_debouncer(
        sample_rate: u32,
        config: &AppConfig,
        strategy: Box<dyn ClassifierStrategy>,
        debouncer: Arc<RwLock<DetectionDebouncer>>,
    ) -> Self {
        Self {
            extractor: FeatureExtractor::with_config(sample_rate, &config.features),
            strategy,
            debouncer,
            sample_rate,
            hop_size: config.audio.hop_size.max(64),
        }
    }

    /// Handle to the shared rolling detection buffer
    pub fn debouncer_handle(&self) -> Arc<RwLock<DetectionDebouncer>> {
        Arc::clone(&self.debouncer)
    }

    /// Name of the active strategy
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Sample rate the pipeline was built for
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Process one frame fully: extract, classify, debounce
    ///
    /// Per-frame failures (inference errors, malformed features) are
    /// logged and reported, then the frame is skipped; they never
    /// propagate out of the pipeline.
    pub fn process_frame(&mut self, frame: AudioFrame<'_>) -> FrameReport {
        let features = self.extractor.extract(frame.samples);

        let metrics = AudioMetrics {
            rms: features.rms,
            spectral_centroid: features.centroid,
            frame_number: frame.timestamp_ms * self.sample_rate as u64 / 1000,
            timestamp_ms: frame.timestamp_ms,
        };

        if !features.is_finite() {
            tracing::warn!(
                "[Pipeline] Skipping frame at {}ms: non-finite feature vector",
                frame.timestamp_ms
            );
            return FrameReport {
                detection: None,
                metrics,
            };
        }

        let result = match self.strategy.classify(ClassifierInput {
            samples: frame.samples,
            sample_rate: frame.sample_rate,
            features: &features,
        }) {
            Ok(result) => result,
            Err(err) => {
                log_model_error(&err, "process_frame");
                telemetry::hub().record_error(err.code(), "classification failed");
                return FrameReport {
                    detection: None,
                    metrics,
                };
            }
        };

        let detection = match self.debouncer.write() {
            Ok(mut debouncer) => debouncer.observe(&result, frame.timestamp_ms),
            Err(_) => {
                tracing::error!("[Pipeline] Detection buffer lock poisoned, dropping frame");
                None
            }
        };

        if let Some(detection) = detection {
            telemetry::hub().record_detection(&detection);
            tracing::debug!(
                "[Pipeline] Detection {:?} at {}ms (confidence {:.2})",
                detection.hit,
                detection.timestamp_ms,
                detection.confidence
            );
        }

        FrameReport { detection, metrics }
    }

    /// Drive the pipeline over an in-memory sample buffer (offline path)
    ///
    /// Chops the buffer into hops, deriving each frame's timestamp from
    /// its sample position, and returns the accepted Detections in order.
    pub fn process_buffer(&mut self, samples: &[f32]) -> Vec<Detection> {
        let mut detections = Vec::new();
        let mut start_sample: u64 = 0;
        let hop = self.hop_size;

        for chunk in samples.chunks(hop) {
            let timestamp_ms = start_sample * 1000 / self.sample_rate as u64;
            let report = self.process_frame(AudioFrame {
                samples: chunk,
                timestamp_ms,
                sample_rate: self.sample_rate,
            });
            if let Some(detection) = report.detection {
                detections.push(detection);
            }
            start_sample += chunk.len() as u64;
        }

        detections
    }

    /// Snapshot of the rolling detection history
    pub fn detections(&self) -> Vec<Detection> {
        self.debouncer
            .read()
            .map(|debouncer| debouncer.history())
            .unwrap_or_default()
    }

    /// Empty the rolling detection history
    pub fn clear_detections(&self) {
        if let Ok(mut debouncer) = self.debouncer.write() {
            debouncer.clear();
        }
    }
}

/// Spawn the analysis worker thread
///
/// The worker pops tagged hop buffers from the data queue, returns each
/// buffer to the pool immediately, runs the pipeline, and fans out
/// detections and metrics over the broadcast channels. It drains the queue
/// after `running` clears, then exits; the owner joins the handle for a
/// complete teardown.
pub fn spawn_analysis_thread(
    mut channels: AnalysisThreadChannels,
    mut pipeline: Pipeline,
    detection_tx: broadcast::Sender<Detection>,
    metrics_tx: broadcast::Sender<AudioMetrics>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("drum-analysis".to_string())
        .spawn(move || {
            tracing::info!(
                "[AnalysisThread] Started with {} strategy at {} Hz",
                pipeline.strategy_name(),
                pipeline.sample_rate()
            );

            let sample_rate = pipeline.sample_rate() as u64;
            let queue_capacity = channels.data_consumer.buffer().capacity().max(1);
            let mut frame_scratch: Vec<f32> = Vec::new();

            loop {
                let (start_sample, buffer) = match channels.data_consumer.pop() {
                    Ok(item) => item,
                    Err(PopError::Empty) => {
                        if !running.load(Ordering::SeqCst) {
                            tracing::info!(
                                "[AnalysisThread] Shutdown flag set and queue empty, exiting"
                            );
                            break;
                        }
                        thread::sleep(std::time::Duration::from_millis(1));
                        continue;
                    }
                };

                let occupancy = channels.data_consumer.slots() as f32
                    / queue_capacity as f32
                    * 100.0;
                telemetry::hub().record_buffer_occupancy("analysis_data_queue", occupancy);

                // Copy out and return the buffer to the pool before any DSP
                // so the capture side never starves on a slow frame
                frame_scratch.clear();
                frame_scratch.extend_from_slice(&buffer);
                if channels.pool_producer.push(buffer).is_err() {
                    tracing::warn!("[AnalysisThread] Pool queue full, dropping buffer");
                }

                let timestamp_ms = start_sample * 1000 / sample_rate;
                let report = pipeline.process_frame(AudioFrame {
                    samples: &frame_scratch,
                    timestamp_ms,
                    sample_rate: sample_rate as u32,
                });

                let _ = metrics_tx.send(report.metrics);
                if let Some(detection) = report.detection {
                    let _ = detection_tx.send(detection);
                }
            }
        })
        .expect("failed to spawn analysis thread")
}
