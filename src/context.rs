// AppContext: owned application state and the collaborator-facing surface
//
// Consolidates the capture engine, the analysis worker, the shared
// detection buffer, and the error channel into one container with explicit
// ownership - no ambient globals, no cross-component event broadcast.
// Consumers either call the accessors directly (level meter, beat
// timeline) or subscribe to the broadcast channels (live streams).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;

use tokio::sync::broadcast;

use crate::analysis::classifier::{build_strategy, ClassifierStrategy, HeuristicClassifier};
use crate::analysis::debounce::{Detection, DetectionDebouncer};
use crate::analysis::scorer::PracticeSession;
use crate::analysis::{spawn_analysis_thread, AudioMetrics, Pipeline};
use crate::audio::buffer_pool::BufferPool;
use crate::audio::capture::CaptureEngine;
use crate::config::AppConfig;
use crate::error::{log_audio_error, log_model_error, AudioError, ErrorCode};
use crate::pattern::Pattern;
use crate::telemetry;

/// Running listener state: capture stream plus analysis worker
struct ListenerState {
    capture: CaptureEngine,
    worker: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    sample_rate: u32,
}

/// Application context exposing the practice-tool surface
///
/// Lifecycle methods are safe to call in any order: `start_listening`
/// fails with `AlreadyListening` while running, `stop_listening` is
/// idempotent and leaves the detection history intact.
pub struct AppContext {
    config: AppConfig,
    listener: Mutex<Option<ListenerState>>,
    debouncer: Arc<RwLock<DetectionDebouncer>>,
    detection_tx: broadcast::Sender<Detection>,
    metrics_tx: broadcast::Sender<AudioMetrics>,
    last_error: Mutex<Option<String>>,
}

impl AppContext {
    /// Create a context with the given configuration
    pub fn new(config: AppConfig) -> Self {
        let (detection_tx, _) = broadcast::channel(256);
        let (metrics_tx, _) = broadcast::channel(256);
        let debouncer = Arc::new(RwLock::new(DetectionDebouncer::new(config.debounce.clone())));

        Self {
            config,
            listener: Mutex::new(None),
            debouncer,
            detection_tx,
            metrics_tx,
            last_error: Mutex::new(None),
        }
    }

    /// Create a context with configuration loaded from the default path
    pub fn from_default_config() -> Self {
        Self::new(AppConfig::load_from_file("drum_trainer.json"))
    }

    /// The active configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build the configured strategy, falling back to the heuristic when a
    /// model fails to load or reports not ready. Model-load failure is
    /// non-fatal: it surfaces on the error channel and practice continues.
    fn resolve_strategy(&self) -> Box<dyn ClassifierStrategy> {
        match build_strategy(&self.config.classifier) {
            Ok(strategy) if strategy.is_ready() => strategy,
            Ok(strategy) => {
                tracing::warn!(
                    "[AppContext] Strategy '{}' not ready, falling back to heuristic",
                    strategy.name()
                );
                self.set_error("Classifier not ready; using heuristic rules".to_string());
                Box::new(HeuristicClassifier::new(self.config.classifier.heuristic.clone()))
            }
            Err(err) => {
                log_model_error(&err, "resolve_strategy");
                telemetry::hub().record_error(err.code(), "strategy init failed");
                self.set_error(err.message());
                Box::new(HeuristicClassifier::new(self.config.classifier.heuristic.clone()))
            }
        }
    }

    /// Open the microphone and start the detection pipeline
    ///
    /// # Errors
    /// - `AlreadyListening` if already started
    /// - `PermissionDenied` / `DeviceError` / `StreamOpenFailed` from the
    ///   capture engine; all surfaced on the error channel too
    pub fn start_listening(&self) -> Result<(), AudioError> {
        let mut listener = self
            .listener
            .lock()
            .map_err(|_| AudioError::LockPoisoned {
                component: "listener".to_string(),
            })?;

        if listener.is_some() {
            return Err(AudioError::AlreadyListening);
        }

        let channels = BufferPool::new(
            self.config.audio.buffer_count.max(2),
            self.config.audio.hop_size.max(64),
        );
        let (audio_side, analysis_side) = channels.split_for_threads();

        let mut capture = CaptureEngine::new(&self.config.audio);
        let sample_rate = match capture.start(audio_side) {
            Ok(rate) => rate,
            Err(err) => {
                log_audio_error(&err, "start_listening");
                telemetry::hub().record_error(err.code(), "capture start failed");
                self.set_error(err.message());
                return Err(err);
            }
        };

        let strategy = self.resolve_strategy();
        let pipeline = Pipeline::with_shared_debouncer(
            sample_rate,
            &self.config,
            strategy,
            Arc::clone(&self.debouncer),
        );

        let running = Arc::new(AtomicBool::new(true));
        let worker = spawn_analysis_thread(
            analysis_side,
            pipeline,
            self.detection_tx.clone(),
            self.metrics_tx.clone(),
            Arc::clone(&running),
        );

        *listener = Some(ListenerState {
            capture,
            worker: Some(worker),
            running,
            sample_rate,
        });

        self.clear_error();
        tracing::info!("[AppContext] Listening at {} Hz", sample_rate);
        Ok(())
    }

    /// Stop capture and tear the pipeline down
    ///
    /// Safe to call when not listening. Blocks until the device is
    /// released and the worker has drained - no partial teardown. The
    /// detection history is preserved; `audio_level` reads 0 afterwards.
    pub fn stop_listening(&self) -> Result<(), AudioError> {
        let mut listener = self
            .listener
            .lock()
            .map_err(|_| AudioError::LockPoisoned {
                component: "listener".to_string(),
            })?;

        if let Some(mut state) = listener.take() {
            // Stop the device first so no new hops arrive, then let the
            // worker drain the queue and exit
            state.capture.stop();
            state.running.store(false, Ordering::SeqCst);
            if let Some(worker) = state.worker.take() {
                if worker.join().is_err() {
                    tracing::warn!("[AppContext] Analysis worker panicked during shutdown");
                }
            }
            tracing::info!("[AppContext] Stopped listening");
        }

        Ok(())
    }

    /// Whether the pipeline is currently running
    pub fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .map(|listener| listener.is_some())
            .unwrap_or(false)
    }

    /// Current microphone level (0.0 - 1.0); 0.0 when not listening
    pub fn audio_level(&self) -> f32 {
        self.listener
            .lock()
            .ok()
            .and_then(|listener| listener.as_ref().map(|state| state.capture.level()))
            .unwrap_or(0.0)
    }

    /// Milliseconds of audio captured since `start_listening`
    ///
    /// The engine timeline; practice sessions anchor their start to this.
    pub fn elapsed_ms(&self) -> u64 {
        self.listener
            .lock()
            .ok()
            .and_then(|listener| {
                listener.as_ref().map(|state| {
                    let samples = state
                        .capture
                        .sample_counter_ref()
                        .load(Ordering::Relaxed);
                    samples * 1000 / state.sample_rate as u64
                })
            })
            .unwrap_or(0)
    }

    /// Read-only snapshot of the rolling detection buffer, oldest first
    pub fn detected_beats(&self) -> Vec<Detection> {
        self.debouncer
            .read()
            .map(|debouncer| debouncer.history())
            .unwrap_or_default()
    }

    /// Empty the rolling detection buffer without stopping capture
    pub fn clear_beats(&self) {
        if let Ok(mut debouncer) = self.debouncer.write() {
            debouncer.clear();
        }
    }

    /// Last surfaced error, human readable; None when healthy
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|guard| guard.clone())
    }

    fn set_error(&self, message: String) {
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = Some(message);
        }
    }

    fn clear_error(&self) {
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = None;
        }
    }

    /// Subscribe to live detections
    pub fn subscribe_detections(&self) -> broadcast::Receiver<Detection> {
        self.detection_tx.subscribe()
    }

    /// Subscribe to per-frame audio metrics (level meter, debug display)
    pub fn subscribe_metrics(&self) -> broadcast::Receiver<AudioMetrics> {
        self.metrics_tx.subscribe()
    }

    /// Live detections as an async stream
    pub fn detections_stream(&self) -> impl futures::Stream<Item = Detection> {
        use futures::StreamExt;
        tokio_stream::wrappers::BroadcastStream::new(self.detection_tx.subscribe())
            .filter_map(|item| async move { item.ok() })
    }

    /// Begin a practice session against `target` at the given tempo
    ///
    /// The session start is anchored to the engine timeline so Detection
    /// timestamps and step alignment share the same clock.
    pub fn start_practice(&self, target: Pattern, bpm: u32) -> PracticeSession {
        PracticeSession::new(
            target,
            bpm,
            self.config.practice.tolerance_ms,
            self.elapsed_ms(),
        )
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        let _ = self.stop_listening();
    }
}
