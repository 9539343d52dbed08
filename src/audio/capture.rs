//! CaptureEngine - cpal-based microphone capture
//!
//! Owns the microphone stream and produces fixed-size hop buffers over the
//! lock-free buffer pool, plus a continuously updated amplitude level for
//! the UI meter.
//!
//! Key properties:
//! - No allocation in the audio callback: hops are copied into pre-allocated
//!   pool buffers; pool exhaustion drops the hop (drop-stale backpressure)
//! - Each hop is tagged with the sample index of its first sample, so
//!   downstream timestamps stay exact across dropped hops
//! - The cpal stream lives on a dedicated control thread (cpal streams are
//!   not Send); start/stop are command messages, and stream teardown is
//!   awaited synchronously so no device handle outlives `stop()`
//! - Stream open failures surface within a bounded startup timeout instead
//!   of hanging on a stuck permission prompt

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::buffer_pool::AudioThreadChannels;
use crate::config::AudioConfig;
use crate::error::AudioError;

/// How long to wait for the device to open before failing fast
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Store a level value (0.0-1.0) into the shared atomic cell
pub fn store_level(bits: &AtomicU32, level: f32) {
    bits.store(level.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
}

/// Load the level value from the shared atomic cell
pub fn load_level(bits: &AtomicU32) -> f32 {
    f32::from_bits(bits.load(Ordering::Relaxed))
}

/// Running state for an open capture stream
struct CaptureControl {
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
    sample_rate: u32,
}

/// Microphone capture engine
///
/// Lifecycle: `start()` opens the default input device and begins pushing
/// hop buffers; `stop()` tears the stream down and zeroes the level meter.
/// Both are idempotent-friendly: `start()` on a running engine returns
/// `AlreadyListening`, `stop()` on a stopped engine is a no-op.
pub struct CaptureEngine {
    control: Option<CaptureControl>,
    level_bits: Arc<AtomicU32>,
    sample_counter: Arc<AtomicU64>,
    hop_size: usize,
}

impl CaptureEngine {
    /// Create a new engine from capture configuration
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            control: None,
            level_bits: Arc::new(AtomicU32::new(0.0_f32.to_bits())),
            sample_counter: Arc::new(AtomicU64::new(0)),
            hop_size: config.hop_size.max(64),
        }
    }

    /// Shared level cell for the UI meter (f32 bits in an AtomicU32)
    pub fn level_ref(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.level_bits)
    }

    /// Shared counter of captured samples (the engine timeline)
    pub fn sample_counter_ref(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.sample_counter)
    }

    /// Current level (0.0 when not capturing)
    pub fn level(&self) -> f32 {
        load_level(&self.level_bits)
    }

    /// Whether a stream is currently open
    pub fn is_running(&self) -> bool {
        self.control.is_some()
    }

    /// Sample rate of the open stream, if running
    pub fn sample_rate(&self) -> Option<u32> {
        self.control.as_ref().map(|c| c.sample_rate)
    }

    /// Open the default input device and start producing hop buffers
    ///
    /// # Returns
    /// The device sample rate on success.
    ///
    /// # Errors
    /// - `AlreadyListening` if a stream is already open
    /// - `PermissionDenied` if the OS refuses microphone access
    /// - `DeviceError` if no input device exists
    /// - `StreamOpenFailed` for other stream setup failures, including a
    ///   startup that exceeds the bounded timeout
    pub fn start(&mut self, channels: AudioThreadChannels) -> Result<u32, AudioError> {
        if self.control.is_some() {
            return Err(AudioError::AlreadyListening);
        }

        let (startup_tx, startup_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel();

        let level_bits = Arc::clone(&self.level_bits);
        let sample_counter = Arc::clone(&self.sample_counter);
        self.sample_counter.store(0, Ordering::Relaxed);
        let hop_size = self.hop_size;

        let join = std::thread::Builder::new()
            .name("drum-capture".to_string())
            .spawn(move || {
                capture_thread_main(
                    channels,
                    startup_tx,
                    shutdown_rx,
                    level_bits,
                    sample_counter,
                    hop_size,
                );
            })
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("failed to spawn capture thread: {}", e),
            })?;

        match startup_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(Ok(sample_rate)) => {
                tracing::info!(
                    "[CaptureEngine] Input stream open at {} Hz, hop {} samples",
                    sample_rate,
                    hop_size
                );
                self.control = Some(CaptureControl {
                    shutdown_tx,
                    join,
                    sample_rate,
                });
                Ok(sample_rate)
            }
            Ok(Err(err)) => {
                // Thread exits on its own after reporting the failure
                let _ = join.join();
                Err(err)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                // Dropping startup_rx makes the thread tear down whenever
                // the stuck open call finally returns; do not join here.
                let _ = shutdown_tx.send(());
                Err(AudioError::StreamOpenFailed {
                    reason: "timed out waiting for the input device".to_string(),
                })
            }
        }
    }

    /// Stop capture and release the device
    ///
    /// Safe to call when not running. Blocks until the stream is dropped,
    /// then zeroes the level meter.
    pub fn stop(&mut self) {
        if let Some(control) = self.control.take() {
            let _ = control.shutdown_tx.send(());
            if control.join.join().is_err() {
                tracing::warn!("[CaptureEngine] Capture thread panicked during shutdown");
            }
        }
        store_level(&self.level_bits, 0.0);
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the capture control thread: owns the cpal stream for its whole
/// lifetime, reports startup success/failure once, then parks until
/// shutdown is requested.
fn capture_thread_main(
    channels: AudioThreadChannels,
    startup_tx: mpsc::Sender<Result<u32, AudioError>>,
    shutdown_rx: mpsc::Receiver<()>,
    level_bits: Arc<AtomicU32>,
    sample_counter: Arc<AtomicU64>,
    hop_size: usize,
) {
    let stream = match open_input_stream(channels, level_bits.clone(), sample_counter, hop_size) {
        Ok((stream, sample_rate)) => {
            if startup_tx.send(Ok(sample_rate)).is_err() {
                // Caller timed out and gave up; release the device
                drop(stream);
                return;
            }
            stream
        }
        Err(err) => {
            let _ = startup_tx.send(Err(err));
            return;
        }
    };

    // Park until stop() signals or the engine is dropped
    let _ = shutdown_rx.recv();
    drop(stream);
    store_level(&level_bits, 0.0);
    tracing::info!("[CaptureEngine] Input stream closed");
}

fn open_input_stream(
    mut channels: AudioThreadChannels,
    level_bits: Arc<AtomicU32>,
    sample_counter: Arc<AtomicU64>,
    hop_size: usize,
) -> Result<(cpal::Stream, u32), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| AudioError::DeviceError {
            details: "no default input device found".to_string(),
        })?;

    let config = device
        .default_input_config()
        .map_err(|e| classify_open_failure(format!("{:?}", e)))?;

    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(AudioError::UnsupportedFormat {
            format: format!("{:?}", config.sample_format()),
        });
    }

    let stream_config: cpal::StreamConfig = config.into();
    let sample_rate = stream_config.sample_rate.0;
    let channels_count = stream_config.channels as usize;

    // Callback-local accumulator; pre-allocated so the callback never
    // allocates after the first hop boundary settles
    let mut pending: Vec<f32> = Vec::with_capacity(hop_size * 2);
    let mut next_start_sample: u64 = 0;
    let mut dropped_hops: u64 = 0;

    let err_fn = |err| eprintln!("Input stream error: {}", err);

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // De-interleave: keep the first channel only
                if channels_count == 1 {
                    pending.extend_from_slice(data);
                } else {
                    for frame in data.chunks(channels_count) {
                        pending.push(frame[0]);
                    }
                }
                sample_counter.fetch_add((data.len() / channels_count) as u64, Ordering::Relaxed);

                while pending.len() >= hop_size {
                    let hop = &pending[..hop_size];

                    // RMS over the most recent frame drives the level meter
                    let sum_squares: f32 = hop.iter().map(|&x| x * x).sum();
                    store_level(&level_bits, (sum_squares / hop_size as f32).sqrt());

                    match channels.pool_consumer.pop() {
                        Ok(mut buffer) => {
                            buffer.clear();
                            buffer.extend_from_slice(hop);
                            if channels
                                .data_producer
                                .push((next_start_sample, buffer))
                                .is_err()
                            {
                                dropped_hops += 1;
                            }
                        }
                        Err(_) => {
                            // Pool exhausted: analysis is behind, drop the hop
                            dropped_hops += 1;
                            if dropped_hops.is_multiple_of(64) {
                                eprintln!(
                                    "Capture dropped {} hops (analysis falling behind)",
                                    dropped_hops
                                );
                            }
                        }
                    }

                    pending.drain(..hop_size);
                    next_start_sample += hop_size as u64;
                }
            },
            err_fn,
            None,
        )
        .map_err(map_build_error)?;

    stream.play().map_err(|e| AudioError::StreamFailure {
        reason: format!("failed to start input stream: {}", e),
    })?;

    Ok((stream, sample_rate))
}

fn map_build_error(err: cpal::BuildStreamError) -> AudioError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => AudioError::DeviceError {
            details: "input device disappeared while opening the stream".to_string(),
        },
        other => classify_open_failure(format!("{}", other)),
    }
}

/// Split stream-open failures into the permission/denied family vs.
/// everything else; backends report permission problems as free-form
/// messages, so match on the text.
fn classify_open_failure(reason: String) -> AudioError {
    let lower = reason.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not permitted") {
        AudioError::PermissionDenied
    } else if lower.contains("devicenotavailable") || lower.contains("no device") {
        AudioError::DeviceError { details: reason }
    } else {
        AudioError::StreamOpenFailed { reason }
    }
}
