//! Configuration management for dynamic parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling fast iteration without recompilation. Detection thresholds,
//! cooldown durations, and band boundaries vary a lot between rooms,
//! microphones, and players, so every one of them is configuration rather
//! than a constant.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub features: FeatureConfig,
    pub classifier: ClassifierConfig,
    pub debounce: DebounceConfig,
    pub practice: PracticeConfig,
}

/// Capture engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Samples per hop buffer handed to the analysis thread
    pub hop_size: usize,
    /// Number of pre-allocated hop buffers in the pool
    pub buffer_count: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            // ~43ms at 48kHz, comfortably above per-frame analysis cost
            hop_size: 2048,
            buffer_count: 16,
        }
    }
}

/// Feature extraction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// FFT window size in samples
    pub fft_size: usize,
    /// Interior band edges in Hz; the four bands are
    /// [0, e0), [e0, e1), [e1, e2), [e2, nyquist]
    pub band_edges_hz: [f32; 3],
    /// Number of log-spaced bands feeding the cepstrum DCT
    pub cepstrum_bands: usize,
    /// Number of cepstral coefficients kept for the trained classifier
    pub cepstral_coefficients: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            // Tuned to drum acoustics: kick fundament, snare body,
            // snare/tom presence, hat/cymbal shimmer
            band_edges_hz: [150.0, 1000.0, 6000.0],
            cepstrum_bands: 24,
            cepstral_coefficients: 13,
        }
    }
}

/// Which classifier strategy the pipeline runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Rule cascade over band-energy ratios
    Heuristic,
    /// Feed-forward net over cepstral coefficients (needs a model artifact)
    Trained,
}

/// Heuristic classifier thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// RMS below this is treated as silence; no rule fires
    pub rms_floor: f32,
    /// Zero-crossing rate above which high-band content reads as a hat
    pub hihat_zcr: f32,
    /// Decay time (ms) separating closed from open hats
    ///
    /// Decay is measured within one hop, so sounds still ringing at the
    /// end of the frame saturate at the hop duration; keep this below the
    /// hop length (~43ms at the default hop and 48kHz) or open hats become
    /// undetectable.
    pub open_hat_decay_ms: f32,
    /// Spectral rolloff (Hz) above which a hat with ambiguous decay still
    /// reads as open (cymbal shimmer reaches the very-high region)
    pub open_hat_rolloff_hz: f32,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            rms_floor: 0.01,
            hihat_zcr: 0.18,
            open_hat_decay_ms: 35.0,
            open_hat_rolloff_hz: 9500.0,
        }
    }
}

/// Classifier strategy selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub strategy: StrategyKind,
    /// Path to the trained-model JSON artifact (Trained strategy only)
    pub model_path: Option<PathBuf>,
    pub heuristic: HeuristicConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Heuristic,
            model_path: None,
            heuristic: HeuristicConfig::default(),
        }
    }
}

/// Detection debouncer parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Classifications below this confidence are dropped before gating
    pub min_confidence: f32,
    /// Minimum spacing between accepted detections of any type (ms)
    pub global_gap_ms: u64,
    /// Minimum spacing between accepted detections of the same type (ms)
    pub class_cooldown_ms: u64,
    /// Rolling history bound by count
    pub max_detections: usize,
    /// Rolling history bound by age (ms)
    pub retention_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
            global_gap_ms: 100,
            class_cooldown_ms: 180,
            max_detections: 50,
            retention_ms: 10_000,
        }
    }
}

/// Practice scoring parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeConfig {
    /// Timing tolerance for the on-time bucket (ms)
    pub tolerance_ms: f64,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self { tolerance_ms: 100.0 }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    ///
    /// Falls back to defaults if the file is missing or invalid, logging a
    /// warning; a broken config file should never keep the trainer from
    /// starting.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}
