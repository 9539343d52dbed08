// Drum Trainer Core - real-time drum-hit detection and practice scoring
//
// Pipeline: CaptureEngine -> FeatureExtractor -> EventClassifier ->
// DetectionDebouncer -> (UI timeline | StepAligner -> PracticeScorer)

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod context;
pub mod error;
pub mod pattern;
pub mod telemetry;
pub mod testing;

// Re-exports for convenience
pub use analysis::classifier::DrumHit;
pub use analysis::debounce::Detection;
pub use analysis::scorer::{PracticeSession, PracticeStats};
pub use context::AppContext;
pub use pattern::Pattern;

/// Initialize tracing for binaries and ad-hoc tools
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();
}
