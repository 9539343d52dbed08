// Tests for the heuristic classifier strategy
//
// Feature vectors here are hand-built to match the acoustic profiles the
// rules target; the integration tests exercise the same rules against
// synthesized audio.

use super::*;
use crate::analysis::classifier::DrumHit;
use crate::analysis::features::{FeatureVector, BAND_COUNT};

fn features(
    band_energy: [f32; BAND_COUNT],
    centroid: f32,
    zcr: f32,
    rms: f32,
    decay_time_ms: f32,
) -> FeatureVector {
    FeatureVector {
        band_energy,
        centroid,
        rolloff: centroid * 2.0,
        zcr,
        rms,
        decay_time_ms,
        cepstra: vec![0.0; 13],
    }
}

#[test]
fn test_silence_yields_no_class() {
    let classifier = HeuristicClassifier::default();
    let silent = features([0.0; BAND_COUNT], 0.0, 0.0, 0.0, 0.0);

    let result = classifier.classify_features(&silent);
    assert_eq!(result.label, None, "Silence must never classify");
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn test_quiet_noise_below_floor_yields_no_class() {
    let classifier = HeuristicClassifier::default();
    // Features shaped like a hat, but at room-noise level
    let quiet = features([0.01, 0.01, 0.02, 0.2], 8000.0, 0.4, 0.005, 40.0);

    let result = classifier.classify_features(&quiet);
    assert_eq!(result.label, None, "Sub-floor RMS must not classify");
}

#[test]
fn test_kick_profile() {
    let classifier = HeuristicClassifier::default();
    // Strong sub band, tonal, dark
    let kick = features([0.8, 0.15, 0.04, 0.01], 120.0, 0.03, 0.3, 60.0);

    let result = classifier.classify_features(&kick);
    assert_eq!(result.label, Some(DrumHit::Kick));
    assert!(
        result.confidence > 0.3,
        "Kick confidence too low: {}",
        result.confidence
    );
}

#[test]
fn test_snare_profile() {
    let classifier = HeuristicClassifier::default();
    // Body + presence bands carry the energy, mid centroid
    let snare = features([0.1, 0.45, 0.35, 0.1], 1500.0, 0.12, 0.25, 80.0);

    let result = classifier.classify_features(&snare);
    assert_eq!(result.label, Some(DrumHit::Snare));
}

#[test]
fn test_closed_hat_profile() {
    let classifier = HeuristicClassifier::default();
    // Shimmer band dominant, noisy, very short decay
    let hat = features([0.02, 0.05, 0.18, 0.75], 9000.0, 0.45, 0.15, 15.0);

    let result = classifier.classify_features(&hat);
    assert_eq!(result.label, Some(DrumHit::HiHat));
}

#[test]
fn test_open_hat_profile() {
    let classifier = HeuristicClassifier::default();
    // Same spectrum as a closed hat but with a long sustain
    let open = features([0.02, 0.05, 0.18, 0.75], 9000.0, 0.45, 0.15, 250.0);

    let result = classifier.classify_features(&open);
    assert_eq!(result.label, Some(DrumHit::OpenHat));
}

#[test]
fn test_decay_splits_hats() {
    let config = HeuristicConfig::default();
    let classifier = HeuristicClassifier::new(config.clone());
    let band_energy = [0.02, 0.05, 0.18, 0.75];

    let short = features(band_energy, 9000.0, 0.45, 0.15, config.open_hat_decay_ms * 0.3);
    let long = features(band_energy, 9000.0, 0.45, 0.15, config.open_hat_decay_ms * 2.0);

    assert_eq!(classifier.classify_features(&short).label, Some(DrumHit::HiHat));
    assert_eq!(classifier.classify_features(&long).label, Some(DrumHit::OpenHat));
}

#[test]
fn test_ranked_list_covers_all_classes() {
    let classifier = HeuristicClassifier::default();
    let kick = features([0.8, 0.15, 0.04, 0.01], 120.0, 0.03, 0.3, 60.0);

    let result = classifier.classify_features(&kick);
    assert_eq!(result.ranked.len(), 4, "Ranked list covers every class");
    assert_eq!(result.ranked[0].0, DrumHit::Kick);
    // Ranked list is sorted best-first
    for window in result.ranked.windows(2) {
        assert!(window[0].1 >= window[1].1);
    }
}

#[test]
fn test_confidence_is_normalized() {
    let classifier = HeuristicClassifier::default();
    let inputs = [
        features([0.8, 0.15, 0.04, 0.01], 120.0, 0.03, 0.3, 60.0),
        features([0.1, 0.45, 0.35, 0.1], 1500.0, 0.12, 0.25, 80.0),
        features([0.02, 0.05, 0.18, 0.75], 9000.0, 0.45, 0.15, 30.0),
    ];

    for input in &inputs {
        let result = classifier.classify_features(input);
        assert!(
            (0.0..=1.0).contains(&result.confidence),
            "Confidence {} out of range",
            result.confidence
        );
    }
}

#[test]
fn test_thresholds_are_tunable() {
    // A tighter RMS floor turns a previously classified hit into silence
    let loose = HeuristicClassifier::new(HeuristicConfig {
        rms_floor: 0.01,
        ..HeuristicConfig::default()
    });
    let strict = HeuristicClassifier::new(HeuristicConfig {
        rms_floor: 0.5,
        ..HeuristicConfig::default()
    });

    let kick = features([0.8, 0.15, 0.04, 0.01], 120.0, 0.03, 0.3, 60.0);
    assert!(loose.classify_features(&kick).label.is_some());
    assert!(strict.classify_features(&kick).label.is_none());
}

#[test]
fn test_strategy_trait_surface() {
    let classifier = HeuristicClassifier::default();
    let kick = features([0.8, 0.15, 0.04, 0.01], 120.0, 0.03, 0.3, 60.0);
    let samples = vec![0.0_f32; 2048];

    let input = ClassifierInput {
        samples: &samples,
        sample_rate: 48000,
        features: &kick,
    };

    let result = classifier.classify(input).expect("heuristic never errors");
    assert_eq!(result.label, Some(DrumHit::Kick));
    assert!(classifier.is_ready());
    assert_eq!(classifier.name(), "heuristic");
}
