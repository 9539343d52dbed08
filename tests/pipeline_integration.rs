// End-to-end pipeline tests over synthesized audio
//
// Renders patterns with the synthetic drum voices, runs the full offline
// pipeline (extract -> classify -> debounce), aligns the detections back
// onto the step grid, and scores them against the pattern that produced
// the audio.

use drum_trainer::analysis::aligner::StepAligner;
use drum_trainer::analysis::Pipeline;
use drum_trainer::config::{AppConfig, DebounceConfig};
use drum_trainer::pattern::step_duration_ms;
use drum_trainer::testing::signals;
use drum_trainer::{DrumHit, Pattern, PracticeSession};

const SAMPLE_RATE: u32 = 48000;
const BPM: u32 = 120;

/// Pipeline tuned for clean synthetic fixtures: the confidence cutoff is
/// configuration, and these tests exercise the pipeline rather than any
/// particular threshold value.
fn fixture_config() -> AppConfig {
    AppConfig {
        debounce: DebounceConfig {
            min_confidence: 0.3,
            ..DebounceConfig::default()
        },
        ..AppConfig::default()
    }
}

fn kick_and_hat_pattern() -> Pattern {
    let mut pattern = Pattern::new(4);
    pattern
        .set_row("kick", vec![true, false, false, false])
        .unwrap();
    pattern
        .set_row("hihat", vec![false, false, true, false])
        .unwrap();
    pattern
}

#[test]
fn silence_produces_no_detections_end_to_end() {
    let mut pipeline = Pipeline::from_config(SAMPLE_RATE, &fixture_config()).unwrap();
    let silence = vec![0.0_f32; SAMPLE_RATE as usize * 2];
    let detections = pipeline.process_buffer(&silence);
    assert!(detections.is_empty(), "Two seconds of silence must stay silent");
}

#[test]
fn rendered_pattern_is_detected_and_labeled() {
    let pattern = kick_and_hat_pattern();
    let audio = signals::render_pattern(&pattern, BPM, SAMPLE_RATE, 2);

    let mut pipeline = Pipeline::from_config(SAMPLE_RATE, &fixture_config()).unwrap();
    let detections = pipeline.process_buffer(&audio);

    // 2 repetitions x (1 kick + 1 hat)
    assert_eq!(
        detections.len(),
        4,
        "Each rendered hit should produce exactly one Detection: {:?}",
        detections
    );

    let kicks = detections.iter().filter(|d| d.hit == DrumHit::Kick).count();
    let hats = detections.iter().filter(|d| d.hit == DrumHit::HiHat).count();
    assert_eq!(kicks, 2, "Both kicks detected: {:?}", detections);
    assert_eq!(hats, 2, "Both hats detected: {:?}", detections);

    // Detections are ordered and debounced
    for window in detections.windows(2) {
        assert!(window[0].timestamp_ms < window[1].timestamp_ms);
    }
}

#[test]
fn detections_align_back_to_their_steps() {
    let pattern = kick_and_hat_pattern();
    let audio = signals::render_pattern(&pattern, BPM, SAMPLE_RATE, 2);

    let mut pipeline = Pipeline::from_config(SAMPLE_RATE, &fixture_config()).unwrap();
    let detections = pipeline.process_buffer(&audio);

    let aligner = StepAligner::new(0, step_duration_ms(BPM), pattern.length());
    for detection in &detections {
        let aligned = aligner.align(detection.timestamp_ms);
        let expected_step = match detection.hit {
            DrumHit::Kick => 0,
            DrumHit::HiHat => 2,
            other => panic!("Unexpected class {:?}", other),
        };
        assert_eq!(
            aligned.step, expected_step,
            "{:?} at {}ms aligned to step {}",
            detection.hit, detection.timestamp_ms, aligned.step
        );
        // One hop of detection latency at most
        assert!(
            aligned.offset_ms.abs() <= 100.0,
            "Offset {}ms exceeds a hop",
            aligned.offset_ms
        );
    }
}

#[test]
fn detected_pattern_export_matches_target() {
    let pattern = kick_and_hat_pattern();
    let audio = signals::render_pattern(&pattern, BPM, SAMPLE_RATE, 2);

    let mut pipeline = Pipeline::from_config(SAMPLE_RATE, &fixture_config()).unwrap();
    let detections = pipeline.process_buffer(&audio);

    let aligner = StepAligner::new(0, step_duration_ms(BPM), pattern.length());
    let detected = aligner.fold_detections(&detections);

    assert_eq!(detected.row("kick"), pattern.row("kick"));
    assert_eq!(detected.row("hihat"), pattern.row("hihat"));
    assert_eq!(detected.row("snare"), Some(&[false; 4][..]));
}

#[test]
fn practice_session_scores_the_rendered_performance() {
    let pattern = kick_and_hat_pattern();
    let audio = signals::render_pattern(&pattern, BPM, SAMPLE_RATE, 2);

    let mut pipeline = Pipeline::from_config(SAMPLE_RATE, &fixture_config()).unwrap();
    let detections = pipeline.process_buffer(&audio);

    let mut session = PracticeSession::new(pattern, BPM, 100.0, 0);
    session.record_all(&detections);
    let stats = session.score();

    assert_eq!(stats.total_expected_beats, 2, "2 active steps per repetition pass");
    // 4 detections land on the 2 active steps across 2 repetitions
    assert_eq!(stats.correct_beats, 4);
    assert_eq!(
        stats.timing.on_time, 4,
        "Machine-rendered hits are on time within 100ms: {:?}",
        stats.timing
    );
    assert!(stats.accuracy_pct.is_finite());
}

#[test]
fn scoring_an_empty_target_with_noise_input_stays_defined() {
    let mut empty = Pattern::new(8);
    empty.set_row("kick", vec![false; 8]).unwrap();

    let mut audio = vec![0.0_f32; SAMPLE_RATE as usize];
    signals::place_hit(&mut audio, &signals::kick(SAMPLE_RATE), 4800);

    let mut pipeline = Pipeline::from_config(SAMPLE_RATE, &fixture_config()).unwrap();
    let detections = pipeline.process_buffer(&audio);

    let mut session = PracticeSession::new(empty, BPM, 100.0, 0);
    session.record_all(&detections);
    let stats = session.score();

    assert_eq!(stats.total_expected_beats, 0);
    assert_eq!(stats.accuracy_pct, 0.0, "Defined as 0, never NaN");
    assert_eq!(stats.correct_beats, 0, "Detections off an empty target are false positives");
}

#[test]
fn mistimed_performance_loses_accuracy() {
    let mut target = Pattern::new(4);
    target
        .set_row("kick", vec![true, false, true, false])
        .unwrap();

    // Performance hits only step 0, missing step 2 entirely
    let mut performed = Pattern::new(4);
    performed
        .set_row("kick", vec![true, false, false, false])
        .unwrap();

    let audio = signals::render_pattern(&performed, BPM, SAMPLE_RATE, 2);
    let mut pipeline = Pipeline::from_config(SAMPLE_RATE, &fixture_config()).unwrap();
    let detections = pipeline.process_buffer(&audio);

    let mut session = PracticeSession::new(target, BPM, 100.0, 0);
    session.record_all(&detections);
    let stats = session.score();

    assert_eq!(stats.total_expected_beats, 2);
    assert_eq!(stats.correct_beats, 2, "Step-0 kicks count once per repetition");
    assert!(
        (stats.accuracy_pct - 100.0).abs() < 1e-6,
        "Both landed hits were correct"
    );

    // The detected-pattern export shows the hole at step 2
    let aligner = StepAligner::new(0, step_duration_ms(BPM), 4);
    let detected = aligner.fold_detections(&detections);
    assert_eq!(detected.row("kick"), Some(&[true, false, false, false][..]));
}

#[test]
fn burst_of_hits_is_debounced_per_class() {
    // Four kicks 30ms apart: one physical flam-like burst, the global gate
    // and class cooldown must collapse it
    let mut audio = vec![0.0_f32; SAMPLE_RATE as usize];
    let kick = signals::kick(SAMPLE_RATE);
    for i in 0..4 {
        signals::place_hit(&mut audio, &kick, 9600 + i * 1440);
    }

    let mut pipeline = Pipeline::from_config(SAMPLE_RATE, &fixture_config()).unwrap();
    let detections = pipeline.process_buffer(&audio);

    assert_eq!(
        detections.len(),
        1,
        "A 90ms burst must collapse to one Detection: {:?}",
        detections
    );
    assert_eq!(detections[0].hit, DrumHit::Kick);
}
