//! Synthetic drum-hit signal generators
//!
//! Deterministic stand-ins for real percussion, shaped to land where the
//! heuristic rules expect them: kicks are decaying low sine tones, snares
//! mix a body tone with band-limited noise, hats are high-passed noise
//! bursts with short (closed) or long (open) decay envelopes. Noise is
//! drawn from a fixed-seed RNG so every run renders byte-identical audio.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::pattern::{samples_per_step, Pattern};

/// Fixed seeds per voice so fixtures never change between runs
const SNARE_SEED: u64 = 0x5EED_0001;
const CLOSED_HAT_SEED: u64 = 0x5EED_0002;
const OPEN_HAT_SEED: u64 = 0x5EED_0003;

fn decay_envelope(i: usize, sample_rate: u32, tau_ms: f32) -> f32 {
    let tau_samples = tau_ms / 1000.0 * sample_rate as f32;
    (-(i as f32) / tau_samples).exp()
}

/// High-passed white noise: first difference of uniform noise
fn high_passed_noise(rng: &mut StdRng, length: usize) -> Vec<f32> {
    let mut previous: f32 = rng.gen_range(-1.0..1.0);
    (0..length)
        .map(|_| {
            let current: f32 = rng.gen_range(-1.0..1.0);
            let sample = (current - previous) / 2.0;
            previous = current;
            sample
        })
        .collect()
}

/// Low-passed white noise: 4-tap moving average of uniform noise
fn low_passed_noise(rng: &mut StdRng, length: usize) -> Vec<f32> {
    let mut taps = [0.0_f32; 4];
    (0..length)
        .map(|_| {
            taps.rotate_right(1);
            taps[0] = rng.gen_range(-1.0..1.0);
            taps.iter().sum::<f32>() / 4.0
        })
        .collect()
}

/// Kick: 60 Hz sine thump with a fast decay
pub fn kick(sample_rate: u32) -> Vec<f32> {
    let length = (sample_rate as usize * 80) / 1000;
    (0..length)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let tone = (2.0 * std::f32::consts::PI * 60.0 * t).sin();
            0.8 * tone * decay_envelope(i, sample_rate, 25.0)
        })
        .collect()
}

/// Snare: 200 Hz body tone plus band-limited noise rattle
pub fn snare(sample_rate: u32) -> Vec<f32> {
    let length = (sample_rate as usize * 100) / 1000;
    let mut rng = StdRng::seed_from_u64(SNARE_SEED);
    let rattle = low_passed_noise(&mut rng, length);

    (0..length)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let body = 0.9 * (2.0 * std::f32::consts::PI * 200.0 * t).sin();
            let noise = 0.25 * rattle[i];
            (body + noise) * decay_envelope(i, sample_rate, 40.0)
        })
        .collect()
}

/// Closed hat: short high-passed noise burst
pub fn closed_hat(sample_rate: u32) -> Vec<f32> {
    let length = (sample_rate as usize * 40) / 1000;
    let mut rng = StdRng::seed_from_u64(CLOSED_HAT_SEED);
    let noise = high_passed_noise(&mut rng, length);

    noise
        .iter()
        .enumerate()
        .map(|(i, &sample)| 0.7 * sample * decay_envelope(i, sample_rate, 8.0))
        .collect()
}

/// Open hat: the same shimmer with a much longer ring
pub fn open_hat(sample_rate: u32) -> Vec<f32> {
    let length = (sample_rate as usize * 250) / 1000;
    let mut rng = StdRng::seed_from_u64(OPEN_HAT_SEED);
    let noise = high_passed_noise(&mut rng, length);

    noise
        .iter()
        .enumerate()
        .map(|(i, &sample)| 0.6 * sample * decay_envelope(i, sample_rate, 55.0))
        .collect()
}

/// The generator for a pattern instrument name, if one exists
pub fn voice_for(instrument: &str, sample_rate: u32) -> Option<Vec<f32>> {
    match instrument {
        "kick" => Some(kick(sample_rate)),
        "snare" => Some(snare(sample_rate)),
        "hihat" => Some(closed_hat(sample_rate)),
        "openhat" => Some(open_hat(sample_rate)),
        _ => None,
    }
}

/// Mix a hit into a buffer at the given sample position
///
/// Samples past the end of the buffer are discarded; the mix is clamped to
/// [-1, 1] so stacked hits cannot clip into garbage.
pub fn place_hit(buffer: &mut [f32], hit: &[f32], at: usize) {
    for (i, &sample) in hit.iter().enumerate() {
        if let Some(slot) = buffer.get_mut(at + i) {
            *slot = (*slot + sample).clamp(-1.0, 1.0);
        }
    }
}

/// Render a pattern into a sample buffer at the given tempo
///
/// Each active step of each known instrument places one hit at its nominal
/// step time; instruments without a synthetic voice are skipped. The buffer
/// spans `repetitions` full passes of the pattern plus one trailing step so
/// the last hit can ring out.
pub fn render_pattern(
    pattern: &Pattern,
    bpm: u32,
    sample_rate: u32,
    repetitions: usize,
) -> Vec<f32> {
    let step_samples = samples_per_step(bpm, sample_rate) as usize;
    let total_steps = pattern.length() * repetitions.max(1) + 1;
    let mut buffer = vec![0.0_f32; total_steps * step_samples];

    let instruments: Vec<String> = pattern.instruments().map(str::to_string).collect();
    for instrument in instruments {
        let Some(voice) = voice_for(&instrument, sample_rate) else {
            continue;
        };
        let Some(row) = pattern.row(&instrument) else {
            continue;
        };
        let row = row.to_vec();

        for repetition in 0..repetitions.max(1) {
            for (step, &active) in row.iter().enumerate() {
                if active {
                    let at = (repetition * pattern.length() + step) * step_samples;
                    place_hit(&mut buffer, &voice, at);
                }
            }
        }
    }

    buffer
}
