use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use drum_trainer::analysis::Pipeline;
use drum_trainer::config::AppConfig;
use drum_trainer::testing::signals;
use drum_trainer::{AppContext, Detection, Pattern, PracticeSession, PracticeStats};

#[derive(Parser, Debug)]
#[command(name = "drum_cli", about = "Offline and live harness for the drum trainer pipeline")]
struct Cli {
    /// Path to a JSON config file (defaults to drum_trainer.json if present)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the detection pipeline over a WAV file and print detections
    Classify {
        /// Input WAV file (mono or first channel of multi-channel)
        wav: PathBuf,
        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Score a WAV file against a target pattern
    Score {
        wav: PathBuf,
        /// Target pattern as JSON: {"length": N, "rows": {"kick": [...]}}
        #[arg(long)]
        pattern: PathBuf,
        #[arg(long, default_value_t = 120)]
        bpm: u32,
    },
    /// Render a demo pattern with the synthetic drum voices to a WAV file
    Synth {
        /// Output WAV path
        #[arg(long)]
        out: PathBuf,
        /// Pattern JSON; a built-in rock beat if omitted
        #[arg(long)]
        pattern: Option<PathBuf>,
        #[arg(long, default_value_t = 120)]
        bpm: u32,
        #[arg(long, default_value_t = 2)]
        repetitions: usize,
    },
    /// Listen on the default microphone and print detections
    Listen {
        /// How long to listen, in seconds
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
}

fn main() -> ExitCode {
    drum_trainer::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load_from_file("drum_trainer.json"),
    };

    match cli.command {
        Commands::Classify { wav, output } => run_classify(&config, &wav, output),
        Commands::Score { wav, pattern, bpm } => run_score(&config, &wav, &pattern, bpm),
        Commands::Synth {
            out,
            pattern,
            bpm,
            repetitions,
        } => run_synth(&out, pattern.as_deref(), bpm, repetitions),
        Commands::Listen { seconds } => run_listen(config, seconds),
    }
}

/// Load a WAV file as mono f32 samples
fn load_wav(path: &std::path::Path) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .step_by(channels)
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .step_by(channels)
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    if samples.is_empty() {
        bail!("{} contains no samples", path.display());
    }
    Ok((samples, spec.sample_rate))
}

fn load_pattern(path: &std::path::Path) -> Result<Pattern> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

fn run_classify(
    config: &AppConfig,
    wav: &std::path::Path,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let (samples, sample_rate) = load_wav(wav)?;
    let mut pipeline = Pipeline::from_config(sample_rate, config)
        .context("initializing classifier strategy")?;

    let detections = pipeline.process_buffer(&samples);

    let report = ClassifyReport {
        file: wav.display().to_string(),
        sample_rate,
        strategy: pipeline.strategy_name(),
        detection_count: detections.len(),
        detections: &detections,
    };
    let json = serde_json::to_string_pretty(&report)?;

    if let Some(path) = output {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }
    Ok(ExitCode::from(0))
}

fn run_score(
    config: &AppConfig,
    wav: &std::path::Path,
    pattern_path: &std::path::Path,
    bpm: u32,
) -> Result<ExitCode> {
    let (samples, sample_rate) = load_wav(wav)?;
    let target = load_pattern(pattern_path)?;

    let mut pipeline = Pipeline::from_config(sample_rate, config)
        .context("initializing classifier strategy")?;
    let detections = pipeline.process_buffer(&samples);

    let mut session =
        PracticeSession::new(target, bpm, config.practice.tolerance_ms, 0);
    session.record_all(&detections);
    let stats = session.score();

    println!("{}", serde_json::to_string_pretty(&ScoreReport {
        file: wav.display().to_string(),
        bpm,
        detection_count: detections.len(),
        stats,
    })?);
    Ok(ExitCode::from(0))
}

/// Kick/snare/hat loop used when no pattern file is given
fn demo_pattern() -> Pattern {
    let mut pattern = Pattern::new(8);
    pattern
        .set_row(
            "kick",
            vec![true, false, false, false, true, false, false, false],
        )
        .expect("demo rows match length");
    pattern
        .set_row(
            "snare",
            vec![false, false, true, false, false, false, true, false],
        )
        .expect("demo rows match length");
    pattern
        .set_row(
            "hihat",
            vec![true, true, true, true, true, true, true, false],
        )
        .expect("demo rows match length");
    pattern
        .set_row(
            "openhat",
            vec![false, false, false, false, false, false, false, true],
        )
        .expect("demo rows match length");
    pattern
}

fn run_synth(
    out: &std::path::Path,
    pattern_path: Option<&std::path::Path>,
    bpm: u32,
    repetitions: usize,
) -> Result<ExitCode> {
    let pattern = match pattern_path {
        Some(path) => load_pattern(path)?,
        None => demo_pattern(),
    };

    const SAMPLE_RATE: u32 = 48000;
    let rendered = signals::render_pattern(&pattern, bpm, SAMPLE_RATE, repetitions);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(out, spec)
        .with_context(|| format!("creating {}", out.display()))?;
    for sample in &rendered {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;

    println!(
        "Wrote {} samples ({:.1}s at {} BPM) to {}",
        rendered.len(),
        rendered.len() as f32 / SAMPLE_RATE as f32,
        bpm,
        out.display()
    );
    Ok(ExitCode::from(0))
}

fn run_listen(config: AppConfig, seconds: u64) -> Result<ExitCode> {
    let context = AppContext::new(config);
    context
        .start_listening()
        .map_err(|err| anyhow::anyhow!("{}", err))?;

    let mut detections = context.subscribe_detections();
    println!("Listening for {seconds}s... hit some drums.");

    let deadline = Instant::now() + Duration::from_secs(seconds);
    while Instant::now() < deadline {
        match detections.try_recv() {
            Ok(detection) => {
                println!("{}", serde_json::to_string(&detection)?);
            }
            Err(tokio::sync::broadcast::error::TryRecvError::Empty) => {
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(tokio::sync::broadcast::error::TryRecvError::Lagged(skipped)) => {
                eprintln!("(dropped {skipped} detections, printing resumed)");
            }
            Err(tokio::sync::broadcast::error::TryRecvError::Closed) => break,
        }
    }

    context
        .stop_listening()
        .map_err(|err| anyhow::anyhow!("{}", err))?;

    let beats = context.detected_beats();
    println!("Captured {} beats; level back at {}", beats.len(), context.audio_level());
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct ClassifyReport<'a> {
    file: String,
    sample_rate: u32,
    strategy: &'a str,
    detection_count: usize,
    detections: &'a [Detection],
}

#[derive(Serialize)]
struct ScoreReport {
    file: String,
    bpm: u32,
    detection_count: usize,
    stats: PracticeStats,
}
