//! `lumacore-diag`: a small CLI harness for running `AudioCore` against a
//! WAV fixture or a synthetic pattern and printing a telemetry summary.
//!
//! This is a diagnostics/development surface only -- it is not part of the
//! realtime core. The commands that need synthetic fixtures require the
//! `diagnostics_fixtures` feature; without it they fail fast with a clear
//! error instead of silently doing nothing.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

fn main() -> ExitCode {
    lumacore::init_logging();
    let cli = Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("lumacore-diag error: {err:?}");
            ExitCode::from(1)
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "lumacore-diag", about = "Offline fixture runner and telemetry dump for lumacore")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn execute(self) -> Result<()> {
        match self.command {
            Command::Run(args) => run_command(args),
            Command::Calibrate(args) => calibrate_command(args),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream a fixture through `AudioCore` and print a telemetry summary.
    Run(RunArgs),
    /// Run noise-floor calibration against a quiet fixture and print the
    /// resulting per-band floors.
    Calibrate(CalibrateArgs),
}

#[derive(Args, Debug, Clone)]
struct FixtureArgs {
    /// Path to a mono 16-bit WAV fixture. Mutually exclusive with
    /// `--synthetic`.
    #[arg(long)]
    wav: Option<PathBuf>,
    /// Deterministic synthetic pattern to generate instead of a WAV file.
    /// Requires the `diagnostics_fixtures` feature.
    #[arg(long, value_enum)]
    synthetic: Option<SyntheticPattern>,
    /// Duration of the synthetic pattern, in seconds. Ignored for `--wav`.
    #[arg(long, default_value_t = 5.0)]
    seconds: f32,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum SyntheticPattern {
    Silence,
    SineBurst,
    ClickTrain120,
    HalfTimeTrap,
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    #[command(flatten)]
    fixture: FixtureArgs,
    /// Output format for the telemetry summary.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
struct CalibrateArgs {
    #[command(flatten)]
    fixture: FixtureArgs,
    #[arg(long, default_value_t = 3000.0)]
    duration_ms: f32,
    #[arg(long, default_value_t = 1.2)]
    safety_multiplier: f32,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum OutputFormat {
    Table,
    Json,
}

fn run_command(args: RunArgs) -> Result<()> {
    #[cfg(feature = "diagnostics_fixtures")]
    {
        return run_impl(args);
    }

    #[cfg(not(feature = "diagnostics_fixtures"))]
    {
        let _ = args;
        bail!("lumacore-diag run requires the diagnostics_fixtures feature");
    }
}

fn calibrate_command(args: CalibrateArgs) -> Result<()> {
    #[cfg(feature = "diagnostics_fixtures")]
    {
        return calibrate_impl(args);
    }

    #[cfg(not(feature = "diagnostics_fixtures"))]
    {
        let _ = args;
        bail!("lumacore-diag calibrate requires the diagnostics_fixtures feature");
    }
}

#[cfg(feature = "diagnostics_fixtures")]
fn load_fixture(args: &FixtureArgs) -> Result<Vec<i16>> {
    use anyhow::Context;
    use lumacore::testing::fixtures;

    match (&args.wav, args.synthetic) {
        (Some(path), None) => {
            let mut reader =
                hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
            let spec = reader.spec();
            if spec.sample_rate != 16_000 {
                log::warn!("fixture sample rate is {} Hz, not the canonical 16 kHz", spec.sample_rate);
            }
            let samples: Result<Vec<i16>, _> = reader.samples::<i16>().collect();
            samples.context("reading WAV samples")
        }
        (None, Some(pattern)) => Ok(match pattern {
            SyntheticPattern::Silence => fixtures::silence((args.seconds * 62.5) as usize),
            SyntheticPattern::SineBurst => fixtures::sine_burst(1000.0, args.seconds, 16_000.0, 0.8),
            SyntheticPattern::ClickTrain120 => fixtures::click_train(120.0, 60.0, args.seconds, 16_000.0, 0.9),
            SyntheticPattern::HalfTimeTrap => fixtures::tempo_change_click_train(
                120.0,
                args.seconds / 2.0,
                60.0,
                args.seconds / 2.0,
                60.0,
                16_000.0,
                0.9,
            ),
        }),
        (Some(_), Some(_)) => bail!("pass either --wav or --synthetic, not both"),
        (None, None) => bail!("pass one of --wav or --synthetic"),
    }
}

#[cfg(feature = "diagnostics_fixtures")]
fn build_core(
    samples: Vec<i16>,
) -> (
    lumacore::engine::AudioCore,
    std::sync::Arc<lumacore::snapshot::SnapshotBuffer<lumacore::control_bus::ControlBusFrame>>,
) {
    use std::sync::Arc;

    let source = Box::new(lumacore::audio::SyntheticAudioSource::new(samples, false));
    let tuning = Arc::new(lumacore::tuning::Tuning::new());
    let snapshot = Arc::new(lumacore::snapshot::SnapshotBuffer::new());
    let mut core = lumacore::engine::AudioCore::new(source, tuning, snapshot.clone());
    core.init().expect("synthetic source init is infallible");
    (core, snapshot)
}

#[cfg(feature = "diagnostics_fixtures")]
fn run_impl(args: RunArgs) -> Result<()> {
    let samples = load_fixture(&args.fixture)?;
    let num_hops = samples.len() / lumacore::time::HOP_SIZE;
    let (mut core, snapshot) = build_core(samples);

    for _ in 0..num_hops {
        core.run_hop().ok();
    }

    let frame = snapshot.read();
    let telemetry = core.telemetry().snapshot();

    match args.format {
        OutputFormat::Table => {
            println!("hops processed   : {num_hops}");
            println!("hop_seq          : {}", frame.hop_seq);
            println!("rms / flux       : {:.4} / {:.4}", frame.rms, frame.flux);
            println!("is_silent        : {}", frame.is_silent);
            println!("tempo bpm        : {:.1}", telemetry.tempo.bpm);
            println!("tempo locked     : {}", telemetry.tempo.locked);
            println!("tempo confidence : {:.2}", telemetry.tempo.confidence);
            println!("agc gain         : {:.2}", telemetry.agc_gain);
            println!("spikes corrected : {}", telemetry.spike_detection_stats.spikes_corrected);
        }
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "hops_processed": num_hops,
                "hop_seq": frame.hop_seq,
                "rms": frame.rms,
                "flux": frame.flux,
                "is_silent": frame.is_silent,
                "tempo_bpm": telemetry.tempo.bpm,
                "tempo_locked": telemetry.tempo.locked,
                "tempo_confidence": telemetry.tempo.confidence,
                "agc_gain": telemetry.agc_gain,
                "spikes_corrected": telemetry.spike_detection_stats.spikes_corrected,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

#[cfg(feature = "diagnostics_fixtures")]
fn calibrate_impl(args: CalibrateArgs) -> Result<()> {
    use anyhow::Context;

    let samples = load_fixture(&args.fixture)?;
    let num_hops = samples.len() / lumacore::time::HOP_SIZE;
    let (mut core, _snapshot) = build_core(samples);

    core.start_calibration(args.duration_ms, args.safety_multiplier)
        .context("starting calibration")?;
    for _ in 0..num_hops {
        core.run_hop().ok();
    }

    match core.calibration_state() {
        lumacore::calibration::CalibrationState::Complete => {
            println!("calibration complete after {num_hops} hops");
        }
        other => bail!("calibration did not complete (state={other:?}); feed a longer/quieter fixture"),
    }
    Ok(())
}
