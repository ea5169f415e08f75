use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use tokio::sync::mpsc;

use vital_monitor_rs::countdown::Countdown;
use vital_monitor_rs::error::VitalError;
use vital_monitor_rs::frames::FrameDirSource;
use vital_monitor_rs::respiratory::{self, RespiratoryPhase};
use vital_monitor_rs::sensors::{self, AccelSample, SampleFeed};
use vital_monitor_rs::storage::{HealthRecord, Storage, SymptomRatings};
use vital_monitor_rs::{heart_rate, VitalsAggregator};

#[derive(Parser, Debug)]
#[command(name = "vital_monitor")]
#[command(about = "Respiratory and heart-rate estimation from recorded sensor streams", long_about = None)]
struct Args {
    /// Measurement window in seconds
    #[arg(long, default_value_t = vital_monitor_rs::countdown::MEASUREMENT_SECS)]
    duration: u64,

    /// Accelerometer replay file (JSON lines); synthetic feed if omitted
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Directory holding the finalized recording's decoded frames
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Record store path
    #[arg(long, default_value = "vital_sessions/records.jsonl")]
    output: PathBuf,

    /// Ten symptom ratings 0-5: nausea,headache,diarrhea,sore-throat,
    /// fever,cough,muscle-ache,tired,short-of-breath,smell-taste-loss
    #[arg(long, value_delimiter = ',', num_args = 10)]
    symptoms: Option<Vec<u8>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Vital Monitor starting");
    info!("  Duration: {} seconds", args.duration);
    info!("  Replay: {:?}", args.replay);
    info!("  Frames Dir: {:?}", args.frames_dir);
    info!("  Output: {}", args.output.display());

    let storage = Storage::open(&args.output)?;
    let aggregator = VitalsAggregator::new();

    run_respiratory_phase(&args, &aggregator).await?;
    run_heart_rate_phase(&args, &aggregator).await?;

    // Handoff to symptom entry: the two vitals cross as floats.
    let vitals = aggregator.snapshot()?;
    println!("Heart Rate: {}", vitals.heart_rate);
    println!("Respiratory Rate: {}", vitals.respiratory_rate);

    let levels: [u8; 10] = match args.symptoms {
        Some(v) if v.len() == 10 => {
            let mut levels = [0u8; 10];
            levels.copy_from_slice(&v);
            levels
        }
        Some(v) => {
            warn!("Expected 10 symptom ratings, got {}; recording zeros", v.len());
            [0; 10]
        }
        None => [0; 10],
    };
    let record = HealthRecord::new(vitals, SymptomRatings::from_levels(levels));

    // Insert off the interactive sequence, then return to the entry flow.
    tokio::task::spawn_blocking(move || storage.insert(&record)).await??;
    println!("Heart and Respiratory Rate saved!");

    Ok(())
}

/// Phase 1: sample the accelerometer over a bounded channel for the full
/// countdown, estimating one rate per completed window. Closing the
/// receiver at expiry is the listener unsubscribe.
async fn run_respiratory_phase(args: &Args, aggregator: &VitalsAggregator) -> Result<()> {
    let feed = match &args.replay {
        Some(path) => SampleFeed::from_replay_path(path),
        None => SampleFeed::Synthetic,
    };

    let (tx, mut rx) = mpsc::channel::<AccelSample>(500);
    let sampler = tokio::spawn(sensors::accel_loop(tx, feed));

    let countdown = Countdown::new(args.duration);
    let mut phase = RespiratoryPhase::new();

    let (average, _) = tokio::join!(
        respiratory::collect_for(&mut phase, &mut rx, countdown.duration()),
        countdown.run(
            |remaining| info!("Respiratory measurement: {remaining}s remaining"),
            || info!("Respiratory measurement window elapsed"),
        ),
    );

    // Receiver was closed by collect_for; the sampler observes the closed
    // channel and exits.
    let _ = sampler.await;

    match average {
        Ok(rate) => {
            info!(
                "Respiratory rate: {} breaths/min over {} windows",
                rate,
                phase.window_rates().len()
            );
            aggregator.set_respiratory_rate(rate)?;
        }
        Err(VitalError::MeasurementIncomplete) => {
            warn!("No motion windows completed; respiratory rate carried forward as 0");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Phase 2: analyze the finalized recording off-thread. Every failure mode
/// here is recovered; the session continues with heart rate 0.
async fn run_heart_rate_phase(args: &Args, aggregator: &VitalsAggregator) -> Result<()> {
    let Some(dir) = &args.frames_dir else {
        warn!("No recording provided, skipping heart-rate measurement");
        return Ok(());
    };

    match FrameDirSource::open(dir) {
        Ok(source) => {
            let rate = heart_rate::analyze(source).await;
            aggregator.set_heart_rate(rate)?;
        }
        Err(e) => {
            error!("Recording unavailable ({e}); heart rate carried forward as 0");
        }
    }
    Ok(())
}
