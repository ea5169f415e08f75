use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tokio::sync::mpsc::Sender;
use tokio::time::{interval, Duration};

/// Accelerometer sample from the device sensor feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub timestamp: f64,
}

impl AccelSample {
    pub fn new(x: f64, y: f64, z: f64, timestamp: f64) -> Self {
        Self { x, y, z, timestamp }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Where the sampler task draws its readings from.
///
/// The live device feed is an external collaborator; a recorded session can
/// be replayed from a JSON-lines file, and without one the loop synthesizes
/// a breathing waveform so the pipeline stays exercisable.
pub enum SampleFeed {
    Replay(Vec<AccelSample>),
    Synthetic,
}

impl SampleFeed {
    /// Load a replay file (one JSON sample per line). Falls back to the
    /// synthetic feed when the file is missing or unreadable.
    pub fn from_replay_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let samples: Vec<AccelSample> = contents
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .filter_map(|line| serde_json::from_str(line).ok())
                    .collect();
                if samples.is_empty() {
                    warn!("Replay file {} contained no samples, using synthetic feed", path.display());
                    SampleFeed::Synthetic
                } else {
                    info!("Loaded {} replay samples from {}", samples.len(), path.display());
                    SampleFeed::Replay(samples)
                }
            }
            Err(e) => {
                warn!("No accelerometer feed at {} ({}), using synthetic feed", path.display(), e);
                SampleFeed::Synthetic
            }
        }
    }
}

/// Sampler task: delivers accelerometer readings into a bounded channel at
/// ~50 Hz until the receiver is dropped. Samples are dropped when the
/// channel is full rather than blocking the tick.
pub async fn accel_loop(tx: Sender<AccelSample>, feed: SampleFeed) {
    let mut ticker = interval(Duration::from_millis(20)); // ~50Hz sampling
    let mut sample_count = 0u64;

    let replay = match feed {
        SampleFeed::Replay(samples) => Some(samples),
        SampleFeed::Synthetic => None,
    };

    loop {
        ticker.tick().await;

        let sample = match &replay {
            Some(samples) => samples[sample_count as usize % samples.len()].clone(),
            None => synthetic_sample(sample_count),
        };

        match tx.try_send(sample) {
            Ok(_) => {
                sample_count += 1;
                if sample_count % 100 == 0 {
                    log::debug!("[accel] {} samples", sample_count);
                }
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                info!("[accel] Channel closed after {} samples", sample_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                // Channel full, drop this sample
            }
        }
    }
}

/// Gravity plus a slow chest-motion oscillation, one breath every ~4 s at
/// the 50 Hz tick.
fn synthetic_sample(seq: u64) -> AccelSample {
    use std::f64::consts::PI;
    let t = seq as f64 * 0.02;

    AccelSample {
        x: (t * 2.0 * PI * 0.25).sin() * 0.3,
        y: (t * 2.0 * PI * 0.25).cos() * 0.2,
        z: 9.81 + (t * 2.0 * PI * 0.25).sin() * 0.4,
        timestamp: current_timestamp(),
    }
}

pub fn current_timestamp() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
