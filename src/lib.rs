//! Vital-signs estimation core.
//!
//! Two independent sampler → buffer → estimator pipelines: respiratory rate
//! from windows of accelerometer magnitudes, heart rate from the ROI
//! intensity of sampled video frames. Results land in a per-session
//! aggregator and are persisted together with a symptom checklist.

pub mod countdown;
pub mod error;
pub mod frames;
pub mod heart_rate;
pub mod respiratory;
pub mod sensors;
pub mod session;
pub mod storage;

pub use error::{VitalError, VitalResult};
pub use session::{VitalSigns, VitalsAggregator};
