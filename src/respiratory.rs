use crate::error::{VitalError, VitalResult};
use crate::sensors::AccelSample;
use log::{debug, info};
use tokio::sync::mpsc::Receiver;
use tokio::time::{timeout_at, Duration, Instant};

/// Samples collected before a window estimate is produced.
pub const WINDOW_CAPACITY: usize = 50;

/// Samples skipped at the start of every window. Together with the seed
/// below this is an ad hoc warm-up heuristic; no documented derivation.
pub const WARMUP_SKIP: usize = 11;

/// Magnitude the detector is seeded with, not a real sample.
pub const MAGNITUDE_SEED: f64 = 10.0;

/// Sample-to-sample magnitude jump that counts as one peak.
pub const PEAK_THRESHOLD: f64 = 0.15;

/// Peaks are extrapolated from this many samples per window...
pub const WINDOW_SAMPLE_BASE: f64 = 45.0;

/// ...onto this time base to yield breaths/min.
pub const RATE_TIME_BASE: f64 = 30.0;

/// One window's worth of accelerometer samples. Cleared immediately after
/// producing a rate estimate; never straddles two computations.
#[derive(Debug, Default)]
pub struct MotionWindow {
    samples: Vec<AccelSample>,
}

impl MotionWindow {
    pub fn new() -> Self {
        MotionWindow {
            samples: Vec::with_capacity(WINDOW_CAPACITY),
        }
    }

    pub fn push(&mut self, sample: AccelSample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= WINDOW_CAPACITY
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn samples(&self) -> &[AccelSample] {
        &self.samples
    }
}

/// Count threshold-crossing magnitude jumps in one window and extrapolate
/// to breaths/min. Windows shorter than `WARMUP_SKIP + 1` samples never
/// enter the loop and yield rate 0.
pub fn window_rate(window: &MotionWindow) -> i32 {
    let mut previous_magnitude = MAGNITUDE_SEED;
    let mut peak_count = 0u32;

    for sample in window.samples().iter().skip(WARMUP_SKIP) {
        let current_magnitude = sample.magnitude();
        if (previous_magnitude - current_magnitude).abs() > PEAK_THRESHOLD {
            peak_count += 1;
        }
        previous_magnitude = current_magnitude;
    }

    ((peak_count as f64 / WINDOW_SAMPLE_BASE) * RATE_TIME_BASE).round() as i32
}

/// Truncating mean of the per-window rates collected in one session.
/// An empty series means the measurement never completed a window; that is
/// surfaced as an error rather than a fabricated rate.
pub fn average_rate(rates: &[i32]) -> VitalResult<i32> {
    if rates.is_empty() {
        return Err(VitalError::MeasurementIncomplete);
    }
    let sum: i64 = rates.iter().map(|&r| r as i64).sum();
    Ok((sum as f64 / rates.len() as f64) as i32)
}

/// Respiratory phase states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    /// Not measuring
    Idle,
    /// Accumulating samples into the current window
    Collecting,
    /// Producing a window estimate (transient, within one call)
    Computing,
}

/// State machine for one respiratory measurement session.
///
/// Samples arrive over a bounded channel instead of a sensor callback; the
/// window is mutated and read only inside the same synchronous call.
pub struct RespiratoryPhase {
    state: PhaseState,
    window: MotionWindow,
    rates: Vec<i32>,
}

impl RespiratoryPhase {
    pub fn new() -> Self {
        RespiratoryPhase {
            state: PhaseState::Idle,
            window: MotionWindow::new(),
            rates: Vec::new(),
        }
    }

    pub fn state(&self) -> PhaseState {
        self.state
    }

    pub fn window_rates(&self) -> &[i32] {
        &self.rates
    }

    /// Idle → Collecting
    pub fn begin(&mut self) -> VitalResult<()> {
        match self.state {
            PhaseState::Idle => {
                self.state = PhaseState::Collecting;
                Ok(())
            }
            _ => Err(VitalError::InvalidState(
                "Measurement already in progress".to_string(),
            )),
        }
    }

    /// Feed one sample. When the window fills, transitions through
    /// Computing, records the estimate, clears the window and returns to
    /// Collecting. Returns the estimate for completed windows.
    pub fn on_sample(&mut self, sample: AccelSample) -> VitalResult<Option<i32>> {
        if self.state != PhaseState::Collecting {
            return Err(VitalError::InvalidState("Not collecting".to_string()));
        }

        self.window.push(sample);
        if !self.window.is_full() {
            return Ok(None);
        }

        self.state = PhaseState::Computing;
        let rate = window_rate(&self.window);
        self.rates.push(rate);
        self.window.clear();
        self.state = PhaseState::Collecting;
        Ok(Some(rate))
    }

    /// Countdown expiry: back to Idle, partial window discarded, session
    /// rate is the truncating mean of the completed windows.
    pub fn finish(&mut self) -> VitalResult<i32> {
        self.state = PhaseState::Idle;
        self.window.clear();
        average_rate(&self.rates)
    }
}

impl Default for RespiratoryPhase {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive a respiratory phase from the sample channel until the measurement
/// window elapses. Closing the receiver on exit is the unsubscribe: the
/// sampler task observes the closed channel and stops.
pub async fn collect_for(
    phase: &mut RespiratoryPhase,
    rx: &mut Receiver<AccelSample>,
    duration: Duration,
) -> VitalResult<i32> {
    phase.begin()?;
    let deadline = Instant::now() + duration;

    loop {
        match timeout_at(deadline, rx.recv()).await {
            Ok(Some(sample)) => {
                if let Some(rate) = phase.on_sample(sample)? {
                    debug!("Window complete: {} breaths/min", rate);
                }
            }
            Ok(None) => {
                info!("Sample channel closed before countdown elapsed");
                break;
            }
            Err(_) => break, // countdown elapsed
        }
    }

    rx.close();
    phase.finish()
}
