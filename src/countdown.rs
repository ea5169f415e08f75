use tokio::time::{interval, Duration};

/// Measurement window length in seconds.
pub const MEASUREMENT_SECS: u64 = 45;

/// Countdown tick length in seconds.
pub const TICK_SECS: u64 = 1;

/// Fixed-duration, fixed-tick countdown. Fires the tick callback once per
/// second with the remaining seconds, then the finish callback.
pub struct Countdown {
    duration_secs: u64,
}

impl Countdown {
    pub fn new(duration_secs: u64) -> Self {
        Countdown { duration_secs }
    }

    pub fn measurement() -> Self {
        Self::new(MEASUREMENT_SECS)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub async fn run<T, F>(&self, mut on_tick: T, on_finish: F)
    where
        T: FnMut(u64),
        F: FnOnce(),
    {
        let mut ticker = interval(Duration::from_secs(TICK_SECS));
        ticker.tick().await; // first tick completes immediately

        for remaining in (1..=self.duration_secs).rev() {
            on_tick(remaining);
            ticker.tick().await;
        }

        on_finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_count_down_then_finish() {
        let countdown = Countdown::new(3);
        let mut ticks = Vec::new();
        let mut finished = false;

        countdown
            .run(|remaining| ticks.push(remaining), || finished = true)
            .await;

        assert_eq!(ticks, vec![3, 2, 1]);
        assert!(finished);
    }

    #[test]
    fn test_measurement_window_is_45s() {
        assert_eq!(Countdown::measurement().duration(), Duration::from_secs(45));
    }
}
