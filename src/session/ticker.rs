use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// One-second cadence driving `elapsed_seconds` during a recording phase
///
/// The ticker is owned by the controller only while the session is
/// recording. Dropping it cancels it, so every way out of the recording
/// phase releases it.
pub struct Ticker {
    interval: Interval,
}

impl Ticker {
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

    /// First tick fires one `period` from now
    pub fn start(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        // Catch up on ticks missed while the controller was busy
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        Self { interval }
    }

    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}
