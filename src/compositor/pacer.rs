//! Frame pacing for the draw loop

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

/// Wakes the draw loop once per display refresh
#[async_trait]
pub trait FramePacer: Send {
    async fn next_frame(&mut self);
}

/// Fixed refresh rate pacer. Late ticks are skipped, never bursted.
pub struct IntervalPacer {
    interval: Interval,
}

impl IntervalPacer {
    /// Must be called from within a Tokio runtime
    pub fn new(refresh_rate: u32) -> Self {
        let period = Duration::from_secs_f64(1.0 / refresh_rate.max(1) as f64);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl FramePacer for IntervalPacer {
    async fn next_frame(&mut self) {
        self.interval.tick().await;
    }
}
