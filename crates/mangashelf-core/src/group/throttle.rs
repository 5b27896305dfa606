//! Fixed-interval admission throttle.
//!
//! Bounds the rate at which new records are admitted (one per tick),
//! independent of how many jobs a [`super::JobGroup`] lets run at once.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::error::Cancelled;

/// Admits one caller per period. A zero period disables throttling.
///
/// The first admission waits one full period, like a ticker that has just
/// been started. Must be created inside a tokio runtime.
#[derive(Debug)]
pub struct Throttle {
    interval: Option<Interval>,
}

impl Throttle {
    pub fn new(period: Duration) -> Self {
        if period.is_zero() {
            return Self::disabled();
        }
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Throttle {
            interval: Some(interval),
        }
    }

    pub fn disabled() -> Self {
        Throttle { interval: None }
    }

    /// Build from a millisecond setting as stored in the config file.
    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn period(&self) -> Option<Duration> {
        self.interval.as_ref().map(|i| i.period())
    }

    /// Wait for the next tick, or return [`Cancelled`] if `cancel` fires first.
    pub async fn admit(&mut self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }
        let Some(interval) = self.interval.as_mut() else {
            return Ok(());
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Cancelled),
            _ = interval.tick() => Ok(()),
        }
    }
}
