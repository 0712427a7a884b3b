//! Upload gate for the blob store's usage quota.
//!
//! When the blob store answers that its quota is exhausted, the gate is
//! closed for a fixed cool-down and later uploads fail fast without calling
//! the store. The gate is process-wide and only reopens when the cool-down
//! elapses or the process restarts. It is a fast-fail optimisation: two
//! uploads racing across the boundary may both reach the store, which is
//! the real enforcement point.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Clone, Default)]
pub struct QuotaGate {
    blocked_until: Arc<Mutex<Option<Instant>>>,
}

impl QuotaGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Err(remaining)` while the gate is closed.
    pub async fn check(&self) -> Result<(), Duration> {
        self.check_at(Instant::now()).await
    }

    pub async fn check_at(&self, now: Instant) -> Result<(), Duration> {
        let mut blocked_until = self.blocked_until.lock().await;
        match *blocked_until {
            Some(until) if now < until => Err(until - now),
            Some(_) => {
                debug!("Blob store cool-down elapsed");
                *blocked_until = None;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Close the gate for `cooldown` starting now.
    pub async fn trip(&self, cooldown: Duration) {
        self.trip_at(Instant::now(), cooldown).await
    }

    pub async fn trip_at(&self, now: Instant, cooldown: Duration) {
        let mut blocked_until = self.blocked_until.lock().await;
        let until = now + cooldown;
        // Never shorten a cool-down that is already running.
        if blocked_until.map_or(true, |current| current < until) {
            *blocked_until = Some(until);
        }
        warn!(cooldown_secs = cooldown.as_secs(), "Blob store quota exhausted, uploads paused");
    }
}

/// Whole minutes, rounded up, for user-facing wait messages.
pub fn minutes_left(wait: Duration) -> u64 {
    let minutes = wait.as_millis().div_ceil(60_000).max(1);
    u64::try_from(minutes).unwrap_or(u64::MAX)
}
