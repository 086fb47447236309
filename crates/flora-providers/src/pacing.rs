//! Request pacing between successive provider queries.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::trace;

/// Decides how long to wait before the next provider query.
#[async_trait]
pub trait Pacer: Send {
    /// Wait until the next query may be issued.
    async fn pace(&mut self);
}

/// Guarantees at least `interval` between the starts of successive queries.
///
/// The first call returns immediately. Built on `tokio::time`, so tests
/// can run it against a paused clock.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    interval: Duration,
    last: Option<Instant>,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl Pacer for FixedInterval {
    async fn pace(&mut self) {
        if let Some(last) = self.last {
            let ready = last + self.interval;
            if ready > Instant::now() {
                trace!(
                    subsystem = "providers",
                    component = "pacer",
                    wait_ms = (ready - Instant::now()).as_millis() as u64,
                    "Waiting before next query"
                );
                tokio::time::sleep_until(ready).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

/// No waiting at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unpaced;

#[async_trait]
impl Pacer for Unpaced {
    async fn pace(&mut self) {}
}
