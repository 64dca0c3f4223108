use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Injectable time source. The engine never touches wall-clock APIs
/// directly, so simulated sessions can run at full speed with
/// reproducible timestamps.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Monotonic time since the clock was created.
    fn monotonic(&self) -> Duration;

    async fn sleep(&self, duration: Duration);
}

/// Real time, real sleeps.
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic(&self) -> Duration {
        self.started.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Deterministic time: starts at a fixed epoch and only advances when
/// something sleeps. Two runs issuing the same sleeps read the same
/// timestamps, which keeps simulated journals byte-comparable.
pub struct VirtualClock {
    epoch: DateTime<Utc>,
    offset: Mutex<Duration>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::starting_at(Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_else(Utc::now))
    }

    pub fn starting_at(epoch: DateTime<Utc>) -> Self {
        Self {
            epoch,
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, duration: Duration) {
        *self.offset.lock() += duration;
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        let offset = *self.offset.lock();
        self.epoch + chrono::Duration::from_std(offset).unwrap_or_else(|_| chrono::Duration::zero())
    }

    fn monotonic(&self) -> Duration {
        *self.offset.lock()
    }

    async fn sleep(&self, duration: Duration) {
        // No real waiting: virtual time jumps forward instead.
        self.advance(duration);
    }
}
