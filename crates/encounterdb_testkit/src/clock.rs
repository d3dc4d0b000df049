//! Deterministic time for tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use encounterdb_core::Clock;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// A clock that advances by a fixed step on every reading.
///
/// Clones share the same timeline, so a repository reopened with a clone
/// keeps producing later timestamps.
#[derive(Debug, Clone)]
pub struct SteppingClock {
    start: DateTime<Utc>,
    step: Duration,
    ticks: Arc<AtomicI64>,
}

impl SteppingClock {
    /// Starts at `start` and advances by `step` per reading.
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            start,
            step,
            ticks: Arc::new(AtomicI64::new(0)),
        }
    }

    /// A clock that never advances.
    pub fn frozen(at: DateTime<Utc>) -> Self {
        Self::new(at, Duration::zero())
    }

    /// Number of readings taken so far.
    pub fn readings(&self) -> i64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl Default for SteppingClock {
    /// 2024-01-01T00:00:00Z, one minute per reading.
    fn default() -> Self {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self::new(start, Duration::minutes(1))
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        let offset = i32::try_from(tick).unwrap_or(i32::MAX);
        self.start + self.step * offset
    }
}
