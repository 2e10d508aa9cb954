//! Injectable timestamp source.
//!
//! All timestamps in an `ExecutionReport` (and every `ExecutionEvent` inside
//! it) come from a single `Clock`, so tests can observe deterministic
//! durations instead of racing the wall clock. Grounded on the teacher's
//! `core::time::now_epoch_z`, which every subsystem calls through rather
//! than reading `SystemTime::now()` directly — generalized here into a
//! trait so tests can substitute a frozen clock.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of epoch-millisecond timestamps.
pub trait Clock: Send + Sync {
    /// Current time as milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Default clock backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Deterministic clock for tests: starts at a fixed instant and advances
/// by one millisecond on every read, so event orderings and `duration_ms`
/// assertions are reproducible without sleeping.
#[derive(Debug)]
pub struct FrozenClock {
    next: AtomicI64,
}

impl FrozenClock {
    pub fn starting_at(millis: i64) -> Self {
        Self {
            next: AtomicI64::new(millis),
        }
    }
}

impl Clock for FrozenClock {
    fn now_millis(&self) -> i64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}
