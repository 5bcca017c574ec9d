use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Abstract "current instant" source so every time-dependent decision in the
/// core reads through one seam instead of the operating system directly.
///
/// Every persisted timestamp in this crate is milliseconds since the Unix
/// epoch, so the only operation a clock needs to provide is `now_millis`.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Production clock backed by the OS wall-clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_millis() as i64
    }
}

/// Test clock whose value is set explicitly, so scenarios that depend on
/// throttle windows or health-check intervals are deterministic.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(start_millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_millis: i64) {
        self.millis.fetch_add(delta_millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}
