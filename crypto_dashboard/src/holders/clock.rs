use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

/// Длина временного окна кэша в секундах.
pub const BUCKET_SECONDS: u64 = 300;

pub fn time_bucket(unix_secs: u64) -> u64 {
    unix_secs / BUCKET_SECONDS
}

pub trait Clock: Send + Sync {
    fn now_unix(&self) -> u64;

    fn bucket(&self) -> u64 {
        time_bucket(self.now_unix())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        Utc::now().timestamp().max(0) as u64
    }
}

/// Часы с ручным управлением, для тестов и воспроизводимых прогонов.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(unix_secs: u64) -> Self {
        ManualClock {
            now: Arc::new(AtomicU64::new(unix_secs)),
        }
    }

    pub fn set(&self, unix_secs: u64) {
        self.now.store(unix_secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_boundaries() {
        assert_eq!(time_bucket(0), 0);
        assert_eq!(time_bucket(299), 0);
        assert_eq!(time_bucket(300), 1);
        assert_eq!(time_bucket(1_700_000_123), 1_700_000_123 / 300);
    }

    #[test]
    fn manual_clock_moves_between_buckets() {
        let clock = ManualClock::new(600);
        assert_eq!(clock.bucket(), 2);
        clock.advance(299);
        assert_eq!(clock.bucket(), 2);
        clock.advance(1);
        assert_eq!(clock.bucket(), 3);
        clock.set(0);
        assert_eq!(clock.now_unix(), 0);
    }
}
