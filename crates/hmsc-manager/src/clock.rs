use std::time::{SystemTime, UNIX_EPOCH};

/// Seam for reading the current time, so session-expiry tests can supply a
/// fixed or advancing clock instead of racing the real one.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_secs()
    }
}
