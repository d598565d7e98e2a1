use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::PoolError;

pub const DEFAULT_WAIT: Duration = Duration::from_millis(33);
pub const DEFAULT_MIN_WAIT: Duration = Duration::from_millis(1);

/// Pool-wide sleep bounds, read by every worker at each sleep computation.
#[derive(Debug)]
pub(crate) struct WaitSettings {
    default_wait_nanos: AtomicU64,
    min_wait_nanos: AtomicU64,
}

impl WaitSettings {
    pub(crate) fn new(default_wait: Duration, min_wait: Duration) -> Result<Self, PoolError> {
        let settings = Self {
            default_wait_nanos: AtomicU64::new(0),
            min_wait_nanos: AtomicU64::new(0),
        };
        settings.set_default_wait(default_wait)?;
        settings.set_min_wait(min_wait)?;
        Ok(settings)
    }

    pub(crate) fn default_wait(&self) -> Duration {
        Duration::from_nanos(self.default_wait_nanos.load(Ordering::Relaxed))
    }

    pub(crate) fn set_default_wait(&self, wait: Duration) -> Result<(), PoolError> {
        let nanos = to_nanos(wait).ok_or(PoolError::InvalidWaitInterval)?;
        self.default_wait_nanos.store(nanos, Ordering::Relaxed);
        Ok(())
    }

    pub(crate) fn min_wait(&self) -> Duration {
        Duration::from_nanos(self.min_wait_nanos.load(Ordering::Relaxed))
    }

    pub(crate) fn set_min_wait(&self, wait: Duration) -> Result<(), PoolError> {
        let nanos = to_nanos(wait).ok_or(PoolError::InvalidMinWait)?;
        self.min_wait_nanos.store(nanos, Ordering::Relaxed);
        Ok(())
    }
}

fn to_nanos(wait: Duration) -> Option<u64> {
    u64::try_from(wait.as_nanos()).ok().filter(|&nanos| nanos > 0)
}

/// How long a worker sleeps after an iteration.
///
/// `next` is the earliest due time seen during the iteration, if any.
/// Nothing seen, or something already due, yields `min_wait`; otherwise the
/// time until `next`, capped at `default_wait`.
pub fn wait_duration(now: Instant, next: Option<Instant>, default_wait: Duration, min_wait: Duration) -> Duration {
    let Some(next) = next else {
        return min_wait;
    };

    match next.checked_duration_since(now) {
        Some(delta) if !delta.is_zero() => delta.min(default_wait),
        _ => min_wait,
    }
}
