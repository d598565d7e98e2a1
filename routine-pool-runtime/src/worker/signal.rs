use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Manual-reset event: stays set until explicitly reset.
#[derive(Debug, Default)]
pub(crate) struct WakeSignal {
    set: Mutex<bool>,
    cond: Condvar,
}

impl WakeSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self) {
        let mut set = self.set.lock();
        *set = true;
        self.cond.notify_all();
    }

    pub(crate) fn reset(&self) {
        *self.set.lock() = false;
    }

    /// Block until the event is set or `timeout` elapses. Returns whether it was set.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut set = self.set.lock();
        while !*set {
            if self.cond.wait_until(&mut set, deadline).timed_out() {
                break;
            }
        }
        *set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn wait_times_out_when_unset() {
        let signal = WakeSignal::new();
        let started = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(20)));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn set_survives_until_reset() {
        let signal = WakeSignal::new();
        signal.set();
        assert!(signal.wait_timeout(Duration::from_secs(5)));
        assert!(signal.wait_timeout(Duration::ZERO));
        signal.reset();
        assert!(!signal.wait_timeout(Duration::ZERO));
    }

    #[test]
    fn set_from_other_thread_wakes_waiter() {
        let signal = Arc::new(WakeSignal::new());
        let setter = {
            let signal = signal.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                signal.set();
            })
        };

        let started = Instant::now();
        assert!(signal.wait_timeout(Duration::from_secs(10)));
        assert!(started.elapsed() < Duration::from_secs(5));
        setter.join().unwrap();
    }
}
