use std::ops::RangeInclusive;
use std::time::Duration;

use crate::error::{PoolError, RoutineError};
use crate::routine::{Routine, Step};

/// A routine declared with `#[routine(...)]`.
///
/// Every field except `handler` may hold a `${key:default}` placeholder that
/// is resolved against the builder's config when the pool starts.
#[derive(Debug, Clone, Copy)]
pub struct RoutineEntry {
    pub name: &'static str,
    pub every: &'static str,
    pub initial_delay: &'static str,
    pub workers: &'static str,
    pub enabled: &'static str,
    pub handler: fn(),
}

/// Global distributed slice for collecting `#[routine]` functions
#[linkme::distributed_slice]
pub static ROUTINES: [fn() -> RoutineEntry] = [..];

/// Fixed-interval routine calling a plain function, optionally after an initial delay.
pub(crate) struct EntryRoutine {
    handler: fn(),
    interval: Duration,
    initial_delay: Option<Duration>,
}

impl EntryRoutine {
    pub(crate) fn new(handler: fn(), interval: Duration, initial_delay: Duration) -> Self {
        Self {
            handler,
            interval,
            initial_delay: (!initial_delay.is_zero()).then_some(initial_delay),
        }
    }
}

impl Routine for EntryRoutine {
    fn step(&mut self) -> Result<Step, RoutineError> {
        if let Some(delay) = self.initial_delay.take() {
            return Ok(Step::Continue(delay));
        }
        (self.handler)();
        Ok(Step::Continue(self.interval))
    }
}

/// Parse a worker selector: `all`, `N`, `A..=B` or `A-B`.
pub fn parse_workers(selector: &str, worker_count: usize) -> Result<RangeInclusive<usize>, PoolError> {
    let selector = selector.trim();
    let invalid = || PoolError::InvalidSelector(selector.to_string());

    if selector.eq_ignore_ascii_case("all") {
        return match worker_count {
            0 => Err(invalid()),
            n => Ok(0..=n - 1),
        };
    }

    let bounds = selector
        .split_once("..=")
        .or_else(|| selector.split_once('-'));
    let (min, max) = match bounds {
        Some((min, max)) => (min.trim(), max.trim()),
        None => (selector, selector),
    };

    let min = min.parse::<usize>().map_err(|_| invalid())?;
    let max = max.parse::<usize>().map_err(|_| invalid())?;
    Ok(min..=max)
}
