use std::time::Duration;

use crate::error::RoutineError;

/// Outcome of one successful routine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Run the next step once this much time has passed.
    Continue(Duration),
    /// The routine has no more steps.
    Done,
}

impl Step {
    pub fn after_millis(millis: u64) -> Self {
        Step::Continue(Duration::from_millis(millis))
    }
}

/// A resumable unit of work executed one step at a time by a worker thread.
///
/// The pool never runs two steps of the same routine at once, even when the
/// routine is visible to several workers, so implementations need `Send` but
/// not `Sync`. Once a step returns [`Step::Done`] or an error (or panics) the
/// routine is never stepped again.
///
/// # Example
///
/// ```rust
/// use routine_pool_runtime::{Routine, RoutineError, Step};
///
/// struct Countdown {
///     left: u32,
/// }
///
/// impl Routine for Countdown {
///     fn step(&mut self) -> Result<Step, RoutineError> {
///         if self.left == 0 {
///             return Ok(Step::Done);
///         }
///         self.left -= 1;
///         Ok(Step::after_millis(10))
///     }
/// }
/// ```
pub trait Routine: Send {
    /// Execute the next step
    fn step(&mut self) -> Result<Step, RoutineError>;
}

impl Routine for Box<dyn Routine> {
    fn step(&mut self) -> Result<Step, RoutineError> {
        (**self).step()
    }
}

/// Routine backed by a closure.
pub struct FnRoutine<F> {
    f: F,
}

impl<F> Routine for FnRoutine<F>
where
    F: FnMut() -> Result<Step, RoutineError> + Send,
{
    fn step(&mut self) -> Result<Step, RoutineError> {
        (self.f)()
    }
}

/// Build a routine from a closure returning the outcome of each step.
pub fn from_fn<F>(f: F) -> FnRoutine<F>
where
    F: FnMut() -> Result<Step, RoutineError> + Send,
{
    FnRoutine { f }
}

/// Routine driven by a sequence of delays; the end of the sequence ends the routine.
pub struct IterRoutine<I> {
    iter: I,
}

impl<I> Routine for IterRoutine<I>
where
    I: Iterator<Item = Duration> + Send,
{
    fn step(&mut self) -> Result<Step, RoutineError> {
        Ok(match self.iter.next() {
            Some(delay) => Step::Continue(delay),
            None => Step::Done,
        })
    }
}

/// Build a routine from anything yielding delays.
///
/// Work is done lazily inside the iterator (`map`, `from_fn`, ...): each
/// `next()` call is one step.
pub fn from_iter<I>(iter: I) -> IterRoutine<I::IntoIter>
where
    I: IntoIterator<Item = Duration>,
    I::IntoIter: Send,
{
    IterRoutine {
        iter: iter.into_iter(),
    }
}

/// Infinite routine that calls `f` and then waits `interval`, until cancelled.
pub fn every<F>(interval: Duration, mut f: F) -> FnRoutine<impl FnMut() -> Result<Step, RoutineError> + Send>
where
    F: FnMut() + Send,
{
    from_fn(move || {
        f();
        Ok(Step::Continue(interval))
    })
}
