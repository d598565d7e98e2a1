//! Dedicated worker threads and their execution loop.

mod signal;
mod wait;

pub(crate) use signal::WakeSignal;
pub(crate) use wait::WaitSettings;
pub use wait::{wait_duration, DEFAULT_MIN_WAIT, DEFAULT_WAIT};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_queue::SegQueue;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, trace};

use crate::error::{panic_message, PoolError, RoutineError};
use crate::routine::Step;
use crate::task::{ScheduledTask, TaskId};

pub(crate) type Inbox = SegQueue<Arc<ScheduledTask>>;

/// Longer delays are clamped; such a task is effectively parked.
const MAX_DELAY: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Thread-free state of one worker: its inbound queue and working set.
///
/// The thread loop calls [`WorkerCore::run_iteration`] once per wake-up.
pub(crate) struct WorkerCore {
    index: usize,
    inbox: Arc<Inbox>,
    working_set: Vec<Arc<ScheduledTask>>,
}

impl WorkerCore {
    pub(crate) fn new(index: usize, inbox: Arc<Inbox>) -> Self {
        Self {
            index,
            inbox,
            working_set: Vec::new(),
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn working_set_len(&self) -> usize {
        self.working_set.len()
    }

    /// Move everything queued so far into the working set.
    fn merge_inbox(&mut self) -> usize {
        let queued = self.inbox.len();
        let mut merged = 0;
        while merged < queued {
            let Some(task) = self.inbox.pop() else {
                break;
            };
            trace!(task = %task.id(), name = task.name(), "merged task");
            self.working_set.push(task);
            merged += 1;
        }
        merged
    }

    /// Merge new registrations, run every due task once, drop finished ones.
    ///
    /// Returns the earliest due time observed, which drives the next sleep.
    pub(crate) fn run_iteration(&mut self, now: Instant) -> Option<Instant> {
        self.merge_inbox();

        let mut finished: Vec<TaskId> = Vec::new();
        let mut next_wake: Option<Instant> = None;

        for task in &self.working_set {
            if task.is_disposed() {
                finished.push(task.id());
                continue;
            }

            let Some(mut guard) = task.try_acquire() else {
                continue;
            };

            if task.is_disposed() {
                finished.push(task.id());
                continue;
            }

            if let Some(due) = guard.next_due() {
                if now < due {
                    next_wake = earliest(next_wake, due);
                    continue;
                }
            }

            match execute_step(guard.routine_mut()) {
                Ok(Step::Continue(delay)) => match now.checked_add(delay.min(MAX_DELAY)) {
                    Some(due) => {
                        guard.set_next_due(due);
                        next_wake = earliest(next_wake, due);
                    }
                    None => {
                        error!(
                            worker = self.index,
                            task = %task.id(),
                            name = task.name(),
                            kind = "user",
                            delay_ms = delay.as_millis() as u64,
                            "routine delay out of range"
                        );
                        task.dispose();
                        finished.push(task.id());
                    }
                },
                Ok(Step::Done) => {
                    debug!(worker = self.index, task = %task.id(), name = task.name(), "routine finished");
                    task.dispose();
                    finished.push(task.id());
                }
                Err(err) => {
                    error!(
                        worker = self.index,
                        task = %task.id(),
                        name = task.name(),
                        kind = "user",
                        error = %err,
                        "routine step failed"
                    );
                    task.dispose();
                    finished.push(task.id());
                }
            }
        }

        if !finished.is_empty() {
            self.working_set.retain(|task| !finished.contains(&task.id()));
        }

        next_wake
    }
}

fn execute_step(routine: &mut dyn crate::routine::Routine) -> Result<Step, RoutineError> {
    match catch_unwind(AssertUnwindSafe(|| routine.step())) {
        Ok(outcome) => outcome,
        Err(payload) => Err(RoutineError::from_panic(payload)),
    }
}

fn earliest(current: Option<Instant>, candidate: Instant) -> Option<Instant> {
    Some(match current {
        Some(current) => current.min(candidate),
        None => candidate,
    })
}

/// Pool-side handle of one worker thread.
pub(crate) struct Worker {
    index: usize,
    inbox: Arc<Inbox>,
    signal: Arc<WakeSignal>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn spawn(
        index: usize,
        settings: Arc<WaitSettings>,
        shutdown: CancellationToken,
    ) -> Result<Self, PoolError> {
        let inbox = Arc::new(Inbox::new());
        let signal = Arc::new(WakeSignal::new());
        let core = WorkerCore::new(index, inbox.clone());

        let thread = {
            let signal = signal.clone();
            std::thread::Builder::new()
                .name(format!("routine-worker-{index}"))
                .spawn(move || run_loop(core, signal, settings, shutdown))?
        };

        Ok(Self {
            index,
            inbox,
            signal,
            thread: Some(thread),
        })
    }

    /// Hand a task to this worker; it is merged on the next iteration.
    pub(crate) fn add(&self, task: Arc<ScheduledTask>) {
        self.inbox.push(task);
        self.signal.set();
    }

    pub(crate) fn wake(&self) {
        self.signal.set();
    }

    pub(crate) fn signal(&self) -> Arc<WakeSignal> {
        self.signal.clone()
    }

    /// Wait for the thread to exit. Returns false if it panicked.
    pub(crate) fn join(&mut self) -> bool {
        match self.thread.take() {
            Some(thread) => thread.join().is_ok(),
            None => true,
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }
}

fn run_loop(mut core: WorkerCore, signal: Arc<WakeSignal>, settings: Arc<WaitSettings>, shutdown: CancellationToken) {
    let span = info_span!("worker", index = core.index());
    let _enter = span.enter();
    debug!("worker started");

    while !shutdown.is_cancelled() {
        signal.reset();
        let wait = iterate(&mut core, &settings, Instant::now());

        if shutdown.is_cancelled() {
            break;
        }
        signal.wait_timeout(wait);
    }

    debug!(remaining = core.working_set_len(), "worker stopped");
}

/// One iteration with scheduler faults contained; returns the sleep that follows.
fn iterate(core: &mut WorkerCore, settings: &WaitSettings, now: Instant) -> Duration {
    match catch_unwind(AssertUnwindSafe(|| core.run_iteration(now))) {
        Ok(next_wake) => wait_duration(now, next_wake, settings.default_wait(), settings.min_wait()),
        Err(payload) => {
            error!(kind = "internal", error = %panic_message(payload.as_ref()), "worker iteration failed");
            settings.min_wait()
        }
    }
}
