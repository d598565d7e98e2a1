mod builder;

pub use builder::PoolBuilder;

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PoolError;
use crate::routine::Routine;
use crate::task::{ScheduledTask, TaskHandle};
use crate::worker::{WaitSettings, WakeSignal, Worker, DEFAULT_MIN_WAIT, DEFAULT_WAIT};

/// Fixed set of dedicated worker threads running registered routines.
///
/// The pool is an ordinary value: create it, pass it (or an `Arc` of it) to
/// whoever registers routines, and shut it down when done. Dropping it
/// shuts it down as well.
pub struct RoutinePool {
    workers: Vec<Worker>,
    settings: Arc<WaitSettings>,
    shutdown: CancellationToken,
    cancel_watcher: Option<JoinHandle<()>>,
}

impl RoutinePool {
    /// Create a pool with `worker_count` threads and default wait settings.
    pub fn new(worker_count: usize) -> Result<Self, PoolError> {
        Self::spawn(worker_count, DEFAULT_WAIT, DEFAULT_MIN_WAIT, CancellationToken::new(), false)
    }

    /// Create a pool with one thread per available CPU.
    pub fn with_defaults() -> Result<Self, PoolError> {
        Self::new(default_worker_count())
    }

    /// With `wake_on_cancel`, a watcher thread wakes every worker as soon as
    /// `shutdown` fires from outside the pool.
    pub(crate) fn spawn(
        worker_count: usize,
        default_wait: Duration,
        min_wait: Duration,
        shutdown: CancellationToken,
        wake_on_cancel: bool,
    ) -> Result<Self, PoolError> {
        if worker_count == 0 {
            return Err(PoolError::InvalidWorkerCount);
        }

        let settings = Arc::new(WaitSettings::new(default_wait, min_wait)?);

        let mut pool = Self {
            workers: Vec::with_capacity(worker_count),
            settings,
            shutdown,
            cancel_watcher: None,
        };
        for index in 0..worker_count {
            // on failure `pool` drops here and stops the workers spawned so far
            let worker = Worker::spawn(index, pool.settings.clone(), pool.shutdown.clone())?;
            pool.workers.push(worker);
        }
        if wake_on_cancel {
            let signals = pool.workers.iter().map(Worker::signal).collect();
            pool.cancel_watcher = Some(spawn_cancel_watcher(pool.shutdown.clone(), signals)?);
        }

        info!(
            workers = worker_count,
            default_wait_ms = default_wait.as_millis() as u64,
            "Routine pool started"
        );
        Ok(pool)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Upper bound on any single worker sleep.
    pub fn default_wait(&self) -> Duration {
        self.settings.default_wait()
    }

    /// Takes effect at each worker's next sleep computation. Zero is rejected.
    pub fn set_default_wait(&self, wait: Duration) -> Result<(), PoolError> {
        self.settings.set_default_wait(wait)
    }

    /// Sleep used when nothing is pending or something is already due.
    pub fn min_wait(&self) -> Duration {
        self.settings.min_wait()
    }

    pub fn set_min_wait(&self, wait: Duration) -> Result<(), PoolError> {
        self.settings.set_min_wait(wait)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Register `routine` on every worker in `range`; exactly one of them runs each due step.
    ///
    /// Returns `false`, with no side effects, if the range does not fit the
    /// pool or the pool is already shut down.
    pub fn register<R>(&self, range: RangeInclusive<usize>, routine: R, cancel: CancellationToken) -> bool
    where
        R: Routine + 'static,
    {
        self.start(range, "routine", routine, cancel).is_ok()
    }

    pub fn register_on<R>(&self, index: usize, routine: R, cancel: CancellationToken) -> bool
    where
        R: Routine + 'static,
    {
        self.register(index..=index, routine, cancel)
    }

    pub fn register_all<R>(&self, routine: R, cancel: CancellationToken) -> bool
    where
        R: Routine + 'static,
    {
        self.register(self.full_range(), routine, cancel)
    }

    /// Same as [`register`](Self::register) with a token that never fires.
    pub fn spawn_routine<R>(&self, range: RangeInclusive<usize>, routine: R) -> bool
    where
        R: Routine + 'static,
    {
        self.register(range, routine, CancellationToken::new())
    }

    pub fn spawn_on<R>(&self, index: usize, routine: R) -> bool
    where
        R: Routine + 'static,
    {
        self.register_on(index, routine, CancellationToken::new())
    }

    pub fn spawn_all<R>(&self, routine: R) -> bool
    where
        R: Routine + 'static,
    {
        self.register_all(routine, CancellationToken::new())
    }

    /// Register a named routine and get a handle to observe or cancel it.
    pub fn start<R>(
        &self,
        range: RangeInclusive<usize>,
        name: impl Into<String>,
        routine: R,
        cancel: CancellationToken,
    ) -> Result<TaskHandle, PoolError>
    where
        R: Routine + 'static,
    {
        self.start_boxed(range, name.into(), Box::new(routine), cancel)
    }

    pub(crate) fn start_boxed(
        &self,
        range: RangeInclusive<usize>,
        name: String,
        routine: Box<dyn Routine>,
        cancel: CancellationToken,
    ) -> Result<TaskHandle, PoolError> {
        if self.is_shutdown() {
            return Err(PoolError::ShutDown);
        }
        self.validate_range(&range)?;

        let task = Arc::new(ScheduledTask::new(name, routine, cancel));
        for worker in &self.workers[range.clone()] {
            worker.add(task.clone());
        }

        debug!(
            task = %task.id(),
            name = task.name(),
            min = range.start(),
            max = range.end(),
            "Registered routine"
        );
        Ok(TaskHandle::new(task))
    }

    fn full_range(&self) -> RangeInclusive<usize> {
        0..=self.workers.len() - 1
    }

    fn validate_range(&self, range: &RangeInclusive<usize>) -> Result<(), PoolError> {
        let (min, max) = (*range.start(), *range.end());
        if min > max || max >= self.workers.len() {
            return Err(PoolError::InvalidRange {
                min,
                max,
                workers: self.workers.len(),
            });
        }
        Ok(())
    }

    /// Stop every worker and wait for their threads to exit.
    ///
    /// Each worker finishes its current iteration first. Tasks still waiting
    /// in a worker's inbound queue are dropped without running.
    pub fn shutdown(mut self) -> Result<(), PoolError> {
        self.stop_and_join()
    }

    /// [`shutdown`](Self::shutdown) on tokio's blocking thread pool.
    pub async fn shutdown_async(self) -> Result<(), PoolError> {
        tokio::task::spawn_blocking(move || self.shutdown()).await?
    }

    fn stop_and_join(&mut self) -> Result<(), PoolError> {
        self.shutdown.cancel();
        for worker in &self.workers {
            worker.wake();
        }

        let mut panicked = 0;
        if let Some(watcher) = self.cancel_watcher.take() {
            if watcher.join().is_err() {
                warn!("cancellation watcher panicked");
                panicked += 1;
            }
        }
        for worker in &mut self.workers {
            if !worker.join() {
                warn!(worker = worker.index(), "worker thread panicked");
                panicked += 1;
            }
        }

        if panicked > 0 {
            return Err(PoolError::WorkerPanicked { workers: panicked });
        }
        Ok(())
    }
}

impl Drop for RoutinePool {
    fn drop(&mut self) {
        if let Err(e) = self.stop_and_join() {
            warn!(error = %e, "Routine pool stopped with errors");
        }
    }
}

impl std::fmt::Debug for RoutinePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutinePool")
            .field("workers", &self.workers.len())
            .field("default_wait", &self.default_wait())
            .field("min_wait", &self.min_wait())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

/// Wait on the pool token without a worker's bounded sleep and wake everyone when it fires.
fn spawn_cancel_watcher(shutdown: CancellationToken, signals: Vec<Arc<WakeSignal>>) -> Result<JoinHandle<()>, PoolError> {
    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    let watcher = std::thread::Builder::new()
        .name("routine-pool-cancel".to_string())
        .spawn(move || {
            runtime.block_on(shutdown.cancelled());
            debug!("Pool cancelled, waking workers");
            for signal in &signals {
                signal.set();
            }
        })?;
    Ok(watcher)
}

pub(crate) fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
