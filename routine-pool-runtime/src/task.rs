use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::routine::Routine;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

struct TaskState {
    next_due: Option<Instant>,
    routine: Box<dyn Routine>,
}

/// Scheduling record wrapping one routine.
///
/// Shared by reference between every worker it was registered with. The
/// execution flag decides which of them may touch the routine and due time;
/// everything behind it is reachable only through a [`TaskGuard`].
pub(crate) struct ScheduledTask {
    id: TaskId,
    name: String,
    cancel: CancellationToken,
    disposed: AtomicBool,
    execution_flag: AtomicBool,
    // locked only by the flag holder, so never contended
    state: Mutex<TaskState>,
}

impl ScheduledTask {
    pub(crate) fn new(name: impl Into<String>, routine: Box<dyn Routine>, cancel: CancellationToken) -> Self {
        Self {
            id: TaskId::next(),
            name: name.into(),
            cancel,
            disposed: AtomicBool::new(false),
            execution_flag: AtomicBool::new(false),
            state: Mutex::new(TaskState {
                next_due: None,
                routine,
            }),
        }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Claim the right to run this task's next step.
    ///
    /// Never blocks; `None` means another worker holds it right now.
    pub(crate) fn try_acquire(&self) -> Option<TaskGuard<'_>> {
        self.execution_flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()?;
        let flag = HeldFlag(self);
        Some(TaskGuard {
            state: self.state.lock(),
            _flag: flag,
        })
    }

    fn release(&self) {
        self.execution_flag.store(false, Ordering::Release);
    }

    /// True once the routine finished, failed, or its cancellation token fired.
    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire) || self.cancel.is_cancelled()
    }

    pub(crate) fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("disposed", &self.is_disposed())
            .field("held", &self.execution_flag.load(Ordering::Relaxed))
            .finish()
    }
}

/// Releases the execution flag on drop.
struct HeldFlag<'a>(&'a ScheduledTask);

impl Drop for HeldFlag<'_> {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Exclusive access to a task's routine. Dropping it releases the execution flag.
pub(crate) struct TaskGuard<'a> {
    // field order matters: the state unlocks before the flag is released
    state: MutexGuard<'a, TaskState>,
    _flag: HeldFlag<'a>,
}

impl TaskGuard<'_> {
    pub(crate) fn next_due(&self) -> Option<Instant> {
        self.state.next_due
    }

    pub(crate) fn set_next_due(&mut self, due: Instant) {
        self.state.next_due = Some(due);
    }

    pub(crate) fn routine_mut(&mut self) -> &mut dyn Routine {
        self.state.routine.as_mut()
    }
}

/// Caller-side view of a registered routine.
///
/// Holding a handle keeps the record alive but has no influence on scheduling.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    task: Arc<ScheduledTask>,
}

impl TaskHandle {
    pub(crate) fn new(task: Arc<ScheduledTask>) -> Self {
        Self { task }
    }

    pub fn id(&self) -> TaskId {
        self.task.id()
    }

    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// True once the routine will never run again.
    pub fn is_finished(&self) -> bool {
        self.task.is_disposed()
    }

    /// Stop the routine. An in-flight step still completes; no further step starts.
    pub fn cancel(&self) {
        self.task.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routine::{from_fn, Step};
    use std::time::Duration;

    fn idle_task(cancel: CancellationToken) -> ScheduledTask {
        ScheduledTask::new("idle", Box::new(from_fn(|| Ok(Step::after_millis(1)))), cancel)
    }

    #[test]
    fn acquire_is_exclusive_until_guard_drops() {
        let task = idle_task(CancellationToken::new());

        let guard = task.try_acquire().expect("free task must be acquirable");
        assert!(task.try_acquire().is_none());
        drop(guard);
        assert!(task.try_acquire().is_some());
    }

    #[test]
    fn due_time_starts_unset() {
        let task = idle_task(CancellationToken::new());
        let mut guard = task.try_acquire().unwrap();
        assert_eq!(guard.next_due(), None);

        let now = Instant::now();
        guard.set_next_due(now);
        assert_eq!(guard.next_due(), Some(now));
    }

    #[test]
    fn state_written_by_one_holder_is_seen_by_the_next() {
        let task = Arc::new(ScheduledTask::new(
            "counter",
            Box::new(crate::routine::from_iter([Duration::from_millis(7), Duration::from_millis(9)])),
            CancellationToken::new(),
        ));
        let due = Instant::now();

        let writer = {
            let task = task.clone();
            std::thread::spawn(move || {
                let mut guard = task.try_acquire().unwrap();
                assert_eq!(guard.routine_mut().step().unwrap(), Step::Continue(Duration::from_millis(7)));
                guard.set_next_due(due);
            })
        };
        writer.join().unwrap();

        let mut guard = task.try_acquire().unwrap();
        assert_eq!(guard.next_due(), Some(due));
        assert_eq!(guard.routine_mut().step().unwrap(), Step::Continue(Duration::from_millis(9)));
        assert_eq!(guard.routine_mut().step().unwrap(), Step::Done);
    }

    #[test]
    fn cancellation_token_disposes_lazily() {
        let cancel = CancellationToken::new();
        let task = idle_task(cancel.clone());
        assert!(!task.is_disposed());

        cancel.cancel();
        assert!(task.is_disposed());
    }

    #[test]
    fn disposal_is_monotonic() {
        let task = Arc::new(idle_task(CancellationToken::new()));
        let handle = TaskHandle::new(task.clone());
        handle.cancel();
        assert!(handle.is_finished());
        assert!(task.is_disposed());
        // nothing clears it again
        drop(task.try_acquire());
        assert!(handle.is_finished());
    }

    #[test]
    fn ids_are_unique() {
        let a = idle_task(CancellationToken::new());
        let b = idle_task(CancellationToken::new());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn concurrent_acquire_admits_one_holder() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::Barrier;

        let task = Arc::new(idle_task(CancellationToken::new()));
        let inside = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let task = task.clone();
                let inside = inside.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..10_000 {
                        if let Some(_guard) = task.try_acquire() {
                            assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                            inside.fetch_sub(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }
    }
}
