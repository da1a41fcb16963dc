//! Dispatcher: turns one classified work item into a pending handle
//!
//! Blocking jobs go to the scheduler's worker pool (`spawn_blocking`) so they
//! never stall the scheduler thread. Deferred futures are spawned as tasks on
//! the scheduler itself. Dispatching never blocks and never runs user code on
//! the calling thread.

use std::any::Any;
use std::cell::Cell;

use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug_span, warn, Instrument};

use super::work::{DispatchKind, UnitResult, WorkItem};
use crate::error::{FailureKind, WorkItemFailure};

thread_local! {
    static ON_BATCH_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is running a blocking job of some batch
///
/// Such a thread sits inside a runtime context but never drives a scheduler,
/// so it may block on a nested batch.
pub(crate) fn on_batch_worker() -> bool {
    ON_BATCH_WORKER.with(Cell::get)
}

struct WorkerMark;

impl WorkerMark {
    fn enter() -> Self {
        ON_BATCH_WORKER.with(|flag| flag.set(true));
        WorkerMark
    }
}

impl Drop for WorkerMark {
    fn drop(&mut self) {
        ON_BATCH_WORKER.with(|flag| flag.set(false));
    }
}

/// Schedules work items onto one batch scheduler
#[derive(Debug, Clone)]
pub struct Dispatcher {
    handle: Handle,
}

impl Dispatcher {
    /// Bind to the scheduler behind `handle`
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Schedule `item`, which sits at `index` in its batch
    pub fn dispatch(&self, index: usize, item: WorkItem) -> PendingUnit {
        let kind = item.kind();
        let handle = match item {
            WorkItem::Blocking(job) => {
                let span = debug_span!("blocking_job", index);
                self.handle.spawn_blocking(move || {
                    let _mark = WorkerMark::enter();
                    span.in_scope(job)
                })
            }
            WorkItem::Deferred(future) => self
                .handle
                .spawn(future.instrument(debug_span!("scheduler_task", index))),
        };
        PendingUnit {
            index,
            kind,
            handle,
        }
    }
}

/// A scheduled unit not yet settled
#[derive(Debug)]
pub struct PendingUnit {
    index: usize,
    kind: DispatchKind,
    handle: JoinHandle<UnitResult>,
}

impl PendingUnit {
    /// Position of the unit in its batch
    pub fn index(&self) -> usize {
        self.index
    }

    /// How the unit was scheduled
    pub fn kind(&self) -> DispatchKind {
        self.kind
    }

    /// Wait for the unit; `None` on success
    pub async fn settle(self) -> Option<WorkItemFailure> {
        let kind = match self.handle.await {
            Ok(Ok(())) => return None,
            Ok(Err(e)) => FailureKind::Error(e),
            Err(e) => join_failure(e),
        };
        warn!(
            index = self.index,
            kind = %self.kind,
            error = %kind,
            "work item failed"
        );
        Some(WorkItemFailure {
            index: self.index,
            kind,
        })
    }
}

fn join_failure(err: JoinError) -> FailureKind {
    if err.is_panic() {
        FailureKind::Panicked(panic_message(err.into_panic()))
    } else {
        FailureKind::Error(anyhow::anyhow!("work item was cancelled"))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_blocking_job_runs_off_scheduler_thread() {
        let rt = runtime();
        let dispatcher = Dispatcher::new(rt.handle().clone());
        let caller = thread::current().id();
        let off_thread = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&off_thread);

        let pending = dispatcher.dispatch(
            0,
            WorkItem::blocking(move || {
                flag.store(thread::current().id() != caller, Ordering::SeqCst);
            }),
        );
        assert_eq!(pending.kind(), DispatchKind::Blocking);

        assert!(rt.block_on(pending.settle()).is_none());
        assert!(off_thread.load(Ordering::SeqCst));
    }

    #[test]
    fn test_deferred_task_runs_on_scheduler_thread() {
        let rt = runtime();
        let dispatcher = Dispatcher::new(rt.handle().clone());
        let caller = thread::current().id();
        let on_thread = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&on_thread);

        let pending = dispatcher.dispatch(
            3,
            WorkItem::deferred(async move {
                tokio::task::yield_now().await;
                flag.store(thread::current().id() == caller, Ordering::SeqCst);
            }),
        );
        assert_eq!(pending.index(), 3);
        assert_eq!(pending.kind(), DispatchKind::Deferred);

        assert!(rt.block_on(pending.settle()).is_none());
        assert!(on_thread.load(Ordering::SeqCst));
    }

    #[test]
    fn test_error_is_kept_unwrapped() {
        let rt = runtime();
        let dispatcher = Dispatcher::new(rt.handle().clone());
        let pending = dispatcher.dispatch(
            1,
            WorkItem::blocking(|| Err::<(), _>(std::fmt::Error)),
        );

        let failure = rt.block_on(pending.settle()).unwrap();
        assert_eq!(failure.index, 1);
        assert!(failure.error().unwrap().is::<std::fmt::Error>());
    }

    #[test]
    fn test_panic_becomes_failure() {
        let rt = runtime();
        let dispatcher = Dispatcher::new(rt.handle().clone());
        let blocking = dispatcher.dispatch(0, WorkItem::blocking::<_, ()>(|| panic!("worker exploded")));
        let deferred = dispatcher.dispatch(
            1,
            WorkItem::deferred(async {
                let reason = String::from("task exploded");
                panic!("{}", reason);
                #[allow(unreachable_code)]
                ()
            }),
        );

        let failure = rt.block_on(blocking.settle()).unwrap();
        assert!(matches!(failure.kind, FailureKind::Panicked(ref m) if m == "worker exploded"));

        let failure = rt.block_on(deferred.settle()).unwrap();
        assert!(matches!(failure.kind, FailureKind::Panicked(ref m) if m == "task exploded"));
    }

    #[test]
    fn test_worker_mark_only_inside_blocking_job() {
        let rt = runtime();
        let dispatcher = Dispatcher::new(rt.handle().clone());
        let seen = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&seen);

        let pending = dispatcher.dispatch(
            0,
            WorkItem::blocking(move || flag.store(on_batch_worker(), Ordering::SeqCst)),
        );
        assert!(rt.block_on(pending.settle()).is_none());
        assert!(seen.load(Ordering::SeqCst));
        assert!(!on_batch_worker());

        let pending = dispatcher.dispatch(
            1,
            WorkItem::blocking(|| -> UnitResult {
                assert!(on_batch_worker());
                panic!("mid-job")
            }),
        );
        assert!(rt.block_on(pending.settle()).is_some());

        let pending = dispatcher.dispatch(2, WorkItem::deferred(async { assert!(!on_batch_worker()) }));
        assert!(rt.block_on(pending.settle()).is_none());
    }

    #[test]
    fn test_panic_message_fallback() {
        assert_eq!(panic_message(Box::new(42u8)), "non-string panic payload");
    }
}
