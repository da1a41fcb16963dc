//! Batch coordinator: one scheduler run and one join per batch
//!
//! Every coordinator builds its own current-thread tokio runtime. The calling
//! thread drives that runtime, so deferred units interleave cooperatively on
//! it while blocking jobs run on the runtime's worker pool. The runtime is
//! dropped when the run ends; nothing outlives the batch.

use std::thread;
use std::time::Instant;

use futures_util::future::join_all;
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};
use tracing::{debug, info_span};

use super::config::ParallelConfig;
use super::dispatcher::{on_batch_worker, Dispatcher, PendingUnit};
use super::work::{Batch, DispatchKind};
use crate::error::{BatchFailure, Error, Result};

/// Runs one batch to quiescence
///
/// Single-use: [`run_all`](Self::run_all) consumes the coordinator.
#[derive(Debug)]
pub struct BatchCoordinator {
    config: ParallelConfig,
}

impl BatchCoordinator {
    /// Create a coordinator for one batch
    pub fn new(config: ParallelConfig) -> Self {
        Self { config }
    }

    /// Schedule every unit, wait until all have settled, then report
    ///
    /// A failing unit never stops its siblings. When any unit failed, every
    /// failure is returned together as [`Error::Batch`].
    ///
    /// Blocks the calling thread. Called from inside an async runtime, the batch
    /// is driven from a dedicated thread so that its scheduler is never nested
    /// in the caller's.
    ///
    /// A thread that drives a current-thread runtime cannot block: its timers
    /// and I/O would stop, and any deferred unit built against them would
    /// never settle. Such callers, including `spawn_blocking` tasks of that
    /// runtime, get [`Error::SchedulerError`] before anything is scheduled.
    /// Blocking jobs of a running batch may still start nested batches.
    pub fn run_all(self, batch: Batch) -> Result<()> {
        if batch.is_empty() {
            debug!("empty batch, nothing to schedule");
            return Ok(());
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => return self.drive(batch),
        };

        if matches!(handle.runtime_flavor(), RuntimeFlavor::CurrentThread) && !on_batch_worker() {
            return Err(Error::SchedulerError(
                "cannot block a current-thread runtime; run the batch from a plain \
                 thread or a multi-thread runtime"
                    .to_string(),
            ));
        }

        thread::scope(|scope| -> Result<()> {
            let joined = thread::Builder::new()
                .name("parallel-batch".to_string())
                .spawn_scoped(scope, move || self.drive(batch))
                .map_err(|e| Error::SchedulerError(format!("failed to spawn batch thread: {}", e)))?
                .join();
            settle_batch_thread(joined)
        })
    }

    fn drive(self, batch: Batch) -> Result<()> {
        let batch_size = batch.len();
        let span = info_span!(
            "batch",
            size = batch_size,
            blocking = batch.count(DispatchKind::Blocking),
            deferred = batch.count(DispatchKind::Deferred)
        );
        let _enter = span.enter();

        let runtime = self.build_runtime()?;
        let dispatcher = Dispatcher::new(runtime.handle().clone());
        let started = Instant::now();

        let failures = runtime.block_on(async {
            let pending: Vec<PendingUnit> = batch
                .into_iter()
                .enumerate()
                .map(|(index, item)| dispatcher.dispatch(index, item))
                .collect();
            debug!(scheduled = pending.len(), "batch scheduled");

            join_all(pending.into_iter().map(PendingUnit::settle))
                .await
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
        });

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            failed = failures.len(),
            "batch settled"
        );

        match BatchFailure::new(failures, batch_size) {
            Some(failure) => Err(Error::Batch(failure)),
            None => Ok(()),
        }
    }

    fn build_runtime(&self) -> Result<Runtime> {
        Builder::new_current_thread()
            .enable_all()
            .max_blocking_threads(self.config.max_workers)
            .thread_keep_alive(self.config.worker_keep_alive())
            .thread_name(self.config.worker_thread_name.clone())
            .build()
            .map_err(|e| Error::SchedulerError(format!("failed to build batch scheduler: {}", e)))
    }
}

fn settle_batch_thread(joined: thread::Result<Result<()>>) -> Result<()> {
    joined.map_err(|_| Error::SchedulerError("batch thread panicked".to_string()))?
}
