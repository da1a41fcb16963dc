//! Parallel batch execution
//!
//! Runs a batch of blocking closures and async futures concurrently and joins
//! on all of them.

mod config;
mod coordinator;
mod dispatcher;
mod entry;
mod work;

pub use config::{ParallelConfig, ENV_MAX_WORKERS, ENV_WORKER_KEEP_ALIVE_MS};
pub use coordinator::BatchCoordinator;
pub use dispatcher::{Dispatcher, PendingUnit};
pub use entry::{for_each, for_range, invoke, ForEach, ForRange, Parallel};
pub use work::{Batch, DispatchKind, Invoke, UnitResult, WorkItem, WorkOutcome};
