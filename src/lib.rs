//! # parallel-batch - Run Mixed Work Concurrently and Join on All of It
//!
//! Runs a batch of heterogeneous units of work concurrently and blocks the
//! caller until every unit has finished. A unit is either a **blocking
//! closure**, which runs to completion on its own worker thread, or a
//! **deferred future**, which is resumed cooperatively on a single scheduler
//! thread. Both kinds run side by side in the same batch.
//!
//! ## Quick Start
//!
//! ```rust
//! use parallel_batch::{for_each, for_range, invoke, Invoke, WorkItem};
//! use std::sync::{Arc, Mutex};
//! use std::time::Duration;
//!
//! # fn main() -> parallel_batch::Result<()> {
//! // Several units, mixed kinds
//! invoke([
//!     WorkItem::blocking(|| std::thread::sleep(Duration::from_millis(10))),
//!     WorkItem::deferred(async { tokio::time::sleep(Duration::from_millis(10)).await }),
//! ])?;
//!
//! // A parallel `for` over 0..10
//! let sum = Arc::new(Mutex::new(0));
//! let acc = Arc::clone(&sum);
//! for_range(0, 10, Invoke::blocking(move |i: i64| {
//!     *acc.lock().unwrap() += i;
//! }))?;
//! assert_eq!(*sum.lock().unwrap(), 45);
//!
//! // A parallel for-each with an async target
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! for_each(vec!["a", "b", "c"], Invoke::deferred(move |item: &'static str| {
//!     let sink = Arc::clone(&sink);
//!     async move { sink.lock().unwrap().push(item) }
//! }))?;
//! assert_eq!(seen.lock().unwrap().len(), 3);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Entry point → validate → Batch → BatchCoordinator → Dispatcher → join all
//! ```
//!
//! - [`Parallel`] / [`invoke`] / [`for_range`] / [`for_each`] - validate arguments and build a [`Batch`]
//! - [`Invoke`] - per-item target, classified once as blocking or deferred
//! - [`BatchCoordinator`] - owns one current-thread tokio runtime per batch and waits for every unit
//! - [`Dispatcher`] - sends blocking jobs to the worker pool and futures to the scheduler
//!
//! ## Error Handling
//!
//! Argument problems are reported before anything is scheduled
//! ([`Error::ArgumentError`], [`Error::TypeError`]). A unit that fails or
//! panics never stops its siblings; once the batch has settled, every failure
//! is returned together in [`Error::Batch`]:
//!
//! ```rust
//! use parallel_batch::{invoke, Error, WorkItem};
//!
//! let result = invoke([
//!     WorkItem::blocking(|| Err::<(), _>(anyhow::anyhow!("disk full"))),
//!     WorkItem::blocking(|| ()),
//! ]);
//!
//! match result {
//!     Err(Error::Batch(failure)) => {
//!         assert_eq!(failure.len(), 1);
//!         assert_eq!(failure.first().index, 0);
//!     }
//!     other => panic!("expected a batch failure, got {:?}", other),
//! }
//! ```
//!
//! ## Logging
//!
//! Scheduling and failures are reported through `tracing`. Hosts without a
//! subscriber can call [`logging::init`].

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod logging;
pub mod parallel;

// Re-export main types
pub use error::{BatchFailure, Error, FailureKind, Result, WorkItemFailure};
pub use parallel::{
    for_each, for_range, invoke, Batch, BatchCoordinator, DispatchKind, Dispatcher, ForEach,
    ForRange, Invoke, Parallel, ParallelConfig, PendingUnit, UnitResult, WorkItem, WorkOutcome,
};
