//! Entry points: invoke-many, parallel range and parallel for-each
//!
//! Each call validates its arguments before anything is scheduled, builds a
//! fresh [`Batch`] and hands it to a new [`BatchCoordinator`].

use tracing::debug;

use super::config::ParallelConfig;
use super::coordinator::BatchCoordinator;
use super::work::{Batch, Invoke, WorkItem};
use crate::error::{Error, Result};

/// Batch entry points sharing one configuration
///
/// ```
/// use parallel_batch::{Invoke, Parallel, WorkItem};
/// use std::sync::atomic::{AtomicI64, Ordering};
/// use std::sync::Arc;
///
/// # fn main() -> parallel_batch::Result<()> {
/// let parallel = Parallel::new();
/// let total = Arc::new(AtomicI64::new(0));
///
/// let acc = Arc::clone(&total);
/// parallel.for_range(0, 10, Invoke::blocking(move |i: i64| {
///     acc.fetch_add(i, Ordering::SeqCst);
/// }))?;
/// assert_eq!(total.load(Ordering::SeqCst), 45);
///
/// parallel.invoke([
///     WorkItem::blocking(|| println!("Task A")),
///     WorkItem::deferred(async { println!("Task B") }),
/// ])?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Parallel {
    config: ParallelConfig,
}

impl Parallel {
    /// Entry points with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry points with a validated configuration
    pub fn with_config(config: ParallelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration every batch of this instance uses
    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Run the given units concurrently and wait for all of them
    ///
    /// Fails with [`Error::ArgumentError`] before scheduling anything when
    /// `items` is empty.
    pub fn invoke<I>(&self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = WorkItem>,
    {
        let batch: Batch = items.into_iter().collect();
        if batch.is_empty() {
            return Err(Error::argument("invoke requires at least one work item"));
        }
        self.run(batch)
    }

    /// Run `invoke` once for every index in `start..stop`
    ///
    /// An empty range is a valid, empty batch.
    pub fn for_range(&self, start: i64, stop: i64, invoke: Invoke<i64>) -> Result<()> {
        self.range().start(start).stop(stop).invoke(invoke).run()
    }

    /// Run `invoke` once for every element of `items`
    pub fn for_each<T, I>(&self, items: I, invoke: Invoke<T>) -> Result<()>
    where
        T: Send + 'static,
        I: IntoIterator<Item = T>,
    {
        self.each().items(items).invoke(invoke).run()
    }

    /// Builder form of [`for_range`](Self::for_range)
    pub fn range(&self) -> ForRange<'_> {
        ForRange {
            parallel: self,
            start: None,
            stop: None,
            invoke: None,
        }
    }

    /// Builder form of [`for_each`](Self::for_each)
    pub fn each<T: Send + 'static>(&self) -> ForEach<'_, T> {
        ForEach {
            parallel: self,
            items: None,
            invoke: None,
        }
    }

    fn run(&self, batch: Batch) -> Result<()> {
        BatchCoordinator::new(self.config.clone()).run_all(batch)
    }
}

/// Parallel `for` loop over a half-open index range
///
/// Every argument is required; [`run`](Self::run) reports a missing one as
/// [`Error::TypeError`] without scheduling anything.
#[derive(Debug)]
#[must_use = "a ForRange does nothing until run"]
pub struct ForRange<'a> {
    parallel: &'a Parallel,
    start: Option<i64>,
    stop: Option<i64>,
    invoke: Option<Invoke<i64>>,
}

impl ForRange<'_> {
    /// First index (inclusive)
    pub fn start(mut self, start: i64) -> Self {
        self.start = Some(start);
        self
    }

    /// End of the range (exclusive)
    pub fn stop(mut self, stop: i64) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Target run for each index
    pub fn invoke(mut self, invoke: Invoke<i64>) -> Self {
        self.invoke = Some(invoke);
        self
    }

    /// Validate, build the batch and run it
    pub fn run(self) -> Result<()> {
        let invoke = self.invoke.ok_or_else(|| Error::missing("`invoke` target"))?;
        let start = self.start.ok_or_else(|| Error::missing("`start` index"))?;
        let stop = self.stop.ok_or_else(|| Error::missing("`stop` index"))?;

        debug!(start, stop, kind = %invoke.kind(), "building range batch");
        self.parallel.run(Batch::bind_all(start..stop, &invoke))
    }
}

/// Parallel for-each over the elements of a collection
///
/// Elements are bound in iteration order. A missing argument is reported by
/// [`run`](Self::run) as [`Error::TypeError`].
#[must_use = "a ForEach does nothing until run"]
pub struct ForEach<'a, T> {
    parallel: &'a Parallel,
    items: Option<Vec<T>>,
    invoke: Option<Invoke<T>>,
}

impl<T: Send + 'static> ForEach<'_, T> {
    /// Elements to process
    pub fn items<I>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        self.items = Some(items.into_iter().collect());
        self
    }

    /// Target run for each element
    pub fn invoke(mut self, invoke: Invoke<T>) -> Self {
        self.invoke = Some(invoke);
        self
    }

    /// Validate, build the batch and run it
    pub fn run(self) -> Result<()> {
        let items = self.items.ok_or_else(|| Error::missing("`items` collection"))?;
        let invoke = self.invoke.ok_or_else(|| Error::missing("`invoke` target"))?;

        debug!(items = items.len(), kind = %invoke.kind(), "building for-each batch");
        self.parallel.run(Batch::bind_all(items, &invoke))
    }
}

impl<T> std::fmt::Debug for ForEach<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForEach")
            .field("items", &self.items.as_ref().map(Vec::len))
            .field("invoke", &self.invoke)
            .finish()
    }
}

/// [`Parallel::invoke`] with the default configuration
pub fn invoke<I>(items: I) -> Result<()>
where
    I: IntoIterator<Item = WorkItem>,
{
    Parallel::new().invoke(items)
}

/// [`Parallel::for_range`] with the default configuration
pub fn for_range(start: i64, stop: i64, invoke: Invoke<i64>) -> Result<()> {
    Parallel::new().for_range(start, stop, invoke)
}

/// [`Parallel::for_each`] with the default configuration
pub fn for_each<T, I>(items: I, invoke: Invoke<T>) -> Result<()>
where
    T: Send + 'static,
    I: IntoIterator<Item = T>,
{
    Parallel::new().for_each(items, invoke)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(hits: &Arc<AtomicUsize>) -> Invoke<i64> {
        let hits = Arc::clone(hits);
        Invoke::blocking(move |_: i64| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_invoke_empty_is_argument_error() {
        let err = invoke(Vec::<WorkItem>::new()).unwrap_err();
        assert!(matches!(err, Error::ArgumentError { .. }));
    }

    #[test]
    fn test_range_missing_invoke() {
        let err = Parallel::new().range().start(0).stop(3).run().unwrap_err();
        assert!(matches!(err, Error::TypeError { ref expected, .. } if expected.contains("invoke")));
    }

    #[test]
    fn test_range_missing_bounds_does_not_schedule() {
        let hits = Arc::new(AtomicUsize::new(0));
        let parallel = Parallel::new();

        let err = parallel.range().invoke(counting(&hits)).stop(3).run().unwrap_err();
        assert!(matches!(err, Error::TypeError { ref expected, .. } if expected.contains("start")));

        let err = parallel.range().invoke(counting(&hits)).start(0).run().unwrap_err();
        assert!(matches!(err, Error::TypeError { ref expected, .. } if expected.contains("stop")));

        assert!(parallel.range().run().is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_and_reversed_ranges_accepted() {
        let hits = Arc::new(AtomicUsize::new(0));
        assert!(for_range(5, 5, counting(&hits)).is_ok());
        assert!(for_range(5, 2, counting(&hits)).is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_range_negative_bounds() {
        let hits = Arc::new(AtomicUsize::new(0));
        for_range(-3, 2, counting(&hits)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_each_missing_arguments() {
        let parallel = Parallel::new();

        let err = parallel.each::<i32>().run().unwrap_err();
        assert!(matches!(err, Error::TypeError { ref expected, .. } if expected.contains("items")));

        let err = parallel.each().items([1, 2, 3]).run().unwrap_err();
        assert!(matches!(err, Error::TypeError { ref expected, .. } if expected.contains("invoke")));
    }

    #[test]
    fn test_each_empty_collection_accepted() {
        let result = for_each(Vec::<u8>::new(), Invoke::blocking(|_: u8| ()));
        assert!(result.is_ok());
    }

    #[test]
    fn test_with_config_validates() {
        let config = ParallelConfig {
            max_workers: 0,
            ..Default::default()
        };
        assert!(Parallel::with_config(config).is_err());

        let config = ParallelConfig {
            max_workers: 4,
            ..Default::default()
        };
        assert_eq!(Parallel::with_config(config).unwrap().config().max_workers, 4);
    }
}
