//! Work items and per-item targets
//!
//! A [`WorkItem`] is one unit of a batch, already classified as either a
//! blocking closure or a deferred future. An [`Invoke`] is the target of the
//! range and for-each shapes: its kind is fixed when it is constructed, so the
//! entry layer classifies it once and binds every index or element the same way.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};

/// Result every unit reduces to once executed
pub type UnitResult = anyhow::Result<()>;

/// Return values a unit of work may produce
///
/// Results are discarded; only success or failure is observed. Implemented for
/// `()` and for `Result<(), E>` with any error convertible into [`anyhow::Error`].
pub trait WorkOutcome {
    /// Reduce the return value to success or failure
    fn into_result(self) -> UnitResult;
}

impl WorkOutcome for () {
    fn into_result(self) -> UnitResult {
        Ok(())
    }
}

impl<E> WorkOutcome for std::result::Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_result(self) -> UnitResult {
        self.map_err(Into::into)
    }
}

/// How a unit is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchKind {
    /// Runs to completion on its own worker thread
    Blocking,
    /// Resumed cooperatively on the batch scheduler
    Deferred,
}

impl fmt::Display for DispatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchKind::Blocking => write!(f, "blocking"),
            DispatchKind::Deferred => write!(f, "deferred"),
        }
    }
}

type BlockingJob = Box<dyn FnOnce() -> UnitResult + Send + 'static>;

/// One classified unit of a batch
pub enum WorkItem {
    /// A closure that never yields to the scheduler
    Blocking(BlockingJob),
    /// A future resumed at its own suspension points
    Deferred(BoxFuture<'static, UnitResult>),
}

impl WorkItem {
    /// Wrap a zero-argument closure as a blocking job
    pub fn blocking<F, O>(job: F) -> Self
    where
        F: FnOnce() -> O + Send + 'static,
        O: WorkOutcome,
    {
        WorkItem::Blocking(Box::new(move || job().into_result()))
    }

    /// Register an already-constructed future as a scheduler task
    ///
    /// The future is not polled until the batch runs.
    pub fn deferred<Fut>(future: Fut) -> Self
    where
        Fut: Future + Send + 'static,
        Fut::Output: WorkOutcome,
    {
        WorkItem::Deferred(async move { future.await.into_result() }.boxed())
    }

    /// Classification of this unit
    pub fn kind(&self) -> DispatchKind {
        match self {
            WorkItem::Blocking(_) => DispatchKind::Blocking,
            WorkItem::Deferred(_) => DispatchKind::Deferred,
        }
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorkItem::{}", self.kind())
    }
}

enum Target<T> {
    Blocking(Arc<dyn Fn(T) -> UnitResult + Send + Sync>),
    Deferred(Arc<dyn Fn(T) -> BoxFuture<'static, UnitResult> + Send + Sync>),
}

/// Per-item target for [`for_range`](crate::for_range) and [`for_each`](crate::for_each)
///
/// ```
/// use parallel_batch::{DispatchKind, Invoke};
///
/// let square = Invoke::blocking(|i: i64| {
///     let _ = i * i;
/// });
/// assert_eq!(square.kind(), DispatchKind::Blocking);
///
/// let wait = Invoke::deferred(|ms: u64| async move {
///     tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
/// });
/// assert_eq!(wait.kind(), DispatchKind::Deferred);
/// ```
pub struct Invoke<T> {
    target: Target<T>,
}

impl<T: Send + 'static> Invoke<T> {
    /// A plain function, run as one blocking job per item
    pub fn blocking<F, O>(f: F) -> Self
    where
        F: Fn(T) -> O + Send + Sync + 'static,
        O: WorkOutcome,
    {
        Self {
            target: Target::Blocking(Arc::new(move |item: T| f(item).into_result())),
        }
    }

    /// A future-producing function, run as one scheduler task per item
    pub fn deferred<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: WorkOutcome,
    {
        Self {
            target: Target::Deferred(Arc::new(move |item: T| {
                let future = f(item);
                async move { future.await.into_result() }.boxed()
            })),
        }
    }

    /// Classification of the target, fixed at construction
    pub fn kind(&self) -> DispatchKind {
        match self.target {
            Target::Blocking(_) => DispatchKind::Blocking,
            Target::Deferred(_) => DispatchKind::Deferred,
        }
    }

    /// Bind one item to the target
    ///
    /// For a deferred target this only builds the future; nothing runs yet.
    pub fn bind(&self, item: T) -> WorkItem {
        match &self.target {
            Target::Blocking(f) => {
                let f = Arc::clone(f);
                WorkItem::Blocking(Box::new(move || f(item)))
            }
            Target::Deferred(f) => WorkItem::Deferred(f(item)),
        }
    }
}

impl<T> Clone for Invoke<T> {
    fn clone(&self) -> Self {
        let target = match &self.target {
            Target::Blocking(f) => Target::Blocking(Arc::clone(f)),
            Target::Deferred(f) => Target::Deferred(Arc::clone(f)),
        };
        Self { target }
    }
}

impl<T> fmt::Debug for Invoke<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.target {
            Target::Blocking(_) => DispatchKind::Blocking,
            Target::Deferred(_) => DispatchKind::Deferred,
        };
        write!(f, "Invoke::{}", kind)
    }
}

/// Ordered work items of one batch call
#[derive(Debug, Default)]
pub struct Batch {
    items: Vec<WorkItem>,
}

impl Batch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a unit; insertion order is submission order
    pub fn push(&mut self, item: WorkItem) {
        self.items.push(item);
    }

    /// Number of units
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the batch holds no units
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of units of the given kind
    pub fn count(&self, kind: DispatchKind) -> usize {
        self.items.iter().filter(|item| item.kind() == kind).count()
    }

    /// Build a batch by binding every item to `invoke`
    pub fn bind_all<T, I>(items: I, invoke: &Invoke<T>) -> Self
    where
        T: Send + 'static,
        I: IntoIterator<Item = T>,
    {
        items.into_iter().map(|item| invoke.bind(item)).collect()
    }
}

impl FromIterator<WorkItem> for Batch {
    fn from_iter<I: IntoIterator<Item = WorkItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Batch {
    type Item = WorkItem;
    type IntoIter = std::vec::IntoIter<WorkItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
