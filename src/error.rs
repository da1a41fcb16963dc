//! Error types for parallel batch execution

use std::fmt;

use thiserror::Error;

/// Errors returned by the batch entry points
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors (raised before anything is scheduled)
    /// Invalid argument value
    ///
    /// **Triggered by:** `invoke` called with zero work items
    /// **Prevention:** Check the item list is non-empty before calling
    #[error("Argument error: {message}")]
    ArgumentError {
        /// Description of the rejected argument
        message: String,
    },

    /// Required argument missing or of the wrong shape
    ///
    /// **Triggered by:** `ForRange` / `ForEach` builders run without `start`,
    /// `stop`, `items` or `invoke`
    #[error("Type error: expected {expected}, got {got}")]
    TypeError {
        /// What the entry point needed
        expected: String,
        /// What it received
        got: String,
    },

    /// Configuration rejected by [`crate::ParallelConfig::validate`]
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration problem
        message: String,
    },

    // Scheduling errors
    /// The per-batch scheduler or its driving thread could not be started
    #[error("Scheduler error: {0}")]
    SchedulerError(String),

    // Execution errors
    /// One or more work items failed after the whole batch settled
    #[error(transparent)]
    Batch(#[from] BatchFailure),
}

impl Error {
    /// Create an argument error with a message
    pub fn argument(msg: impl Into<String>) -> Self {
        Error::ArgumentError {
            message: msg.into(),
        }
    }

    /// Create a type error for a missing argument
    pub fn missing(expected: impl Into<String>) -> Self {
        Error::TypeError {
            expected: expected.into(),
            got: "nothing".to_string(),
        }
    }

    /// Create a configuration error with a message
    pub fn config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig {
            message: msg.into(),
        }
    }

    /// True for errors raised before any work item was scheduled
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::ArgumentError { .. } | Error::TypeError { .. } | Error::InvalidConfig { .. }
        )
    }

    /// The aggregated work-item failures, if this is a batch failure
    pub fn batch_failure(&self) -> Option<&BatchFailure> {
        match self {
            Error::Batch(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Why a single work item did not succeed
#[derive(Debug)]
pub enum FailureKind {
    /// The unit returned an error; kept as-is
    Error(anyhow::Error),
    /// The unit panicked; holds the panic message when it was a string
    Panicked(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Error(e) => write!(f, "{}", e),
            FailureKind::Panicked(msg) => write!(f, "panicked: {}", msg),
        }
    }
}

/// Failure of one unit inside a batch
#[derive(Debug)]
pub struct WorkItemFailure {
    /// Position of the unit in the batch (submission order)
    pub index: usize,
    /// What went wrong
    pub kind: FailureKind,
}

impl WorkItemFailure {
    /// The unit's own error, when it returned one rather than panicking
    pub fn error(&self) -> Option<&anyhow::Error> {
        match &self.kind {
            FailureKind::Error(e) => Some(e),
            FailureKind::Panicked(_) => None,
        }
    }

    /// Whether the unit panicked
    pub fn is_panic(&self) -> bool {
        matches!(self.kind, FailureKind::Panicked(_))
    }
}

impl fmt::Display for WorkItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "work item {} failed: {}", self.index, self.kind)
    }
}

/// Every failure of a batch, ordered by submission index
///
/// Produced only after all units of the batch have settled. Failures are
/// never dropped: a batch with several failing units reports all of them.
#[derive(Debug)]
pub struct BatchFailure {
    failures: Vec<WorkItemFailure>,
    batch_size: usize,
}

impl BatchFailure {
    /// Build from collected failures; sorts them by index
    ///
    /// Returns `None` when `failures` is empty.
    pub fn new(mut failures: Vec<WorkItemFailure>, batch_size: usize) -> Option<Self> {
        if failures.is_empty() {
            return None;
        }
        failures.sort_by_key(|f| f.index);
        Some(Self {
            failures,
            batch_size,
        })
    }

    /// The failure with the lowest submission index
    pub fn first(&self) -> &WorkItemFailure {
        &self.failures[0]
    }

    /// All failures in submission order
    pub fn failures(&self) -> &[WorkItemFailure] {
        &self.failures
    }

    /// Consume into the failures
    pub fn into_failures(self) -> Vec<WorkItemFailure> {
        self.failures
    }

    /// Number of failed units
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Whether no unit failed
    ///
    /// [`BatchFailure::new`] refuses an empty list, so this is false for
    /// every value the crate hands out.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of units the batch contained
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} work items failed; first: {}",
            self.failures.len(),
            self.batch_size,
            self.first()
        )
    }
}

impl std::error::Error for BatchFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.first().kind {
            FailureKind::Error(e) => {
                let source: &(dyn std::error::Error + 'static) = e.as_ref();
                Some(source)
            }
            FailureKind::Panicked(_) => None,
        }
    }
}

/// Result type for batch operations
pub type Result<T> = std::result::Result<T, Error>;
