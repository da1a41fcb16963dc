//! Shared helpers for integration tests

#![allow(dead_code)]

use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, ReentrantMutex};

/// Route crate logs to stderr once per test binary
pub fn init_logging() {
    parallel_batch::logging::init();
}

/// Thread-safe accumulator guarded by a reentrant lock
#[derive(Clone)]
pub struct Counter {
    inner: Arc<ReentrantMutex<Cell<i64>>>,
}

impl Counter {
    pub fn new(initial: i64) -> Self {
        Self {
            inner: Arc::new(ReentrantMutex::new(Cell::new(initial))),
        }
    }

    pub fn increment(&self) {
        self.add(1);
    }

    pub fn add(&self, x: i64) {
        let guard = self.inner.lock();
        guard.set(guard.get() + x);
    }

    pub fn value(&self) -> i64 {
        self.inner.lock().get()
    }
}

/// One-shot signal, set once and observed by any number of waiters
#[derive(Clone, Default)]
pub struct Event {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        let (flag, cond) = &*self.state;
        *flag.lock() = true;
        cond.notify_all();
    }

    pub fn is_set(&self) -> bool {
        *self.state.0.lock()
    }

    /// Wait until set; false if `timeout` elapsed first
    pub fn wait(&self, timeout: Duration) -> bool {
        let (flag, cond) = &*self.state;
        let mut guard = flag.lock();
        cond.wait_while_for(&mut guard, |set| !*set, timeout);
        *guard
    }
}
