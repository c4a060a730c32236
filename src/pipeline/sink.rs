//! NullSink: terminal consumer that accepts and discards items.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts and drops everything it is offered. Every predicated link owns one
/// as its discard path, so a rejected item is accounted for rather than lost.
pub struct NullSink {
    name: String,
    count: AtomicUsize,
}

impl NullSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: AtomicUsize::new(0),
        }
    }

    /// Accept an item and drop it.
    pub fn consume<T>(&self, item: T) {
        drop(item);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of items discarded so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
