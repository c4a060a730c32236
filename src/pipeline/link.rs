//! Links: predicated edges between stages, with per-link discard accounting.

use crossbeam_channel::Sender;
use std::sync::Arc;

use super::sink::NullSink;

/// Completion accounting seen from the target side: one call per registered
/// upstream link when that link's source finishes.
pub(crate) trait SourceObserver: Send + Sync {
    fn source_done(&self);
}

pub(crate) type LinkFilter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// A directed edge from one stage's output to another stage's input.
///
/// The link holds its own clone of the target's sender: the target's queue can
/// only disconnect once every upstream link (and the target's own keeper) has
/// let go, which is exactly the join-on-all-predecessors completion rule.
pub(crate) struct Link<T> {
    tx: Sender<T>,
    target: Arc<dyn SourceObserver>,
    filter: Option<LinkFilter<T>>,
    discard: Arc<NullSink>,
}

impl<T> Link<T> {
    pub(crate) fn new(
        tx: Sender<T>,
        target: Arc<dyn SourceObserver>,
        filter: Option<LinkFilter<T>>,
        discard: Arc<NullSink>,
    ) -> Self {
        Self {
            tx,
            target,
            filter,
            discard,
        }
    }

    /// Offer one item: a predicate pass forwards it to the target, a fail
    /// routes it to the discard sink. Either way the item ends up in exactly
    /// one place.
    pub(crate) fn offer(&self, item: T) {
        let pass = match &self.filter {
            Some(filter) => filter(&item),
            None => true,
        };
        if pass {
            // Blocks when the target queue is bounded and full (backpressure).
            let _ = self.tx.send(item);
        } else {
            self.discard.consume(item);
        }
    }

    /// Tell the target that this edge's source has completed.
    pub(crate) fn done(&self) {
        self.target.source_done();
    }
}
