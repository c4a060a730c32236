//! Stage: a bounded worker pool over an input queue, emitting to links.

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use log::debug;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use super::QueueCap;
use super::graph::{FaultCell, Pipeline};
use super::link::{Link, LinkFilter, SourceObserver};
use super::sink::NullSink;

/// Lifecycle of a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageState {
    /// Accepting submissions.
    Open,
    /// No new submissions accepted; queued items still processed.
    Draining,
    /// Queue empty, every worker exited. Terminal.
    Completed,
}

/// Returned by [`Stage::submit`] once the stage has left `Open`. Submitting to
/// a draining stage is a driver bug, not a recoverable condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rejected;

impl std::fmt::Display for Rejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage is no longer accepting items")
    }
}

impl std::error::Error for Rejected {}

/// Worker count and queue bound for one stage.
#[derive(Clone, Copy, Debug)]
pub struct StageOpts {
    /// Concurrent transform invocations (one dedicated thread per lane).
    pub workers: usize,
    /// Input queue bound.
    pub queue: QueueCap,
}

impl Default for StageOpts {
    fn default() -> Self {
        Self {
            workers: 1,
            queue: QueueCap::Unbounded,
        }
    }
}

pub(crate) type Transform<I, O> = Arc<dyn Fn(I) -> Vec<O> + Send + Sync>;

pub(crate) struct StageCore<I, O> {
    name: String,
    workers: usize,
    rx: Receiver<I>,
    /// The stage's own share of its input channel. Dropped on drain so the
    /// channel disconnects once every upstream link lets go too.
    keeper: Mutex<Option<Sender<I>>>,
    /// Taken at start and handed to the workers, so the closure (and whatever
    /// it captures) is released as soon as the last worker exits.
    transform: Mutex<Option<Transform<I, O>>>,
    pending_links: Mutex<Vec<Link<O>>>,
    state: Mutex<StageState>,
    /// Upstream links not yet done. The stage drains when this hits zero.
    sources_open: AtomicUsize,
    active: AtomicUsize,
    processed: AtomicUsize,
    emitted: AtomicUsize,
    handles: Mutex<Vec<JoinHandle<()>>>,
    fault: Arc<FaultCell>,
}

impl<I, O> StageCore<I, O> {
    fn begin_drain(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == StageState::Open {
            *state = StageState::Draining;
            drop(state);
            self.keeper.lock().unwrap().take();
        }
    }
}

impl<I, O> SourceObserver for StageCore<I, O>
where
    I: Send,
    O: Send,
{
    fn source_done(&self) {
        if self.sources_open.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.begin_drain();
        }
    }
}

/// One node of the stage network: wraps a per-item transformation function and
/// runs it across up to `workers` lanes, reading from the input queue and
/// offering each output to every registered link in registration order.
///
/// Handles are cheap clones over shared state; wire links before the pipeline
/// starts.
pub struct Stage<I, O> {
    core: Arc<StageCore<I, O>>,
}

impl<I, O> Clone for Stage<I, O> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<I, O> Stage<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    /// One-to-one transform stage.
    pub fn transform<F>(pipeline: &Pipeline, name: &str, opts: StageOpts, f: F) -> Self
    where
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        Self::transform_many(pipeline, name, opts, move |item| vec![f(item)])
    }

    /// Fan-out stage: zero or more outputs per input, emitted in order.
    pub fn transform_many<F>(pipeline: &Pipeline, name: &str, opts: StageOpts, f: F) -> Self
    where
        F: Fn(I) -> Vec<O> + Send + Sync + 'static,
    {
        let (tx, rx) = match opts.queue {
            QueueCap::Unbounded => unbounded(),
            QueueCap::Bounded(cap) => bounded(cap),
        };
        let core = Arc::new(StageCore {
            name: name.to_string(),
            workers: opts.workers.max(1),
            rx,
            keeper: Mutex::new(Some(tx)),
            transform: Mutex::new(Some(Arc::new(f) as Transform<I, O>)),
            pending_links: Mutex::new(Vec::new()),
            state: Mutex::new(StageState::Open),
            sources_open: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            processed: AtomicUsize::new(0),
            emitted: AtomicUsize::new(0),
            handles: Mutex::new(Vec::new()),
            fault: pipeline.fault_cell(),
        });
        let stage = Self { core };
        pipeline.attach(Box::new(stage.clone()));
        stage
    }

    /// Enqueue an item for processing. Blocks when a bounded queue is full
    /// (backpressure); fails with [`Rejected`] once the stage has left `Open`.
    pub fn submit(&self, item: I) -> Result<(), Rejected> {
        // Clone the sender under the lock, send outside it: a blocking send on
        // a full bounded queue must not hold the state lock.
        let tx = {
            let state = self.core.state.lock().unwrap();
            if *state != StageState::Open {
                return Err(Rejected);
            }
            match self.core.keeper.lock().unwrap().as_ref() {
                Some(tx) => tx.clone(),
                None => return Err(Rejected),
            }
        };
        tx.send(item).map_err(|_| Rejected)
    }

    /// Mark that no further submissions will occur. Queued items still drain;
    /// completion propagates downstream once the last worker goes idle.
    pub fn complete(&self) {
        self.core.begin_drain();
    }

    /// Register an unconditional edge to `target`.
    pub fn link_to<U>(&self, target: &Stage<O, U>)
    where
        U: Clone + Send + 'static,
    {
        self.add_link(target, None);
    }

    /// Register a predicated edge to `target`. Items failing `filter` go to
    /// the returned discard sink instead of the target.
    pub fn link_when<U, P>(&self, target: &Stage<O, U>, filter: P) -> Arc<NullSink>
    where
        U: Clone + Send + 'static,
        P: Fn(&O) -> bool + Send + Sync + 'static,
    {
        self.add_link(target, Some(Box::new(filter)))
    }

    fn add_link<U>(&self, target: &Stage<O, U>, filter: Option<LinkFilter<O>>) -> Arc<NullSink>
    where
        U: Clone + Send + 'static,
    {
        let tx = target
            .core
            .keeper
            .lock()
            .unwrap()
            .as_ref()
            .expect("link target is already draining")
            .clone();
        target.core.sources_open.fetch_add(1, Ordering::SeqCst);
        let discard = Arc::new(NullSink::new(format!(
            "{}->{} rejects",
            self.core.name, target.core.name
        )));
        let link = Link::new(
            tx,
            Arc::clone(&target.core) as Arc<dyn SourceObserver>,
            filter,
            Arc::clone(&discard),
        );
        self.core.pending_links.lock().unwrap().push(link);
        discard
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn state(&self) -> StageState {
        *self.core.state.lock().unwrap()
    }

    /// Items whose transform ran to completion.
    pub fn processed(&self) -> usize {
        self.core.processed.load(Ordering::Relaxed)
    }

    /// Output items offered to the links.
    pub fn emitted(&self) -> usize {
        self.core.emitted.load(Ordering::Relaxed)
    }
}

impl<I> Stage<I, ()>
where
    I: Send + 'static,
{
    /// Terminal action stage: runs `f` per item, emits nothing.
    pub fn consume<F>(pipeline: &Pipeline, name: &str, opts: StageOpts, f: F) -> Self
    where
        F: Fn(I) + Send + Sync + 'static,
    {
        Self::transform_many(pipeline, name, opts, move |item| {
            f(item);
            Vec::new()
        })
    }
}

/// Start/join surface the assembly uses without knowing item types.
pub(crate) trait StageCtl: Send + Sync {
    fn start(&self);
    fn join(&self) -> anyhow::Result<()>;
    fn state(&self) -> StageState;
    fn name(&self) -> &str;
}

impl<I, O> StageCtl for Stage<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    fn start(&self) {
        let links = Arc::new(std::mem::take(
            &mut *self.core.pending_links.lock().unwrap(),
        ));
        let transform = self
            .core
            .transform
            .lock()
            .unwrap()
            .take()
            .expect("stage started twice");
        self.core.active.store(self.core.workers, Ordering::SeqCst);
        let mut handles = self.core.handles.lock().unwrap();
        for _ in 0..self.core.workers {
            let core = Arc::clone(&self.core);
            let links = Arc::clone(&links);
            let transform = Arc::clone(&transform);
            handles.push(thread::spawn(move || worker_loop(core, links, transform)));
        }
    }

    fn join(&self) -> anyhow::Result<()> {
        let handles: Vec<_> = self.core.handles.lock().unwrap().drain(..).collect();
        for handle in handles {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("worker of stage '{}' panicked", self.core.name))?;
        }
        Ok(())
    }

    fn state(&self) -> StageState {
        Stage::state(self)
    }

    fn name(&self) -> &str {
        &self.core.name
    }
}

/// One worker lane: items arrive in queue order, each output is offered to
/// every link before the lane takes its next item. The lane that exits last
/// fires the completion cascade.
fn worker_loop<I, O>(core: Arc<StageCore<I, O>>, links: Arc<Vec<Link<O>>>, transform: Transform<I, O>)
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    while let Ok(item) = core.rx.recv() {
        if core.fault.is_tripped() {
            // Fast drain: keep receiving so no upstream sender ever blocks on
            // a full queue, but process nothing further.
            continue;
        }
        let outputs = match catch_unwind(AssertUnwindSafe(|| (*transform)(item))) {
            Ok(outputs) => outputs,
            Err(payload) => {
                core.fault.trip(format!(
                    "stage '{}': transform panicked: {}",
                    core.name,
                    panic_message(payload.as_ref())
                ));
                continue;
            }
        };
        core.processed.fetch_add(1, Ordering::Relaxed);
        for output in outputs {
            core.emitted.fetch_add(1, Ordering::Relaxed);
            // Offered to every link in registration order; only the last
            // offer gets to move the item.
            if let Some((last, rest)) = links.split_last() {
                for link in rest {
                    link.offer(output.clone());
                }
                last.offer(output);
            }
        }
    }
    if core.active.fetch_sub(1, Ordering::SeqCst) == 1 {
        finish(&core, &links);
    }
}

/// Queue empty and every lane idle: mark terminal state and signal each linked
/// target that this source is done. The targets' queues disconnect shortly
/// after, when the last worker's share of the links is dropped.
fn finish<I, O>(core: &StageCore<I, O>, links: &[Link<O>]) {
    *core.state.lock().unwrap() = StageState::Completed;
    debug!(
        "stage '{}' completed ({} processed, {} emitted)",
        core.name,
        core.processed.load(Ordering::Relaxed),
        core.emitted.load(Ordering::Relaxed)
    );
    for link in links {
        link.done();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
