//! Pipeline assembly: attach stages, start workers, drive seeds, join.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::stage::{Stage, StageCtl, StageState};

/// Shared first-fault cell. The first recorded reason wins; once tripped,
/// every stage fast-drains so the run terminates instead of hanging.
pub(crate) struct FaultCell {
    tripped: AtomicBool,
    message: Mutex<Option<String>>,
}

impl FaultCell {
    fn new() -> Self {
        Self {
            tripped: AtomicBool::new(false),
            message: Mutex::new(None),
        }
    }

    pub(crate) fn trip(&self, message: String) {
        let _ = self.message.lock().unwrap().get_or_insert(message);
        self.tripped.store(true, Ordering::Release);
    }

    pub(crate) fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    fn take(&self) -> Option<String> {
        self.message.lock().unwrap().take()
    }
}

/// An acyclic network of stages. Stages attach themselves at construction;
/// wire links, then [`start`](Pipeline::start) (or just [`run`](Pipeline::run))
/// to spawn the workers.
///
/// Joining requires that every entry stage is eventually completed; a stage
/// with no upstream links and no `complete()` call never drains.
pub struct Pipeline {
    fault: Arc<FaultCell>,
    stages: Mutex<Vec<Box<dyn StageCtl>>>,
    started: AtomicBool,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            fault: Arc::new(FaultCell::new()),
            stages: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    pub(crate) fn fault_cell(&self) -> Arc<FaultCell> {
        Arc::clone(&self.fault)
    }

    pub(crate) fn attach(&self, stage: Box<dyn StageCtl>) {
        self.stages.lock().unwrap().push(stage);
    }

    /// Spawn every stage's workers. Idempotent.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        for stage in self.stages.lock().unwrap().iter() {
            stage.start();
        }
    }

    /// Abort the run with `reason`: stages stop processing, queues drain, and
    /// [`join`](Pipeline::join) surfaces the reason as an error. This is the
    /// alternate completion path used for cancellation.
    pub fn trip(&self, reason: &str) {
        self.fault.trip(reason.to_string());
    }

    pub fn faulted(&self) -> bool {
        self.fault.is_tripped()
    }

    /// Wait for every worker, in attach (dependency) order, then surface the
    /// first recorded fault if any. Returns exactly when the last-attached
    /// stage's final worker has exited, i.e. when the terminal stage is
    /// `Completed`.
    pub fn join(&self) -> anyhow::Result<()> {
        for stage in self.stages.lock().unwrap().iter() {
            stage.join()?;
        }
        if let Some(message) = self.fault.take() {
            anyhow::bail!(message);
        }
        Ok(())
    }

    /// Drive the network: submit each seed to `entry` in order (sequential, so
    /// a bounded entry queue throttles admission), complete the entry stage,
    /// then wait for the whole graph to drain.
    pub fn run<I, O>(
        &self,
        entry: &Stage<I, O>,
        seeds: impl IntoIterator<Item = I>,
    ) -> anyhow::Result<()>
    where
        I: Send + 'static,
        O: Clone + Send + 'static,
    {
        self.start();
        for seed in seeds {
            if self.faulted() {
                break;
            }
            if let Err(rejected) = entry.submit(seed) {
                self.trip(&format!("entry stage '{}': {}", entry.name(), rejected));
                break;
            }
        }
        entry.complete();
        self.join()
    }

    /// Name and state of every attached stage, in attach order (diagnostics).
    pub fn states(&self) -> Vec<(String, StageState)> {
        self.stages
            .lock()
            .unwrap()
            .iter()
            .map(|s| (s.name().to_string(), s.state()))
            .collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
