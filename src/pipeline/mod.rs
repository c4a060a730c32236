//! Stage network: bounded-worker transform stages wired by predicated links,
//! with completion cascading downstream once every upstream source has drained.

pub mod graph;
pub mod link;
pub mod sink;
pub mod stage;

pub use graph::Pipeline;
pub use sink::NullSink;
pub use stage::{Rejected, Stage, StageOpts, StageState};

/// Bound for a stage's input queue. Bounded gives blocking-send backpressure;
/// unbounded lets producers run ahead of consumers (the default, matching a
/// driver that posts every seed before waiting on anything).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueueCap {
    #[default]
    Unbounded,
    Bounded(usize),
}
