//! Progress display for runs with unknown totals.

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

/// Create a counter-style bar. A crawl never knows its total up front (the
/// fan-out stage decides it), so progress is a count, not a percentage.
pub fn create_counter(desc: &'static str) -> Arc<Mutex<Bar>> {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        unit = " resources"
    )))
}

/// Advance the counter by one. try_lock so a contended bar never blocks the
/// emitting thread; a skipped tick only costs display accuracy.
pub fn tick_counter(bar: &Arc<Mutex<Bar>>) {
    if let Ok(mut bar) = bar.try_lock() {
        let _ = bar.update(1);
    }
}
