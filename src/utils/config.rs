//! Application configuration constants.
//! Tuning and defaults in one place.

use crate::utils::fd_limit::max_workers_by_fd_limit;

// ---- HTTP ----

/// HTTP client defaults.
pub struct HttpConsts;

impl HttpConsts {
    /// Request timeout when none is configured (seconds).
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
    /// User agent sent with every request.
    pub const USER_AGENT: &'static str =
        concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
}

// ---- Workers ----

/// Ceiling on per-stage workers when nothing else caps them. Every lane of the
/// fetch stage may hold an open connection, so this also bounds concurrent
/// sockets per stage.
pub const WORKER_CEILING: usize = 32;

/// Per-stage worker count: explicit override wins, else available parallelism
/// capped by [`WORKER_CEILING`] and the FD limit.
pub fn worker_count(requested: Option<usize>) -> usize {
    if let Some(n) = requested {
        return n.max(1);
    }
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2);
    let capped = available.min(WORKER_CEILING);
    match max_workers_by_fd_limit() {
        Some(fd_cap) if fd_cap < capped => fd_cap.max(1),
        _ => capped,
    }
}
