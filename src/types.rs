//! Options and run summary for the fetchsum API.

use serde::Serialize;

use crate::engine::digest::DigestKind;

/// Lib-facing options for [`fetchsum_pages`](crate::fetchsum_pages). Only the
/// fields that apply when using the crate (no CLI output concerns).
#[derive(Clone, Debug, Default)]
pub struct FetchsumOpts {
    /// Worker count per stage. When None, derived from available parallelism
    /// and the FD limit.
    pub workers: Option<usize>,
    /// Bound each stage's input queue to this many items (blocking-send
    /// backpressure). When None, queues are unbounded.
    pub queue_cap: Option<usize>,
    /// HTTP timeout in seconds. When None, the default from
    /// [`HttpConsts`](crate::utils::config::HttpConsts).
    pub timeout_secs: Option<u64>,
    /// Digest algorithm for fetched bytes.
    pub digest: DigestKind,
}

/// Full options (CLI and crawl). Use [`FetchsumOpts`] for lib.
#[derive(Clone, Debug, Default)]
pub struct Opts {
    /// Worker count per stage. When None, derived from available parallelism
    /// and the FD limit.
    pub workers: Option<usize>,
    /// Bound each stage's input queue. When None, unbounded.
    pub queue_cap: Option<usize>,
    /// HTTP timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Digest algorithm for fetched bytes.
    pub digest: DigestKind,
    /// Verbose output (debug logging and progress counter).
    pub verbose: bool,
    /// Print a JSON summary instead of streaming digest lines.
    pub json: bool,
}

impl From<&FetchsumOpts> for Opts {
    fn from(o: &FetchsumOpts) -> Self {
        Opts {
            workers: o.workers,
            queue_cap: o.queue_cap,
            timeout_secs: o.timeout_secs,
            digest: o.digest,
            verbose: false,
            json: false,
        }
    }
}

/// Result of one crawl run. Counters are read from the stages and the
/// per-link discard sinks after the graph has drained, so they are final.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CrawlSummary {
    /// Pages the load stage processed.
    pub pages: usize,
    /// Pages whose load failed (absent content, discarded at the first link).
    pub pages_failed: usize,
    /// Resource references the extract stage emitted.
    pub refs_found: usize,
    /// References rejected by the scheme predicate.
    pub refs_skipped: usize,
    /// Resources whose fetch failed.
    pub fetch_failed: usize,
    /// Hex digests in emission order, one per successfully fetched resource.
    pub digests: Vec<String>,
}
