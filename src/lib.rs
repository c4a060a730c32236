//! Fetchsum: a bounded-concurrency stage pipeline that crawls pages, fetches
//! the resources they embed, and digests the bytes.

pub mod crawl;
pub mod engine;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use log::debug;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::fetch::HttpFetcher;
use crate::utils::config::HttpConsts;

/// Result alias used by public fetchsum API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: crawl `pages` with `opts` and return the run summary.
///
/// - **`on_digest: None`** → digests are only collected into the summary.
/// - **`on_digest: Some(f)`** → streaming; `f` is invoked for each digest as
///   it is emitted. It runs on the caller thread while the stage workers are
///   still busy, so keep it fast.
///
/// The call returns only after the terminal stage has drained: every seed has
/// either produced its digests or been filtered out along the way.
pub fn fetchsum_pages<F>(
    pages: &[String],
    opts: &FetchsumOpts,
    on_digest: Option<F>,
) -> Result<CrawlSummary>
where
    F: FnMut(&str),
{
    let opts = Opts::from(opts);
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );

    let timeout = Duration::from_secs(
        opts.timeout_secs
            .unwrap_or(HttpConsts::DEFAULT_TIMEOUT_SECS),
    );
    let fetcher = HttpFetcher::new(timeout)?;
    crawl::run_crawl(pages, &opts, Arc::new(fetcher), on_digest, None)
}
