//! Crawl pipeline assembly: load -> extract -> fetch -> hash -> encode -> emit.

use anyhow::Result;
use crossbeam_channel::{RecvTimeoutError, unbounded};
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use url::Url;

use crate::engine::digest::{digest_bytes, to_hex};
use crate::engine::extract::extract_references;
use crate::engine::fetch::PageSource;
use crate::pipeline::{Pipeline, QueueCap, Stage, StageOpts, StageState};
use crate::types::{CrawlSummary, Opts};
use crate::utils::config::worker_count;

/// Keep only locators the fetch stage can actually retrieve.
pub fn is_fetchable(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// How long the drain loop waits between cancellation checks.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Build and drive the whole stage graph. Seeds are submitted in order and the
/// entry stage completed; digests are received on the caller thread while the
/// workers run (so `on_digest` needs no `Send` or `'static`), and the call
/// returns once the terminal stage has drained.
///
/// A page or resource that fails to load produces no digest and no error; the
/// miss is counted at the link that filtered it out.
pub fn run_crawl<F>(
    seeds: &[String],
    opts: &Opts,
    source: Arc<dyn PageSource>,
    mut on_digest: Option<F>,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<CrawlSummary>
where
    F: FnMut(&str),
{
    let workers = worker_count(opts.workers);
    let queue = match opts.queue_cap {
        Some(cap) => QueueCap::Bounded(cap),
        None => QueueCap::Unbounded,
    };
    let stage_opts = StageOpts { workers, queue };
    debug!(
        "crawl: {} worker(s) per stage, queue {:?}, digest {:?}",
        workers, queue, opts.digest
    );

    let pl = Pipeline::new();

    let loader = {
        let source = Arc::clone(&source);
        Stage::transform(&pl, "load", stage_opts, move |page: String| {
            source.load(&page)
        })
    };
    let searcher = Stage::transform_many(&pl, "extract", stage_opts, |content: Option<String>| {
        content.map(|c| extract_references(&c)).unwrap_or_default()
    });
    let fetcher = {
        let source = Arc::clone(&source);
        Stage::transform(&pl, "fetch", stage_opts, move |url: Url| source.fetch(&url))
    };
    let hasher = {
        let kind = opts.digest;
        Stage::transform_many(&pl, "hash", stage_opts, move |bytes: Option<Vec<u8>>| {
            bytes
                .map(|b| vec![digest_bytes(kind, &b)])
                .unwrap_or_default()
        })
    };
    let encoder = Stage::transform(&pl, "encode", stage_opts, |digest: Vec<u8>| to_hex(&digest));
    let (out_tx, out_rx) = unbounded::<String>();
    let emitter = Stage::consume(&pl, "emit", StageOpts::default(), move |line: String| {
        let _ = out_tx.send(line);
    });

    let load_misses = loader.link_when(&searcher, |content: &Option<String>| content.is_some());
    let scheme_misses = searcher.link_when(&fetcher, is_fetchable);
    let fetch_misses = fetcher.link_when(&hasher, |bytes: &Option<Vec<u8>>| bytes.is_some());
    hasher.link_to(&encoder);
    encoder.link_to(&emitter);

    pl.start();
    for page in seeds {
        if pl.faulted() {
            break;
        }
        if let Err(rejected) = loader.submit(page.clone()) {
            pl.trip(&format!("submit '{}': {}", page, rejected));
            break;
        }
    }
    loader.complete();

    // Streaming receiver on the caller thread; the emit stage's closure (and
    // with it out_tx) is released when its worker exits, which closes out_rx.
    let mut digests = Vec::new();
    loop {
        match out_rx.recv_timeout(CANCEL_POLL) {
            Ok(line) => {
                if let Some(f) = on_digest.as_mut() {
                    f(&line);
                }
                digests.push(line);
            }
            Err(RecvTimeoutError::Timeout) => {
                if let Some(flag) = &cancel
                    && flag.load(Ordering::Relaxed)
                {
                    pl.trip("crawl cancelled by user");
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    pl.join()?;
    debug_assert_eq!(emitter.state(), StageState::Completed);
    debug!("crawl: stages drained: {:?}", pl.states());
    for misses in [&load_misses, &scheme_misses, &fetch_misses] {
        if misses.count() > 0 {
            debug!("{}: {} item(s) discarded", misses.name(), misses.count());
        }
    }

    Ok(CrawlSummary {
        pages: loader.processed(),
        pages_failed: load_misses.count(),
        refs_found: searcher.emitted(),
        refs_skipped: scheme_misses.count(),
        fetch_failed: fetch_misses.count(),
        digests,
    })
}
