//! CLI command handler: crawl the given pages and print digests.

use anyhow::{Context, Result};
use log::info;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::crawl::run_crawl;
use crate::engine::arg_parser::Cli;
use crate::engine::fetch::HttpFetcher;
use crate::engine::progress::{create_counter, tick_counter};
use crate::types::Opts;
use crate::utils::config::HttpConsts;
use crate::utils::fetchsum_toml::{apply_file_to_opts, load_fetchsum_toml};
use crate::utils::setup_logging;

fn setup_opts(cli: &Cli) -> Opts {
    setup_logging(cli.verbose);
    let mut opts = Opts {
        workers: cli.workers,
        queue_cap: cli.queue_cap,
        timeout_secs: cli.timeout,
        digest: cli.digest,
        verbose: cli.verbose,
        json: cli.json,
    };
    // File config fills only what the CLI left unset; flags always win.
    if let Ok(dir) = std::env::current_dir()
        && let Some(file) = load_fetchsum_toml(&dir)
    {
        apply_file_to_opts(&file, &mut opts);
    }
    opts
}

/// Run the crawl: stream one digest per line to stdout (or print a JSON
/// summary with --json), log counters to stderr at the end. Ctrl-C trips the
/// pipeline, which drains and surfaces the cancellation as an error.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli);

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        cancel_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;

    let timeout = Duration::from_secs(
        opts.timeout_secs
            .unwrap_or(HttpConsts::DEFAULT_TIMEOUT_SECS),
    );
    let fetcher = HttpFetcher::new(timeout)?;

    let bar = (opts.verbose && !opts.json).then(|| create_counter("Fetching"));
    let on_digest = (!opts.json).then(|| {
        move |line: &str| {
            println!("{line}");
            if let Some(bar) = &bar {
                tick_counter(bar);
            }
        }
    });

    let summary = run_crawl(&cli.urls, &opts, Arc::new(fetcher), on_digest, Some(cancel))?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    info!(
        "{} digest(s) from {} page(s): {} page load(s) failed, {} reference(s) skipped by scheme, {} fetch(es) failed",
        summary.digests.len(),
        summary.pages,
        summary.pages_failed,
        summary.refs_skipped,
        summary.fetch_failed
    );
    Ok(())
}
