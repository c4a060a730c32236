use clap::Parser;

use crate::engine::digest::DigestKind;

/// Crawl pages, fetch the resources they embed, print one digest per line.
#[derive(Clone, Parser)]
#[command(name = "fetchsum")]
#[command(about = "Crawl pages, fetch embedded resources, print one content digest per line.")]
pub struct Cli {
    /// Page URLs to crawl.
    #[arg(value_name = "URL", required = true)]
    pub urls: Vec<String>,

    /// Worker count per stage. Default: available parallelism, capped by the FD limit.
    #[arg(long, short)]
    pub workers: Option<usize>,

    /// Bound each stage queue to this many items (backpressure). Default: unbounded.
    #[arg(long, short)]
    pub queue_cap: Option<usize>,

    /// HTTP timeout in seconds.
    #[arg(long, short)]
    pub timeout: Option<u64>,

    /// Digest algorithm for fetched bytes.
    #[arg(long, short, value_enum, default_value = "sha1")]
    pub digest: DigestKind,

    /// Print a JSON summary (digests plus counters) instead of streaming lines.
    #[arg(long, short)]
    pub json: bool,

    /// Verbose output.
    #[arg(long, short)]
    pub verbose: bool,
}
