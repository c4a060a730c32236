//! Fetchsum CLI: crawl pages and print one digest per fetched resource.

use anyhow::Result;
use clap::Parser;
use fetchsum::engine::arg_parser::Cli;
use fetchsum::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
