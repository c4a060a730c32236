use colored::Colorize;
use env_logger::Builder;
use log::Level;
use std::io::Write;

pub fn setup_logging(verbose: bool) {
    use log::LevelFilter;

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Stdout is the data channel (one digest per line); everything here goes
    // to stderr via env_logger's default target.
    Builder::from_default_env()
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_PKG_NAME"), level) // Our crate: use requested level
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME").cyan();
            let line = match record.level() {
                Level::Error => format!(
                    "[{} {} {}] {}",
                    name,
                    "ERROR".red(),
                    record.target(),
                    record.args()
                ),
                Level::Warn => format!(
                    "[{} {} {}] {}",
                    name,
                    "WARN".yellow(),
                    record.target(),
                    record.args()
                ),
                Level::Debug | Level::Trace => format!(
                    "[{} {}] {}",
                    name,
                    record.level().to_string().dimmed(),
                    record.args()
                ),
                Level::Info => format!("[{}] {}", name, record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .init();
}
