//! Load `.fetchsum.toml` from the working directory (CLI only). Lib callers
//! inject config through `FetchsumOpts` instead.

use serde::Deserialize;
use std::path::Path;

use crate::types::Opts;

#[derive(Debug, Deserialize)]
pub(crate) struct FetchsumToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    workers: Option<usize>,
    queue_cap: Option<usize>,
    timeout: Option<u64>,
}

/// Load `.fetchsum.toml` from `dir` if present. None when missing or unreadable.
pub(crate) fn load_fetchsum_toml(dir: &Path) -> Option<FetchsumToml> {
    let path = dir.join(".fetchsum.toml");
    let s = std::fs::read_to_string(&path).ok()?;
    toml::from_str(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Fill opts fields the CLI left unset. CLI flags always win.
pub(crate) fn apply_file_to_opts(file: &FetchsumToml, opts: &mut Opts) {
    let settings = &file.settings;
    if opts.workers.is_none() {
        opts.workers = settings.workers;
    }
    if opts.queue_cap.is_none() {
        opts.queue_cap = settings.queue_cap;
    }
    if opts.timeout_secs.is_none() {
        opts.timeout_secs = settings.timeout;
    }
}
