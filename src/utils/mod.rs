pub mod config;
pub mod fd_limit;
pub mod fetchsum_toml;
pub mod logger;

pub use config::{HttpConsts, WORKER_CEILING, worker_count};
pub use fd_limit::{FDS_PER_WORKER, max_open_fds, max_workers_by_fd_limit};
pub use logger::setup_logging;
