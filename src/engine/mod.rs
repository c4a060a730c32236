//! Engine module: per-item collaborator functions and CLI plumbing.

pub mod arg_parser;
pub mod cli;
pub mod digest;
pub mod extract;
pub mod fetch;
pub mod progress;

// Re-export commonly used items
pub use arg_parser::Cli;
pub use cli::handle_run;
pub use digest::{DigestKind, digest_bytes, to_hex};
pub use extract::extract_references;
pub use fetch::{HttpFetcher, PageSource};
