//! Tracing initialization for the node binary.
//!
//! Console output (status tables, text messages) goes to stdout; structured
//! logs go to stderr, or are appended to a file when one is given.

use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize global tracing. `RUST_LOG` overrides the default `info` level.
///
/// With `log_file`, events are appended there (created if missing). If the
/// file cannot be opened, logging falls back to stderr with a warning.
pub fn init_tracing(log_file: Option<&Path>) {
    let file = log_file.and_then(|path| {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => Some(f),
            Err(e) => {
                eprintln!("Cannot open log file {}: {} (logging to stderr)", path.display(), e);
                None
            }
        }
    });

    match file {
        Some(f) => tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(Mutex::new(f))
            .with_target(true)
            .with_ansi(false)
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .init(),
    }
}
