//! Tracing subscriber setup.
//!
//! `RUST_LOG` controls verbosity (default `warn`). CLI commands log to
//! stderr. The TUI owns the terminal, so while it runs logs go to
//! `<root>/ticketdesk.log` instead.

use std::fs::{self, OpenOptions};
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use crate::error::Result;
use crate::paths::log_path;

const DEFAULT_FILTER: &str = "warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Log to stderr. Safe to call more than once.
pub fn init_stderr() {
    let _ = fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Log to the desk's log file. Safe to call more than once.
pub fn init_file() -> Result<()> {
    let path = log_path();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let _ = fmt()
        .with_env_filter(env_filter())
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .try_init();
    Ok(())
}
