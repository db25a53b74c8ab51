//! Tracing subscriber setup.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Where log output goes.
#[derive(Debug, Clone, Copy)]
pub enum LogTarget<'a> {
    Stderr,
    /// Append to a file; used while the terminal UI owns the screen.
    File(&'a Path),
}

fn filter_for(verbosity: u8) -> EnvFilter {
    let default = match verbosity {
        0 => "warn",
        1 => "remark=info",
        2 => "remark=debug",
        _ => "remark=trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. `RUST_LOG` wins over `verbosity`.
pub fn init(verbosity: u8, target: LogTarget<'_>) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbosity))
        .with_target(false);

    match target {
        LogTarget::Stderr => builder
            .with_writer(io::stderr)
            .try_init()
            .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}")),
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create log directory {}", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))
        }
    }
}
