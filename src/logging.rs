//! File-backed tracing setup. The terminal belongs to the UI, so logs never go to stderr.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub fn default_log_path() -> Option<PathBuf> {
    let base = dirs::data_local_dir()?;
    Some(base.join("batchpad").join("batchpad.log"))
}

/// Installs the global subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init(log_path: &Path) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let log_file = File::create(log_path)
        .with_context(|| format!("Failed to create {}", log_path.display()))?;

    build_subscriber(log_file)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

pub fn build_subscriber(log_file: File) -> impl tracing::Subscriber + Send + Sync {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_writer(Arc::new(log_file)).with_ansi(false);

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}
