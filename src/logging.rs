//! File logging.
//!
//! The terminal belongs to the UI, so events only go somewhere when a log file
//! is configured. Without one no subscriber is installed and `tracing` macros
//! are no-ops.

use std::fs::OpenOptions;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::Level;

pub fn init(log_file: Option<&Path>, level: Option<&str>) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_max_level(parse_level(level))
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {}", e))?;

    Ok(())
}

fn parse_level(level: Option<&str>) -> Level {
    level
        .and_then(|l| Level::from_str(l.trim()).ok())
        .unwrap_or(Level::INFO)
}
