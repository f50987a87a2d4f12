//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

use vigil_store::RiskBand;

/// Name of the data directory created by `vigil init`
pub const DATA_DIR_NAME: &str = ".vigil";

/// Environment override for the data directory location
pub const DATA_DIR_ENV: &str = "VIGIL_DIR";

/// Find the data directory: explicit override first, then walk up from cwd
pub fn find_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        let path = PathBuf::from(dir);
        if path.is_dir() {
            return Ok(path);
        }
        anyhow::bail!(
            "{} points at {} which is not a directory",
            DATA_DIR_ENV,
            path.display()
        );
    }

    let current = std::env::current_dir().context("Failed to get current directory")?;

    find_data_dir_from(&current).ok_or_else(|| {
        anyhow::anyhow!("Not inside a monitored directory (no .vigil found; run 'vigil init' first)")
    })
}

/// Walk up from `start` looking for a `.vigil` directory
pub fn find_data_dir_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let data_dir = current.join(DATA_DIR_NAME);
        if data_dir.is_dir() {
            return Some(data_dir);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return None,
        }
    }
}

/// OS user the daemon attributes events to
///
/// Plain environment lookup; on a headless box with none of these set
/// we still want the pipeline running, so fall back to "unknown".
pub fn current_actor() -> String {
    for var in ["USER", "LOGNAME", "USERNAME"] {
        if let Ok(value) = std::env::var(var) {
            if !value.is_empty() {
                return value;
            }
        }
    }
    "unknown".to_string()
}

/// Format timestamp as relative time ("2 hours ago")
pub fn format_relative_time(ts: DateTime<Utc>) -> String {
    let elapsed = Utc::now().signed_duration_since(ts);
    let seconds = elapsed.num_seconds();

    if seconds < 0 {
        "in the future".to_string()
    } else if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{} days ago", seconds / 86400)
    } else {
        format!("{} weeks ago", seconds / 604800)
    }
}

/// Format timestamp as absolute time ("2024-01-03 14:30:00")
pub fn format_absolute_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Right-align a score to three columns and color it by band
///
/// Pad before coloring: the ANSI escape codes would otherwise count
/// toward the field width.
pub fn paint_score(score: u8, high_floor: u8) -> String {
    let padded = format!("{:>3}", score);
    if score >= high_floor {
        padded.red().bold().to_string()
    } else if score >= RiskBand::MEDIUM_FLOOR {
        padded.yellow().to_string()
    } else {
        padded.green().to_string()
    }
}
