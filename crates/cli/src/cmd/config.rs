//! Configuration management command
//!
//! Provides CLI interface to view and edit monitor configuration.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use crate::config;
use crate::util;

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let data_dir = util::find_data_dir()?;
    let monitor_config = config::load(&data_dir)?;
    let config_path = config::config_path(&data_dir);

    println!("{}", "Monitor Configuration".bold());
    println!(
        "{}: {}\n",
        "Location".dimmed(),
        config_path.display().dimmed()
    );

    println!("{}", "[watch]".yellow());
    println!("  {} = {:?}", "paths".cyan(), monitor_config.watch.paths);
    println!("  {} = {:?}", "ignore".cyan(), monitor_config.watch.ignore);
    println!(
        "  {} = {} {}",
        "quiet_ms".cyan(),
        monitor_config.watch.quiet_ms,
        format!("({:.1}s)", monitor_config.watch.quiet_ms as f64 / 1000.0).dimmed()
    );
    println!("  {} = {}", "poll_ms".cyan(), monitor_config.watch.poll_ms);

    println!("\n{}", "[alerts]".yellow());
    println!(
        "  {} = {}",
        "threshold".cyan(),
        monitor_config.alerts.threshold
    );

    println!("\n{}", "[anomaly]".yellow());
    println!(
        "  {} = {} {}",
        "cadence_secs".cyan(),
        monitor_config.anomaly.cadence_secs,
        format!("({} min)", monitor_config.anomaly.cadence_secs / 60).dimmed()
    );
    println!(
        "  {} = {}",
        "window_hours".cyan(),
        monitor_config.anomaly.window_hours
    );
    println!(
        "  {} = {}",
        "baseline_ttl_secs".cyan(),
        monitor_config.anomaly.baseline_ttl_secs
    );
    println!(
        "  {} = {}",
        "min_sample_events".cyan(),
        monitor_config.anomaly.min_sample_events
    );

    println!("\n{}", "[display]".yellow());
    println!(
        "  {} = {}",
        "high_risk_threshold".cyan(),
        monitor_config.display.high_risk_threshold
    );

    println!("\n{}", "Valid Ranges:".bold());
    println!("  quiet_ms: 100-60000 (at least poll_ms)");
    println!("  poll_ms: 10-10000");
    println!("  threshold: 0-100");
    println!("  cadence_secs: 60-86400");
    println!("  window_hours: 1-168");
    println!("  baseline_ttl_secs: 0-86400");
    println!("  high_risk_threshold: 0-100");

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let data_dir = util::find_data_dir()?;
    let monitor_config = config::load(&data_dir)?;

    let value = match key {
        "watch.quiet_ms" => monitor_config.watch.quiet_ms.to_string(),
        "watch.poll_ms" => monitor_config.watch.poll_ms.to_string(),
        "alerts.threshold" => monitor_config.alerts.threshold.to_string(),
        "anomaly.cadence_secs" => monitor_config.anomaly.cadence_secs.to_string(),
        "anomaly.window_hours" => monitor_config.anomaly.window_hours.to_string(),
        "anomaly.baseline_ttl_secs" => monitor_config.anomaly.baseline_ttl_secs.to_string(),
        "anomaly.min_sample_events" => monitor_config.anomaly.min_sample_events.to_string(),
        "display.high_risk_threshold" => monitor_config.display.high_risk_threshold.to_string(),
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'vigil config list' to see available keys.",
            key
        ),
    };

    println!("{}", value);
    Ok(())
}

/// Set a configuration value
///
/// Scalar keys only; list values (watch.paths, watch.ignore) are
/// edited in the file directly.
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let data_dir = util::find_data_dir()?;
    let mut monitor_config = config::load(&data_dir)?;

    match key {
        "watch.quiet_ms" => {
            let val: u64 = value
                .parse()
                .context("Invalid value: must be a positive integer")?;
            monitor_config.watch.quiet_ms = val;
        }
        "watch.poll_ms" => {
            let val: u64 = value
                .parse()
                .context("Invalid value: must be a positive integer")?;
            monitor_config.watch.poll_ms = val;
        }
        "alerts.threshold" => {
            let val: u8 = value
                .parse()
                .context("Invalid value: must be an integer between 0 and 100")?;
            monitor_config.alerts.threshold = val;
        }
        "anomaly.cadence_secs" => {
            let val: u64 = value
                .parse()
                .context("Invalid value: must be a positive integer")?;
            monitor_config.anomaly.cadence_secs = val;
        }
        "anomaly.window_hours" => {
            let val: i64 = value
                .parse()
                .context("Invalid value: must be a positive integer")?;
            monitor_config.anomaly.window_hours = val;
        }
        "anomaly.baseline_ttl_secs" => {
            let val: u64 = value
                .parse()
                .context("Invalid value: must be a non-negative integer")?;
            monitor_config.anomaly.baseline_ttl_secs = val;
        }
        "anomaly.min_sample_events" => {
            let val: usize = value
                .parse()
                .context("Invalid value: must be a non-negative integer")?;
            monitor_config.anomaly.min_sample_events = val;
        }
        "display.high_risk_threshold" => {
            let val: u8 = value
                .parse()
                .context("Invalid value: must be an integer between 0 and 100")?;
            monitor_config.display.high_risk_threshold = val;
        }
        "watch.paths" | "watch.ignore" => anyhow::bail!(
            "{} is a list; edit {} directly",
            key,
            config::config_path(&data_dir).display()
        ),
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'vigil config list' to see available keys.",
            key
        ),
    }

    // Validate before saving
    monitor_config
        .validate()
        .context("Invalid configuration value")?;

    config::save(&monitor_config, &data_dir)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    println!(
        "{}",
        "Note: Restart daemon for changes to take effect (vigil stop && vigil start)".yellow()
    );

    Ok(())
}

/// Show the config file path
pub async fn run_path() -> Result<()> {
    let data_dir = util::find_data_dir()?;
    let config_path = config::config_path(&data_dir);

    println!("{}", config_path.display());
    if !config_path.exists() {
        println!("{}", "File does not exist; defaults are in effect.".yellow());
    }

    Ok(())
}
