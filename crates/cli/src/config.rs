//! Monitor configuration
//!
//! Lives at `.vigil/config.toml`. Every field has a default so a
//! missing or partial file still yields a runnable configuration;
//! `vigil init` writes the full commented example.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use vigil_core::ALERT_THRESHOLD;

/// Top-level configuration for the daemon and the CLI display
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub watch: WatchConfig,
    pub alerts: AlertConfig,
    pub anomaly: AnomalyConfig,
    pub display: DisplayConfig,
}

/// What to watch and how aggressively to debounce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Extra roots to monitor besides the platform defaults
    pub paths: Vec<PathBuf>,
    /// Gitignore-style patterns dropped before classification
    pub ignore: Vec<String>,
    /// Quiet period a file must hold before its burst of writes is emitted
    pub quiet_ms: u64,
    /// How often pending bursts are checked for expiry
    pub poll_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            ignore: Vec::new(),
            quiet_ms: 2000,
            poll_ms: 100,
        }
    }
}

/// Alerting policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Scores strictly above this raise an alert
    pub threshold: u8,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            threshold: ALERT_THRESHOLD,
        }
    }
}

/// Anomaly detection cadence and baseline shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Seconds between detection passes
    pub cadence_secs: u64,
    /// Size of the trailing window each pass inspects
    pub window_hours: i64,
    /// How long a computed baseline is served before recomputation
    pub baseline_ttl_secs: u64,
    /// Below this many sampled events the fallback baseline is used
    pub min_sample_events: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            cadence_secs: 900,
            window_hours: 24,
            baseline_ttl_secs: 300,
            min_sample_events: 24,
        }
    }
}

/// Presentation-only knobs; these never change what gets stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Where the high band starts in listings and stats
    pub high_risk_threshold: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            high_risk_threshold: 70,
        }
    }
}

impl MonitorConfig {
    /// Reject values that would make the daemon thrash or never fire
    pub fn validate(&self) -> Result<()> {
        let watch = &self.watch;
        if !(100..=60_000).contains(&watch.quiet_ms) {
            anyhow::bail!("watch.quiet_ms must be between 100 and 60000");
        }
        if !(10..=10_000).contains(&watch.poll_ms) {
            anyhow::bail!("watch.poll_ms must be between 10 and 10000");
        }
        if watch.quiet_ms < watch.poll_ms {
            anyhow::bail!("watch.quiet_ms must be at least watch.poll_ms");
        }
        if self.alerts.threshold > 100 {
            anyhow::bail!("alerts.threshold must be between 0 and 100");
        }
        let anomaly = &self.anomaly;
        if !(60..=86_400).contains(&anomaly.cadence_secs) {
            anyhow::bail!("anomaly.cadence_secs must be between 60 and 86400");
        }
        if !(1..=168).contains(&anomaly.window_hours) {
            anyhow::bail!("anomaly.window_hours must be between 1 and 168");
        }
        if anomaly.baseline_ttl_secs > 86_400 {
            anyhow::bail!("anomaly.baseline_ttl_secs must be at most 86400");
        }
        if self.display.high_risk_threshold > 100 {
            anyhow::bail!("display.high_risk_threshold must be between 0 and 100");
        }
        Ok(())
    }
}

/// Path of the config file inside a data directory
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Load configuration, treating a missing file as all-defaults
pub fn load(data_dir: &Path) -> Result<MonitorConfig> {
    let path = config_path(data_dir);
    if !path.exists() {
        return Ok(MonitorConfig::default());
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: MonitorConfig =
        toml::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Persist configuration back to the data directory
pub fn save(config: &MonitorConfig, data_dir: &Path) -> Result<()> {
    let path = config_path(data_dir);
    let serialized =
        toml::to_string_pretty(config).context("Failed to serialize configuration")?;
    std::fs::write(&path, serialized)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Commented example written by `vigil init`
pub fn example_config() -> String {
    r#"# Vigil monitor configuration
# Remove or edit values as needed; missing keys fall back to defaults.

[watch]
# Extra roots to monitor besides the platform defaults.
paths = []
# Gitignore-style patterns dropped before classification.
ignore = []
# Quiet period a file must hold before its burst of writes is emitted.
quiet_ms = 2000
# How often pending bursts are checked for expiry.
poll_ms = 100

[alerts]
# Scores strictly above this raise an alert (0-100).
threshold = 70

[anomaly]
# Seconds between detection passes.
cadence_secs = 900
# Size of the trailing window each pass inspects.
window_hours = 24
# How long a computed baseline is served before recomputation.
baseline_ttl_secs = 300
# Below this many sampled events the fallback baseline is used.
min_sample_events = 24

[display]
# Where the high band starts in listings and stats (0-100).
high_risk_threshold = 70
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_pass_validation() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.alerts.threshold, 70);
        assert_eq!(config.watch.quiet_ms, 2000);
        assert_eq!(config.anomaly.cadence_secs, 900);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load(temp_dir.path()).unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            config_path(temp_dir.path()),
            "[alerts]\nthreshold = 85\n",
        )
        .unwrap();

        let config = load(temp_dir.path()).unwrap();
        assert_eq!(config.alerts.threshold, 85);
        assert_eq!(config.watch.quiet_ms, 2000);
        assert_eq!(config.anomaly.window_hours, 24);
    }

    #[test]
    fn test_save_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = MonitorConfig::default();
        config.watch.ignore = vec!["*.log".to_string(), "node_modules/".to_string()];
        config.anomaly.cadence_secs = 300;

        save(&config, temp_dir.path()).unwrap();
        let loaded = load(temp_dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = MonitorConfig::default();
        config.watch.quiet_ms = 50;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.watch.poll_ms = 5000;
        config.watch.quiet_ms = 1000;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.anomaly.window_hours = 0;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.alerts.threshold = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_file_rejected() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            config_path(temp_dir.path()),
            "[anomaly]\ncadence_secs = 5\n",
        )
        .unwrap();
        assert!(load(temp_dir.path()).is_err());
    }

    #[test]
    fn test_example_parses_to_defaults() {
        let config: MonitorConfig = toml::from_str(&example_config()).unwrap();
        assert_eq!(config, MonitorConfig::default());
    }
}
