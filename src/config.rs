use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::report::key::MAX_KEY_PARTS;
use crate::report::{DataKind, ReportInfo};

/// Top-level configuration for the tickfold daemon.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Logging verbosity (debug, info, warn, error). Default: "info".
    #[serde(default = "default_log_level")]
    #[allow(dead_code)]
    pub log_level: String,

    /// Window timing shared by all report engines.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Synthetic workload generator (development harness).
    #[serde(default)]
    pub workload: WorkloadConfig,

    /// Reports to aggregate. At least one must be configured.
    pub reports: Vec<ReportConfig>,
}

/// Window timing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Duration of one aggregation tick. Default: 1s.
    #[serde(default = "default_tick_interval", with = "humantime_serde")]
    pub tick_interval: Duration,

    /// Closed ticks retained in each report's window. Default: 60.
    #[serde(default = "default_tick_count")]
    pub tick_count: usize,

    /// How often report snapshots are rendered to the log. Default: 10s.
    #[serde(default = "default_report_interval", with = "humantime_serde")]
    pub report_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            tick_count: default_tick_count(),
            report_interval: default_report_interval(),
        }
    }
}

/// Synthetic workload generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadConfig {
    /// Feed generated samples into every report. Default: false.
    #[serde(default)]
    pub enabled: bool,

    /// Delay between generated samples. Default: 10ms.
    #[serde(default = "default_sample_interval", with = "humantime_serde")]
    pub sample_interval: Duration,

    /// Distinct synthetic keys per report. Default: 16.
    #[serde(default = "default_keys_per_report")]
    pub keys_per_report: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sample_interval: default_sample_interval(),
            keys_per_report: default_keys_per_report(),
        }
    }
}

/// One aggregated report definition.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Report name, unique across the config.
    pub name: String,

    /// Table value shape (counter, latency).
    pub kind: DataKind,

    /// Number of key components rows are grouped by.
    pub key_parts: usize,

    /// Collect per-row latency histograms (latency reports only).
    #[serde(default)]
    pub hv_enabled: bool,
}

impl Config {
    /// Loads and validates configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let cfg: Config = serde_yaml::from_str(&raw).context("parsing YAML config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects configurations that would violate core invariants before any
    /// engine starts.
    pub fn validate(&self) -> Result<()> {
        if self.engine.tick_count == 0 {
            bail!("engine.tick_count must be > 0");
        }
        if self.engine.tick_interval.is_zero() {
            bail!("engine.tick_interval must be > 0");
        }
        if self.reports.is_empty() {
            bail!("at least one report must be configured");
        }

        let mut seen = HashSet::new();
        for report in &self.reports {
            if report.name.is_empty() {
                bail!("report name must not be empty");
            }
            if !seen.insert(report.name.as_str()) {
                bail!("duplicate report name '{}'", report.name);
            }
            if report.key_parts == 0 || report.key_parts > MAX_KEY_PARTS {
                bail!(
                    "report '{}': key_parts must be within 1..={}",
                    report.name,
                    MAX_KEY_PARTS
                );
            }
            if report.hv_enabled && report.kind != DataKind::Latency {
                bail!(
                    "report '{}': histograms require a latency report",
                    report.name
                );
            }
        }

        Ok(())
    }

    /// Builds the immutable metadata copy handed to a report engine.
    pub fn report_info(&self, report: &ReportConfig) -> ReportInfo {
        ReportInfo {
            name: Arc::from(report.name.as_str()),
            kind: report.kind,
            tick_interval: self.engine.tick_interval,
            tick_count: self.engine.tick_count,
            key_parts: report.key_parts,
            hv_enabled: report.hv_enabled,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_tick_count() -> usize {
    60
}

fn default_report_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_sample_interval() -> Duration {
    Duration::from_millis(10)
}

fn default_keys_per_report() -> usize {
    16
}
