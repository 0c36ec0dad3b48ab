/*!
 * Configuration types for s3-analyser
 *
 * Layering: defaults < TOML file < environment < command line flags.
 */

use crate::error::{AnalyserError, Result};
use crate::export::{RAW_JOB, SUMMARY_JOB};
use crate::protocol::s3::MAX_KEYS_PER_PAGE;
use crate::protocol::ProviderConfig;
use crate::report::{ReportFormat, SizeUnit};
use analyser_observability::MetricsSink;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Push gateway URL; selects the gateway sink when set
pub const ENV_PUSH_GATEWAY: &str = "PROM_GATEWAY";

/// Text file written by the metrics summary
pub const ENV_TEXT_FILE: &str = "PROM_TEXT";

/// Text file written by the raw traversal
pub const ENV_RAW_TEXT_FILE: &str = "S3_PROM_TEXT";

const DEFAULT_TEXT_FILE: &str = "s3-metrics.prom";

/// Which pipeline a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Daily storage metrics from the metrics API
    #[default]
    Metrics,

    /// Exhaustive object listing
    Raw,
}

/// Main configuration of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyserConfig {
    /// Unit of the byte columns
    #[serde(default)]
    pub unit: SizeUnit,

    /// Bucket filter, `s3://glob[/sub/path]`
    #[serde(default)]
    pub prefix: Option<String>,

    /// Worker count; `None` uses the available parallelism
    #[serde(default)]
    pub concurrency: Option<usize>,

    #[serde(default)]
    pub format: ReportFormat,

    #[serde(default)]
    pub mode: AnalysisMode,

    /// Page-size cap for raw object listings
    #[serde(default)]
    pub max_keys: Option<i32>,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub log_level: LogLevel,

    /// Write JSON logs to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub verbose: bool,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            unit: SizeUnit::default(),
            prefix: None,
            concurrency: None,
            format: ReportFormat::default(),
            mode: AnalysisMode::default(),
            max_keys: None,
            export: ExportConfig::default(),
            provider: ProviderConfig::default(),
            log_level: LogLevel::default(),
            log_file: None,
            verbose: false,
        }
    }
}

/// Gauge export settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Commit gauges at the end of a run
    pub enabled: bool,

    /// Push gateway URL; the text file is used when unset
    pub push_gateway: Option<String>,

    /// Text file of the metrics summary
    pub text_file: PathBuf,

    /// Text file of the raw traversal
    pub raw_text_file: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            push_gateway: None,
            text_file: PathBuf::from(DEFAULT_TEXT_FILE),
            raw_text_file: PathBuf::from(DEFAULT_TEXT_FILE),
        }
    }
}

impl ExportConfig {
    /// Sink for a run in `mode`
    pub fn sink(&self, mode: AnalysisMode) -> MetricsSink {
        let (path, job) = match mode {
            AnalysisMode::Metrics => (&self.text_file, SUMMARY_JOB),
            AnalysisMode::Raw => (&self.raw_text_file, RAW_JOB),
        };
        MetricsSink::select(self.push_gateway.as_deref(), path, job)
    }
}

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("unknown log level '{}'", s)),
        }
    }
}

impl AnalyserConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AnalyserError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents).map_err(|e| {
            AnalyserError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Overlay the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Overlay variables looked up through `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_PUSH_GATEWAY) {
            self.export.push_gateway = Some(url);
        }
        if let Some(path) = non_empty(ENV_TEXT_FILE) {
            self.export.text_file = PathBuf::from(path);
        }
        if let Some(path) = non_empty(ENV_RAW_TEXT_FILE) {
            self.export.raw_text_file = PathBuf::from(path);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == Some(0) {
            return Err(AnalyserError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }

        if let Some(max_keys) = self.max_keys {
            if !(1..=MAX_KEYS_PER_PAGE).contains(&max_keys) {
                return Err(AnalyserError::Config(format!(
                    "max_keys must be between 1 and {}",
                    MAX_KEYS_PER_PAGE
                )));
            }
        }

        self.provider
            .validate()
            .map_err(|e| AnalyserError::Config(e.to_string()))
    }
}
