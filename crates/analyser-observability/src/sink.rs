//! Metrics sinks: push gateway or local text file

use crate::error::{ObservabilityError, Result};
use crate::gauges::GaugeRegistry;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Where a run's gauges are committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsSink {
    /// Push every family to a Prometheus push gateway under `job`
    PushGateway { url: String, job: String },

    /// Overwrite a text exposition file
    TextFile { path: PathBuf },
}

impl MetricsSink {
    /// Pick the gateway when one is configured, the text file otherwise
    pub fn select(push_gateway: Option<&str>, text_file: &Path, job: &str) -> Self {
        match push_gateway {
            Some(url) if !url.trim().is_empty() => MetricsSink::PushGateway {
                url: url.to_string(),
                job: job.to_string(),
            },
            _ => MetricsSink::TextFile {
                path: text_file.to_path_buf(),
            },
        }
    }

    /// Commit the registry's current snapshot
    pub fn commit(&self, registry: &GaugeRegistry) -> Result<()> {
        match self {
            MetricsSink::PushGateway { url, job } => push(url, job, registry),
            MetricsSink::TextFile { path } => write_text_file(path, registry),
        }
    }
}

impl std::fmt::Display for MetricsSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsSink::PushGateway { url, job } => write!(f, "push gateway {} (job {})", url, job),
            MetricsSink::TextFile { path } => write!(f, "text file {}", path.display()),
        }
    }
}

fn push(url: &str, job: &str, registry: &GaugeRegistry) -> Result<()> {
    let families = registry.gather();
    let count = families.len();

    prometheus::push_metrics(job, HashMap::new(), url, families, None).map_err(|e| {
        ObservabilityError::Push {
            url: url.to_string(),
            message: e.to_string(),
        }
    })?;

    tracing::info!("Pushed {} metric families to {} as job {}", count, url, job);
    Ok(())
}

/// Write to a temporary file next to `path`, then rename it over `path`
fn write_text_file(path: &Path, registry: &GaugeRegistry) -> Result<()> {
    let text = registry.encode_text()?;
    let io_err = |source: std::io::Error| ObservabilityError::TextFile {
        path: path.display().to_string(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(text.as_bytes()).map_err(io_err)?;
    tmp.flush().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    tracing::info!("Wrote {} bytes of metrics to {}", text.len(), path.display());
    Ok(())
}
