//! Application state shared across handlers

use analyser_observability::GaugeRegistry;
use s3_analyser::protocol::{MetricsProvider, StorageProvider};
use s3_analyser::{AnalyserConfig, RunLock};
use std::sync::Arc;

/// Shared by every request
///
/// Requests run one at a time through `lock`; gauges persist across runs.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageProvider>,
    pub metrics: Arc<dyn MetricsProvider>,
    pub gauges: Arc<GaugeRegistry>,
    pub lock: RunLock,

    /// Shared secret expected in the `token` parameter
    pub token: Arc<str>,

    /// Base configuration each request is layered on
    pub config: Arc<AnalyserConfig>,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn StorageProvider>,
        metrics: Arc<dyn MetricsProvider>,
        token: &str,
        config: AnalyserConfig,
    ) -> Self {
        Self {
            storage,
            metrics,
            gauges: Arc::new(GaugeRegistry::new()),
            lock: RunLock::new(),
            token: Arc::from(token),
            config: Arc::new(config),
        }
    }
}
