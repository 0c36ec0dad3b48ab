//! Errors raised by the gauge registry and the sinks

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ObservabilityError>;

#[derive(Debug, Error)]
pub enum ObservabilityError {
    /// Registry or encoder failure
    #[error("Prometheus error: {0}")]
    Prometheus(String),

    /// A gauge was used with label names other than the ones it was created with
    #[error("Gauge {name} has labels {expected:?}, got {got:?}")]
    LabelMismatch {
        name: String,
        expected: Vec<String>,
        got: Vec<String>,
    },

    /// Push to the gateway failed
    #[error("Push to {url} failed: {message}")]
    Push { url: String, message: String },

    /// Text file could not be written
    #[error("Failed to write {path}: {source}")]
    TextFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Gauge registry lock poisoned by a panicking writer
    #[error("Gauge registry lock poisoned")]
    Poisoned,
}

impl From<prometheus::Error> for ObservabilityError {
    fn from(err: prometheus::Error) -> Self {
        ObservabilityError::Prometheus(err.to_string())
    }
}
