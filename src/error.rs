/*!
 * Error types for the analyser
 */

use crate::protocol::ProviderError;
use analyser_observability::ObservabilityError;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalyserError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
/// Run aborted by a provider, export or I/O failure; no report was produced
pub const EXIT_ABORTED: i32 = 1;
pub const EXIT_FATAL: i32 = 2;
pub const EXIT_INTEGRITY: i32 = 3;

#[derive(Debug, Error)]
pub enum AnalyserError {
    /// Bucket name filter is malformed or selected nothing
    #[error("Invalid prefix \"{filter}\"; {reason}")]
    InvalidFilter { filter: String, reason: String },

    /// Region lookup failed for a bucket
    #[error("{bucket} {source}")]
    RegionResolution {
        bucket: String,
        #[source]
        source: ProviderError,
    },

    /// A datapoint named a bucket outside the directory
    #[error("Datapoint references unknown bucket {bucket} (region {region})")]
    UnknownBucket { bucket: String, region: String },

    /// Provider call failed
    #[error("Remote call failed: {0}")]
    RemoteCall(#[from] ProviderError),

    /// Another run holds the run lock
    #[error("There is already an analysis running")]
    RunAlreadyInProgress,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker pool could not be built
    #[error("Worker pool error: {0}")]
    Pool(String),

    /// Gauge registry or sink failure
    #[error("Metrics export failed: {0}")]
    Export(#[from] ObservabilityError),

    /// Report serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Error category for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Network,
    Integrity,
    Concurrency,
    Configuration,
    Export,
    IoError,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Network => "network",
            ErrorCategory::Integrity => "integrity",
            ErrorCategory::Concurrency => "concurrency",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Export => "export",
            ErrorCategory::IoError => "io",
        };
        f.write_str(name)
    }
}

impl AnalyserError {
    /// Shorthand for an `InvalidFilter` error
    pub fn invalid_filter(filter: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalyserError::InvalidFilter {
            filter: filter.into(),
            reason: reason.into(),
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            AnalyserError::InvalidFilter { .. }
            | AnalyserError::Config(_)
            | AnalyserError::RegionResolution { .. }
            | AnalyserError::Pool(_) => EXIT_FATAL,
            AnalyserError::UnknownBucket { .. } => EXIT_INTEGRITY,
            _ => EXIT_ABORTED,
        }
    }

    /// Check if the error came from a provider call
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            AnalyserError::RemoteCall(_) | AnalyserError::RegionResolution { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            AnalyserError::InvalidFilter { .. } => ErrorCategory::Validation,
            AnalyserError::RegionResolution { .. } | AnalyserError::RemoteCall(_) => {
                ErrorCategory::Network
            }
            AnalyserError::UnknownBucket { .. } => ErrorCategory::Integrity,
            AnalyserError::RunAlreadyInProgress | AnalyserError::Pool(_) => {
                ErrorCategory::Concurrency
            }
            AnalyserError::Config(_) => ErrorCategory::Configuration,
            AnalyserError::Export(_) | AnalyserError::Serialization(_) => ErrorCategory::Export,
            AnalyserError::Io(_) => ErrorCategory::IoError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_constants() {
        assert_eq!(EXIT_SUCCESS, 0);
        assert_eq!(EXIT_ABORTED, 1);
        assert_eq!(EXIT_FATAL, 2);
        assert_eq!(EXIT_INTEGRITY, 3);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            AnalyserError::invalid_filter("s3://x*", "no bucket selected").exit_code(),
            EXIT_FATAL
        );
        assert_eq!(
            AnalyserError::UnknownBucket {
                bucket: "ghost".to_string(),
                region: "us-east-1".to_string()
            }
            .exit_code(),
            EXIT_INTEGRITY
        );
        assert_eq!(
            AnalyserError::RemoteCall(ProviderError::Network("reset".to_string())).exit_code(),
            EXIT_ABORTED
        );
        assert_eq!(AnalyserError::RunAlreadyInProgress.exit_code(), EXIT_ABORTED);
    }

    #[test]
    fn test_display_messages() {
        let err = AnalyserError::invalid_filter("s3://nomatch*", "no bucket selected");
        assert_eq!(
            err.to_string(),
            "Invalid prefix \"s3://nomatch*\"; no bucket selected"
        );

        let err = AnalyserError::RegionResolution {
            bucket: "locked".to_string(),
            source: ProviderError::AccessDenied("denied".to_string()),
        };
        assert_eq!(err.to_string(), "locked Access denied: denied");
        assert!(err.is_remote());
        assert_eq!(err.category(), ErrorCategory::Network);

        assert_eq!(
            AnalyserError::RunAlreadyInProgress.to_string(),
            "There is already an analysis running"
        );
    }
}
