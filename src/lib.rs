/*!
 * s3-analyser - inventory the S3 buckets of an account
 *
 * - Bucket directory with glob selection and parallel region resolution
 * - Daily storage metrics folded per bucket, region and storage type
 * - Exhaustive raw traversal of every object as an alternative mode
 * - Prometheus gauges committed to a push gateway or a text file
 * - Table, CSV/TSV, HTML and JSON reports
 */

pub mod analysis;
pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod export;
pub mod logging;
pub mod protocol;
pub mod report;

// Re-export commonly used types
pub use analysis::{run, Analyser, MetricsSummary, RawSummary};
pub use config::{AnalyserConfig, AnalysisMode, ExportConfig, LogLevel};
pub use context::{RunContext, RunLock};
pub use error::{AnalyserError, Result};
pub use report::{ReportFormat, SizeUnit};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
