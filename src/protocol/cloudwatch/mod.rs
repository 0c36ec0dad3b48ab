//! Metrics provider built on `aws-sdk-cloudwatch`
//!
//! `ListMetrics` pages and `GetMetricStatistics` calls are issued against a
//! client for the region being analysed.

mod client;

pub use client::CloudWatchClient;

/// Namespace S3 publishes its daily storage metrics under
pub const S3_NAMESPACE: &str = "AWS/S3";
