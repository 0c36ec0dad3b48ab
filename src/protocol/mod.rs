/*!
 * Provider abstraction layer
 *
 * Two narrow, synchronous seams separate the analysis from the cloud:
 * - `StorageProvider`: bucket listing, location lookups and raw object pages
 * - `MetricsProvider`: metric descriptor pages and single statistics
 *
 * The AWS adapters (`s3`, `cloudwatch`) drive the async SDK on a runtime
 * handle; `mock` serves canned data for tests.
 */

pub mod aws;
pub mod cloudwatch;
pub mod config;
pub mod error;
pub mod mock;
pub mod s3;
pub mod types;

pub use config::{normalize_region, ProviderConfig, DEFAULT_REGION};
pub use error::{ProviderError, ProviderResult};
pub use types::{
    BucketListing, Dimension, ListCursor, ListObjectsRequest, MetricDescriptor, MetricUnit,
    MetricsPage, MetricsQuery, ObjectPage, ObjectRecord, Statistic, StatisticDatapoint,
    StatisticRequest, StatisticWindow, StorageClass,
};

/// Object-storage provider
pub trait StorageProvider: Send + Sync {
    /// Every bucket the credentials can see, in provider order
    fn list_buckets(&self) -> ProviderResult<Vec<BucketListing>>;

    /// Region a bucket lives in, already normalised
    fn bucket_region(&self, bucket: &str) -> ProviderResult<String>;

    /// One page of a bucket's object listing
    fn list_objects_page(&self, request: &ListObjectsRequest) -> ProviderResult<ObjectPage>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str;
}

/// Metrics provider
pub trait MetricsProvider: Send + Sync {
    /// One page of metric descriptors matching `query`
    fn list_metrics_page(
        &self,
        query: &MetricsQuery,
        next_token: Option<&str>,
    ) -> ProviderResult<MetricsPage>;

    /// Datapoints of one statistic over the request window
    fn get_statistic(&self, request: &StatisticRequest)
        -> ProviderResult<Vec<StatisticDatapoint>>;
}
