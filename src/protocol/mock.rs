//! In-memory provider for tests
//!
//! Serves buckets, objects and metric datapoints from memory, implementing
//! both [`StorageProvider`] and [`MetricsProvider`]. Paging, tokenless
//! truncated pages, bogus metric tokens, per-call latency and injected
//! failures are all configurable so the pagination and worker-pool code can
//! be exercised without a network.

use super::error::{ProviderError, ProviderResult};
use super::types::{
    BucketListing, Dimension, ListCursor, ListObjectsRequest, MetricDescriptor, MetricsPage,
    MetricsQuery, ObjectPage, ObjectRecord, StatisticDatapoint, StatisticRequest, StorageClass,
};
use super::{normalize_region, MetricsProvider, StorageProvider};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
struct MockBucket {
    listing: BucketListing,
    region: String,
}

#[derive(Debug, Clone)]
struct MockMetric {
    region: String,
    descriptor: MetricDescriptor,
    value: Option<f64>,
}

#[derive(Debug, Default)]
struct MockState {
    buckets: Vec<MockBucket>,
    objects: HashMap<String, BTreeMap<String, ObjectRecord>>,
    metrics: Vec<MockMetric>,
    location_failures: HashMap<String, ProviderError>,
    object_failures: HashSet<String>,
    statistic_failures: HashSet<String>,
    page_size: Option<usize>,
    tokenless_pages: bool,
    bogus_metric_token: bool,
    latency: Option<Duration>,
    statistic_requests: Vec<StatisticRequest>,
}

#[derive(Debug, Default)]
struct CallCounters {
    list_buckets: AtomicUsize,
    bucket_region: AtomicUsize,
    list_objects: AtomicUsize,
    list_metrics: AtomicUsize,
    get_statistic: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// In-memory storage and metrics provider
///
/// # Example
///
/// ```rust
/// use s3_analyser::protocol::mock::MockProvider;
/// use s3_analyser::protocol::{StorageClass, StorageProvider};
///
/// let provider = MockProvider::new();
/// provider.add_bucket("demo", "eu-west-1", None);
/// provider.add_object("demo", "a.txt", 4, StorageClass::Standard);
///
/// assert_eq!(provider.bucket_region("demo").unwrap(), "eu-west-1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    state: Arc<RwLock<MockState>>,
    counters: Arc<CallCounters>,
}

impl MockProvider {
    /// Create a new empty provider
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MockState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MockState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a bucket whose location constraint is `region`
    ///
    /// Lookups normalise it the way S3 answers do: `""` is us-east-1 and
    /// `EU` is eu-west-1.
    pub fn add_bucket(
        &self,
        name: impl Into<String>,
        region: impl Into<String>,
        creation_date: Option<DateTime<Utc>>,
    ) {
        let name = name.into();
        let mut state = self.write();
        state.objects.entry(name.clone()).or_default();
        state.buckets.push(MockBucket {
            listing: BucketListing {
                name,
                creation_date,
            },
            region: region.into(),
        });
    }

    /// Add an object to a bucket
    pub fn add_object(&self, bucket: &str, key: &str, size: u64, storage_class: StorageClass) {
        self.add_object_at(bucket, key, size, storage_class, None);
    }

    /// Add an object with an explicit modification time
    pub fn add_object_at(
        &self,
        bucket: &str,
        key: &str,
        size: u64,
        storage_class: StorageClass,
        last_modified: Option<DateTime<Utc>>,
    ) {
        let record = ObjectRecord {
            key: key.to_string(),
            size,
            storage_class,
            last_modified,
        };
        self.write()
            .objects
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), record);
    }

    /// Publish a metric series for a bucket
    ///
    /// `value` of `None` models a series with no datapoints in the window.
    pub fn add_metric(
        &self,
        region: &str,
        bucket: &str,
        metric_name: &str,
        storage_type: &str,
        value: Option<f64>,
    ) {
        let descriptor = MetricDescriptor {
            namespace: super::cloudwatch::S3_NAMESPACE.to_string(),
            metric_name: metric_name.to_string(),
            dimensions: vec![
                Dimension::new("BucketName", bucket),
                Dimension::new("StorageType", storage_type),
            ],
        };
        self.write().metrics.push(MockMetric {
            region: region.to_string(),
            descriptor,
            value,
        });
    }

    /// Make location lookups for `bucket` fail
    pub fn fail_location(&self, bucket: &str, error: ProviderError) {
        self.write()
            .location_failures
            .insert(bucket.to_string(), error);
    }

    /// Make object listings of `bucket` fail
    pub fn fail_objects(&self, bucket: &str) {
        self.write().object_failures.insert(bucket.to_string());
    }

    /// Make statistic calls for `bucket` fail
    pub fn fail_statistics(&self, bucket: &str) {
        self.write().statistic_failures.insert(bucket.to_string());
    }

    /// Cap every page at `size` entries
    pub fn set_page_size(&self, size: usize) {
        self.write().page_size = Some(size.max(1));
    }

    /// Send truncated object pages without a continuation token
    pub fn set_tokenless_pages(&self, tokenless: bool) {
        self.write().tokenless_pages = tokenless;
    }

    /// End the last metrics page with a whitespace-led token
    pub fn set_bogus_metric_token(&self, bogus: bool) {
        self.write().bogus_metric_token = bogus;
    }

    /// Sleep this long inside every call
    pub fn set_latency(&self, latency: Duration) {
        self.write().latency = Some(latency);
    }

    /// Number of `list_objects_page` calls served
    pub fn object_calls(&self) -> usize {
        self.counters.list_objects.load(Ordering::SeqCst)
    }

    /// Number of `list_metrics_page` calls served
    pub fn metrics_calls(&self) -> usize {
        self.counters.list_metrics.load(Ordering::SeqCst)
    }

    /// Number of `get_statistic` calls served
    pub fn statistic_calls(&self) -> usize {
        self.counters.get_statistic.load(Ordering::SeqCst)
    }

    /// Number of `bucket_region` calls served
    pub fn location_calls(&self) -> usize {
        self.counters.bucket_region.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.counters.max_in_flight.load(Ordering::SeqCst)
    }

    /// Every statistic request received so far
    pub fn statistic_requests(&self) -> Vec<StatisticRequest> {
        self.read().statistic_requests.clone()
    }

    fn enter(&self, counter: &AtomicUsize) -> InFlight<'_> {
        counter.fetch_add(1, Ordering::SeqCst);
        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = self.read().latency;
        if let Some(latency) = latency {
            std::thread::sleep(latency);
        }
        InFlight {
            counters: &self.counters,
        }
    }
}

struct InFlight<'a> {
    counters: &'a CallCounters,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn parse_token(token: &str) -> ProviderResult<usize> {
    token
        .strip_prefix("tok-")
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| ProviderError::Service {
            code: "InvalidArgument".to_string(),
            message: format!("unknown continuation token {}", token),
        })
}

impl StorageProvider for MockProvider {
    fn list_buckets(&self) -> ProviderResult<Vec<BucketListing>> {
        let _call = self.enter(&self.counters.list_buckets);
        Ok(self.read().buckets.iter().map(|b| b.listing.clone()).collect())
    }

    fn bucket_region(&self, bucket: &str) -> ProviderResult<String> {
        let _call = self.enter(&self.counters.bucket_region);
        let state = self.read();

        if let Some(error) = state.location_failures.get(bucket) {
            return Err(error.clone());
        }

        state
            .buckets
            .iter()
            .find(|b| b.listing.name == bucket)
            .map(|b| normalize_region(Some(&b.region)))
            .ok_or_else(|| ProviderError::BucketNotFound(bucket.to_string()))
    }

    fn list_objects_page(&self, request: &ListObjectsRequest) -> ProviderResult<ObjectPage> {
        let _call = self.enter(&self.counters.list_objects);
        let state = self.read();

        if state.object_failures.contains(&request.bucket) {
            return Err(ProviderError::Network(format!(
                "connection reset listing {}",
                request.bucket
            )));
        }

        let objects = state
            .objects
            .get(&request.bucket)
            .ok_or_else(|| ProviderError::BucketNotFound(request.bucket.clone()))?;

        let matching: Vec<&ObjectRecord> = objects
            .values()
            .filter(|o| match &request.prefix {
                Some(prefix) => o.key.starts_with(prefix.as_str()),
                None => true,
            })
            .collect();

        let start = match &request.cursor {
            ListCursor::Start => 0,
            ListCursor::Token(token) => parse_token(token)?,
            ListCursor::StartAfter(key) => matching
                .iter()
                .position(|o| o.key.as_str() > key.as_str())
                .unwrap_or(matching.len()),
        };

        let mut limit = state.page_size.unwrap_or(1000);
        if let Some(max_keys) = request.max_keys {
            limit = limit.min(max_keys.max(1) as usize);
        }

        let end = (start + limit).min(matching.len());
        let is_truncated = end < matching.len();
        let next_continuation_token = if is_truncated && !state.tokenless_pages {
            Some(format!("tok-{}", end))
        } else {
            None
        };

        Ok(ObjectPage {
            objects: matching[start.min(end)..end]
                .iter()
                .map(|o| (*o).clone())
                .collect(),
            next_continuation_token,
            is_truncated,
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

impl MetricsProvider for MockProvider {
    fn list_metrics_page(
        &self,
        query: &MetricsQuery,
        next_token: Option<&str>,
    ) -> ProviderResult<MetricsPage> {
        let _call = self.enter(&self.counters.list_metrics);
        let state = self.read();

        let matching: Vec<&MockMetric> = state
            .metrics
            .iter()
            .filter(|m| m.region == query.region && m.descriptor.namespace == query.namespace)
            .filter(|m| {
                query
                    .dimensions
                    .iter()
                    .all(|d| m.descriptor.dimension(&d.name) == Some(d.value.as_str()))
            })
            .collect();

        let start = match next_token {
            Some(token) => parse_token(token)?,
            None => 0,
        };
        let limit = state.page_size.unwrap_or(500);
        let end = (start + limit).min(matching.len());

        let next_token = if end < matching.len() {
            Some(format!("tok-{}", end))
        } else if state.bogus_metric_token {
            Some("\n      ".to_string())
        } else {
            None
        };

        Ok(MetricsPage {
            descriptors: matching[start.min(end)..end]
                .iter()
                .map(|m| m.descriptor.clone())
                .collect(),
            next_token,
        })
    }

    fn get_statistic(
        &self,
        request: &StatisticRequest,
    ) -> ProviderResult<Vec<StatisticDatapoint>> {
        let _call = self.enter(&self.counters.get_statistic);
        self.write().statistic_requests.push(request.clone());
        let state = self.read();

        if let Some(bucket) = request.descriptor.dimension("BucketName") {
            if state.statistic_failures.contains(bucket) {
                return Err(ProviderError::RateLimitExceeded(format!(
                    "Throttling: statistics for {}",
                    bucket
                )));
            }
        }

        Ok(state
            .metrics
            .iter()
            .find(|m| m.region == request.region && m.descriptor == request.descriptor)
            .and_then(|m| m.value)
            .map(|value| {
                vec![StatisticDatapoint {
                    timestamp: Some(request.window.start),
                    value,
                }]
            })
            .unwrap_or_default())
    }
}
