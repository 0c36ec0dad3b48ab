//! Paginated source adapters
//!
//! [`MetricsEnumerator`] walks the metric descriptors of one region and
//! [`ObjectEnumerator`] walks the objects of one bucket. Both hand out lazy
//! [`Paginated`] sequences and can be iterated again from the start.

use super::filter::BucketFilter;
use super::pagination::{Page, Paginated};
use super::types::{Bucket, DataPoint, MetricKind, StorageType};
use crate::error::Result;
use crate::protocol::cloudwatch::S3_NAMESPACE;
use crate::protocol::{
    Dimension, ListCursor, ListObjectsRequest, MetricDescriptor, MetricsProvider, MetricsQuery,
    ObjectRecord, Statistic, StatisticRequest, StatisticWindow, StorageProvider,
};

pub const BUCKET_NAME_DIMENSION: &str = "BucketName";
pub const STORAGE_TYPE_DIMENSION: &str = "StorageType";

/// Metric descriptors published for one region
pub struct MetricsEnumerator<'a> {
    provider: &'a dyn MetricsProvider,
    query: MetricsQuery,
    filter: Option<&'a BucketFilter>,
}

impl<'a> MetricsEnumerator<'a> {
    /// An exact (non-glob) filter is pushed down as a `BucketName` dimension
    /// filter; a glob filter is applied to each descriptor locally.
    pub fn new(
        provider: &'a dyn MetricsProvider,
        region: &str,
        filter: Option<&'a BucketFilter>,
    ) -> Self {
        let dimensions = filter
            .and_then(BucketFilter::exact_name)
            .map(|name| vec![Dimension::new(BUCKET_NAME_DIMENSION, name)])
            .unwrap_or_default();

        Self {
            provider,
            query: MetricsQuery {
                region: region.to_string(),
                namespace: S3_NAMESPACE.to_string(),
                dimensions,
            },
            filter,
        }
    }

    pub fn query(&self) -> &MetricsQuery {
        &self.query
    }

    /// Iterate the matching descriptors from the first page
    pub fn iter(&self) -> impl Iterator<Item = Result<MetricDescriptor>> + '_ {
        Paginated::new(move |token: Option<String>| {
            let page = self
                .provider
                .list_metrics_page(&self.query, token.as_deref())?;
            Ok(Page {
                next: page.next_cursor(),
                items: page.descriptors,
            })
        })
        .filter(move |descriptor| match (descriptor, self.filter) {
            (Ok(d), Some(filter)) => d
                .dimension(BUCKET_NAME_DIMENSION)
                .is_some_and(|bucket| filter.matches(bucket)),
            _ => true,
        })
    }
}

/// A storage metric series ready to be fetched
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub metric: MetricKind,
    pub storage: StorageType,
    pub bucket: String,
    pub region: String,
    pub descriptor: MetricDescriptor,
}

impl MetricSeries {
    /// Recognise a storage metric; request metrics and series without the
    /// bucket/storage dimensions give `None`
    pub fn from_descriptor(region: &str, descriptor: MetricDescriptor) -> Option<Self> {
        let metric = MetricKind::from_metric_name(&descriptor.metric_name)?;
        let bucket = descriptor.dimension(BUCKET_NAME_DIMENSION)?.to_string();
        let storage = StorageType::from_dimension(descriptor.dimension(STORAGE_TYPE_DIMENSION)?);

        Some(Self {
            metric,
            storage,
            bucket,
            region: region.to_string(),
            descriptor,
        })
    }

    /// Fetch the average over `window`; `None` when the series has no datapoint
    pub fn fetch(
        &self,
        provider: &dyn MetricsProvider,
        window: StatisticWindow,
    ) -> Result<Option<DataPoint>> {
        let request = StatisticRequest {
            region: self.region.clone(),
            descriptor: self.descriptor.clone(),
            statistic: Statistic::Average,
            unit: self.metric.unit(),
            window,
        };

        let datapoints = provider.get_statistic(&request)?;
        let Some(first) = datapoints.first() else {
            tracing::trace!(
                "No datapoint for {} {} of {}",
                self.metric.metric_name(),
                self.storage,
                self.bucket
            );
            return Ok(None);
        };

        Ok(Some(DataPoint {
            metric: self.metric,
            storage: self.storage.clone(),
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            value: first.value,
            creation_date: None,
        }))
    }
}

/// Objects of one bucket
pub struct ObjectEnumerator<'a> {
    provider: &'a dyn StorageProvider,
    bucket: &'a Bucket,
    prefix: Option<String>,
    max_keys: Option<i32>,
}

impl<'a> ObjectEnumerator<'a> {
    pub fn new(provider: &'a dyn StorageProvider, bucket: &'a Bucket) -> Self {
        Self {
            provider,
            bucket,
            prefix: None,
            max_keys: None,
        }
    }

    /// Only list keys starting with `prefix`
    pub fn with_prefix(mut self, prefix: Option<&str>) -> Self {
        self.prefix = prefix.map(str::to_string);
        self
    }

    /// Cap the page size
    pub fn with_max_keys(mut self, max_keys: Option<i32>) -> Self {
        self.max_keys = max_keys;
        self
    }

    /// Iterate every object from the first page
    pub fn iter(&self) -> impl Iterator<Item = Result<ObjectRecord>> + '_ {
        Paginated::new(move |cursor: Option<ListCursor>| {
            let request = ListObjectsRequest {
                bucket: self.bucket.name.clone(),
                region: self.bucket.region.clone(),
                prefix: self.prefix.clone(),
                max_keys: self.max_keys,
                cursor: cursor.unwrap_or_default(),
            };
            let page = self.provider.list_objects_page(&request)?;
            Ok(Page {
                next: page.next_cursor(),
                items: page.objects,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::mock::MockProvider;
    use crate::protocol::{MetricUnit, StorageClass};
    use chrono::Utc;

    fn bucket(name: &str) -> Bucket {
        Bucket {
            name: name.to_string(),
            region: "us-east-1".to_string(),
            creation_date: None,
        }
    }

    fn four_objects(provider: &MockProvider) {
        provider.add_bucket("demo", "us-east-1", None);
        for key in ["k1", "k2", "k3", "k4"] {
            provider.add_object("demo", key, 1, StorageClass::Standard);
        }
        provider.set_page_size(2);
    }

    fn keys(enumerator: &ObjectEnumerator<'_>) -> Vec<String> {
        enumerator
            .iter()
            .map(|o| o.map(|o| o.key))
            .collect::<Result<_>>()
            .unwrap()
    }

    #[test]
    fn test_object_pages_with_tokens() {
        let provider = MockProvider::new();
        four_objects(&provider);
        let demo = bucket("demo");

        let enumerator = ObjectEnumerator::new(&provider, &demo);
        assert_eq!(keys(&enumerator), vec!["k1", "k2", "k3", "k4"]);
        assert_eq!(provider.object_calls(), 2);
    }

    #[test]
    fn test_object_pages_with_start_after() {
        let provider = MockProvider::new();
        four_objects(&provider);
        provider.set_tokenless_pages(true);
        let demo = bucket("demo");

        let enumerator = ObjectEnumerator::new(&provider, &demo);
        assert_eq!(keys(&enumerator), vec!["k1", "k2", "k3", "k4"]);
    }

    #[test]
    fn test_object_enumerator_is_restartable() {
        let provider = MockProvider::new();
        four_objects(&provider);
        let demo = bucket("demo");

        let enumerator = ObjectEnumerator::new(&provider, &demo).with_max_keys(Some(3));
        let first: Vec<_> = enumerator.iter().take(1).collect::<Result<_>>().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(provider.object_calls(), 1);
        assert_eq!(keys(&enumerator).len(), 4);
    }

    #[test]
    fn test_object_prefix() {
        let provider = MockProvider::new();
        provider.add_bucket("demo", "us-east-1", None);
        provider.add_object("demo", "logs/a", 1, StorageClass::Standard);
        provider.add_object("demo", "img/b", 1, StorageClass::Standard);
        let demo = bucket("demo");

        let enumerator = ObjectEnumerator::new(&provider, &demo).with_prefix(Some("logs/"));
        assert_eq!(keys(&enumerator), vec!["logs/a"]);
    }

    #[test]
    fn test_metrics_enumerator_glob_filter() {
        let provider = MockProvider::new();
        provider.add_metric("us-east-1", "prod-a", "NumberOfObjects", "AllStorageTypes", Some(1.0));
        provider.add_metric("us-east-1", "dev-b", "NumberOfObjects", "AllStorageTypes", Some(1.0));
        provider.add_metric("eu-west-1", "prod-c", "NumberOfObjects", "AllStorageTypes", Some(1.0));
        provider.set_page_size(1);
        provider.set_bogus_metric_token(true);

        let filter = BucketFilter::parse("s3://prod-*").unwrap();
        let enumerator = MetricsEnumerator::new(&provider, "us-east-1", Some(&filter));
        assert!(enumerator.query().dimensions.is_empty());

        let found: Vec<MetricDescriptor> = enumerator.iter().collect::<Result<_>>().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].dimension(BUCKET_NAME_DIMENSION), Some("prod-a"));
        assert_eq!(provider.metrics_calls(), 2);
    }

    #[test]
    fn test_metrics_enumerator_exact_filter_pushed_down() {
        let provider = MockProvider::new();
        let filter = BucketFilter::parse("s3://hm.samples").unwrap();
        let enumerator = MetricsEnumerator::new(&provider, "us-east-1", Some(&filter));
        assert_eq!(
            enumerator.query().dimensions,
            vec![Dimension::new("BucketName", "hm.samples")]
        );
    }

    #[test]
    fn test_series_fetch_and_empty_datapoints() {
        let provider = MockProvider::new();
        provider.add_metric("us-east-1", "a", "BucketSizeBytes", "StandardStorage", Some(24.0));
        provider.add_metric("us-east-1", "b", "BucketSizeBytes", "StandardStorage", None);
        let window = StatisticWindow::daily_ending(Utc::now());

        let descriptors: Vec<_> = MetricsEnumerator::new(&provider, "us-east-1", None)
            .iter()
            .collect::<Result<_>>()
            .unwrap();
        let series: Vec<_> = descriptors
            .into_iter()
            .filter_map(|d| MetricSeries::from_descriptor("us-east-1", d))
            .collect();
        assert_eq!(series.len(), 2);

        let point = series[0].fetch(&provider, window).unwrap().unwrap();
        assert_eq!(point.value, 24.0);
        assert_eq!(point.storage, StorageType::Standard);
        assert_eq!(point.metric, MetricKind::ByteSize);
        assert!(series[1].fetch(&provider, window).unwrap().is_none());

        let requests = provider.statistic_requests();
        assert_eq!(requests[0].unit, MetricUnit::Bytes);
        assert_eq!(requests[0].statistic, Statistic::Average);
        assert_eq!(requests[0].window, window);
    }

    #[test]
    fn test_series_ignores_request_metrics() {
        let descriptor = MetricDescriptor {
            namespace: "AWS/S3".to_string(),
            metric_name: "AllRequests".to_string(),
            dimensions: vec![
                Dimension::new("BucketName", "a"),
                Dimension::new("FilterId", "all"),
            ],
        };
        assert!(MetricSeries::from_descriptor("us-east-1", descriptor).is_none());
    }
}
