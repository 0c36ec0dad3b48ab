//! Bucket directory: list, filter, resolve regions

use super::concurrency::WorkerPool;
use super::filter::BucketFilter;
use super::types::Bucket;
use crate::error::{AnalyserError, Result};
use crate::protocol::{BucketListing, StorageProvider};

/// Selected buckets with their regions, sorted by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketDirectory {
    buckets: Vec<Bucket>,
}

impl BucketDirectory {
    /// List every bucket, keep the ones matching `filter` and resolve their
    /// regions on the worker pool
    ///
    /// A filter that selects nothing fails with `InvalidFilter`; any failed
    /// region lookup fails the whole listing.
    pub fn list(
        provider: &dyn StorageProvider,
        pool: &WorkerPool,
        filter: Option<&BucketFilter>,
    ) -> Result<Self> {
        let listings = provider.list_buckets()?;
        let total = listings.len();

        let selected: Vec<BucketListing> = match filter {
            Some(filter) => listings
                .into_iter()
                .filter(|b| filter.matches(&b.name))
                .collect(),
            None => listings,
        };

        if let Some(filter) = filter {
            if selected.is_empty() {
                return Err(AnalyserError::invalid_filter(
                    filter.raw(),
                    "no bucket selected",
                ));
            }
        }

        tracing::info!(
            "Selected {} of {} buckets via {}",
            selected.len(),
            total,
            provider.provider_name()
        );

        let mut buckets = pool.map(&selected, |listing| {
            let region = provider.bucket_region(&listing.name).map_err(|source| {
                AnalyserError::RegionResolution {
                    bucket: listing.name.clone(),
                    source,
                }
            })?;
            Ok(Bucket {
                name: listing.name.clone(),
                region,
                creation_date: listing.creation_date,
            })
        })?;

        buckets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self { buckets })
    }

    /// Build a directory from already resolved buckets
    pub fn from_buckets(mut buckets: Vec<Bucket>) -> Self {
        buckets.sort_by(|a, b| a.name.cmp(&b.name));
        Self { buckets }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn get(&self, name: &str) -> Option<&Bucket> {
        self.buckets
            .binary_search_by(|b| b.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.buckets[i])
    }

    /// Distinct regions, sorted
    pub fn regions(&self) -> Vec<String> {
        let mut regions: Vec<String> = self.buckets.iter().map(|b| b.region.clone()).collect();
        regions.sort();
        regions.dedup();
        regions
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::mock::MockProvider;
    use crate::protocol::ProviderError;

    fn provider() -> MockProvider {
        let provider = MockProvider::new();
        provider.add_bucket("zeta-logs", "eu-west-1", None);
        provider.add_bucket("alpha-logs", "us-east-1", None);
        provider.add_bucket("media", "ap-south-1", None);
        provider
    }

    #[test]
    fn test_lists_all_sorted() {
        let provider = provider();
        let pool = WorkerPool::new(Some(2));
        let directory = BucketDirectory::list(&provider, &pool, None).unwrap();

        let names: Vec<_> = directory.buckets().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["alpha-logs", "media", "zeta-logs"]);
        assert_eq!(directory.get("zeta-logs").unwrap().region, "eu-west-1");
        assert_eq!(directory.regions(), vec!["ap-south-1", "eu-west-1", "us-east-1"]);
        assert_eq!(provider.location_calls(), 3);
    }

    #[test]
    fn test_glob_filter_subset() {
        let provider = provider();
        let pool = WorkerPool::new(Some(1));
        let filter = BucketFilter::parse("s3://*-logs").unwrap();
        let directory = BucketDirectory::list(&provider, &pool, Some(&filter)).unwrap();

        let names: Vec<_> = directory.buckets().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["alpha-logs", "zeta-logs"]);
        assert_eq!(provider.location_calls(), 2);
    }

    #[test]
    fn test_empty_selection_is_invalid_filter() {
        let provider = provider();
        let pool = WorkerPool::new(Some(1));
        let filter = BucketFilter::parse("s3://nothing*").unwrap();
        let err = BucketDirectory::list(&provider, &pool, Some(&filter)).unwrap_err();

        assert!(matches!(err, AnalyserError::InvalidFilter { .. }));
        assert_eq!(provider.location_calls(), 0);
    }

    #[test]
    fn test_region_failure_is_fatal() {
        let provider = provider();
        provider.fail_location("media", ProviderError::AccessDenied("denied".to_string()));
        let pool = WorkerPool::new(Some(3));

        let err = BucketDirectory::list(&provider, &pool, None).unwrap_err();
        match err {
            AnalyserError::RegionResolution { bucket, .. } => assert_eq!(bucket, "media"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_account_without_filter() {
        let provider = MockProvider::new();
        let pool = WorkerPool::new(None);
        let directory = BucketDirectory::list(&provider, &pool, None).unwrap();
        assert!(directory.is_empty());
    }
}
