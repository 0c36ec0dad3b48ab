//! Exhaustive per-bucket object traversal

use super::concurrency::WorkerPool;
use super::directory::BucketDirectory;
use super::enumerate::ObjectEnumerator;
use super::types::{Bucket, BucketUsage};
use crate::error::Result;
use crate::protocol::StorageProvider;

/// Options for a raw traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraverseOptions {
    /// Only count keys under this prefix
    pub prefix: Option<String>,

    /// Page-size cap for each listing call
    pub max_keys: Option<i32>,
}

/// Walk every object of one bucket
pub fn traverse_bucket(
    provider: &dyn StorageProvider,
    bucket: &Bucket,
    options: &TraverseOptions,
) -> Result<BucketUsage> {
    let enumerator = ObjectEnumerator::new(provider, bucket)
        .with_prefix(options.prefix.as_deref())
        .with_max_keys(options.max_keys);

    let mut usage = BucketUsage::new(bucket.clone());
    for object in enumerator.iter() {
        usage.record(&object?);
    }

    tracing::debug!(
        "Traversed {}: {} files, {} bytes",
        bucket.name,
        usage.total_files,
        usage.total_size
    );
    Ok(usage)
}

/// Traverse every bucket of the directory, one bucket per work unit
///
/// The result follows directory order.
pub fn traverse_all(
    provider: &dyn StorageProvider,
    pool: &WorkerPool,
    directory: &BucketDirectory,
    options: &TraverseOptions,
) -> Result<Vec<BucketUsage>> {
    pool.map(directory.buckets(), |bucket| {
        traverse_bucket(provider, bucket, options)
    })
}
