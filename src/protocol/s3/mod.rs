//! S3 storage provider built on `aws-sdk-s3`
//!
//! Implements [`StorageProvider`](crate::protocol::StorageProvider):
//! - `ListBuckets` with continuation tokens
//! - `GetBucketLocation`, normalised so an empty constraint means `us-east-1`
//!   and the legacy `EU` constraint means `eu-west-1`
//! - `ListObjectsV2` pages routed to the bucket's own region
//!
//! Works against S3-compatible endpoints (LocalStack, MinIO) through
//! [`ProviderConfig::endpoint`](crate::protocol::ProviderConfig) and
//! path-style addressing.

mod client;

pub use client::S3Client;

/// Largest page `ListObjectsV2` returns
pub const MAX_KEYS_PER_PAGE: i32 = 1000;
