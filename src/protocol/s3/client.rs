//! S3 storage provider

use crate::protocol::aws::{block_on, to_chrono, RegionalClients};
use crate::protocol::config::{normalize_region, ProviderConfig};
use crate::protocol::error::{ProviderError, ProviderResult};
use crate::protocol::types::{
    BucketListing, ListCursor, ListObjectsRequest, ObjectPage, ObjectRecord, StorageClass,
};
use crate::protocol::StorageProvider;
use aws_config::SdkConfig;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client as AwsS3Client;
use tokio::runtime::Handle;

/// S3 client for AWS S3 and S3-compatible storage
///
/// Account-wide calls go through the home-region client; object listings are
/// routed to a client for the bucket's own region, built on first use.
pub struct S3Client {
    sdk_config: SdkConfig,
    force_path_style: bool,
    home_region: String,
    regional: RegionalClients<AwsS3Client>,
    handle: Handle,
}

impl S3Client {
    /// Create a new S3 client from a loaded SDK configuration
    pub fn new(sdk_config: SdkConfig, config: &ProviderConfig, handle: Handle) -> Self {
        let home_region = sdk_config
            .region()
            .map(|r| r.as_ref().to_string())
            .unwrap_or_else(|| config.home_region().to_string());

        Self {
            sdk_config,
            force_path_style: config.force_path_style,
            home_region,
            regional: RegionalClients::new(),
            handle,
        }
    }

    /// Region used for account-wide calls
    pub fn home_region(&self) -> &str {
        &self.home_region
    }

    /// SDK client bound to `region`
    fn client_for(&self, region: &str) -> ProviderResult<AwsS3Client> {
        self.regional.get_or_build(region, |region| {
            let builder = aws_sdk_s3::config::Builder::from(&self.sdk_config)
                .region(Region::new(region.to_string()))
                .force_path_style(self.force_path_style);
            AwsS3Client::from_conf(builder.build())
        })
    }

    async fn fetch_buckets(&self) -> ProviderResult<Vec<BucketListing>> {
        let client = self.client_for(&self.home_region)?;
        let mut buckets = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let response = client
                .list_buckets()
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| ProviderError::from(e).context("listing buckets"))?;

            for bucket in response.buckets() {
                let name = bucket.name().ok_or_else(|| {
                    ProviderError::Malformed("bucket listing entry without a name".to_string())
                })?;
                buckets.push(BucketListing {
                    name: name.to_string(),
                    creation_date: bucket.creation_date().and_then(to_chrono),
                });
            }

            match response.continuation_token() {
                Some(token) if !token.is_empty() => continuation_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(buckets)
    }

    async fn fetch_location(&self, bucket: &str) -> ProviderResult<String> {
        let client = self.client_for(&self.home_region)?;
        let response = client
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(ProviderError::from)?;

        Ok(normalize_region(
            response.location_constraint().map(|c| c.as_str()),
        ))
    }

    async fn fetch_objects(&self, request: &ListObjectsRequest) -> ProviderResult<ObjectPage> {
        let client = self.client_for(&request.region)?;

        let mut call = client
            .list_objects_v2()
            .bucket(&request.bucket)
            .set_prefix(request.prefix.clone())
            .set_max_keys(request.max_keys);

        call = match &request.cursor {
            ListCursor::Start => call,
            ListCursor::Token(token) => call.continuation_token(token),
            ListCursor::StartAfter(key) => call.start_after(key),
        };

        let response = call.send().await.map_err(|e| {
            ProviderError::from(e).context(format!("listing objects of {}", request.bucket))
        })?;

        let objects = response
            .contents()
            .iter()
            .filter_map(|obj| {
                let key = obj.key()?.to_string();
                Some(ObjectRecord {
                    key,
                    size: obj.size().unwrap_or(0).max(0) as u64,
                    storage_class: obj
                        .storage_class()
                        .map(|sc| StorageClass::from_wire(sc.as_str()))
                        .unwrap_or_default(),
                    last_modified: obj.last_modified().and_then(to_chrono),
                })
            })
            .collect();

        Ok(ObjectPage {
            objects,
            next_continuation_token: response.next_continuation_token().map(str::to_string),
            is_truncated: response.is_truncated().unwrap_or(false),
        })
    }
}

impl StorageProvider for S3Client {
    fn list_buckets(&self) -> ProviderResult<Vec<BucketListing>> {
        block_on(&self.handle, self.fetch_buckets())
    }

    fn bucket_region(&self, bucket: &str) -> ProviderResult<String> {
        block_on(&self.handle, self.fetch_location(bucket))
    }

    fn list_objects_page(&self, request: &ListObjectsRequest) -> ProviderResult<ObjectPage> {
        block_on(&self.handle, self.fetch_objects(request))
    }

    fn provider_name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::aws::load_sdk_config;

    fn local_config() -> ProviderConfig {
        ProviderConfig {
            region: Some("eu-west-2".to_string()),
            endpoint: Some("http://127.0.0.1:9".to_string()),
            access_key: Some("test".to_string()),
            secret_key: Some("test".to_string()),
            force_path_style: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_client_uses_configured_home_region() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let config = local_config();
        let sdk_config = runtime.block_on(load_sdk_config(&config)).unwrap();
        let client = S3Client::new(sdk_config, &config, runtime.handle().clone());

        assert_eq!(client.home_region(), "eu-west-2");
        assert_eq!(client.provider_name(), "s3");
    }

    #[test]
    fn test_client_cache_per_region() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let config = local_config();
        let sdk_config = runtime.block_on(load_sdk_config(&config)).unwrap();
        let client = S3Client::new(sdk_config, &config, runtime.handle().clone());

        client.client_for("eu-west-2").unwrap();
        client.client_for("ap-south-1").unwrap();
        client.client_for("eu-west-2").unwrap();
        assert_eq!(client.regional.len(), 2);
    }
}
