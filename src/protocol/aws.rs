//! Shared AWS SDK plumbing: config loading, per-region client caches and
//! blocking on the runtime handle

use super::cloudwatch::CloudWatchClient;
use super::config::ProviderConfig;
use super::error::{ProviderError, ProviderResult};
use super::s3::S3Client;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::DateTime as SdkDateTime;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::runtime::Handle;

/// Load the shared SDK configuration for `config`
pub async fn load_sdk_config(config: &ProviderConfig) -> ProviderResult<SdkConfig> {
    config.validate()?;

    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    let region_provider = match &config.region {
        Some(region) => RegionProviderChain::first_try(Region::new(region.clone())),
        None => RegionProviderChain::default_provider().or_else(super::DEFAULT_REGION),
    };
    loader = loader.region(region_provider);

    if let Some(profile) = &config.profile {
        loader = loader.profile_name(profile);
    }

    if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
        let credentials = Credentials::new(
            access_key,
            secret_key,
            config.session_token.clone(),
            None,
            "s3-analyser-explicit",
        );
        loader = loader.credentials_provider(credentials);
    }

    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    loader = loader
        .timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(Duration::from_secs(config.timeout_seconds))
                .build(),
        )
        .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts));

    Ok(loader.load().await)
}

/// Build both AWS providers on the current runtime
///
/// Must be awaited inside a tokio runtime; the returned clients keep its
/// handle and block on it for every call, so they must only be used from
/// threads that are not driving that runtime.
pub async fn connect(config: &ProviderConfig) -> ProviderResult<(S3Client, CloudWatchClient)> {
    let sdk_config = load_sdk_config(config).await?;
    let handle = Handle::current();

    if config.is_custom_endpoint() {
        tracing::info!(
            "Connecting to custom endpoint {:?} (home region {})",
            config.endpoint,
            config.home_region()
        );
    } else {
        tracing::debug!("Connecting providers (home region {})", config.home_region());
    }

    let storage = S3Client::new(sdk_config.clone(), config, handle.clone());
    let metrics = CloudWatchClient::new(sdk_config, handle);
    Ok((storage, metrics))
}

/// Lazily built SDK clients, one per region
pub(crate) struct RegionalClients<C> {
    clients: Mutex<HashMap<String, C>>,
}

impl<C: Clone> RegionalClients<C> {
    pub(crate) fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Client for `region`, building it with `build` on first use
    pub(crate) fn get_or_build<F>(&self, region: &str, build: F) -> ProviderResult<C>
    where
        F: FnOnce(&str) -> C,
    {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| ProviderError::Sdk("regional client cache poisoned".to_string()))?;

        let client = clients
            .entry(region.to_string())
            .or_insert_with(|| build(region));
        Ok(client.clone())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.clients.lock().map(|c| c.len()).unwrap_or(0)
    }
}

/// Run an SDK future to completion on `handle`
pub(crate) fn block_on<F: Future>(handle: &Handle, future: F) -> F::Output {
    handle.block_on(future)
}

/// Convert an SDK timestamp
pub(crate) fn to_chrono(dt: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}
