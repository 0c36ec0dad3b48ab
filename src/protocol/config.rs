//! Connection settings shared by the S3 and CloudWatch clients

use super::error::{ProviderError, ProviderResult};
use serde::{Deserialize, Serialize};

/// Region that answers for buckets whose location constraint is empty
pub const DEFAULT_REGION: &str = "us-east-1";

/// Provider connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Region used for account-wide calls (bucket listing, location lookups)
    pub region: Option<String>,

    /// Custom endpoint URL (LocalStack, MinIO, ...)
    pub endpoint: Option<String>,

    /// AWS access key ID (optional - uses credential chain if not provided)
    pub access_key: Option<String>,

    /// AWS secret access key (optional - uses credential chain if not provided)
    pub secret_key: Option<String>,

    /// Session token (for temporary credentials)
    pub session_token: Option<String>,

    /// AWS profile name to use
    pub profile: Option<String>,

    /// Path-style addressing (required for some S3-compatible services)
    pub force_path_style: bool,

    /// Per-operation timeout in seconds
    pub timeout_seconds: u64,

    /// Maximum attempts per call, including the first
    pub max_attempts: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint: None,
            access_key: None,
            secret_key: None,
            session_token: None,
            profile: None,
            force_path_style: false,
            timeout_seconds: 60,
            max_attempts: 3,
        }
    }
}

impl ProviderConfig {
    /// Validate the configuration
    pub fn validate(&self) -> ProviderResult<()> {
        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err(ProviderError::InvalidConfig(
                "Both access_key and secret_key must be provided together".to_string(),
            ));
        }

        if self.session_token.is_some() && self.access_key.is_none() {
            return Err(ProviderError::InvalidConfig(
                "session_token requires access_key and secret_key".to_string(),
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(ProviderError::InvalidConfig(
                "timeout_seconds must be at least 1".to_string(),
            ));
        }

        if self.max_attempts == 0 {
            return Err(ProviderError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        if let Some(endpoint) = &self.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ProviderError::InvalidConfig(format!(
                    "Endpoint must be an http(s) URL: {}",
                    endpoint
                )));
            }
        }

        Ok(())
    }

    /// Check if using a custom endpoint
    pub fn is_custom_endpoint(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Region for account-wide calls
    pub fn home_region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }
}

/// Map a raw bucket location constraint onto a region name
pub fn normalize_region(location: Option<&str>) -> String {
    match location {
        None | Some("") => DEFAULT_REGION.to_string(),
        Some("EU") => "eu-west-1".to_string(),
        Some(other) => other.to_string(),
    }
}
