//! Error types for provider (S3 / CloudWatch) calls

use aws_sdk_s3::error::ProvideErrorMetadata;
use thiserror::Error;

/// Result type alias for provider calls
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors raised by a storage or metrics provider call
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// AWS SDK error that does not fit another variant
    #[error("AWS SDK error: {0}")]
    Sdk(String),

    /// Service error with specific error code
    #[error("Service error ({code}): {message}")]
    Service { code: String, message: String },

    /// Bucket not found or not accessible
    #[error("Bucket not found or not accessible: {0}")]
    BucketNotFound(String),

    /// Access denied error
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Response was missing a field the adapter relies on
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Add context to an error
    pub fn context<S: Into<String>>(self, context: S) -> Self {
        ProviderError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Strip any context wrappers
    pub fn root(&self) -> &ProviderError {
        match self {
            ProviderError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Check if a service error code means the caller is being throttled
pub(crate) fn is_throttling_code(code: &str) -> bool {
    matches!(
        code,
        "Throttling"
            | "ThrottlingException"
            | "ThrottledException"
            | "SlowDown"
            | "TooManyRequestsException"
            | "RequestLimitExceeded"
    )
}

/// Convert AWS SDK errors (S3 and CloudWatch share the same `SdkError` type)
impl<E> From<aws_sdk_s3::error::SdkError<E>> for ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    fn from(error: aws_sdk_s3::error::SdkError<E>) -> Self {
        use aws_sdk_s3::error::SdkError;

        match error {
            SdkError::DispatchFailure(e) => {
                if e.is_timeout() {
                    ProviderError::Timeout(format!("Dispatch timed out: {:?}", e))
                } else {
                    ProviderError::Network(format!("Network dispatch failure: {:?}", e))
                }
            }
            SdkError::TimeoutError(e) => ProviderError::Timeout(format!("{:?}", e)),
            SdkError::ResponseError(e) => {
                ProviderError::Network(format!("Response error: {:?}", e))
            }
            SdkError::ServiceError(ctx) => {
                let err = ctx.err();
                let code = err.code().unwrap_or("Unknown").to_string();
                let message = err
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string());

                if code == "AccessDenied" || code == "AccessDeniedException" {
                    ProviderError::AccessDenied(message)
                } else if code == "NoSuchBucket" {
                    ProviderError::BucketNotFound(message)
                } else if is_throttling_code(&code) {
                    ProviderError::RateLimitExceeded(format!("{}: {}", code, message))
                } else {
                    ProviderError::Service { code, message }
                }
            }
            other => ProviderError::Sdk(format!("{:?}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context() {
        let base = ProviderError::Network("connection reset".to_string());
        let wrapped = base.context("listing objects of demo");

        assert!(matches!(wrapped, ProviderError::WithContext { .. }));
        assert_eq!(
            wrapped.to_string(),
            "listing objects of demo: Network error: connection reset"
        );
        assert!(matches!(wrapped.root(), ProviderError::Network(_)));
    }

    #[test]
    fn test_throttling_codes() {
        assert!(is_throttling_code("Throttling"));
        assert!(is_throttling_code("SlowDown"));
        assert!(is_throttling_code("ThrottlingException"));
        assert!(!is_throttling_code("AccessDenied"));
        assert!(!is_throttling_code("NoSuchBucket"));
    }

    #[test]
    fn test_error_display_formats() {
        let err = ProviderError::Service {
            code: "InternalError".to_string(),
            message: "try again".to_string(),
        };
        assert_eq!(err.to_string(), "Service error (InternalError): try again");

        let err = ProviderError::AccessDenied("no perms".to_string());
        assert_eq!(err.to_string(), "Access denied: no perms");

        let err = ProviderError::Malformed("bucket without a name".to_string());
        assert_eq!(err.to_string(), "Malformed response: bucket without a name");
    }
}
