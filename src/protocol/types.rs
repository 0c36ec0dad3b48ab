//! Type definitions exchanged with the storage and metrics providers

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A bucket as returned by the provider's bucket listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketListing {
    /// Bucket name (globally unique)
    pub name: String,

    /// Creation timestamp
    pub creation_date: Option<DateTime<Utc>>,
}

/// One object from a raw listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Object key (path within bucket)
    pub key: String,

    /// Object size in bytes
    pub size: u64,

    /// Storage class
    pub storage_class: StorageClass,

    /// Last modified timestamp
    pub last_modified: Option<DateTime<Utc>>,
}

/// Where a listing call resumes from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ListCursor {
    /// First page
    #[default]
    Start,

    /// Opaque continuation token handed out by the previous page
    Token(String),

    /// Resume after the last key seen
    StartAfter(String),
}

/// Parameters of a single `list_objects_page` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListObjectsRequest {
    pub bucket: String,

    /// Region the bucket lives in; the call is routed there
    pub region: String,

    /// Only list keys starting with this prefix
    pub prefix: Option<String>,

    /// Page-size cap
    pub max_keys: Option<i32>,

    pub cursor: ListCursor,
}

/// One page of a raw object listing
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectRecord>,

    /// Continuation token for the next page, if the provider sent one
    pub next_continuation_token: Option<String>,

    /// Whether more data is available
    pub is_truncated: bool,
}

impl ObjectPage {
    /// Cursor for the page following this one, `None` when the listing is done
    pub fn next_cursor(&self) -> Option<ListCursor> {
        if !self.is_truncated {
            return None;
        }
        match &self.next_continuation_token {
            Some(token) if !token.is_empty() => Some(ListCursor::Token(token.clone())),
            _ => self
                .objects
                .last()
                .map(|obj| ListCursor::StartAfter(obj.key.clone())),
        }
    }
}

/// S3 storage classes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum StorageClass {
    /// Standard storage class
    #[default]
    Standard,

    /// Reduced redundancy (deprecated but still reported)
    ReducedRedundancy,

    /// Infrequent access
    StandardIa,

    /// One zone infrequent access
    OnezoneIa,

    /// Intelligent tiering
    IntelligentTiering,

    /// Glacier instant retrieval
    GlacierInstantRetrieval,

    /// Glacier flexible retrieval
    GlacierFlexibleRetrieval,

    /// Glacier deep archive
    GlacierDeepArchive,

    /// Any class not listed above, kept under its wire name
    Other(String),
}

impl StorageClass {
    /// Every known class, in reporting order
    pub const ALL: [StorageClass; 8] = [
        StorageClass::Standard,
        StorageClass::ReducedRedundancy,
        StorageClass::StandardIa,
        StorageClass::OnezoneIa,
        StorageClass::IntelligentTiering,
        StorageClass::GlacierInstantRetrieval,
        StorageClass::GlacierFlexibleRetrieval,
        StorageClass::GlacierDeepArchive,
    ];

    /// Parse the wire name used by `ListObjectsV2`
    pub fn from_wire(name: &str) -> Self {
        match name {
            "STANDARD" => StorageClass::Standard,
            "REDUCED_REDUNDANCY" => StorageClass::ReducedRedundancy,
            "STANDARD_IA" => StorageClass::StandardIa,
            "ONEZONE_IA" => StorageClass::OnezoneIa,
            "INTELLIGENT_TIERING" => StorageClass::IntelligentTiering,
            "GLACIER_IR" => StorageClass::GlacierInstantRetrieval,
            "GLACIER" => StorageClass::GlacierFlexibleRetrieval,
            "DEEP_ARCHIVE" => StorageClass::GlacierDeepArchive,
            other => StorageClass::Other(other.to_string()),
        }
    }

    /// Short label used on gauges
    pub fn abbreviation(&self) -> &'static str {
        match self {
            StorageClass::Standard => "st",
            StorageClass::ReducedRedundancy => "rr",
            StorageClass::StandardIa => "ia",
            StorageClass::OnezoneIa => "oz",
            StorageClass::IntelligentTiering => "it",
            StorageClass::GlacierInstantRetrieval => "gir",
            StorageClass::GlacierFlexibleRetrieval => "gl",
            StorageClass::GlacierDeepArchive => "da",
            StorageClass::Other(_) => "other",
        }
    }
}

impl std::fmt::Display for StorageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageClass::Standard => write!(f, "STANDARD"),
            StorageClass::ReducedRedundancy => write!(f, "REDUCED_REDUNDANCY"),
            StorageClass::StandardIa => write!(f, "STANDARD_IA"),
            StorageClass::OnezoneIa => write!(f, "ONEZONE_IA"),
            StorageClass::IntelligentTiering => write!(f, "INTELLIGENT_TIERING"),
            StorageClass::GlacierInstantRetrieval => write!(f, "GLACIER_IR"),
            StorageClass::GlacierFlexibleRetrieval => write!(f, "GLACIER"),
            StorageClass::GlacierDeepArchive => write!(f, "DEEP_ARCHIVE"),
            StorageClass::Other(name) => f.write_str(name),
        }
    }
}

/// A metric dimension (name/value pair)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Description of one metric time series, as returned by `list_metrics`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricDescriptor {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
}

impl MetricDescriptor {
    /// Value of the named dimension, if present
    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }
}

/// Parameters of a `list_metrics_page` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsQuery {
    pub region: String,
    pub namespace: String,

    /// Exact-match dimension filters
    pub dimensions: Vec<Dimension>,
}

/// One page of metric descriptors
#[derive(Debug, Clone, Default)]
pub struct MetricsPage {
    pub descriptors: Vec<MetricDescriptor>,
    pub next_token: Option<String>,
}

impl MetricsPage {
    /// Token for the following page. Blank tokens, or tokens starting with
    /// whitespace, end the listing.
    pub fn next_cursor(&self) -> Option<String> {
        match &self.next_token {
            Some(token) if !token.trim().is_empty() && !token.starts_with(char::is_whitespace) => {
                Some(token.clone())
            }
            _ => None,
        }
    }
}

/// Statistic computed over a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Average,
    Sum,
    Minimum,
    Maximum,
    SampleCount,
}

/// Unit requested from the metrics provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    Count,
    Bytes,
}

/// Time window of a statistic request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub period_secs: i32,
}

impl StatisticWindow {
    /// One-day window ending at the midnight (UTC) that starts `now`'s day
    pub fn daily_ending(now: DateTime<Utc>) -> Self {
        let end = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        Self {
            start: end - Duration::days(1),
            end,
            period_secs: 86_400,
        }
    }
}

/// Parameters of a `get_statistic` call
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticRequest {
    pub region: String,
    pub descriptor: MetricDescriptor,
    pub statistic: Statistic,
    pub unit: MetricUnit,
    pub window: StatisticWindow,
}

/// One datapoint returned by `get_statistic`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticDatapoint {
    pub timestamp: Option<DateTime<Utc>>,
    pub value: f64,
}
