//! Typed records flowing between the pipeline stages

use crate::protocol::{MetricUnit, ObjectRecord, StorageClass};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// A bucket with its region resolved
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Bucket {
    pub name: String,
    pub region: String,
    pub creation_date: Option<DateTime<Utc>>,
}

/// The two daily S3 storage metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    /// `NumberOfObjects`
    ObjectCount,

    /// `BucketSizeBytes`
    ByteSize,
}

impl MetricKind {
    pub fn from_metric_name(name: &str) -> Option<Self> {
        match name {
            "NumberOfObjects" => Some(MetricKind::ObjectCount),
            "BucketSizeBytes" => Some(MetricKind::ByteSize),
            _ => None,
        }
    }

    pub fn metric_name(&self) -> &'static str {
        match self {
            MetricKind::ObjectCount => "NumberOfObjects",
            MetricKind::ByteSize => "BucketSizeBytes",
        }
    }

    /// Unit the statistic is requested in
    pub fn unit(&self) -> MetricUnit {
        match self {
            MetricKind::ObjectCount => MetricUnit::Count,
            MetricKind::ByteSize => MetricUnit::Bytes,
        }
    }
}

/// Value of the `StorageType` metric dimension
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StorageType {
    /// Synthetic label covering every class
    AllStorageTypes,
    Standard,
    StandardIa,
    ReducedRedundancy,
    Other(String),
}

impl StorageType {
    pub fn from_dimension(value: &str) -> Self {
        match value {
            "AllStorageTypes" => StorageType::AllStorageTypes,
            "StandardStorage" => StorageType::Standard,
            "StandardIAStorage" => StorageType::StandardIa,
            "ReducedRedundancyStorage" => StorageType::ReducedRedundancy,
            other => StorageType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StorageType::AllStorageTypes => "AllStorageTypes",
            StorageType::Standard => "StandardStorage",
            StorageType::StandardIa => "StandardIAStorage",
            StorageType::ReducedRedundancy => "ReducedRedundancyStorage",
            StorageType::Other(other) => other,
        }
    }

    /// Gauge label, `None` for types that are not exported
    pub fn abbreviation(&self) -> Option<&'static str> {
        match self {
            StorageType::Standard => Some("st"),
            StorageType::StandardIa => Some("ia"),
            StorageType::ReducedRedundancy => Some("rr"),
            StorageType::AllStorageTypes | StorageType::Other(_) => None,
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One metric value for one bucket and storage type
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub metric: MetricKind,
    pub storage: StorageType,
    pub bucket: String,
    pub region: String,
    pub value: f64,

    /// Filled in by the correlator
    pub creation_date: Option<DateTime<Utc>>,
}

/// Totals for one storage class within a bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageClassStats {
    pub total_size: u64,
    pub total_files: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl StorageClassStats {
    pub fn record(&mut self, size: u64, last_modified: Option<DateTime<Utc>>) {
        self.total_size += size;
        self.total_files += 1;
        self.last_modified = latest(self.last_modified, last_modified);
    }
}

/// Raw-traversal totals for one bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketUsage {
    pub bucket: Bucket,
    pub total_size: u64,
    pub total_files: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub storage: BTreeMap<StorageClass, StorageClassStats>,
}

impl BucketUsage {
    pub fn new(bucket: Bucket) -> Self {
        Self {
            bucket,
            total_size: 0,
            total_files: 0,
            last_modified: None,
            storage: BTreeMap::new(),
        }
    }

    /// Account for one listed object. Zero-byte objects (folder markers) are ignored.
    pub fn record(&mut self, object: &ObjectRecord) {
        if object.size == 0 {
            return;
        }
        self.total_size += object.size;
        self.total_files += 1;
        self.last_modified = latest(self.last_modified, object.last_modified);
        self.storage
            .entry(object.storage_class.clone())
            .or_default()
            .record(object.size, object.last_modified);
    }

    /// Stats for one class, zero when the bucket holds none
    pub fn class(&self, class: &StorageClass) -> StorageClassStats {
        self.storage.get(class).copied().unwrap_or_default()
    }
}

fn latest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bucket() -> Bucket {
        Bucket {
            name: "demo".to_string(),
            region: "eu-west-1".to_string(),
            creation_date: None,
        }
    }

    fn object(size: u64, class: StorageClass, day: u32) -> ObjectRecord {
        ObjectRecord {
            key: format!("k{}-{}", size, day),
            size,
            storage_class: class,
            last_modified: Some(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_usage_ignores_folder_markers() {
        let mut usage = BucketUsage::new(bucket());
        usage.record(&object(0, StorageClass::Standard, 9));
        usage.record(&object(0, StorageClass::Standard, 9));
        usage.record(&object(4, StorageClass::Standard, 2));

        assert_eq!(usage.total_files, 1);
        assert_eq!(usage.total_size, 4);
        assert_eq!(
            usage.last_modified,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
        assert_eq!(usage.storage.len(), 1);
    }

    #[test]
    fn test_usage_per_class_latest_modification() {
        let mut usage = BucketUsage::new(bucket());
        usage.record(&object(10, StorageClass::StandardIa, 5));
        usage.record(&object(20, StorageClass::StandardIa, 3));
        usage.record(&object(7, StorageClass::Standard, 8));

        let ia = usage.class(&StorageClass::StandardIa);
        assert_eq!(ia.total_files, 2);
        assert_eq!(ia.total_size, 30);
        assert_eq!(
            ia.last_modified,
            Some(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap())
        );
        assert_eq!(usage.class(&StorageClass::GlacierDeepArchive), StorageClassStats::default());
        assert_eq!(usage.total_size, 37);
    }

    #[test]
    fn test_storage_type_round_trip_and_abbreviations() {
        assert_eq!(StorageType::from_dimension("StandardIAStorage"), StorageType::StandardIa);
        assert_eq!(StorageType::from_dimension("GlacierStorage").as_str(), "GlacierStorage");
        assert_eq!(StorageType::Standard.abbreviation(), Some("st"));
        assert_eq!(StorageType::AllStorageTypes.abbreviation(), None);
        assert_eq!(MetricKind::from_metric_name("BucketSizeBytes"), Some(MetricKind::ByteSize));
        assert_eq!(MetricKind::from_metric_name("Other"), None);
        assert_eq!(MetricKind::ObjectCount.unit(), MetricUnit::Count);
    }
}
