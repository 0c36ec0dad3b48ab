/*!
 * Folding of datapoints and raw usage into bucket/region/storage aggregates
 *
 * Every (metric, storage type) pair maps to at most one column:
 *
 * | metric            | storage type               | column   |
 * |-------------------|----------------------------|----------|
 * | `NumberOfObjects` | `AllStorageTypes`          | Files    |
 * | `BucketSizeBytes` | `AllStorageTypes`          | Bytes    |
 * | `BucketSizeBytes` | `StandardStorage`          | Bytes-ST |
 * | `BucketSizeBytes` | `StandardIAStorage`        | Bytes-IA |
 * | `BucketSizeBytes` | `ReducedRedundancyStorage` | Bytes-RR |
 *
 * Pairs outside the table are skipped. Folding runs on one thread and sorts
 * its input first, so the result does not depend on arrival order.
 */

use super::directory::BucketDirectory;
use super::types::{BucketUsage, DataPoint, MetricKind, StorageType};
use crate::protocol::StorageClass;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Folded column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Files,
    Bytes,
    BytesStandard,
    BytesIa,
    BytesRr,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Files,
        Field::Bytes,
        Field::BytesStandard,
        Field::BytesIa,
        Field::BytesRr,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Files => "Files",
            Field::Bytes => "Bytes",
            Field::BytesStandard => "Bytes-ST",
            Field::BytesIa => "Bytes-IA",
            Field::BytesRr => "Bytes-RR",
        }
    }

    /// Whether the column counts objects (as opposed to bytes)
    pub fn is_count(&self) -> bool {
        matches!(self, Field::Files)
    }
}

/// Column a (metric, storage type) pair folds into
pub fn folded_field(metric: MetricKind, storage: &StorageType) -> Option<Field> {
    match (metric, storage) {
        (MetricKind::ObjectCount, StorageType::AllStorageTypes) => Some(Field::Files),
        (MetricKind::ByteSize, StorageType::AllStorageTypes) => Some(Field::Bytes),
        (MetricKind::ByteSize, StorageType::Standard) => Some(Field::BytesStandard),
        (MetricKind::ByteSize, StorageType::StandardIa) => Some(Field::BytesIa),
        (MetricKind::ByteSize, StorageType::ReducedRedundancy) => Some(Field::BytesRr),
        _ => None,
    }
}

/// Running totals for every folded column
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub files: f64,
    pub bytes: f64,
    pub bytes_standard: f64,
    pub bytes_ia: f64,
    pub bytes_rr: f64,
}

impl Totals {
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Files => self.files,
            Field::Bytes => self.bytes,
            Field::BytesStandard => self.bytes_standard,
            Field::BytesIa => self.bytes_ia,
            Field::BytesRr => self.bytes_rr,
        }
    }

    pub fn add(&mut self, field: Field, value: f64) {
        let slot = match field {
            Field::Files => &mut self.files,
            Field::Bytes => &mut self.bytes,
            Field::BytesStandard => &mut self.bytes_standard,
            Field::BytesIa => &mut self.bytes_ia,
            Field::BytesRr => &mut self.bytes_rr,
        };
        *slot += value;
    }

    pub fn merge(&mut self, other: &Totals) {
        for field in Field::ALL {
            self.add(field, other.get(field));
        }
    }
}

/// One ByBucket entry
#[derive(Debug, Clone, PartialEq)]
pub struct BucketRow {
    pub bucket: String,
    pub region: String,

    /// Set once the bucket reported an object count
    pub creation_date: Option<DateTime<Utc>>,
    pub totals: Totals,
}

/// One ByRegion entry
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRow {
    pub region: String,

    /// Buckets that reported an object count
    pub buckets: u64,
    pub totals: Totals,
}

/// One ByStorage entry
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StorageRow {
    pub files: f64,
    pub bytes: f64,
}

/// The three aggregate tables of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    pub by_bucket: BTreeMap<String, BucketRow>,
    pub by_region: BTreeMap<String, RegionRow>,
    pub by_storage: BTreeMap<StorageType, StorageRow>,
}

impl Aggregates {
    /// Zero rows for every bucket and region of the directory
    pub fn seeded(directory: &BucketDirectory) -> Self {
        let mut aggregates = Self::default();
        for bucket in directory.buckets() {
            aggregates.bucket_row(&bucket.name, &bucket.region);
            aggregates.region_row(&bucket.region);
        }
        aggregates
    }

    fn bucket_row(&mut self, bucket: &str, region: &str) -> &mut BucketRow {
        self.by_bucket
            .entry(bucket.to_string())
            .or_insert_with(|| BucketRow {
                bucket: bucket.to_string(),
                region: region.to_string(),
                creation_date: None,
                totals: Totals::default(),
            })
    }

    fn region_row(&mut self, region: &str) -> &mut RegionRow {
        self.by_region
            .entry(region.to_string())
            .or_insert_with(|| RegionRow {
                region: region.to_string(),
                buckets: 0,
                totals: Totals::default(),
            })
    }

    /// Fold correlated datapoints
    pub fn fold(directory: &BucketDirectory, datapoints: &[DataPoint]) -> Self {
        let mut ordered: Vec<&DataPoint> = datapoints.iter().collect();
        ordered.sort_by(|a, b| {
            a.bucket
                .cmp(&b.bucket)
                .then(a.metric.cmp(&b.metric))
                .then_with(|| a.storage.cmp(&b.storage))
                .then(a.value.total_cmp(&b.value))
        });

        let mut aggregates = Self::seeded(directory);
        let mut skipped = 0usize;
        for point in ordered {
            if !aggregates.apply(point) {
                skipped += 1;
            }
        }

        if skipped > 0 {
            tracing::debug!("Skipped {} datapoints without a folded column", skipped);
        }
        aggregates
    }

    /// Fold one datapoint; `false` when its pair has no column
    fn apply(&mut self, point: &DataPoint) -> bool {
        let Some(field) = folded_field(point.metric, &point.storage) else {
            return false;
        };

        let is_count = point.metric == MetricKind::ObjectCount;

        let bucket = self.bucket_row(&point.bucket, &point.region);
        bucket.totals.add(field, point.value);
        if is_count {
            bucket.creation_date = point.creation_date;
        }

        let region = self.region_row(&point.region);
        region.totals.add(field, point.value);
        if is_count {
            region.buckets += 1;
        }

        let storage = self.by_storage.entry(point.storage.clone()).or_default();
        if field.is_count() {
            storage.files += point.value;
        } else {
            storage.bytes += point.value;
        }
        true
    }

    /// Fold raw-traversal usage into the same tables
    ///
    /// Buckets without a qualifying object keep zero totals, are not counted
    /// in their region and get no creation date.
    pub fn from_usage(usage: &[BucketUsage]) -> Self {
        let mut ordered: Vec<&BucketUsage> = usage.iter().collect();
        ordered.sort_by(|a, b| a.bucket.name.cmp(&b.bucket.name));

        let mut aggregates = Self::default();
        for entry in ordered {
            let totals = Totals {
                files: entry.total_files as f64,
                bytes: entry.total_size as f64,
                bytes_standard: entry.class(&StorageClass::Standard).total_size as f64,
                bytes_ia: entry.class(&StorageClass::StandardIa).total_size as f64,
                bytes_rr: entry.class(&StorageClass::ReducedRedundancy).total_size as f64,
            };
            let has_objects = entry.total_files > 0;

            let bucket = aggregates.bucket_row(&entry.bucket.name, &entry.bucket.region);
            bucket.totals.merge(&totals);
            if has_objects {
                bucket.creation_date = entry.bucket.creation_date;
            }

            let region = aggregates.region_row(&entry.bucket.region);
            region.totals.merge(&totals);
            if has_objects {
                region.buckets += 1;

                let all = aggregates
                    .by_storage
                    .entry(StorageType::AllStorageTypes)
                    .or_default();
                all.files += totals.files;
                all.bytes += totals.bytes;
            }

            for (class, stats) in &entry.storage {
                let row = aggregates
                    .by_storage
                    .entry(storage_type_of(class))
                    .or_default();
                row.files += stats.total_files as f64;
                row.bytes += stats.total_size as f64;
            }
        }
        aggregates
    }

    /// Grand totals over every region
    pub fn totals(&self) -> Totals {
        let mut totals = Totals::default();
        for region in self.by_region.values() {
            totals.merge(&region.totals);
        }
        totals
    }

    /// Bucket rows in name order
    pub fn bucket_rows(&self) -> impl Iterator<Item = &BucketRow> {
        self.by_bucket.values()
    }
}

/// Metric storage type corresponding to an object storage class
pub fn storage_type_of(class: &StorageClass) -> StorageType {
    match class {
        StorageClass::Standard => StorageType::Standard,
        StorageClass::StandardIa => StorageType::StandardIa,
        StorageClass::ReducedRedundancy => StorageType::ReducedRedundancy,
        other => StorageType::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Bucket;
    use crate::protocol::ObjectRecord;
    use chrono::TimeZone;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 2, 3, 4, 5, 6).unwrap()
    }

    fn directory() -> BucketDirectory {
        BucketDirectory::from_buckets(vec![
            Bucket {
                name: "a".to_string(),
                region: "us-east-1".to_string(),
                creation_date: Some(created()),
            },
            Bucket {
                name: "b".to_string(),
                region: "us-east-1".to_string(),
                creation_date: Some(created()),
            },
            Bucket {
                name: "c".to_string(),
                region: "eu-west-1".to_string(),
                creation_date: None,
            },
            Bucket {
                name: "empty".to_string(),
                region: "eu-west-1".to_string(),
                creation_date: Some(created()),
            },
        ])
    }

    fn point(bucket: &str, region: &str, metric: MetricKind, storage: &str, value: f64) -> DataPoint {
        DataPoint {
            metric,
            storage: StorageType::from_dimension(storage),
            bucket: bucket.to_string(),
            region: region.to_string(),
            value,
            creation_date: Some(created()),
        }
    }

    fn sample_points() -> Vec<DataPoint> {
        use MetricKind::*;
        vec![
            point("a", "us-east-1", ObjectCount, "AllStorageTypes", 4.0),
            point("a", "us-east-1", ByteSize, "AllStorageTypes", 24.0),
            point("a", "us-east-1", ByteSize, "StandardStorage", 24.0),
            point("b", "us-east-1", ObjectCount, "AllStorageTypes", 10.0),
            point("b", "us-east-1", ByteSize, "AllStorageTypes", 300.0),
            point("b", "us-east-1", ByteSize, "StandardStorage", 100.0),
            point("b", "us-east-1", ByteSize, "StandardIAStorage", 150.0),
            point("b", "us-east-1", ByteSize, "ReducedRedundancyStorage", 50.0),
            point("c", "eu-west-1", ObjectCount, "AllStorageTypes", 1.0),
            point("c", "eu-west-1", ByteSize, "AllStorageTypes", 7.0),
            point("c", "eu-west-1", ByteSize, "GlacierStorage", 7.0),
            point("c", "eu-west-1", ObjectCount, "StandardStorage", 1.0),
        ]
    }

    #[test]
    fn test_folded_field_table() {
        use MetricKind::*;
        assert_eq!(folded_field(ObjectCount, &StorageType::AllStorageTypes), Some(Field::Files));
        assert_eq!(folded_field(ByteSize, &StorageType::AllStorageTypes), Some(Field::Bytes));
        assert_eq!(folded_field(ByteSize, &StorageType::Standard), Some(Field::BytesStandard));
        assert_eq!(folded_field(ByteSize, &StorageType::StandardIa), Some(Field::BytesIa));
        assert_eq!(folded_field(ByteSize, &StorageType::ReducedRedundancy), Some(Field::BytesRr));
        assert_eq!(folded_field(ObjectCount, &StorageType::Standard), None);
        assert_eq!(
            folded_field(ByteSize, &StorageType::Other("GlacierStorage".to_string())),
            None
        );
    }

    #[test]
    fn test_fold_bucket_and_region_totals() {
        let aggregates = Aggregates::fold(&directory(), &sample_points());

        let a = &aggregates.by_bucket["a"];
        assert_eq!(a.totals.files, 4.0);
        assert_eq!(a.totals.bytes, 24.0);
        assert_eq!(a.totals.bytes_standard, 24.0);
        assert_eq!(a.totals.bytes_ia, 0.0);
        assert_eq!(a.creation_date, Some(created()));

        let us = &aggregates.by_region["us-east-1"];
        assert_eq!(us.buckets, 2);
        assert_eq!(us.totals.files, 14.0);
        assert_eq!(us.totals.bytes, 324.0);
        assert_eq!(us.totals.bytes_rr, 50.0);

        let eu = &aggregates.by_region["eu-west-1"];
        assert_eq!(eu.buckets, 1);
        assert_eq!(eu.totals.bytes, 7.0);

        assert_eq!(aggregates.by_storage[&StorageType::AllStorageTypes].files, 15.0);
        assert_eq!(aggregates.by_storage[&StorageType::StandardIa].bytes, 150.0);
        assert!(!aggregates
            .by_storage
            .contains_key(&StorageType::Other("GlacierStorage".to_string())));
    }

    #[test]
    fn test_empty_bucket_keeps_zero_row() {
        let aggregates = Aggregates::fold(&directory(), &sample_points());
        let empty = &aggregates.by_bucket["empty"];
        assert_eq!(empty.totals, Totals::default());
        assert_eq!(empty.creation_date, None);
        assert_eq!(empty.region, "eu-west-1");
    }

    #[test]
    fn test_region_sums_equal_bucket_sums() {
        let aggregates = Aggregates::fold(&directory(), &sample_points());
        for field in Field::ALL {
            let by_bucket: f64 = aggregates.by_bucket.values().map(|r| r.totals.get(field)).sum();
            let by_region: f64 = aggregates.by_region.values().map(|r| r.totals.get(field)).sum();
            assert_eq!(by_bucket, by_region, "{}", field.name());
            assert_eq!(aggregates.totals().get(field), by_region);
        }
    }

    #[test]
    fn test_fold_is_order_independent() {
        let points = sample_points();
        let forward = Aggregates::fold(&directory(), &points);

        let mut reversed = points.clone();
        reversed.reverse();
        assert_eq!(Aggregates::fold(&directory(), &reversed), forward);

        let mut rotated = points;
        rotated.rotate_left(5);
        assert_eq!(Aggregates::fold(&directory(), &rotated), forward);
    }

    #[test]
    fn test_from_usage_demo_bucket() {
        let bucket = Bucket {
            name: "demo".to_string(),
            region: "eu-west-1".to_string(),
            creation_date: Some(created()),
        };
        let mut usage = BucketUsage::new(bucket);
        for (key, size) in [("dir1/", 0), ("dir2/", 0), ("dir3/", 0), ("file", 4)] {
            usage.record(&ObjectRecord {
                key: key.to_string(),
                size,
                storage_class: StorageClass::Standard,
                last_modified: None,
            });
        }

        let aggregates = Aggregates::from_usage(&[usage]);
        for totals in [
            aggregates.by_bucket["demo"].totals,
            aggregates.by_region["eu-west-1"].totals,
        ] {
            assert_eq!(totals.files, 1.0);
            assert_eq!(totals.bytes, 4.0);
            assert_eq!(totals.bytes_standard, 4.0);
            assert_eq!(totals.bytes_ia, 0.0);
            assert_eq!(totals.bytes_rr, 0.0);
        }
        assert_eq!(aggregates.by_region["eu-west-1"].buckets, 1);
        assert_eq!(aggregates.by_bucket["demo"].creation_date, Some(created()));
    }

    #[test]
    fn test_from_usage_unlisted_class_is_not_standard() {
        let bucket = Bucket {
            name: "edge".to_string(),
            region: "us-east-1".to_string(),
            creation_date: None,
        };
        let mut usage = BucketUsage::new(bucket);
        for (key, size, class) in [
            ("a", 6, StorageClass::from_wire("EXPRESS_ONEZONE")),
            ("b", 3, StorageClass::Standard),
        ] {
            usage.record(&ObjectRecord {
                key: key.to_string(),
                size,
                storage_class: class,
                last_modified: None,
            });
        }

        let aggregates = Aggregates::from_usage(&[usage]);
        let totals = aggregates.by_bucket["edge"].totals;
        assert_eq!(totals.files, 2.0);
        assert_eq!(totals.bytes, 9.0);
        assert_eq!(totals.bytes_standard, 3.0);

        let other = StorageType::Other("EXPRESS_ONEZONE".to_string());
        assert_eq!(aggregates.by_storage[&other].bytes, 6.0);
        assert_eq!(aggregates.by_storage[&StorageType::Standard].bytes, 3.0);
    }

    #[test]
    fn test_from_usage_empty_bucket() {
        let bucket = Bucket {
            name: "markers-only".to_string(),
            region: "us-east-1".to_string(),
            creation_date: Some(created()),
        };
        let aggregates = Aggregates::from_usage(&[BucketUsage::new(bucket)]);

        assert_eq!(aggregates.by_bucket["markers-only"].totals, Totals::default());
        assert_eq!(aggregates.by_bucket["markers-only"].creation_date, None);
        assert_eq!(aggregates.by_region["us-east-1"].buckets, 0);
        assert!(aggregates.by_storage.is_empty());
    }
}
