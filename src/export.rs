/*!
 * Gauge export
 *
 * Converts aggregates into labelled gauges. Runs on the coordinator only;
 * worker units never touch the registry.
 */

use crate::core::{Aggregates, BucketUsage, Field};
use crate::error::Result;
use crate::protocol::StorageClass;
use analyser_observability::GaugeRegistry;

/// Push gateway job of the metrics summary
pub const SUMMARY_JOB: &str = "s3analyser";

/// Push gateway job of the raw traversal
pub const RAW_JOB: &str = "s3rawanalyser";

pub const OBJECTS_TOTAL: &str = "cloudwatch_s3_objects_total";
pub const SIZE_BYTES: &str = "cloudwatch_s3_size_bytes";
pub const REGION_BUCKETS: &str = "cloudwatch_s3_region_buckets";
pub const REGION_OBJECTS_TOTAL: &str = "cloudwatch_s3_region_objects_total";

pub const RAW_SIZE_BYTES: &str = "s3_size_bytes";
pub const RAW_FILES_TOTAL: &str = "s3_files_total";
pub const RAW_LAST_MODIFIED: &str = "s3_last_modified";

/// Summary columns exported per storage class
const SIZE_COLUMNS: [(Field, &str); 3] = [
    (Field::BytesStandard, "st"),
    (Field::BytesIa, "ia"),
    (Field::BytesRr, "rr"),
];

/// Set the metrics-summary gauges
///
/// The all-classes byte total is not exported; it is the sum of the
/// per-class series.
pub fn export_summary_gauges(gauges: &GaugeRegistry, aggregates: &Aggregates) -> Result<usize> {
    let mut series = 0;

    for row in aggregates.bucket_rows() {
        let labels = [("region", row.region.as_str()), ("bucket", row.bucket.as_str())];
        gauges.set(OBJECTS_TOTAL, "Number of objects in a bucket", &labels, row.totals.files)?;
        series += 1;

        for (field, storage) in SIZE_COLUMNS {
            gauges.set(
                SIZE_BYTES,
                "Bucket size in bytes per storage class",
                &[
                    ("region", row.region.as_str()),
                    ("storage", storage),
                    ("bucket", row.bucket.as_str()),
                ],
                row.totals.get(field),
            )?;
            series += 1;
        }
    }

    for row in aggregates.by_region.values() {
        let labels = [("region", row.region.as_str())];
        gauges.set(REGION_BUCKETS, "Number of buckets in a region", &labels, row.buckets as f64)?;
        gauges.set(
            REGION_OBJECTS_TOTAL,
            "Number of objects in a region",
            &labels,
            row.totals.files,
        )?;
        series += 2;
    }

    tracing::debug!("Exported {} summary gauge series", series);
    Ok(series)
}

/// Set the raw-traversal gauges for every storage class of every bucket
pub fn export_raw_gauges(gauges: &GaugeRegistry, usage: &[BucketUsage]) -> Result<usize> {
    let mut series = 0;

    for entry in usage {
        let region = entry.bucket.region.as_str();
        let bucket = entry.bucket.name.as_str();

        for class in StorageClass::ALL {
            let stats = entry.class(&class);
            let labels = [
                ("region", region),
                ("storage", class.abbreviation()),
                ("bucket", bucket),
            ];
            let last_modified = stats
                .last_modified
                .map(|t| t.timestamp() as f64)
                .unwrap_or(0.0);

            gauges.set(RAW_SIZE_BYTES, "Bytes stored per storage class", &labels, stats.total_size as f64)?;
            gauges.set(RAW_FILES_TOTAL, "Objects stored per storage class", &labels, stats.total_files as f64)?;
            gauges.set(
                RAW_LAST_MODIFIED,
                "Latest modification per storage class, unix seconds",
                &labels,
                last_modified,
            )?;
            series += 3;
        }
    }

    tracing::debug!("Exported {} raw gauge series", series);
    Ok(series)
}
