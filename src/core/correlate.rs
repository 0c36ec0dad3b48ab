//! Join datapoints back to their buckets

use super::directory::BucketDirectory;
use super::types::DataPoint;
use crate::error::{AnalyserError, Result};

/// Copy each bucket's region and creation date onto its datapoints
///
/// A datapoint naming a bucket outside the directory is an integrity failure.
/// When the datapoint's region disagrees with the directory, the directory wins.
pub fn correlate(directory: &BucketDirectory, datapoints: Vec<DataPoint>) -> Result<Vec<DataPoint>> {
    datapoints
        .into_iter()
        .map(|mut point| {
            let bucket = directory.get(&point.bucket).ok_or_else(|| {
                AnalyserError::UnknownBucket {
                    bucket: point.bucket.clone(),
                    region: point.region.clone(),
                }
            })?;
            if region_mismatch(&point.region, &bucket.region) {
                tracing::warn!(
                    "Datapoint for {} reported region {}, directory has {}",
                    point.bucket,
                    point.region,
                    bucket.region
                );
            }
            point.region = bucket.region.clone();
            point.creation_date = bucket.creation_date;
            Ok(point)
        })
        .collect()
}

fn region_mismatch(reported: &str, resolved: &str) -> bool {
    !reported.is_empty() && reported != resolved
}
