/*!
 * Inventory and aggregation engine
 *
 * Bucket directory → worker pool → paginated sources → correlator → folding.
 */

pub mod concurrency;
pub mod correlate;
pub mod directory;
pub mod enumerate;
pub mod filter;
pub mod fold;
pub mod pagination;
pub mod traverse;
pub mod types;

pub use concurrency::{default_concurrency, WorkerPool};
pub use correlate::correlate;
pub use directory::BucketDirectory;
pub use enumerate::{MetricSeries, MetricsEnumerator, ObjectEnumerator};
pub use filter::BucketFilter;
pub use fold::{folded_field, Aggregates, BucketRow, Field, RegionRow, StorageRow, Totals};
pub use pagination::{Page, Paginated};
pub use traverse::{traverse_all, traverse_bucket, TraverseOptions};
pub use types::{Bucket, BucketUsage, DataPoint, MetricKind, StorageClassStats, StorageType};
