//! Gauge registry and metrics sinks for s3-analyser
//!
//! - [`GaugeRegistry`]: labelled gauges on a private `prometheus::Registry`,
//!   set idempotently by the run coordinator
//! - [`MetricsSink`]: commits a registry snapshot once per run, either to a
//!   push gateway or to a text exposition file
//!
//! ## Quick Start
//!
//! ```no_run
//! use analyser_observability::{GaugeRegistry, MetricsSink};
//! use std::path::Path;
//!
//! let gauges = GaugeRegistry::new();
//! gauges
//!     .set(
//!         "cloudwatch_s3_objects_total",
//!         "Number of objects",
//!         &[("region", "us-east-1"), ("bucket", "hm.samples")],
//!         4.0,
//!     )
//!     .unwrap();
//!
//! let sink = MetricsSink::select(None, Path::new("s3-metrics.prom"), "s3analyser");
//! sink.commit(&gauges).unwrap();
//! ```

pub mod error;
pub mod gauges;
pub mod sink;

pub use error::{ObservabilityError, Result};
pub use gauges::GaugeRegistry;
pub use sink::MetricsSink;
