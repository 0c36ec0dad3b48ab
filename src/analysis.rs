/*!
 * Analysis pipelines
 *
 * Metrics mode: directory → per-region descriptor enumeration → statistic
 * fetch → correlation → folding.
 *
 * Raw mode: directory → per-bucket object traversal → folding.
 *
 * Both pipelines dispatch remote calls on the run's worker pool and do the
 * rest on the calling thread.
 */

use crate::config::{AnalyserConfig, AnalysisMode};
use crate::context::RunContext;
use crate::core::{
    correlate, traverse_all, Aggregates, BucketDirectory, BucketFilter, BucketUsage, DataPoint,
    MetricSeries, MetricsEnumerator, TraverseOptions,
};
use crate::error::Result;
use crate::export::{export_raw_gauges, export_summary_gauges};
use crate::protocol::{MetricsProvider, StatisticWindow, StorageProvider};
use crate::report::{render_raw, render_summary};
use chrono::Utc;

/// Result of the metrics pipeline
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub directory: BucketDirectory,
    pub datapoints: Vec<DataPoint>,
    pub aggregates: Aggregates,
}

/// Result of the raw traversal
#[derive(Debug, Clone)]
pub struct RawSummary {
    pub directory: BucketDirectory,
    pub usage: Vec<BucketUsage>,
    pub aggregates: Aggregates,
}

/// The two providers a run talks to
#[derive(Clone, Copy)]
pub struct Analyser<'a> {
    storage: &'a dyn StorageProvider,
    metrics: &'a dyn MetricsProvider,
}

impl<'a> Analyser<'a> {
    pub fn new(storage: &'a dyn StorageProvider, metrics: &'a dyn MetricsProvider) -> Self {
        Self { storage, metrics }
    }

    /// Run the metrics pipeline
    pub fn summarize(&self, ctx: &RunContext, filter: Option<&BucketFilter>) -> Result<MetricsSummary> {
        let pool = ctx.pool();
        let directory = BucketDirectory::list(self.storage, pool, filter)?;
        let regions = directory.regions();

        let per_region = pool.map(&regions, |region| {
            let mut series = Vec::new();
            for descriptor in MetricsEnumerator::new(self.metrics, region, filter).iter() {
                if let Some(s) = MetricSeries::from_descriptor(region, descriptor?) {
                    series.push(s);
                }
            }
            tracing::debug!("Found {} storage metric series in {}", series.len(), region);
            Ok(series)
        })?;
        let series: Vec<MetricSeries> = per_region.into_iter().flatten().collect();

        let window = StatisticWindow::daily_ending(Utc::now());
        let fetched = pool.map(&series, |s| s.fetch(self.metrics, window))?;
        let datapoints: Vec<DataPoint> = fetched.into_iter().flatten().collect();

        tracing::info!(
            "Fetched {} datapoints from {} series across {} regions",
            datapoints.len(),
            series.len(),
            regions.len()
        );

        let datapoints = correlate(&directory, datapoints)?;
        let aggregates = Aggregates::fold(&directory, &datapoints);

        Ok(MetricsSummary {
            directory,
            datapoints,
            aggregates,
        })
    }

    /// Run the raw traversal
    ///
    /// A sub-path on the filter narrows the listing when `options` has no
    /// prefix of its own.
    pub fn traverse(
        &self,
        ctx: &RunContext,
        filter: Option<&BucketFilter>,
        options: &TraverseOptions,
    ) -> Result<RawSummary> {
        let pool = ctx.pool();
        let directory = BucketDirectory::list(self.storage, pool, filter)?;

        let mut options = options.clone();
        if options.prefix.is_none() {
            options.prefix = filter.and_then(BucketFilter::sub_path).map(str::to_string);
        }

        let usage = traverse_all(self.storage, pool, &directory, &options)?;
        let aggregates = Aggregates::from_usage(&usage);

        tracing::info!(
            "Traversed {} buckets, {} files",
            usage.len(),
            aggregates.totals().files
        );

        Ok(RawSummary {
            directory,
            usage,
            aggregates,
        })
    }
}

/// Execute one configured run and return the rendered report
///
/// Gauges are set on the calling thread after the pipeline finishes and
/// committed once, unless exporting is disabled.
pub fn run(ctx: &RunContext, analyser: &Analyser<'_>, config: &AnalyserConfig) -> Result<String> {
    let filter = BucketFilter::parse_optional(config.prefix.as_deref())?;

    let report = match config.mode {
        AnalysisMode::Metrics => {
            let summary = analyser.summarize(ctx, filter.as_ref())?;
            export_summary_gauges(ctx.gauges(), &summary.aggregates)?;
            render_summary(&summary.aggregates, config.unit, config.format)?
        }
        AnalysisMode::Raw => {
            let options = TraverseOptions {
                prefix: None,
                max_keys: config.max_keys,
            };
            let summary = analyser.traverse(ctx, filter.as_ref(), &options)?;
            export_raw_gauges(ctx.gauges(), &summary.usage)?;
            render_raw(&summary.usage, config.unit, config.format)?
        }
    };

    if config.export.enabled {
        let sink = config.export.sink(config.mode);
        sink.commit(ctx.gauges())?;
        tracing::info!("Committed gauges to {}", sink);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyserError;
    use crate::protocol::mock::MockProvider;
    use crate::protocol::{ProviderError, StorageClass};
    use crate::report::{ReportFormat, SizeUnit};
    use chrono::TimeZone;

    fn provider() -> MockProvider {
        let provider = MockProvider::new();
        let created = Utc.with_ymd_and_hms(2006, 2, 3, 16, 45, 9).unwrap();
        provider.add_bucket("hm.samples", "us-east-1", Some(created));
        provider.add_bucket("logs-eu", "eu-west-1", Some(created));
        provider.add_metric("us-east-1", "hm.samples", "NumberOfObjects", "AllStorageTypes", Some(4.0));
        provider.add_metric("us-east-1", "hm.samples", "BucketSizeBytes", "AllStorageTypes", Some(24.0));
        provider.add_metric("us-east-1", "hm.samples", "BucketSizeBytes", "StandardStorage", Some(24.0));
        provider.add_metric("eu-west-1", "logs-eu", "NumberOfObjects", "AllStorageTypes", Some(10.0));
        provider.add_metric("eu-west-1", "logs-eu", "BucketSizeBytes", "AllStorageTypes", Some(300.0));
        provider.add_metric("eu-west-1", "logs-eu", "BucketSizeBytes", "StandardIAStorage", Some(300.0));
        provider.add_metric("eu-west-1", "logs-eu", "BucketSizeBytes", "GlacierStorage", None);
        provider
    }

    #[test]
    fn test_summarize_folds_every_region() {
        let provider = provider();
        let ctx = RunContext::standalone(Some(2)).unwrap();
        let summary = Analyser::new(&provider, &provider)
            .summarize(&ctx, None)
            .unwrap();

        assert_eq!(summary.directory.len(), 2);
        assert_eq!(summary.datapoints.len(), 6);

        let totals = summary.aggregates.totals();
        assert_eq!(totals.files, 14.0);
        assert_eq!(totals.bytes, 324.0);
        assert_eq!(totals.bytes_ia, 300.0);
        assert_eq!(summary.aggregates.by_region["eu-west-1"].buckets, 1);
        assert!(summary.aggregates.by_bucket["logs-eu"].creation_date.is_some());
    }

    #[test]
    fn test_summarize_with_exact_filter() {
        let provider = provider();
        let ctx = RunContext::standalone(Some(1)).unwrap();
        let filter = BucketFilter::parse("s3://hm.samples").unwrap();
        let summary = Analyser::new(&provider, &provider)
            .summarize(&ctx, Some(&filter))
            .unwrap();

        assert_eq!(summary.aggregates.by_bucket.len(), 1);
        assert_eq!(summary.aggregates.by_bucket["hm.samples"].totals.files, 4.0);
    }

    #[test]
    fn test_unknown_bucket_is_fatal() {
        let provider = provider();
        provider.add_metric("us-east-1", "deleted-bucket", "NumberOfObjects", "AllStorageTypes", Some(1.0));
        let ctx = RunContext::standalone(Some(1)).unwrap();

        let err = Analyser::new(&provider, &provider)
            .summarize(&ctx, None)
            .unwrap_err();
        assert!(matches!(err, AnalyserError::UnknownBucket { .. }));
    }

    #[test]
    fn test_traverse_uses_filter_sub_path() {
        let provider = MockProvider::new();
        provider.add_bucket("demo", "eu-west-1", None);
        provider.add_object("demo", "keep/a", 4, StorageClass::Standard);
        provider.add_object("demo", "skip/b", 8, StorageClass::Standard);

        let ctx = RunContext::standalone(Some(1)).unwrap();
        let filter = BucketFilter::parse("s3://demo/keep/").unwrap();
        let summary = Analyser::new(&provider, &provider)
            .traverse(&ctx, Some(&filter), &TraverseOptions::default())
            .unwrap();

        assert_eq!(summary.usage[0].total_size, 4);
        assert_eq!(summary.aggregates.by_bucket["demo"].totals.files, 1.0);
    }

    #[test]
    fn test_run_writes_text_file() {
        let provider = provider();
        let dir = tempfile::tempdir().unwrap();
        let mut config = AnalyserConfig {
            unit: SizeUnit::B,
            format: ReportFormat::Csv,
            ..Default::default()
        };
        config.export.text_file = dir.path().join("summary.prom");

        let ctx = RunContext::standalone(None).unwrap();
        let report = run(&ctx, &Analyser::new(&provider, &provider), &config).unwrap();

        assert!(report.contains("hm.samples,us-east-1,4,24,24,0,0,2006-02-03T16:45:09"));
        let text = std::fs::read_to_string(dir.path().join("summary.prom")).unwrap();
        assert!(text.contains("cloudwatch_s3_region_buckets{region=\"eu-west-1\"} 1"));
    }

    #[test]
    fn test_run_without_export_leaves_no_file() {
        let provider = provider();
        let dir = tempfile::tempdir().unwrap();
        let mut config = AnalyserConfig::default();
        config.export.enabled = false;
        config.export.text_file = dir.path().join("summary.prom");

        let ctx = RunContext::standalone(Some(1)).unwrap();
        run(&ctx, &Analyser::new(&provider, &provider), &config).unwrap();

        assert!(!dir.path().join("summary.prom").exists());
        assert!(ctx.gauges().series_count("cloudwatch_s3_objects_total") > 0);
    }

    #[test]
    fn test_region_failure_aborts_run() {
        let provider = provider();
        provider.fail_location("logs-eu", ProviderError::AccessDenied("denied".to_string()));
        let ctx = RunContext::standalone(Some(2)).unwrap();

        let err = run(&ctx, &Analyser::new(&provider, &provider), &AnalyserConfig::default())
            .unwrap_err();
        assert!(matches!(err, AnalyserError::RegionResolution { .. }));
        assert!(err.to_string().starts_with("logs-eu "));
    }
}
