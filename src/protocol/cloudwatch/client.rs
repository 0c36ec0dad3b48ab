//! CloudWatch metrics provider

use crate::protocol::aws::{block_on, to_chrono, RegionalClients};
use crate::protocol::error::{ProviderError, ProviderResult};
use crate::protocol::types::{
    Dimension, MetricDescriptor, MetricUnit, MetricsPage, MetricsQuery, Statistic,
    StatisticDatapoint, StatisticRequest,
};
use crate::protocol::MetricsProvider;
use aws_config::SdkConfig;
use aws_sdk_cloudwatch::config::Region;
use aws_sdk_cloudwatch::primitives::DateTime as SdkDateTime;
use aws_sdk_cloudwatch::types::{
    Datapoint, Dimension as AwsDimension, DimensionFilter, StandardUnit,
    Statistic as AwsStatistic,
};
use aws_sdk_cloudwatch::Client as AwsCloudWatchClient;
use tokio::runtime::Handle;

/// CloudWatch client holding one SDK client per region
pub struct CloudWatchClient {
    sdk_config: SdkConfig,
    regional: RegionalClients<AwsCloudWatchClient>,
    handle: Handle,
}

impl CloudWatchClient {
    pub fn new(sdk_config: SdkConfig, handle: Handle) -> Self {
        Self {
            sdk_config,
            regional: RegionalClients::new(),
            handle,
        }
    }

    fn client_for(&self, region: &str) -> ProviderResult<AwsCloudWatchClient> {
        self.regional.get_or_build(region, |region| {
            let conf = aws_sdk_cloudwatch::config::Builder::from(&self.sdk_config)
                .region(Region::new(region.to_string()))
                .build();
            AwsCloudWatchClient::from_conf(conf)
        })
    }

    async fn fetch_metrics_page(
        &self,
        query: &MetricsQuery,
        next_token: Option<&str>,
    ) -> ProviderResult<MetricsPage> {
        let client = self.client_for(&query.region)?;

        let mut call = client
            .list_metrics()
            .namespace(&query.namespace)
            .set_next_token(next_token.map(str::to_string));

        for dimension in &query.dimensions {
            let filter = DimensionFilter::builder()
                .name(&dimension.name)
                .value(&dimension.value)
                .build();
            call = call.dimensions(filter);
        }

        let response = call.send().await.map_err(|e| {
            ProviderError::from(e).context(format!("listing metrics in {}", query.region))
        })?;

        let descriptors = response
            .metrics()
            .iter()
            .filter_map(|metric| {
                Some(MetricDescriptor {
                    namespace: metric.namespace()?.to_string(),
                    metric_name: metric.metric_name()?.to_string(),
                    dimensions: metric
                        .dimensions()
                        .iter()
                        .filter_map(|d| Some(Dimension::new(d.name()?, d.value()?)))
                        .collect(),
                })
            })
            .collect();

        Ok(MetricsPage {
            descriptors,
            next_token: response.next_token().map(str::to_string),
        })
    }

    async fn fetch_statistic(
        &self,
        request: &StatisticRequest,
    ) -> ProviderResult<Vec<StatisticDatapoint>> {
        let client = self.client_for(&request.region)?;

        let dimensions: Vec<AwsDimension> = request
            .descriptor
            .dimensions
            .iter()
            .map(|d| AwsDimension::builder().name(&d.name).value(&d.value).build())
            .collect();

        let response = client
            .get_metric_statistics()
            .namespace(&request.descriptor.namespace)
            .metric_name(&request.descriptor.metric_name)
            .set_dimensions(Some(dimensions))
            .start_time(SdkDateTime::from_secs(request.window.start.timestamp()))
            .end_time(SdkDateTime::from_secs(request.window.end.timestamp()))
            .period(request.window.period_secs)
            .statistics(to_aws_statistic(request.statistic))
            .unit(to_aws_unit(request.unit))
            .send()
            .await
            .map_err(|e| {
                ProviderError::from(e).context(format!(
                    "fetching {} in {}",
                    request.descriptor.metric_name, request.region
                ))
            })?;

        Ok(response
            .datapoints()
            .iter()
            .filter_map(|dp| {
                Some(StatisticDatapoint {
                    timestamp: dp.timestamp().and_then(to_chrono),
                    value: statistic_value(dp, request.statistic)?,
                })
            })
            .collect())
    }
}

fn to_aws_statistic(statistic: Statistic) -> AwsStatistic {
    match statistic {
        Statistic::Average => AwsStatistic::Average,
        Statistic::Sum => AwsStatistic::Sum,
        Statistic::Minimum => AwsStatistic::Minimum,
        Statistic::Maximum => AwsStatistic::Maximum,
        Statistic::SampleCount => AwsStatistic::SampleCount,
    }
}

fn to_aws_unit(unit: MetricUnit) -> StandardUnit {
    match unit {
        MetricUnit::Count => StandardUnit::Count,
        MetricUnit::Bytes => StandardUnit::Bytes,
    }
}

fn statistic_value(dp: &Datapoint, statistic: Statistic) -> Option<f64> {
    match statistic {
        Statistic::Average => dp.average(),
        Statistic::Sum => dp.sum(),
        Statistic::Minimum => dp.minimum(),
        Statistic::Maximum => dp.maximum(),
        Statistic::SampleCount => dp.sample_count(),
    }
}

impl MetricsProvider for CloudWatchClient {
    fn list_metrics_page(
        &self,
        query: &MetricsQuery,
        next_token: Option<&str>,
    ) -> ProviderResult<MetricsPage> {
        block_on(&self.handle, self.fetch_metrics_page(query, next_token))
    }

    fn get_statistic(
        &self,
        request: &StatisticRequest,
    ) -> ProviderResult<Vec<StatisticDatapoint>> {
        block_on(&self.handle, self.fetch_statistic(request))
    }
}
