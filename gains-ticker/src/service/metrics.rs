use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{Dimension, MetricDatum, StandardUnit};
use aws_sdk_cloudwatch::Client;
use tracing::{error, info};

use super::records::MetricPoint;
use super::WriteError;
use crate::models::settings::MetricsSettings;

const SINK: &str = "cloudwatch";

/// PutMetricData accepts at most this many datums per call
pub const MAX_DATUMS_PER_CALL: usize = 1000;

#[async_trait]
pub trait MetricsWriter: Send + Sync {
    async fn put_metrics(&self, points: &[MetricPoint]) -> Result<(), WriteError>;
}

pub struct CloudWatchMetrics {
    client: Client,
    namespace: String,
}

impl CloudWatchMetrics {
    pub fn new(sdk_config: &SdkConfig, settings: &MetricsSettings) -> Self {
        Self {
            client: Client::new(sdk_config),
            namespace: settings.namespace.clone(),
        }
    }
}

fn to_datum(point: &MetricPoint) -> MetricDatum {
    let dimensions: Vec<Dimension> = point
        .dimensions
        .iter()
        .map(|d| Dimension::builder().name(&d.name).value(&d.value).build())
        .collect();

    MetricDatum::builder()
        .metric_name(&point.metric_name)
        .set_dimensions(Some(dimensions))
        .value(point.value)
        .unit(StandardUnit::from(point.unit))
        .timestamp(AwsDateTime::from_millis(point.timestamp.timestamp_millis()))
        .build()
}

#[async_trait]
impl MetricsWriter for CloudWatchMetrics {
    async fn put_metrics(&self, points: &[MetricPoint]) -> Result<(), WriteError> {
        for chunk in points.chunks(MAX_DATUMS_PER_CALL) {
            let datums: Vec<MetricDatum> = chunk.iter().map(to_datum).collect();

            if let Err(err) = self
                .client
                .put_metric_data()
                .namespace(&self.namespace)
                .set_metric_data(Some(datums))
                .send()
                .await
            {
                let message = DisplayErrorContext(&err).to_string();
                error!("ERROR: PutMetricData to {} failed: {}", self.namespace, message);
                return Err(WriteError::Service { sink: SINK, message });
            }
            info!("PutMetricData to {}: {} datum(s)", self.namespace, chunk.len());
        }
        Ok(())
    }
}
