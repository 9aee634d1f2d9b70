use anyhow::anyhow;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_timestreamwrite::error::DisplayErrorContext;
use aws_sdk_timestreamwrite::operation::write_records::WriteRecordsError;
use aws_sdk_timestreamwrite::types::{Dimension, MeasureValueType, Record, RejectedRecord, TimeUnit};
use aws_sdk_timestreamwrite::Client;
use tracing::{error, info};

use super::records::TimeSeriesRecord;
use super::{Rejection, WriteError};
use crate::models::settings::TimestreamSettings;

const SINK: &str = "timestream";

/// WriteRecords accepts at most this many records per call
pub const MAX_RECORDS_PER_WRITE: usize = 100;

#[async_trait]
pub trait TimeSeriesWriter: Send + Sync {
    async fn write_records(&self, records: &[TimeSeriesRecord]) -> Result<(), WriteError>;
}

pub struct TimestreamWriter {
    client: Client,
    database: String,
    table: String,
}

impl TimestreamWriter {
    pub async fn connect(sdk_config: &SdkConfig, settings: &TimestreamSettings) -> anyhow::Result<Self> {
        let (client, reloader) = Client::new(sdk_config)
            .with_endpoint_discovery_enabled()
            .await
            .map_err(|e| anyhow!("Failed to discover Timestream endpoint: {e}"))?;
        tokio::spawn(reloader.reload_task());

        Ok(Self {
            client,
            database: settings.database.clone(),
            table: settings.table.clone(),
        })
    }
}

fn to_sdk_record(record: &TimeSeriesRecord) -> Result<Record, WriteError> {
    let dimensions = record
        .dimensions
        .iter()
        .map(|d| {
            Dimension::builder()
                .name(&d.name)
                .value(&d.value)
                .build()
                .map_err(|e| WriteError::Build {
                    sink: SINK,
                    message: e.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Record::builder()
        .set_dimensions(Some(dimensions))
        .measure_name(&record.measure_name)
        .measure_value(&record.measure_value)
        .measure_value_type(MeasureValueType::from(record.measure_value_type))
        .time(&record.time)
        .time_unit(TimeUnit::Milliseconds)
        .build())
}

/// Indices are reported against the whole input, `offset` being where this chunk starts
fn rejections(offset: usize, records: &[RejectedRecord]) -> Vec<Rejection> {
    records
        .iter()
        .map(|r| Rejection {
            index: offset + r.record_index().max(0) as usize,
            reason: r.reason().unwrap_or("unknown").to_string(),
        })
        .collect()
}

/// Logs every rejected index with its reason. The whole write is reported as failed.
pub(crate) fn rejected_records_error(rejected: Vec<Rejection>) -> WriteError {
    error!("ERROR RejectedRecords: {} record(s)", rejected.len());
    for rejection in &rejected {
        error!("Rejected Index {}: {}", rejection.index, rejection.reason);
    }
    error!("Other records were written successfully.");
    WriteError::RejectedRecords { sink: SINK, rejected }
}

#[async_trait]
impl TimeSeriesWriter for TimestreamWriter {
    async fn write_records(&self, records: &[TimeSeriesRecord]) -> Result<(), WriteError> {
        for (chunk_index, chunk) in records.chunks(MAX_RECORDS_PER_WRITE).enumerate() {
            let offset = chunk_index * MAX_RECORDS_PER_WRITE;
            let sdk_records = chunk.iter().map(to_sdk_record).collect::<Result<Vec<_>, _>>()?;

            let result = self
                .client
                .write_records()
                .database_name(&self.database)
                .table_name(&self.table)
                .set_records(Some(sdk_records))
                .send()
                .await;

            match result {
                Ok(output) => info!(
                    "WriteRecords to {}.{}: {} record(s) ingested",
                    self.database,
                    self.table,
                    output.records_ingested().map_or(0, |r| r.total())
                ),
                Err(err) => {
                    if let Some(WriteRecordsError::RejectedRecordsException(exception)) = err.as_service_error() {
                        let rejected = rejections(offset, exception.rejected_records());
                        return Err(rejected_records_error(rejected));
                    }

                    let message = DisplayErrorContext(&err).to_string();
                    error!("ERROR: {}", message);
                    return Err(WriteError::Service { sink: SINK, message });
                }
            }
        }
        Ok(())
    }
}
