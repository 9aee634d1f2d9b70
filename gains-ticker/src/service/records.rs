use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::summary::AggregateReport;

/// Label used for the roll-up row across all accounts
pub const ROLLUP_LABEL: &str = "account";

const MEASURE_VALUE_TYPE: &str = "DOUBLE";
const METRIC_UNIT: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Gain,
    Balance,
    Investment,
}

impl Measure {
    pub fn name(&self) -> &'static str {
        match self {
            Measure::Gain => "gain",
            Measure::Balance => "balance",
            Measure::Investment => "investment",
        }
    }
}

/// One measure for one label (the roll-up or a currency)
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureRow {
    pub label: String,
    pub measure: Measure,
    pub value: Decimal,
}

fn rows_for(label: &str, gain: Decimal, balance: Decimal, investment: Decimal) -> [MeasureRow; 3] {
    [
        (Measure::Gain, gain),
        (Measure::Balance, balance),
        (Measure::Investment, investment),
    ]
    .map(|(measure, value)| MeasureRow {
        label: label.to_string(),
        measure,
        value,
    })
}

/// Roll-up first, then every account in report order. Each label carries all three measures.
pub fn measure_rows(report: &AggregateReport) -> Vec<MeasureRow> {
    let mut rows = Vec::with_capacity(3 * (report.summaries().len() + 1));
    rows.extend(rows_for(
        ROLLUP_LABEL,
        report.total_gains().amount(),
        report.total_balance().amount(),
        report.total_investment().amount(),
    ));
    for summary in report.summaries() {
        rows.extend(rows_for(
            &summary.name,
            summary.realized_gains().amount(),
            summary.balance().amount(),
            summary.investment().amount(),
        ));
    }
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordDimension {
    pub name: String,
    pub value: String,
}

impl RecordDimension {
    fn new(name: &str, value: &str) -> Self {
        RecordDimension {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimeSeriesRecord {
    pub dimensions: Vec<RecordDimension>,
    pub measure_name: String,
    pub measure_value: String,
    pub measure_value_type: &'static str,
    /// Epoch milliseconds
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricPoint {
    pub metric_name: String,
    pub dimensions: Vec<RecordDimension>,
    pub value: f64,
    pub unit: &'static str,
    pub timestamp: DateTime<Utc>,
}

pub fn build_record(owner: &str, row: &MeasureRow, timestamp: DateTime<Utc>) -> TimeSeriesRecord {
    TimeSeriesRecord {
        dimensions: vec![
            RecordDimension::new("wallet", owner),
            RecordDimension::new("type", &row.label),
        ],
        measure_name: row.measure.name().to_string(),
        measure_value: row.value.to_string(),
        measure_value_type: MEASURE_VALUE_TYPE,
        time: timestamp.timestamp_millis().to_string(),
    }
}

pub fn build_metric(owner: &str, row: &MeasureRow, timestamp: DateTime<Utc>) -> MetricPoint {
    MetricPoint {
        metric_name: row.measure.name().to_string(),
        dimensions: vec![
            RecordDimension::new("user", owner),
            RecordDimension::new("account", &row.label),
        ],
        value: row.value.to_f64().unwrap_or_default(),
        unit: METRIC_UNIT,
        timestamp,
    }
}

pub fn build_records(owner: &str, rows: &[MeasureRow], timestamp: DateTime<Utc>) -> Vec<TimeSeriesRecord> {
    rows.iter().map(|row| build_record(owner, row, timestamp)).collect()
}

pub fn build_metrics(owner: &str, rows: &[MeasureRow], timestamp: DateTime<Utc>) -> Vec<MetricPoint> {
    rows.iter().map(|row| build_metric(owner, row, timestamp)).collect()
}
