use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::parameter_store::{parameter_name_for_user, ParameterStore, SecretStore};
use std::sync::Arc;
use tracing::{error, info};

use super::aggregator::AccountAggregator;
use super::metrics::{CloudWatchMetrics, MetricsWriter};
use super::records::{build_metrics, build_records, measure_rows};
use super::registry::{ledger_account_refs, AccountRegistry, DynamoRegistry};
use super::timestream::{TimeSeriesWriter, TimestreamWriter};
use crate::ledger::coinbase::CoinbaseConnector;
use crate::ledger::{ApiCredentials, LedgerClient, LedgerConnector};
use crate::models::account::AccountRef;
use crate::models::event::Invocation;
use crate::models::settings::{AccountSource, LedgerSettings, Settings};
use crate::models::summary::AggregateReport;

/// Everything one invocation needs, built once at cold start
pub struct Job {
    ledger: LedgerSettings,
    default_user: Option<String>,
    secrets: Arc<dyn SecretStore>,
    connector: Arc<dyn LedgerConnector>,
    registry: Option<Arc<dyn AccountRegistry>>,
    timeseries: Option<Arc<dyn TimeSeriesWriter>>,
    metrics: Option<Arc<dyn MetricsWriter>>,
}

impl Job {
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let sdk_config = settings.aws.load().await;

        let registry: Option<Arc<dyn AccountRegistry>> = match &settings.accounts {
            AccountSource::Ledger => None,
            AccountSource::Registry {
                table,
                user_key,
                account_key,
            } => Some(Arc::new(DynamoRegistry::new(&sdk_config, table, user_key, account_key))),
        };

        let timeseries: Option<Arc<dyn TimeSeriesWriter>> = match &settings.timestream {
            Some(timestream) => Some(Arc::new(TimestreamWriter::connect(&sdk_config, timestream).await?)),
            None => None,
        };

        let metrics: Option<Arc<dyn MetricsWriter>> = settings
            .metrics
            .as_ref()
            .map(|m| Arc::new(CloudWatchMetrics::new(&sdk_config, m)) as Arc<dyn MetricsWriter>);

        Ok(Job {
            ledger: settings.ledger.clone(),
            default_user: settings.default_user.clone(),
            secrets: Arc::new(ParameterStore::with_config(&sdk_config)),
            connector: Arc::new(CoinbaseConnector::new(settings.ledger.clone())),
            registry,
            timeseries,
            metrics,
        })
    }

    /// Runs every user the invocation names, in order. The first failure fails the invocation
    /// so the trigger can redeliver.
    pub async fn handle(&self, invocation: &Invocation, timestamp: DateTime<Utc>) -> Result<Vec<String>> {
        let users = invocation.users(self.default_user.as_deref())?;
        for user in &users {
            if let Err(err) = self.run_for_user(user, timestamp).await {
                error!("ERROR: invocation for {} failed: {:#}", user, err);
                return Err(err);
            }
        }
        Ok(users)
    }

    pub async fn run_for_user(&self, user: &str, timestamp: DateTime<Utc>) -> Result<AggregateReport> {
        info!("Aggregating realized gains for {}", user);
        let credentials = self.credentials(user).await?;
        let ledger = self.connector.connect(credentials)?;

        let accounts = self.account_refs(user, ledger.as_ref()).await?;
        let report = AccountAggregator::new(accounts, ledger.as_ref())
            .with_reporting_currency(&self.ledger.reporting_currency)
            .aggregate()
            .await
            .context(format!("Failed to aggregate accounts for {}", user))?;

        info!(
            "{}: {} account(s), gains {}, balance {}, investment {}",
            user,
            report.summaries().len(),
            report.total_gains(),
            report.total_balance(),
            report.total_investment()
        );

        self.publish(user, &report, timestamp).await?;
        Ok(report)
    }

    async fn credentials(&self, user: &str) -> Result<ApiCredentials> {
        let api_key = self
            .secrets
            .get_parameter(&parameter_name_for_user(&self.ledger.api_key_parameter, user))
            .await?;
        let api_secret = self
            .secrets
            .get_parameter(&parameter_name_for_user(&self.ledger.api_secret_parameter, user))
            .await?;
        Ok(ApiCredentials { api_key, api_secret })
    }

    async fn account_refs(&self, user: &str, ledger: &dyn LedgerClient) -> Result<Vec<AccountRef>> {
        let accounts = match &self.registry {
            Some(registry) => registry.query(user).await,
            None => ledger_account_refs(ledger).await,
        };
        accounts.context(format!("Failed to list accounts for {}", user))
    }

    async fn publish(&self, user: &str, report: &AggregateReport, timestamp: DateTime<Utc>) -> Result<()> {
        let rows = measure_rows(report);

        match &self.timeseries {
            Some(writer) => writer.write_records(&build_records(user, &rows, timestamp)).await?,
            None => info!("Timestream output disabled"),
        }

        match &self.metrics {
            Some(writer) => writer.put_metrics(&build_metrics(user, &rows, timestamp)).await?,
            None => info!("CloudWatch metrics output disabled"),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::mock::{transaction, MockConnector, MockLedger};
    use crate::service::records::{MetricPoint, TimeSeriesRecord};
    use crate::service::registry::RegistryError;
    use crate::service::timestream::rejected_records_error;
    use crate::service::{Rejection, WriteError};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MemorySecrets(HashMap<String, String>);

    #[async_trait]
    impl SecretStore for MemorySecrets {
        async fn get_parameter(&self, name: &str) -> Result<String> {
            self.0
                .get(name)
                .cloned()
                .context(format!("Parameter not found: {}", name))
        }
    }

    #[derive(Default)]
    struct RecordingWriter {
        records: Mutex<Vec<TimeSeriesRecord>>,
        reject_index: Option<usize>,
    }

    #[async_trait]
    impl TimeSeriesWriter for RecordingWriter {
        async fn write_records(&self, records: &[TimeSeriesRecord]) -> Result<(), WriteError> {
            let mut stored = self.records.lock().unwrap();
            for (index, record) in records.iter().enumerate() {
                if Some(index) != self.reject_index {
                    stored.push(record.clone());
                }
            }
            match self.reject_index {
                Some(index) => Err(rejected_records_error(vec![Rejection {
                    index,
                    reason: "Duplicate record".to_string(),
                }])),
                None => Ok(()),
            }
        }
    }

    #[derive(Default)]
    struct RecordingMetrics {
        points: Mutex<Vec<MetricPoint>>,
    }

    #[async_trait]
    impl MetricsWriter for RecordingMetrics {
        async fn put_metrics(&self, points: &[MetricPoint]) -> Result<(), WriteError> {
            self.points.lock().unwrap().extend_from_slice(points);
            Ok(())
        }
    }

    struct StaticRegistry(HashMap<String, Vec<AccountRef>>);

    #[async_trait]
    impl AccountRegistry for StaticRegistry {
        async fn query(&self, user_id: &str) -> Result<Vec<AccountRef>, RegistryError> {
            Ok(self.0.get(user_id).cloned().unwrap_or_default())
        }
    }

    fn secrets_for(users: &[&str]) -> Arc<dyn SecretStore> {
        let mut values = HashMap::new();
        for user in users {
            values.insert(format!("/realized-gains/{user}/coinbase/api-key"), format!("{user}-key"));
            values.insert(format!("/realized-gains/{user}/coinbase/api-secret"), format!("{user}-secret"));
        }
        Arc::new(MemorySecrets(values))
    }

    fn ledger() -> MockLedger {
        MockLedger::new()
            .with_account(
                "a",
                "BTC",
                dec!(100.00),
                vec![vec![transaction("1", dec!(30.00))], vec![transaction("2", dec!(20.00))]],
            )
            .with_uncreated_account("ghost", "DOGE")
            .with_account("b", "ETH", dec!(-5.00), vec![vec![transaction("3", dec!(10.00))]])
    }

    struct Fixture {
        job: Job,
        connector: Arc<MockConnector>,
        writer: Arc<RecordingWriter>,
        metrics: Arc<RecordingMetrics>,
    }

    fn fixture(writer: RecordingWriter, registry: Option<Arc<dyn AccountRegistry>>) -> Fixture {
        let connector = Arc::new(MockConnector::new(ledger()));
        let writer = Arc::new(writer);
        let metrics = Arc::new(RecordingMetrics::default());
        let job = Job {
            ledger: LedgerSettings::default(),
            default_user: Some("ross".to_string()),
            secrets: secrets_for(&["ross", "alice"]),
            connector: connector.clone(),
            registry,
            timeseries: Some(writer.clone()),
            metrics: Some(metrics.clone()),
        };
        Fixture {
            job,
            connector,
            writer,
            metrics,
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[tokio::test]
    async fn test_run_for_user_publishes_report() {
        let fixture = fixture(RecordingWriter::default(), None);

        let report = fixture.job.run_for_user("ross", fixed_time()).await.unwrap();

        assert_eq!(report.total_gains().amount(), dec!(35.00));
        assert_eq!(report.total_investment().amount(), dec!(60.00));
        assert_eq!(report.total_balance().amount(), dec!(95.00));
        assert_eq!(*fixture.connector.seen_keys.lock().unwrap(), vec!["ross-key"]);

        let records = fixture.writer.records.lock().unwrap();
        let written: Vec<(String, String, String)> = records
            .iter()
            .map(|r| (r.dimensions[1].value.clone(), r.measure_name.clone(), r.measure_value.clone()))
            .collect();
        assert_eq!(
            written,
            vec![
                ("account".to_string(), "gain".to_string(), "35.00".to_string()),
                ("account".to_string(), "balance".to_string(), "95.00".to_string()),
                ("account".to_string(), "investment".to_string(), "60.00".to_string()),
                ("BTC".to_string(), "gain".to_string(), "50.00".to_string()),
                ("BTC".to_string(), "balance".to_string(), "100.00".to_string()),
                ("BTC".to_string(), "investment".to_string(), "50.00".to_string()),
                ("ETH".to_string(), "gain".to_string(), "-15.00".to_string()),
                ("ETH".to_string(), "balance".to_string(), "-5.00".to_string()),
                ("ETH".to_string(), "investment".to_string(), "10.00".to_string()),
            ]
        );
        assert!(records.iter().all(|r| r.dimensions[0].value == "ross"));
        assert!(records.iter().all(|r| r.time == "1704164645000"));

        let points = fixture.metrics.points.lock().unwrap();
        assert_eq!(points.len(), 9);
        assert_eq!(points[6].metric_name, "gain");
        assert_eq!(points[6].value, -15.0);
        assert_eq!(points[6].dimensions[1].value, "ETH");
    }

    #[tokio::test]
    async fn test_registry_limits_accounts() {
        let registry = StaticRegistry(HashMap::from([(
            "ross".to_string(),
            vec![AccountRef::from("b")],
        )]));
        let fixture = fixture(RecordingWriter::default(), Some(Arc::new(registry)));

        let report = fixture.job.run_for_user("ross", fixed_time()).await.unwrap();

        assert_eq!(report.summaries().len(), 1);
        assert_eq!(report.summaries()[0].name, "ETH");
        assert_eq!(report.total_gains().amount(), dec!(-15.00));
    }

    #[tokio::test]
    async fn test_rejected_records_fail_the_invocation() {
        let writer = RecordingWriter {
            reject_index: Some(1),
            ..RecordingWriter::default()
        };
        let fixture = fixture(writer, None);

        let err = fixture.job.run_for_user("ross", fixed_time()).await.unwrap_err();

        match err.downcast_ref::<WriteError>() {
            Some(WriteError::RejectedRecords { rejected, .. }) => assert_eq!(rejected[0].index, 1),
            other => panic!("unexpected error {other:?}"),
        }
        // the unrejected records were still stored
        assert_eq!(fixture.writer.records.lock().unwrap().len(), 8);
        // metrics are not published after a failed write
        assert!(fixture.metrics.points.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials_fail() {
        let fixture = fixture(RecordingWriter::default(), None);

        let err = fixture.job.run_for_user("mallory", fixed_time()).await.unwrap_err();

        assert!(err.to_string().contains("/realized-gains/mallory/coinbase/api-key"));
        assert!(fixture.writer.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handle_queue_batch() {
        let fixture = fixture(RecordingWriter::default(), None);
        let invocation = Invocation::Queue {
            user_names: vec!["ross".to_string(), "alice".to_string()],
        };

        let users = fixture.job.handle(&invocation, fixed_time()).await.unwrap();

        assert_eq!(users, vec!["ross", "alice"]);
        assert_eq!(*fixture.connector.seen_keys.lock().unwrap(), vec!["ross-key", "alice-key"]);
        assert_eq!(fixture.writer.records.lock().unwrap().len(), 18);
    }

    #[tokio::test]
    async fn test_handle_stops_at_first_failure() {
        let fixture = fixture(RecordingWriter::default(), None);
        let invocation = Invocation::Queue {
            user_names: vec!["mallory".to_string(), "ross".to_string()],
        };

        assert!(fixture.job.handle(&invocation, fixed_time()).await.is_err());
        assert!(fixture.connector.seen_keys.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_direct_invocation_uses_default_user() {
        let fixture = fixture(RecordingWriter::default(), None);

        let users = fixture
            .job
            .handle(&Invocation::Direct { user_name: None }, fixed_time())
            .await
            .unwrap();

        assert_eq!(users, vec!["ross"]);
    }

    #[tokio::test]
    async fn test_disabled_outputs_are_skipped() {
        let mut fixture = fixture(RecordingWriter::default(), None);
        fixture.job.timeseries = None;
        fixture.job.metrics = None;

        let report = fixture.job.run_for_user("ross", fixed_time()).await.unwrap();

        assert_eq!(report.summaries().len(), 2);
        assert!(fixture.writer.records.lock().unwrap().is_empty());
        assert!(fixture.metrics.points.lock().unwrap().is_empty());
    }
}
