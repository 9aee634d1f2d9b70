use common::{aws::AwsSettings, logging::LoggingConfig};
use serde::{Deserialize, Serialize};

use super::money::USD;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub aws: AwsSettings,
    pub logging: LoggingConfig,
    pub ledger: LedgerSettings,
    pub accounts: AccountSource,
    /// `null` disables the Timestream output
    pub timestream: Option<TimestreamSettings>,
    /// `null` disables the CloudWatch metrics output
    pub metrics: Option<MetricsSettings>,
    /// Owner used when a direct invocation names no user
    pub default_user: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            aws: AwsSettings::default(),
            logging: LoggingConfig::default(),
            ledger: LedgerSettings::default(),
            accounts: AccountSource::default(),
            timestream: Some(TimestreamSettings::default()),
            metrics: Some(MetricsSettings::default()),
            default_user: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    pub base_url: String,
    pub api_version: String,
    /// SSM parameter names; `{user}` is replaced with the invoking user
    pub api_key_parameter: String,
    pub api_secret_parameter: String,
    pub reporting_currency: String,
    pub timeout_secs: u64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            base_url: "https://api.coinbase.com".to_string(),
            api_version: "2021-06-01".to_string(),
            api_key_parameter: "/realized-gains/{user}/coinbase/api-key".to_string(),
            api_secret_parameter: "/realized-gains/{user}/coinbase/api-secret".to_string(),
            reporting_currency: USD.to_string(),
            timeout_secs: 20,
        }
    }
}

fn default_user_key() -> String {
    "user_id".to_string()
}

fn default_account_key() -> String {
    "account_id".to_string()
}

/// Where the list of accounts to aggregate comes from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum AccountSource {
    /// Every account the exchange lists for the API key
    #[default]
    Ledger,
    /// Accounts registered for the user in a DynamoDB table
    Registry {
        table: String,
        #[serde(default = "default_user_key")]
        user_key: String,
        #[serde(default = "default_account_key")]
        account_key: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestreamSettings {
    pub database: String,
    pub table: String,
}

impl Default for TimestreamSettings {
    fn default() -> Self {
        TimestreamSettings {
            database: "realized-gains".to_string(),
            table: "gains".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    pub namespace: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        MetricsSettings {
            namespace: "RealizedGains".to_string(),
        }
    }
}
