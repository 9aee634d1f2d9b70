use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_ssm::config::Credentials;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 20;

/// How AWS clients authenticate. `Default` walks the standard provider chain
/// (environment, profile, Lambda execution role).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AwsCredentials {
    #[default]
    Default,
    Static {
        access_key_id: String,
        #[serde(skip_serializing)]
        secret_access_key: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsSettings {
    pub region: Option<String>,
    pub credentials: AwsCredentials,
    pub max_attempts: u32,
    pub read_timeout_secs: u64,
}

impl Default for AwsSettings {
    fn default() -> Self {
        AwsSettings {
            region: None,
            credentials: AwsCredentials::Default,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

impl AwsSettings {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::standard().with_max_attempts(self.max_attempts.max(1))
    }

    pub fn timeout_config(&self) -> TimeoutConfig {
        TimeoutConfig::builder()
            .read_timeout(Duration::from_secs(self.read_timeout_secs))
            .build()
    }

    /// Resolve a shared SDK config. Every AWS client in the job is built from this.
    pub async fn load(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(self.retry_config())
            .timeout_config(self.timeout_config());

        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }

        if let AwsCredentials::Static {
            access_key_id,
            secret_access_key,
        } = &self.credentials
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "settings",
            ));
        }

        loader.load().await
    }
}
