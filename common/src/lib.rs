use anyhow::{Context, Result};
use std::fmt;

use crate::settings::SettingsReader;

pub mod aws;
pub mod logging;
pub mod parameter_store;
pub mod s3_config;
pub mod settings;

pub const SETTINGS_BUCKET_ENV: &str = "GAINS_SETTINGS_BUCKET";

/// Bucket and key a settings object was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
}

impl fmt::Display for S3Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// `None` when no bucket is configured
pub fn settings_location(bucket: Option<&str>, object_key: &str) -> Option<S3Location> {
    match bucket {
        Some(bucket) if !bucket.is_empty() => Some(S3Location {
            bucket: bucket.to_string(),
            key: object_key.to_string(),
        }),
        _ => None,
    }
}

/// Loads settings from the bucket named by `GAINS_SETTINGS_BUCKET`.
/// Returns `None` when the variable is unset so the caller can fall back to defaults.
/// Runs before logging is initialised, so the location is handed back for the caller to log.
pub async fn load_settings_from_s3<T>(object_key: &str) -> Result<Option<(T, S3Location)>>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let bucket = std::env::var(SETTINGS_BUCKET_ENV).ok();
    let location = match settings_location(bucket.as_deref(), object_key) {
        Some(location) => location,
        None => return Ok(None),
    };

    let sdk_config = aws::AwsSettings::default().load().await;
    let settings =
        SettingsReader::read_config_from_s3::<T>(&sdk_config, &location.bucket, &location.key)
            .await
            .with_context(|| format!("Failed to load settings from {location}"))?;
    Ok(Some((settings, location)))
}
