use anyhow::{Context, Result};
use aws_config::SdkConfig;
use serde::Deserialize;
use std::fs::File;
use std::io::prelude::*;

use crate::s3_config::S3ConfigReader;

#[derive(Debug)]
pub struct SettingsReader {}

impl SettingsReader {
    /// Read settings from a local JSON file
    pub fn read_config_file<Settings>(path: &str) -> Result<Settings>
    where
        Settings: for<'de> Deserialize<'de>,
    {
        let mut file = File::open(path).context(format!("Failed to open settings file: {}", path))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::parse_config(&contents).context(format!("Failed to parse settings file: {}", path))
    }

    pub fn parse_config<Settings>(contents: &str) -> Result<Settings>
    where
        Settings: for<'de> Deserialize<'de>,
    {
        let settings: Settings = serde_json::from_str(contents)?;
        Ok(settings)
    }

    /// Read settings from an S3 object
    pub async fn read_config_from_s3<Settings>(
        sdk_config: &SdkConfig,
        bucket_name: &str,
        object_key: &str,
    ) -> Result<Settings>
    where
        Settings: for<'de> Deserialize<'de>,
    {
        S3ConfigReader::with_config(sdk_config)
            .read_json_config(bucket_name, object_key)
            .await
    }
}
