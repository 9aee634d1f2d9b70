use anyhow::{Context, Result};
use aws_config::SdkConfig;
use serde::Deserialize;

/// Reads JSON documents such as the job settings from S3
pub struct S3ConfigReader {
    client: aws_sdk_s3::Client,
}

impl S3ConfigReader {
    pub fn with_config(config: &SdkConfig) -> Self {
        let client = aws_sdk_s3::Client::new(config);
        Self { client }
    }

    pub async fn read_string(&self, bucket: &str, key: &str) -> Result<String> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .context(format!("Failed to fetch object from S3: s3://{}/{}", bucket, key))?;

        let body = response.body.collect().await.context(format!(
            "Failed to read response body from s3://{}/{}",
            bucket, key
        ))?;

        String::from_utf8(body.into_bytes().to_vec()).context("S3 object is not valid UTF-8")
    }

    pub async fn read_json_config<T>(&self, bucket: &str, key: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let contents = self.read_string(bucket, key).await?;
        serde_json::from_str(&contents).context(format!(
            "Failed to parse JSON configuration from s3://{}/{}",
            bucket, key
        ))
    }
}
