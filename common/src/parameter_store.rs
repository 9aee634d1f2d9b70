use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ssm::Client;

pub const USER_PLACEHOLDER: &str = "{user}";

/// Source of decrypted secrets such as exchange API keys
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_parameter(&self, name: &str) -> Result<String>;
}

/// AWS Systems Manager Parameter Store client
pub struct ParameterStore {
    client: Client,
}

impl ParameterStore {
    pub fn with_config(config: &SdkConfig) -> Self {
        let client = Client::new(config);
        Self { client }
    }
}

#[async_trait]
impl SecretStore for ParameterStore {
    /// SecureString parameters are always decrypted on read
    async fn get_parameter(&self, name: &str) -> Result<String> {
        let response = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .context(format!("Failed to get parameter: {}", name))?;

        let parameter = response
            .parameter
            .context(format!("Parameter not found: {}", name))?;

        parameter
            .value
            .context(format!("Parameter has no value: {}", name))
    }
}

/// Expands a parameter name template for one user.
/// Example: "/gains/{user}/api-key" with "ross" -> "/gains/ross/api-key"
pub fn parameter_name_for_user(template: &str, user: &str) -> String {
    template.replace(USER_PLACEHOLDER, user)
}
