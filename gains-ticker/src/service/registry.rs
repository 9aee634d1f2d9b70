use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::ledger::pager::fetch_all_accounts;
use crate::ledger::{LedgerClient, LedgerError};
use crate::models::account::AccountRef;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Account registry query failed: {0}")]
    Query(String),
    #[error("Registry item is missing string attribute '{0}'")]
    MissingAttribute(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Which accounts belong to a user
#[async_trait]
pub trait AccountRegistry: Send + Sync {
    async fn query(&self, user_id: &str) -> Result<Vec<AccountRef>, RegistryError>;
}

pub struct DynamoRegistry {
    client: Client,
    table: String,
    user_key: String,
    account_key: String,
}

impl DynamoRegistry {
    pub fn new(sdk_config: &SdkConfig, table: &str, user_key: &str, account_key: &str) -> Self {
        Self {
            client: Client::new(sdk_config),
            table: table.to_string(),
            user_key: user_key.to_string(),
            account_key: account_key.to_string(),
        }
    }
}

fn account_ref_from_item(
    item: &HashMap<String, AttributeValue>,
    account_key: &str,
) -> Result<AccountRef, RegistryError> {
    item.get(account_key)
        .and_then(|value| value.as_s().ok())
        .map(|id| AccountRef::from(id.as_str()))
        .ok_or_else(|| RegistryError::MissingAttribute(account_key.to_string()))
}

#[async_trait]
impl AccountRegistry for DynamoRegistry {
    async fn query(&self, user_id: &str) -> Result<Vec<AccountRef>, RegistryError> {
        let mut accounts = Vec::new();
        let mut start_key = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table)
                .key_condition_expression("#user = :user")
                .expression_attribute_names("#user", &self.user_key)
                .expression_attribute_values(":user", AttributeValue::S(user_id.to_string()))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| RegistryError::Query(DisplayErrorContext(&e).to_string()))?;

            for item in output.items.unwrap_or_default() {
                accounts.push(account_ref_from_item(&item, &self.account_key)?);
            }

            start_key = output.last_evaluated_key;
            if start_key.is_none() {
                break;
            }
        }

        debug!("Registry lists {} account(s) for {}", accounts.len(), user_id);
        Ok(accounts)
    }
}

/// Every account the exchange lists for the credentials, used when no registry is configured
pub async fn ledger_account_refs(client: &dyn LedgerClient) -> Result<Vec<AccountRef>, RegistryError> {
    let accounts = fetch_all_accounts(client).await?;
    Ok(accounts
        .iter()
        .map(|account| AccountRef::from(account.id.as_str()))
        .collect())
}
