//! Read-only access to the exchange ledger: accounts, balances and transactions.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::account::{Account, Transaction};
use crate::models::money::MoneyError;

pub(crate) mod coinbase;
pub(crate) mod pager;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Ledger returned {status} for {path}: {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },
    #[error("Failed to decode ledger response for {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid API credentials: {0}")]
    Credentials(String),
    #[error("Failed to sign ledger request: {0}")]
    Signing(String),
    #[error("Invalid ledger URL {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// One page of a cursor-paginated listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    /// Cursor for the next page; `None` once the listing is exhausted
    pub next_starting_after: Option<String>,
}

#[derive(Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn get_account(&self, account_id: &str) -> Result<Account, LedgerError>;

    async fn get_transactions(
        &self,
        account_id: &str,
        starting_after: Option<&str>,
    ) -> Result<Page<Transaction>, LedgerError>;

    async fn list_accounts(&self, starting_after: Option<&str>) -> Result<Page<Account>, LedgerError>;
}

/// Builds a ledger client once a user's API credentials are known
pub trait LedgerConnector: Send + Sync {
    fn connect(&self, credentials: ApiCredentials) -> Result<Box<dyn LedgerClient>, LedgerError>;
}

#[cfg(test)]
pub(crate) mod mock;
