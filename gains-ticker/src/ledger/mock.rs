//! In-memory ledger for tests. Serves pre-built pages and counts requests.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{ApiCredentials, LedgerClient, LedgerConnector, LedgerError, Page};
use crate::models::account::{Account, Transaction};
use crate::models::money::{Money, USD};

#[derive(Default)]
pub(crate) struct MockLedger {
    accounts: Vec<Account>,
    pages: HashMap<String, Vec<Vec<Transaction>>>,
    failing: Vec<String>,
    transaction_calls: Mutex<Vec<(String, Option<String>)>>,
}

pub(crate) fn transaction(id: &str, amount: Decimal) -> Transaction {
    Transaction {
        id: id.to_string(),
        kind: "buy".to_string(),
        native_amount: Money::new(amount, USD),
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a created account whose transactions are served as the given pages
    pub fn with_account(mut self, id: &str, currency: &str, balance: Decimal, pages: Vec<Vec<Transaction>>) -> Self {
        self.accounts.push(Account {
            id: id.to_string(),
            currency: currency.to_string(),
            created_at: Some(chrono::Utc::now()),
            native_balance: Money::new(balance, USD),
        });
        self.pages.insert(id.to_string(), pages);
        self
    }

    pub fn with_uncreated_account(mut self, id: &str, currency: &str) -> Self {
        self.accounts.push(Account {
            id: id.to_string(),
            currency: currency.to_string(),
            created_at: None,
            native_balance: Money::zero(USD),
        });
        self
    }

    /// Transaction listing for this account answers with a server error
    pub fn with_failing_transactions(mut self, id: &str) -> Self {
        self.failing.push(id.to_string());
        self
    }

    pub fn transaction_calls(&self) -> Vec<(String, Option<String>)> {
        self.transaction_calls.lock().unwrap().clone()
    }

    fn cursor(account_id: &str, index: usize) -> String {
        format!("{account_id}-page-{index}")
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn get_account(&self, account_id: &str) -> Result<Account, LedgerError> {
        self.accounts
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
            .ok_or_else(|| LedgerError::Status {
                status: 404,
                path: format!("/v2/accounts/{account_id}"),
                body: "not found".to_string(),
            })
    }

    async fn get_transactions(
        &self,
        account_id: &str,
        starting_after: Option<&str>,
    ) -> Result<Page<Transaction>, LedgerError> {
        self.transaction_calls
            .lock()
            .unwrap()
            .push((account_id.to_string(), starting_after.map(str::to_string)));

        if self.failing.iter().any(|id| id == account_id) {
            return Err(LedgerError::Status {
                status: 500,
                path: format!("/v2/accounts/{account_id}/transactions"),
                body: "internal error".to_string(),
            });
        }

        let pages = self.pages.get(account_id).cloned().unwrap_or_default();
        let index = match starting_after {
            None => 0,
            Some(cursor) => (0..pages.len())
                .find(|i| Self::cursor(account_id, *i) == cursor)
                .map(|i| i + 1)
                .expect("unknown cursor"),
        };

        let data = pages.get(index).cloned().unwrap_or_default();
        let next_starting_after = (index + 1 < pages.len()).then(|| Self::cursor(account_id, index));
        Ok(Page {
            data,
            next_starting_after,
        })
    }

    async fn list_accounts(&self, starting_after: Option<&str>) -> Result<Page<Account>, LedgerError> {
        // one account per page to exercise the cursor
        let index = match starting_after {
            None => 0,
            Some(cursor) => self.accounts.iter().position(|a| a.id == cursor).map_or(0, |i| i + 1),
        };
        let data: Vec<Account> = self.accounts.get(index).cloned().into_iter().collect();
        let next_starting_after = (index + 1 < self.accounts.len()).then(|| self.accounts[index].id.clone());
        Ok(Page {
            data,
            next_starting_after,
        })
    }
}

/// Hands out a fixed ledger regardless of credentials and records the keys it saw
pub(crate) struct MockConnector {
    ledger: std::sync::Arc<MockLedger>,
    pub seen_keys: Mutex<Vec<String>>,
}

impl MockConnector {
    pub fn new(ledger: MockLedger) -> Self {
        Self {
            ledger: std::sync::Arc::new(ledger),
            seen_keys: Mutex::new(Vec::new()),
        }
    }
}

struct SharedLedger(std::sync::Arc<MockLedger>);

#[async_trait]
impl LedgerClient for SharedLedger {
    async fn get_account(&self, account_id: &str) -> Result<Account, LedgerError> {
        self.0.get_account(account_id).await
    }

    async fn get_transactions(
        &self,
        account_id: &str,
        starting_after: Option<&str>,
    ) -> Result<Page<Transaction>, LedgerError> {
        self.0.get_transactions(account_id, starting_after).await
    }

    async fn list_accounts(&self, starting_after: Option<&str>) -> Result<Page<Account>, LedgerError> {
        self.0.list_accounts(starting_after).await
    }
}

impl LedgerConnector for MockConnector {
    fn connect(&self, credentials: ApiCredentials) -> Result<Box<dyn LedgerClient>, LedgerError> {
        self.seen_keys.lock().unwrap().push(credentials.api_key);
        Ok(Box::new(SharedLedger(self.ledger.clone())))
    }
}
