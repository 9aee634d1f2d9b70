use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::Money;

/// Reference to an account on the ledger, as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    pub account_id: String,
}

impl From<&str> for AccountRef {
    fn from(account_id: &str) -> Self {
        AccountRef {
            account_id: account_id.to_string(),
        }
    }
}

/// Live view of a ledger account at the time it was fetched
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: String,
    pub currency: String,
    /// Absent for wallets the exchange lists but never initialized
    pub created_at: Option<DateTime<Utc>>,
    pub native_balance: Money,
}

impl Account {
    pub fn is_created(&self) -> bool {
        self.created_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub kind: String,
    pub native_amount: Money,
}
