use tracing::debug;

use crate::ledger::pager::TransactionPager;
use crate::ledger::{LedgerClient, LedgerError};
use crate::models::account::{Account, AccountRef, Transaction};
use crate::models::money::{Money, MoneyError, USD};
use crate::models::summary::{AccountSummary, AggregateReport};

/// Computes realized gains for a list of accounts, one account at a time.
/// Nothing is cached: each call to `aggregate` re-fetches from the ledger.
pub struct AccountAggregator<'a> {
    accounts: Vec<AccountRef>,
    client: &'a dyn LedgerClient,
    reporting_currency: String,
}

impl<'a> AccountAggregator<'a> {
    pub fn new(accounts: Vec<AccountRef>, client: &'a dyn LedgerClient) -> Self {
        Self {
            accounts,
            client,
            reporting_currency: USD.to_string(),
        }
    }

    pub fn with_reporting_currency(mut self, currency: &str) -> Self {
        self.reporting_currency = currency.to_uppercase();
        self
    }

    /// Any ledger failure aborts the whole report.
    pub async fn aggregate(&self) -> Result<AggregateReport, LedgerError> {
        let pager = TransactionPager::new(self.client);
        let mut report = AggregateReport::new(&self.reporting_currency);

        for account_ref in &self.accounts {
            let account = self.client.get_account(&account_ref.account_id).await?;
            if !account.is_created() {
                debug!("Skipping uninitialized account {} ({})", account.id, account.currency);
                continue;
            }

            let transactions = pager.fetch_all(&account.id).await?;
            let summary = self.summarize(&account, &transactions)?;
            debug!(
                "Account {}: {} transactions, balance {}, investment {}, gains {}",
                summary.name,
                transactions.len(),
                summary.balance(),
                summary.investment(),
                summary.realized_gains()
            );
            report.push(summary)?;
        }

        Ok(report)
    }

    // Investment is the raw sum of every transaction regardless of its type.
    fn summarize(&self, account: &Account, transactions: &[Transaction]) -> Result<AccountSummary, MoneyError> {
        let zero = Money::zero(&self.reporting_currency);
        let investment = transactions
            .iter()
            .try_fold(zero.clone(), |total, tx| total.checked_add(&tx.native_amount))?;
        let balance = zero.checked_add(&account.native_balance)?;
        AccountSummary::new(&account.currency, balance, investment)
    }
}
