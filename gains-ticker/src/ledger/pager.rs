use std::future::Future;

use super::{LedgerClient, LedgerError, Page};
use crate::models::account::{Account, Transaction};

/// Follows `next_starting_after` until the ledger stops returning a cursor.
/// Pages are appended in the order the API returns them; nothing is deduplicated.
async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, LedgerError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, LedgerError>>,
{
    let mut items = Vec::new();
    let mut cursor = None;

    loop {
        let page = fetch(cursor.take()).await?;
        items.extend(page.data);
        match page.next_starting_after {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(items)
}

pub struct TransactionPager<'a> {
    client: &'a dyn LedgerClient,
}

impl<'a> TransactionPager<'a> {
    pub fn new(client: &'a dyn LedgerClient) -> Self {
        Self { client }
    }

    /// Every transaction of the account, fully materialized
    pub async fn fetch_all(&self, account_id: &str) -> Result<Vec<Transaction>, LedgerError> {
        let client = self.client;
        collect_pages(move |cursor| async move {
            client.get_transactions(account_id, cursor.as_deref()).await
        })
        .await
    }
}

/// Every account visible to the API key
pub async fn fetch_all_accounts(client: &dyn LedgerClient) -> Result<Vec<Account>, LedgerError> {
    collect_pages(move |cursor| async move { client.list_accounts(cursor.as_deref()).await }).await
}
