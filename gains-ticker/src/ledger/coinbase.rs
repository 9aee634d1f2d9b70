use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;
use tracing::debug;

use super::{ApiCredentials, LedgerClient, LedgerConnector, LedgerError, Page};
use crate::models::account::{Account, Transaction};
use crate::models::money::Money;
use crate::models::settings::LedgerSettings;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    next_starting_after: Option<String>,
}

impl<T> Envelope<Vec<T>> {
    fn into_page<U>(self, convert: impl Fn(T) -> U) -> Page<U> {
        let next_starting_after = self
            .pagination
            .and_then(|p| p.next_starting_after)
            .filter(|cursor| !cursor.is_empty());
        Page {
            data: self.data.into_iter().map(convert).collect(),
            next_starting_after,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CoinbaseMoney {
    amount: Decimal,
    currency: String,
}

impl From<CoinbaseMoney> for Money {
    fn from(money: CoinbaseMoney) -> Self {
        Money::new(money.amount, &money.currency)
    }
}

/// Older API versions send the bare code, newer ones a currency object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CoinbaseCurrency {
    Code(String),
    Detail { code: String },
}

#[derive(Debug, Deserialize)]
struct CoinbaseAccount {
    id: String,
    currency: CoinbaseCurrency,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    native_balance: CoinbaseMoney,
}

impl From<CoinbaseAccount> for Account {
    fn from(account: CoinbaseAccount) -> Self {
        let currency = match account.currency {
            CoinbaseCurrency::Code(code) | CoinbaseCurrency::Detail { code } => code,
        };
        Account {
            id: account.id,
            currency,
            created_at: account.created_at,
            native_balance: account.native_balance.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CoinbaseTransaction {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    native_amount: CoinbaseMoney,
}

impl From<CoinbaseTransaction> for Transaction {
    fn from(tx: CoinbaseTransaction) -> Self {
        Transaction {
            id: tx.id,
            kind: tx.kind,
            native_amount: tx.native_amount.into(),
        }
    }
}

fn request_url(base_url: &str, path: &str, starting_after: Option<&str>) -> Result<Url, LedgerError> {
    let mut url = Url::parse(&format!("{base_url}{path}"))
        .map_err(|e| LedgerError::InvalidUrl(format!("{base_url}{path}: {e}")))?;
    if let Some(cursor) = starting_after {
        url.query_pairs_mut().append_pair("starting_after", cursor);
    }
    Ok(url)
}

/// Path and encoded query exactly as sent, which is what the signature covers
fn signed_path(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Coinbase v2 REST client using API key authentication
pub struct CoinbaseClient {
    http: Client,
    base_url: String,
    api_version: String,
    credentials: ApiCredentials,
}

impl CoinbaseClient {
    pub fn new(settings: &LedgerSettings, credentials: ApiCredentials) -> Result<Self, LedgerError> {
        if credentials.api_key.is_empty() || credentials.api_secret.is_empty() {
            return Err(LedgerError::Credentials(
                "API key or secret is empty".to_string(),
            ));
        }

        let base_url = settings.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| LedgerError::InvalidUrl(format!("{base_url}: {e}")))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_version: settings.api_version.clone(),
            credentials,
        })
    }

    /// Hex HMAC-SHA256 of `timestamp + method + path + body`
    fn sign(&self, timestamp: i64, method: &str, request_path: &str) -> Result<String, LedgerError> {
        let prehash = format!("{timestamp}{method}{request_path}");
        let mut mac = HmacSha256::new_from_slice(self.credentials.api_secret.as_bytes())
            .map_err(|e| LedgerError::Signing(format!("Invalid HMAC secret: {e}")))?;
        mac.update(prehash.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, starting_after: Option<&str>) -> Result<T, LedgerError> {
        let url = request_url(&self.base_url, path, starting_after)?;
        let request_path = signed_path(&url);
        let timestamp = Utc::now().timestamp();
        let signature = self.sign(timestamp, "GET", &request_path)?;

        debug!("GET {}", request_path);
        let response = self
            .http
            .get(url)
            .header("CB-ACCESS-KEY", &self.credentials.api_key)
            .header("CB-ACCESS-SIGN", signature)
            .header("CB-ACCESS-TIMESTAMP", timestamp.to_string())
            .header("CB-VERSION", &self.api_version)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(LedgerError::Status {
                status: status.as_u16(),
                path: request_path,
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| LedgerError::Decode {
            path: request_path,
            source,
        })
    }
}

#[async_trait]
impl LedgerClient for CoinbaseClient {
    async fn get_account(&self, account_id: &str) -> Result<Account, LedgerError> {
        let envelope: Envelope<CoinbaseAccount> =
            self.get(&format!("/v2/accounts/{account_id}"), None).await?;
        Ok(envelope.data.into())
    }

    async fn get_transactions(
        &self,
        account_id: &str,
        starting_after: Option<&str>,
    ) -> Result<Page<Transaction>, LedgerError> {
        let path = format!("/v2/accounts/{account_id}/transactions");
        let envelope: Envelope<Vec<CoinbaseTransaction>> = self.get(&path, starting_after).await?;
        Ok(envelope.into_page(Transaction::from))
    }

    async fn list_accounts(&self, starting_after: Option<&str>) -> Result<Page<Account>, LedgerError> {
        let envelope: Envelope<Vec<CoinbaseAccount>> = self.get("/v2/accounts", starting_after).await?;
        Ok(envelope.into_page(Account::from))
    }
}

pub struct CoinbaseConnector {
    settings: LedgerSettings,
}

impl CoinbaseConnector {
    pub fn new(settings: LedgerSettings) -> Self {
        Self { settings }
    }
}

impl LedgerConnector for CoinbaseConnector {
    fn connect(&self, credentials: ApiCredentials) -> Result<Box<dyn LedgerClient>, LedgerError> {
        Ok(Box::new(CoinbaseClient::new(&self.settings, credentials)?))
    }
}
