use rust_decimal::Decimal;
use serde::Serialize;

use super::money::{Money, MoneyError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    pub name: String,
    balance: Money,
    investment: Money,
}

impl AccountSummary {
    pub fn new(name: &str, balance: Money, investment: Money) -> Result<Self, MoneyError> {
        // balance and investment must be comparable for realized_gains
        balance.checked_sub(&investment)?;
        Ok(AccountSummary {
            name: name.to_string(),
            balance,
            investment,
        })
    }

    pub fn balance(&self) -> &Money {
        &self.balance
    }

    pub fn investment(&self) -> &Money {
        &self.investment
    }

    pub fn currency(&self) -> &str {
        self.balance.currency()
    }

    pub fn realized_gains(&self) -> Money {
        Money::new(
            self.balance.amount() - self.investment.amount(),
            self.balance.currency(),
        )
    }
}

/// Per-account summaries in input order plus roll-up totals
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    currency: String,
    summaries: Vec<AccountSummary>,
}

impl AggregateReport {
    pub fn new(currency: &str) -> Self {
        AggregateReport {
            currency: currency.to_uppercase(),
            summaries: Vec::new(),
        }
    }

    pub fn push(&mut self, summary: AccountSummary) -> Result<(), MoneyError> {
        if summary.currency() != self.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency.clone(),
                right: summary.currency().to_string(),
            });
        }
        self.summaries.push(summary);
        Ok(())
    }

    pub fn summaries(&self) -> &[AccountSummary] {
        &self.summaries
    }

    fn total(&self, field: impl Fn(&AccountSummary) -> Decimal) -> Money {
        let sum: Decimal = self.summaries.iter().map(field).sum();
        Money::new(sum, &self.currency)
    }

    pub fn total_gains(&self) -> Money {
        self.total(|s| s.realized_gains().amount())
    }

    pub fn total_investment(&self) -> Money {
        self.total(|s| s.investment.amount())
    }

    pub fn total_balance(&self) -> Money {
        self.total(|s| s.balance.amount())
    }
}
