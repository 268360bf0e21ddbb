//! Status service - store summaries and per-user history

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::Transaction;
use crate::services::Ledger;

/// Status service for store summaries
pub struct StatusService {
    ledger: Ledger,
}

impl StatusService {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Get overall status summary
    pub fn get_status(&self) -> Result<StatusSummary> {
        let accounts = self.ledger.accounts()?;
        let transactions = self.ledger.transactions()?;
        let session = self.ledger.session()?;

        let pending: Vec<_> = transactions
            .iter()
            .filter(|tx| tx.is_pending_withdrawal())
            .collect();

        let session = session.map(|s| {
            // Prefer the account store's balance over the cached one
            let account = accounts.iter().find(|a| a.matches_email(&s.email));
            SessionSummary {
                name: s.display_name().to_string(),
                email: s.email.clone(),
                balance: account.map(|a| a.balance).or(s.balance),
                account_exists: account.is_some(),
            }
        });

        Ok(StatusSummary {
            backend: self.ledger.backend().to_string(),
            total_accounts: accounts.len() as i64,
            total_transactions: transactions.len() as i64,
            pending_withdrawals: pending.len() as i64,
            pending_withdrawal_total: pending.iter().map(|tx| tx.amount).sum(),
            session,
        })
    }

    /// Transactions of one user, newest first
    pub fn history(&self, email: &str) -> Result<Vec<Transaction>> {
        let mut transactions = self.ledger.transactions_for(email)?;
        // The log is append-only, so reversing gives newest first
        transactions.reverse();
        Ok(transactions)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub backend: String,
    pub total_accounts: i64,
    pub total_transactions: i64,
    pub pending_withdrawals: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub pending_withdrawal_total: Decimal,
    pub session: Option<SessionSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub name: String,
    pub email: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub balance: Option<Decimal>,
    pub account_exists: bool,
}
