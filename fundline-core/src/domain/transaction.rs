//! Transaction domain model

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Length of the random base-36 suffix of a transaction id
const ID_SUFFIX_LEN: usize = 7;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Transaction identifier, `tx_<unix millis>_<7 base-36 chars>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Generate an id from a timestamp and a random suffix
    pub fn generate<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> Self {
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        Self(format!("tx_{}_{}", now.timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Funds leaving the platform, debited at request time
    Withdrawal,
    /// Funds entering the platform (recorded by flows outside the ledger core)
    Deposit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Rejected,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Withdrawal => f.write_str("withdrawal"),
            TransactionKind::Deposit => f.write_str("deposit"),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => f.write_str("pending"),
            TransactionStatus::Completed => f.write_str("completed"),
            TransactionStatus::Rejected => f.write_str("rejected"),
        }
    }
}

/// An entry of the global `allTransactions` log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub user_email: String,
    /// Display name at the time of the request
    pub user_name: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// ISO 4217 currency code, normalized to uppercase
    pub currency: String,
    pub status: TransactionStatus,
    pub date: NaiveDate,
    /// Free-text payment channel (bitcoin, ethereum, usdt, ...)
    #[serde(default)]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

impl Transaction {
    /// Create a pending withdrawal dated today (UTC)
    pub fn pending_withdrawal(
        id: TransactionId,
        user_email: impl Into<String>,
        user_name: impl Into<String>,
        amount: Decimal,
        currency: &str,
        method: impl Into<String>,
    ) -> Self {
        Self {
            id,
            user_email: user_email.into(),
            user_name: user_name.into(),
            kind: TransactionKind::Withdrawal,
            amount,
            currency: Self::normalize_currency(currency),
            status: TransactionStatus::Pending,
            date: Utc::now().date_naive(),
            method: method.into(),
            wallet_address: None,
        }
    }

    /// Normalize currency code to uppercase, defaulting to USD
    pub fn normalize_currency(currency: &str) -> String {
        let code = currency.trim().to_uppercase();
        if code.is_empty() {
            "USD".to_string()
        } else {
            code
        }
    }

    pub fn is_pending_withdrawal(&self) -> bool {
        self.kind == TransactionKind::Withdrawal && self.status == TransactionStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_id_format() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let id = TransactionId::generate(now, &mut rng);

        let parts: Vec<&str> = id.as_str().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "tx");
        assert_eq!(parts[1], "1700000000123");
        assert_eq!(parts[2].len(), ID_SUFFIX_LEN);
        assert!(parts[2].bytes().all(|b| BASE36.contains(&b)));
    }

    #[test]
    fn test_currency_normalization() {
        assert_eq!(Transaction::normalize_currency(" eur "), "EUR");
        assert_eq!(Transaction::normalize_currency(""), "USD");
    }

    #[test]
    fn test_pending_withdrawal_layout() {
        let tx = Transaction::pending_withdrawal(
            TransactionId::from("tx_1_abcdefg"),
            "ada@example.com",
            "Ada",
            Decimal::new(5000, 2),
            "usd",
            "bitcoin",
        );
        assert!(tx.is_pending_withdrawal());

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], serde_json::json!("withdrawal"));
        assert_eq!(json["status"], serde_json::json!("pending"));
        assert_eq!(json["userEmail"], serde_json::json!("ada@example.com"));
        assert_eq!(json["currency"], serde_json::json!("USD"));
        assert_eq!(json["amount"], serde_json::json!(50.0));
        assert!(json.get("walletAddress").is_none());
    }

    #[test]
    fn test_reads_records_written_by_other_flows() {
        let raw = r#"{
            "id": "tx_1700000000000_k3j2h1g",
            "userEmail": "ada@example.com",
            "userName": "Ada",
            "type": "deposit",
            "amount": 250,
            "currency": "USD",
            "status": "completed",
            "date": "2024-01-15"
        }"#;
        let tx: Transaction = serde_json::from_str(raw).unwrap();
        assert_eq!(tx.kind, TransactionKind::Deposit);
        assert_eq!(tx.amount, Decimal::new(250, 0));
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(tx.method, "");
    }
}
