//! User account domain model

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::STARTING_BALANCE;

/// Account identifier
///
/// New accounts get a UUID v4. Records written by other flows may carry any
/// string (e.g. a millisecond timestamp) or a bare number; both are kept
/// as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Number(number) => Self(number.to_string()),
        })
    }
}

/// A registered investor, stored in the `registeredUsers` collection
///
/// Field names follow the persisted layout (camelCase JSON). The balance is
/// serialized as a JSON number and is implicitly USD. Fields this crate does
/// not manage land in `other` and are written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: AccountId,
    #[serde(default)]
    pub full_name: String,
    /// Unique key of the account store, trimmed and lower-cased on creation
    pub email: String,
    /// Argon2id PHC string, never the plaintext password; empty never verifies
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_blocked: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,

    // =========================================================================
    // Sub-collections owned by flows outside the ledger core
    // =========================================================================
    #[serde(default)]
    pub transactions: Vec<JsonValue>,
    #[serde(default)]
    pub investments: Vec<JsonValue>,

    #[serde(flatten)]
    pub other: HashMap<String, JsonValue>,
}

impl UserAccount {
    /// Create a freshly registered account with the starting balance
    pub fn new(
        full_name: impl Into<String>,
        email: &str,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: AccountId::generate(),
            full_name: full_name.into(),
            email: Self::normalize_email(email),
            password_hash: password_hash.into(),
            country: String::new(),
            phone: String::new(),
            balance: STARTING_BALANCE,
            is_verified: false,
            is_blocked: false,
            created_at: Utc::now(),
            transactions: Vec::new(),
            investments: Vec::new(),
            other: HashMap::new(),
        }
    }

    /// Normalize an email for use as the account key
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Whether this account is keyed by the given email, ignoring case and
    /// surrounding whitespace on both sides
    pub fn matches_email(&self, email: &str) -> bool {
        Self::normalize_email(&self.email) == Self::normalize_email(email)
    }

    /// Name to show on transactions, falling back to the email
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.email
        } else {
            &self.full_name
        }
    }
}
