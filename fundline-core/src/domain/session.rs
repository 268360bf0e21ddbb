//! Session domain model

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::UserAccount;

/// Cached copy of the signed-in account, stored under the `user` key
///
/// Fields written by other flows are kept in `other` so rewriting the
/// balance does not drop them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub balance: Option<Decimal>,
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

impl Session {
    /// Build a session mirroring an account
    pub fn for_account(account: &UserAccount) -> Self {
        Self {
            email: account.email.clone(),
            name: Some(account.display_name().to_string()),
            balance: Some(account.balance),
            other: HashMap::new(),
        }
    }

    /// Copy identity and balance from the account store entry
    ///
    /// Returns whether anything changed.
    pub fn sync_from(&mut self, account: &UserAccount) -> bool {
        let name = Some(account.display_name().to_string());
        let balance = Some(account.balance);
        if self.name == name && self.balance == balance {
            return false;
        }
        self.name = name;
        self.balance = balance;
        true
    }

    /// Name to show for this session, falling back to the email
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_from_account() {
        let mut account = UserAccount::new("Ada", "ada@example.com", "hash");
        let mut session = Session::for_account(&account);
        assert_eq!(session.balance, Some(Decimal::new(145000, 0)));

        assert!(!session.sync_from(&account));

        account.balance = Decimal::new(100, 0);
        assert!(session.sync_from(&account));
        assert_eq!(session.balance, Some(Decimal::new(100, 0)));
        assert_eq!(session.display_name(), "Ada");
        assert!(!session.sync_from(&account));
    }

    #[test]
    fn test_unknown_fields_survive_rewrite() {
        let raw = r#"{"email":"ada@example.com","isAdmin":false,"token":"abc"}"#;
        let mut session: Session = serde_json::from_str(raw).unwrap();
        assert_eq!(session.balance, None);
        assert_eq!(session.display_name(), "ada@example.com");

        session.balance = Some(Decimal::new(50, 0));
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["token"], serde_json::json!("abc"));
        assert_eq!(json["isAdmin"], serde_json::json!(false));
        assert_eq!(json["balance"], serde_json::json!(50.0));
    }
}
