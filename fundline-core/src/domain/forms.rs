//! Form submissions for the withdrawal and registration flows
//!
//! Each form validates its own fields. Checks that need the store
//! (balance, duplicate email) live in the services.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, PolicyViolation, Result};
use super::{MINIMUM_PASSWORD_LENGTH, MINIMUM_WITHDRAWAL};

/// A withdrawal request as typed into the form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalForm {
    /// Raw amount text; parsed by [`WithdrawalForm::amount`]
    pub amount: String,
    pub currency: String,
    pub method: String,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

impl WithdrawalForm {
    pub fn new(amount: impl Into<String>, currency: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            currency: currency.into(),
            method: method.into(),
            wallet_address: None,
        }
    }

    pub fn with_wallet_address(mut self, address: impl Into<String>) -> Self {
        let address = address.into();
        self.wallet_address = if address.trim().is_empty() {
            None
        } else {
            Some(address.trim().to_string())
        };
        self
    }

    /// Parse the amount and apply the input and minimum checks
    pub fn amount(&self) -> Result<Decimal> {
        let amount = parse_amount(&self.amount)
            .filter(|a| *a > Decimal::ZERO)
            .ok_or_else(|| Error::invalid_input("Please enter a valid amount"))?;

        if amount < MINIMUM_WITHDRAWAL {
            return Err(PolicyViolation::BelowMinimumWithdrawal {
                minimum: MINIMUM_WITHDRAWAL,
            }
            .into());
        }

        Ok(amount)
    }
}

/// Parse a typed amount, accepting plain and scientific notation
///
/// Returns None for empty, non-numeric or non-finite input. Digit group
/// separators such as `1_000` or `1,000` are not numbers here.
fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || !trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
    {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// A registration request as typed into the form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: String,
}

impl RegistrationForm {
    /// Run every check that does not need the store, first failure wins
    pub fn validate(&self) -> Result<()> {
        if self.full_name.trim().is_empty() {
            return Err(Error::invalid_input("Full name is required"));
        }
        if !is_email(&self.email) {
            return Err(Error::invalid_input("Please enter a valid email address"));
        }
        if self.password != self.confirm_password {
            return Err(Error::invalid_input("Passwords do not match"));
        }
        if self.password.chars().count() < MINIMUM_PASSWORD_LENGTH {
            return Err(Error::invalid_input(format!(
                "Password must be at least {} characters",
                MINIMUM_PASSWORD_LENGTH
            )));
        }
        Ok(())
    }
}

fn is_email(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+$").expect("email pattern is valid")
    });
    re.is_match(email.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> RegistrationForm {
        RegistrationForm {
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            country: "UK".to_string(),
            phone: "+44 20 7946 0000".to_string(),
        }
    }

    #[test]
    fn test_amount_rejects_invalid_input() {
        for raw in [
            "", "   ", "abc", "0", "-10", "NaN", "inf", "12abc", "1_000", "1,000", "5_0", "١٠٠",
        ] {
            let err = WithdrawalForm::new(raw, "USD", "bitcoin").amount().unwrap_err();
            assert_eq!(err.to_string(), "Please enter a valid amount", "input {:?}", raw);
        }
    }

    #[test]
    fn test_amount_below_minimum() {
        let err = WithdrawalForm::new("49.99", "USD", "bitcoin").amount().unwrap_err();
        assert!(matches!(
            err,
            Error::Policy(PolicyViolation::BelowMinimumWithdrawal { .. })
        ));
    }

    #[test]
    fn test_amount_accepts_minimum_and_notation() {
        assert_eq!(WithdrawalForm::new("50", "USD", "").amount().unwrap(), Decimal::new(50, 0));
        assert_eq!(WithdrawalForm::new(" 75.5 ", "USD", "").amount().unwrap(), Decimal::new(755, 1));
        assert_eq!(WithdrawalForm::new("1e3", "USD", "").amount().unwrap(), Decimal::new(1000, 0));
    }

    #[test]
    fn test_wallet_address_blank_is_none() {
        let form = WithdrawalForm::new("50", "USD", "usdt").with_wallet_address("  ");
        assert!(form.wallet_address.is_none());
        let form = WithdrawalForm::new("50", "USD", "usdt").with_wallet_address(" TXyz ");
        assert_eq!(form.wallet_address.as_deref(), Some("TXyz"));
    }

    #[test]
    fn test_registration_checks_in_order() {
        assert!(registration().validate().is_ok());

        let mut form = registration();
        form.confirm_password = "other1".to_string();
        form.password = "abc".to_string();
        // mismatch is reported before length
        assert_eq!(form.validate().unwrap_err().to_string(), "Passwords do not match");

        let mut form = registration();
        form.password = "abc".to_string();
        form.confirm_password = "abc".to_string();
        assert_eq!(
            form.validate().unwrap_err().to_string(),
            "Password must be at least 6 characters"
        );
    }

    #[test]
    fn test_registration_requires_name_and_email() {
        let mut form = registration();
        form.full_name = " ".to_string();
        assert!(matches!(form.validate(), Err(Error::InvalidInput(_))));

        let mut form = registration();
        form.email = "not-an-email".to_string();
        assert!(matches!(form.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_password_length_counts_characters() {
        let mut form = registration();
        form.password = "ééééé".to_string();
        form.confirm_password = "ééééé".to_string();
        assert!(form.validate().is_err());

        form.password = "éééééé".to_string();
        form.confirm_password = "éééééé".to_string();
        assert!(form.validate().is_ok());
    }
}
