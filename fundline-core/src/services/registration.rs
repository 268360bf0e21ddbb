//! Registration service - creates accounts in the account store

use std::time::Duration;

use serde::Serialize;

use crate::domain::result::{Error, PolicyViolation, Result};
use crate::domain::{AccountId, RegistrationForm, UserAccount};
use crate::services::credentials::hash_password;
use crate::services::flow::FlowTracker;
use crate::services::Ledger;

/// Where the front-end goes once a flow has finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Handoff {
    SignIn,
}

/// A newly created account, without its credentials
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registered {
    pub id: AccountId,
    pub email: String,
    pub full_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: rust_decimal::Decimal,
    pub next: Handoff,
}

impl From<&UserAccount> for Registered {
    fn from(account: &UserAccount) -> Self {
        Self {
            id: account.id.clone(),
            email: account.email.clone(),
            full_name: account.full_name.clone(),
            balance: account.balance,
            next: Handoff::SignIn,
        }
    }
}

/// Registration service
pub struct RegistrationService {
    ledger: Ledger,
    redirect_delay: Duration,
}

impl RegistrationService {
    pub fn new(ledger: Ledger, redirect_delay: Duration) -> Self {
        Self {
            ledger,
            redirect_delay,
        }
    }

    /// Validate the form and append a new account
    ///
    /// Does not sign the new account in.
    pub fn register(&self, form: &RegistrationForm) -> Result<Registered> {
        form.validate()?;

        // Hashing is slow; do it before taking the writer lock
        let password_hash = hash_password(&form.password)?;
        self.insert_account(form, password_hash)
    }

    /// Register, then hold the success state for the redirect delay
    ///
    /// The password hash runs on the blocking pool so the runtime keeps
    /// driving other tasks meanwhile.
    pub async fn submit(
        &self,
        form: &RegistrationForm,
        tracker: &FlowTracker,
    ) -> Result<Registered> {
        tracker.begin();
        match self.register_off_thread(form).await {
            Ok(registered) => {
                tracker.succeed();
                if !self.redirect_delay.is_zero() {
                    tokio::time::sleep(self.redirect_delay).await;
                }
                Ok(registered)
            }
            Err(e) => {
                tracker.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn register_off_thread(&self, form: &RegistrationForm) -> Result<Registered> {
        form.validate()?;

        let password = form.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| Error::Other(format!("Password hashing task failed: {}", e)))??;
        self.insert_account(form, password_hash)
    }

    fn insert_account(&self, form: &RegistrationForm, password_hash: String) -> Result<Registered> {
        self.ledger.transact(|state| {
            if state.find_account(&form.email).is_some() {
                return Err(PolicyViolation::DuplicateEmail.into());
            }

            let mut account =
                UserAccount::new(form.full_name.trim(), &form.email, password_hash);
            account.country = form.country.trim().to_string();
            account.phone = form.phone.trim().to_string();

            let registered = Registered::from(&account);
            state.insert_account(account);
            Ok(registered)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use crate::adapters::memory::MemoryStore;
    use crate::domain::result::Error;
    use crate::services::credentials::verify_password;
    use crate::services::flow::FlowState;

    fn form(email: &str, password: &str, confirm: &str) -> RegistrationForm {
        RegistrationForm {
            full_name: "Ada Lovelace".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
            country: "UK".to_string(),
            phone: "+44 20 7946 0000".to_string(),
        }
    }

    fn service() -> (RegistrationService, Ledger) {
        let ledger = Ledger::new(Arc::new(MemoryStore::new()));
        (
            RegistrationService::new(ledger.clone(), Duration::from_millis(2000)),
            ledger,
        )
    }

    #[test]
    fn test_register_creates_account_with_starting_balance() {
        let (service, ledger) = service();
        let registered = service
            .register(&form("ada@example.com", "secret1", "secret1"))
            .unwrap();

        assert_eq!(registered.balance, Decimal::new(145_000, 0));
        assert_eq!(registered.next, Handoff::SignIn);

        let account = ledger.find_account("ada@example.com").unwrap().unwrap();
        assert_eq!(account.id, registered.id);
        assert_eq!(account.country, "UK");
        assert!(!account.is_verified);
        assert!(!account.is_blocked);
        assert!(account.transactions.is_empty());
        assert!(account.investments.is_empty());
        assert!(verify_password("secret1", &account.password_hash));

        // Registering does not sign in
        assert!(ledger.session().unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_is_rejected() {
        let (service, ledger) = service();
        service
            .register(&form("a@b.com", "secret1", "secret1"))
            .unwrap();

        let err = service
            .register(&form(" A@B.com ", "another1", "another1"))
            .unwrap_err();
        assert!(matches!(err, Error::Policy(PolicyViolation::DuplicateEmail)));
        assert_eq!(err.to_string(), "User with this email already exists");
        assert_eq!(ledger.accounts().unwrap().len(), 1);
    }

    #[test]
    fn test_mismatch_is_reported_before_length() {
        let (service, ledger) = service();
        let err = service
            .register(&form("ada@example.com", "abc", "abd"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match");
        assert!(ledger.accounts().unwrap().is_empty());
    }

    #[test]
    fn test_short_password_is_rejected() {
        let (service, _) = service();
        let err = service
            .register(&form("ada@example.com", "abc12", "abc12"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 6 characters");
    }

    #[test]
    fn test_accounts_keep_registration_order() {
        let (service, ledger) = service();
        for email in ["one@example.com", "two@example.com", "three@example.com"] {
            service.register(&form(email, "secret1", "secret1")).unwrap();
        }
        let emails: Vec<_> = ledger
            .accounts()
            .unwrap()
            .into_iter()
            .map(|a| a.email)
            .collect();
        assert_eq!(emails, ["one@example.com", "two@example.com", "three@example.com"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_waits_for_redirect() {
        let (service, _) = service();
        let tracker = FlowTracker::new();

        let start = tokio::time::Instant::now();
        let registered = service
            .submit(&form("ada@example.com", "secret1", "secret1"), &tracker)
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(2000));
        assert_eq!(tracker.state(), FlowState::Succeeded);
        assert_eq!(registered.next, Handoff::SignIn);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_failure_reports_message() {
        let (service, _) = service();
        let tracker = FlowTracker::new();

        let result = service
            .submit(&form("ada@example.com", "abc", "abd"), &tracker)
            .await;

        assert!(result.is_err());
        assert_eq!(
            tracker.state(),
            FlowState::Failed {
                message: "Passwords do not match".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_submit_keeps_runtime_responsive_while_hashing() {
        let (_, ledger) = service();
        let service = RegistrationService::new(ledger.clone(), Duration::ZERO);
        let tracker = FlowTracker::new();
        let ticks = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    ticks.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            })
        };

        let registered = service
            .submit(&form("ada@example.com", "secret1", "secret1"), &tracker)
            .await
            .unwrap();
        ticker.abort();

        // The single-threaded test runtime only polls the ticker if the hash
        // ran elsewhere
        assert!(ticks.load(std::sync::atomic::Ordering::SeqCst) > 1);
        let account = ledger.find_account("ada@example.com").unwrap().unwrap();
        assert_eq!(account.id, registered.id);
        assert!(verify_password("secret1", &account.password_hash));
    }
}
