//! Session service - who is signed in

use crate::domain::result::{Error, Result};
use crate::domain::Session;
use crate::services::credentials::verify_password;
use crate::services::Ledger;

/// Session service
pub struct SessionService {
    ledger: Ledger,
}

impl SessionService {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// The signed-in session, refreshed from the account store
    ///
    /// An unreadable session is removed. A session whose account no longer
    /// exists is left alone and returned as stored.
    pub fn current(&self) -> Result<Option<Session>> {
        self.ledger.transact(|state| {
            let email = match state.session() {
                Some(session) => session.email.clone(),
                None => return Ok(None),
            };

            if state.find_account(&email).is_some() {
                state.sync_session(&email)?;
            }
            Ok(state.session().cloned())
        })
    }

    /// Verify credentials and store a session for the account
    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.ledger.transact(|state| {
            let account = state
                .find_account(email)
                .filter(|account| verify_password(password, &account.password_hash))
                .ok_or_else(|| Error::invalid_input("Invalid email or password"))?;

            let session = Session::for_account(account);
            state.set_session(Some(session.clone()));
            Ok(session)
        })
    }

    /// Remove the stored session; returns whether one existed
    pub fn sign_out(&self) -> Result<bool> {
        self.ledger.transact(|state| {
            let existed = state.session().is_some();
            if existed {
                state.set_session(None);
            }
            Ok(existed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use crate::adapters::memory::MemoryStore;
    use crate::domain::UserAccount;
    use crate::ports::{KeyValueStore, SESSION_KEY};
    use crate::services::credentials::hash_password;

    fn setup() -> (SessionService, Ledger, MemoryStore) {
        let store = MemoryStore::new();
        let ledger = Ledger::new(Arc::new(store.clone()));
        let hash = hash_password("secret1").unwrap();
        ledger
            .transact(|state| {
                state.insert_account(UserAccount::new("Ada Lovelace", "ada@example.com", hash));
                Ok(())
            })
            .unwrap();
        (SessionService::new(ledger.clone()), ledger, store)
    }

    #[test]
    fn test_sign_in_and_out() {
        let (service, ledger, _) = setup();
        assert!(service.current().unwrap().is_none());

        let session = service.sign_in("ADA@example.com", "secret1").unwrap();
        assert_eq!(session.email, "ada@example.com");
        assert_eq!(session.balance, Some(Decimal::new(145_000, 0)));
        assert_eq!(ledger.session().unwrap(), Some(session));

        assert!(service.sign_out().unwrap());
        assert!(!service.sign_out().unwrap());
        assert!(ledger.session().unwrap().is_none());
    }

    #[test]
    fn test_wrong_password_keeps_signed_out() {
        let (service, ledger, _) = setup();
        let err = service.sign_in("ada@example.com", "secret2").unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");

        let err = service.sign_in("nobody@example.com", "secret1").unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
        assert!(ledger.session().unwrap().is_none());
    }

    #[test]
    fn test_current_refreshes_balance() {
        let (service, ledger, _) = setup();
        service.sign_in("ada@example.com", "secret1").unwrap();

        ledger
            .transact(|state| {
                if let Some(account) = state.find_account_mut("ada@example.com") {
                    account.balance = Decimal::new(500, 0);
                }
                Ok(())
            })
            .unwrap();

        let session = service.current().unwrap().unwrap();
        assert_eq!(session.balance, Some(Decimal::new(500, 0)));
    }

    #[test]
    fn test_current_removes_corrupt_session() {
        let (service, _, store) = setup();
        store.set(SESSION_KEY, "not json").unwrap();

        assert!(service.current().unwrap().is_none());
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    }
}
