//! Ledger - typed access to the account store, transaction log and session
//!
//! Every flow mutates the store through [`Ledger::transact`]: the writer lock
//! is taken, all three collections are loaded, the closure validates and
//! mutates them, and only the collections it touched are committed as one
//! batch. A closure that returns an error leaves the store untouched.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

use crate::domain::result::{Error, Result};
use crate::domain::{Session, Transaction, TransactionId, UserAccount};
use crate::ports::{KeyValueStore, WriteBatch, ACCOUNTS_KEY, SESSION_KEY, TRANSACTIONS_KEY};

/// Typed view over a [`KeyValueStore`]
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn KeyValueStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Name of the backing store
    pub fn backend(&self) -> &str {
        self.store.name()
    }

    /// All registered accounts, in registration order
    pub fn accounts(&self) -> Result<Vec<UserAccount>> {
        read_collection(self.store.as_ref(), ACCOUNTS_KEY)
    }

    /// Look up an account by email
    pub fn find_account(&self, email: &str) -> Result<Option<UserAccount>> {
        Ok(self
            .accounts()?
            .into_iter()
            .find(|account| account.matches_email(email)))
    }

    /// The whole transaction log, oldest first
    pub fn transactions(&self) -> Result<Vec<Transaction>> {
        read_collection(self.store.as_ref(), TRANSACTIONS_KEY)
    }

    /// Transactions belonging to one user, oldest first
    pub fn transactions_for(&self, email: &str) -> Result<Vec<Transaction>> {
        let email = UserAccount::normalize_email(email);
        Ok(self
            .transactions()?
            .into_iter()
            .filter(|tx| UserAccount::normalize_email(&tx.user_email) == email)
            .collect())
    }

    /// The stored session, or None if absent or unreadable
    pub fn session(&self) -> Result<Option<Session>> {
        Ok(read_session(self.store.as_ref())?.unwrap_or_default())
    }

    /// Run a read-validate-commit cycle under the store's writer lock
    pub fn transact<T>(&self, f: impl FnOnce(&mut LedgerState) -> Result<T>) -> Result<T> {
        let _writer = self.store.lock_writer()?;

        let mut state = LedgerState::load(self.store.as_ref())?;
        let value = f(&mut state)?;

        let batch = state.into_batch()?;
        if !batch.is_empty() {
            self.store.commit(batch)?;
        }
        Ok(value)
    }
}

/// Collections loaded for one [`Ledger::transact`] cycle
#[derive(Debug)]
pub struct LedgerState {
    accounts: Vec<UserAccount>,
    transactions: Vec<Transaction>,
    session: Option<Session>,
    accounts_dirty: bool,
    transactions_dirty: bool,
    session_dirty: bool,
}

impl LedgerState {
    fn load(store: &dyn KeyValueStore) -> Result<Self> {
        let accounts = read_collection(store, ACCOUNTS_KEY)?;
        let transactions = read_collection(store, TRANSACTIONS_KEY)?;

        // An unreadable session is dropped, the same as signing out
        let (session, session_dirty) = match read_session(store)? {
            Ok(session) => (session, false),
            Err(()) => (None, true),
        };

        Ok(Self {
            accounts,
            transactions,
            session,
            accounts_dirty: false,
            transactions_dirty: false,
            session_dirty,
        })
    }

    pub fn accounts(&self) -> &[UserAccount] {
        &self.accounts
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn find_account(&self, email: &str) -> Option<&UserAccount> {
        self.accounts.iter().find(|a| a.matches_email(email))
    }

    pub fn find_account_mut(&mut self, email: &str) -> Option<&mut UserAccount> {
        let account = self.accounts.iter_mut().find(|a| a.matches_email(email));
        if account.is_some() {
            self.accounts_dirty = true;
        }
        account
    }

    pub fn insert_account(&mut self, account: UserAccount) {
        self.accounts.push(account);
        self.accounts_dirty = true;
    }

    pub fn append_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
        self.transactions_dirty = true;
    }

    /// Generate a transaction id not yet present in the log
    pub fn next_transaction_id<R: Rng + ?Sized>(&self, rng: &mut R) -> TransactionId {
        loop {
            let id = TransactionId::generate(Utc::now(), rng);
            if !self.transactions.iter().any(|tx| tx.id == id) {
                return id;
            }
        }
    }

    pub fn set_session(&mut self, session: Option<Session>) {
        self.session = session;
        self.session_dirty = true;
    }

    /// Mirror an account's name and balance into the session if it is signed in
    pub fn sync_session(&mut self, email: &str) -> Result<()> {
        let account = self
            .accounts
            .iter()
            .find(|a| a.matches_email(email))
            .ok_or_else(|| Error::not_found("account for the current session"))?;

        if let Some(session) = self.session.as_mut() {
            if account.matches_email(&session.email) && session.sync_from(account) {
                self.session_dirty = true;
            }
        }
        Ok(())
    }

    fn into_batch(self) -> Result<WriteBatch> {
        let mut batch = WriteBatch::new();
        if self.transactions_dirty {
            batch = batch.set(TRANSACTIONS_KEY, serde_json::to_string(&self.transactions)?);
        }
        if self.accounts_dirty {
            batch = batch.set(ACCOUNTS_KEY, serde_json::to_string(&self.accounts)?);
        }
        if self.session_dirty {
            batch = match &self.session {
                Some(session) => batch.set(SESSION_KEY, serde_json::to_string(session)?),
                None => batch.remove(SESSION_KEY),
            };
        }
        Ok(batch)
    }
}

/// Read a JSON array, treating a missing key as empty
fn read_collection<T>(store: &dyn KeyValueStore, key: &str) -> Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
{
    match store.get(key)? {
        Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
        _ => Ok(Vec::new()),
    }
}

/// Read the session; the inner Err marks an unreadable record
fn read_session(store: &dyn KeyValueStore) -> Result<std::result::Result<Option<Session>, ()>> {
    match store.get(SESSION_KEY)? {
        Some(raw) => Ok(serde_json::from_str::<Session>(&raw)
            .map(Some)
            .map_err(|_| ())),
        None => Ok(Ok(None)),
    }
}
