//! Key-value store port - the storage primitive under the ledger
//!
//! Values are JSON documents stored as strings, one per key. Adapters decide
//! where they live (memory, a JSON file, DuckDB).

use crate::domain::result::Result;

/// Key holding the signed-in [`Session`](crate::domain::Session)
pub const SESSION_KEY: &str = "user";

/// Key holding the ordered list of [`UserAccount`](crate::domain::UserAccount)s
pub const ACCOUNTS_KEY: &str = "registeredUsers";

/// Key holding the global ordered list of [`Transaction`](crate::domain::Transaction)s
pub const TRANSACTIONS_KEY: &str = "allTransactions";

/// A single write: `Some` sets the key, `None` removes it
pub type Write = (String, Option<String>);

/// Writes applied together by [`KeyValueStore::commit`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.writes.push((key.into(), Some(value.into())));
        self
    }

    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.writes.push((key.into(), None));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.writes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }
}

trait Held {}
impl<T> Held for T {}

/// Exclusive writer lock on a store, released on drop
///
/// Holds whatever the adapter needs kept alive (mutex guards, file locks).
pub struct WriterGuard<'a> {
    _held: Box<dyn Held + 'a>,
}

impl<'a> WriterGuard<'a> {
    pub fn new<G: 'a>(held: G) -> Self {
        Self {
            _held: Box::new(held),
        }
    }
}

/// Key-value store abstraction
///
/// Read-modify-write cycles must hold the writer lock from the first read
/// to the commit; [`Ledger::transact`](crate::services::Ledger::transact)
/// does that for every flow.
pub trait KeyValueStore: Send + Sync {
    /// Backend name (e.g., "memory", "file", "duckdb")
    fn name(&self) -> &str;

    /// Read the raw value of a key
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Apply every write of the batch, or none of them
    fn commit(&self, batch: WriteBatch) -> Result<()>;

    /// Take the exclusive writer lock
    ///
    /// Blocks until every other writer (in this process or, for persistent
    /// adapters, in other processes) has released it.
    fn lock_writer(&self) -> Result<WriterGuard<'_>>;

    /// Set a single key under the writer lock
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _writer = self.lock_writer()?;
        self.commit(WriteBatch::new().set(key, value))
    }

    /// Remove a single key under the writer lock
    fn remove(&self, key: &str) -> Result<()> {
        let _writer = self.lock_writer()?;
        self.commit(WriteBatch::new().remove(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_batch_keeps_order() {
        let batch = WriteBatch::new()
            .set(TRANSACTIONS_KEY, "[]")
            .remove(SESSION_KEY)
            .set(ACCOUNTS_KEY, "[]");

        let writes: Vec<_> = batch.iter().collect();
        assert_eq!(batch.len(), 3);
        assert_eq!(writes[0], ("allTransactions", Some("[]")));
        assert_eq!(writes[1], ("user", None));
        assert_eq!(writes[2], ("registeredUsers", Some("[]")));
    }

    #[test]
    fn test_writer_guard_releases_on_drop() {
        let lock = std::sync::Mutex::new(());
        {
            let _guard = WriterGuard::new(lock.lock().unwrap());
            assert!(lock.try_lock().is_err());
        }
        assert!(lock.try_lock().is_ok());
    }
}
