//! In-memory key-value store, used by tests and throwaway contexts

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::result::{Error, Result};
use crate::ports::{KeyValueStore, WriteBatch, WriterGuard};

#[derive(Default, Clone, Debug)]
pub struct MemoryStore {
    data: Arc<Mutex<HashMap<String, String>>>,
    writer: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with raw values
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let data = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            data: Arc::new(Mutex::new(data)),
            writer: Arc::new(Mutex::new(())),
        }
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> Error {
    Error::storage(format!("Lock poisoned: {}", e))
}

impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let data = self.data.lock().map_err(poisoned)?;
        Ok(data.get(key).cloned())
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut data = self.data.lock().map_err(poisoned)?;
        for (key, value) in batch.iter() {
            match value {
                Some(value) => {
                    data.insert(key.to_string(), value.to_string());
                }
                None => {
                    data.remove(key);
                }
            }
        }
        Ok(())
    }

    fn lock_writer(&self) -> Result<WriterGuard<'_>> {
        let guard = self.writer.lock().map_err(poisoned)?;
        Ok(WriterGuard::new(guard))
    }
}
