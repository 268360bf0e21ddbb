//! DuckDB key-value store implementation

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result as AnyResult};
use duckdb::{params, Connection};

use crate::domain::result::{Error, Result};
use crate::ports::{KeyValueStore, WriteBatch, WriterGuard};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("could not set lock on file")
        || lower.contains("file is already open")
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// DuckDB key-value store
///
/// Values live in the `sys_kv` table. One connection is shared behind a
/// mutex; the writer lock is a second mutex so reads stay possible while a
/// flow validates.
pub struct DuckDbStore {
    conn: Mutex<Connection>,
    writer: Mutex<()>,
    db_path: Option<PathBuf>,
}

impl DuckDbStore {
    /// Open a DuckDB store at the given path and run pending migrations
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which can occur when another process still holds the database.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    let store = Self {
                        conn: Mutex::new(conn),
                        writer: Mutex::new(()),
                        db_path: Some(db_path.to_path_buf()),
                    };
                    store.ensure_schema()?;
                    return Ok(store);
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        // Exponential backoff: 50ms, 100ms, 200ms, 400ms
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[fundline] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    // Non-retryable error or max retries reached
                    return Err(e.into());
                }
            }
        }

        // Should only reach here if all retries failed
        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES))
            .into())
    }

    /// Open an in-memory store (nothing persists past the process)
    pub fn in_memory() -> Result<Self> {
        let config = duckdb::Config::default()
            .enable_autoload_extension(false)
            .map_err(|e| Error::storage(e.to_string()))?;
        let conn = Connection::open_in_memory_with_flags(config)
            .map_err(|e| Error::storage(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
            writer: Mutex::new(()),
            db_path: None,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Attempt to open a database connection (called by new() with retry logic)
    fn try_open_connection(db_path: &Path) -> AnyResult<Connection> {
        // Disable extension autoloading; cached extensions may fail code signing
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)?;
        Ok(conn)
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> AnyResult<MigrationResult> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let migration_service = MigrationService::new(&conn);
        migration_service.run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Path of the database file, None for in-memory stores
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn apply_batch(&self, batch: &WriteBatch) -> AnyResult<()> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let tx = conn.transaction()?;
        let updated_at = now_ms();

        for (key, value) in batch.iter() {
            match value {
                Some(value) => {
                    tx.execute(
                        "INSERT OR REPLACE INTO sys_kv (key, value, updated_at) VALUES (?, ?, ?)",
                        params![key, value, updated_at],
                    )?;
                }
                None => {
                    tx.execute("DELETE FROM sys_kv WHERE key = ?", params![key])?;
                }
            }
        }

        // Dropping an uncommitted transaction rolls it back
        tx.commit()?;
        Ok(())
    }
}

impl KeyValueStore for DuckDbStore {
    fn name(&self) -> &str {
        "duckdb"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))?;
        let value = conn.query_row(
            "SELECT value FROM sys_kv WHERE key = ?",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match value {
            Ok(value) => Ok(Some(value)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::storage(e.to_string())),
        }
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.apply_batch(&batch)?;
        Ok(())
    }

    fn lock_writer(&self) -> Result<WriterGuard<'_>> {
        let guard = self
            .writer
            .lock()
            .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))?;
        Ok(WriterGuard::new(guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_in_memory_round_trip() {
        let store = DuckDbStore::in_memory().unwrap();
        assert_eq!(store.get("user").unwrap(), None);

        store.set("user", r#"{"email":"a@b.com"}"#).unwrap();
        store.set("user", r#"{"email":"c@d.com"}"#).unwrap();
        assert_eq!(
            store.get("user").unwrap().as_deref(),
            Some(r#"{"email":"c@d.com"}"#)
        );

        store.remove("user").unwrap();
        assert_eq!(store.get("user").unwrap(), None);
    }

    #[test]
    fn test_batch_applies_all_writes() {
        let store = DuckDbStore::in_memory().unwrap();
        store
            .commit(
                WriteBatch::new()
                    .set("registeredUsers", "[]")
                    .set("allTransactions", "[]")
                    .set("user", "{}"),
            )
            .unwrap();

        assert_eq!(store.get("registeredUsers").unwrap().as_deref(), Some("[]"));
        assert_eq!(store.get("allTransactions").unwrap().as_deref(), Some("[]"));
        assert_eq!(store.get("user").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fundline.duckdb");

        {
            let store = DuckDbStore::new(&path).unwrap();
            store.set("allTransactions", "[]").unwrap();
            assert_eq!(store.db_path(), Some(path.as_path()));
        }

        let reopened = DuckDbStore::new(&path).unwrap();
        assert_eq!(reopened.get("allTransactions").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_retryable_error_detection() {
        assert!(is_retryable_error("IO Error: Could not set lock on file"));
        assert!(is_retryable_error("The process cannot access the file"));
        assert!(!is_retryable_error("Catalog Error: Table does not exist"));
    }
}
