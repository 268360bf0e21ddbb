//! JSON file key-value store
//!
//! All keys live in one JSON object on disk. Commits write a temp file next
//! to the store and rename it over the original, so a batch lands whole or
//! not at all. The writer lock is an `fs2` exclusive lock on a sibling
//! `.lock` file, which serializes writers across processes too.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context};
use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::domain::result::Result;
use crate::ports::{KeyValueStore, WriteBatch, WriterGuard};

type Entries = BTreeMap<String, String>;

/// Exclusive lock on the `.lock` file, released on drop
struct FileLock {
    file: File,
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    // fs2 locks are per open file; this keeps threads sharing one store in line
    local: Mutex<()>,
}

impl FileStore {
    /// Open (or lazily create) a store at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create store directory: {:?}", parent))?;
            }
        }

        let mut lock_name = path.as_os_str().to_owned();
        lock_name.push(".lock");

        Ok(Self {
            path: path.to_path_buf(),
            lock_path: PathBuf::from(lock_name),
            local: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> anyhow::Result<Entries> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read store: {:?}", self.path))?;
        if content.trim().is_empty() {
            return Ok(Entries::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Store file is not a JSON object of strings: {:?}", self.path))
    }

    fn write_entries(&self, entries: &Entries) -> anyhow::Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir)?;
        let content = serde_json::to_string_pretty(entries)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| anyhow!("Failed to replace store {:?}: {}", self.path, e.error))?;
        Ok(())
    }

    fn acquire_file_lock(&self) -> anyhow::Result<FileLock> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .with_context(|| format!("Failed to open lock file: {:?}", self.lock_path))?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock store: {:?}", self.lock_path))?;
        Ok(FileLock { file })
    }
}

impl KeyValueStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.read_entries()?;
        Ok(entries.remove(key))
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut entries = self.read_entries()?;
        for (key, value) in batch.iter() {
            match value {
                Some(value) => {
                    entries.insert(key.to_string(), value.to_string());
                }
                None => {
                    entries.remove(key);
                }
            }
        }
        self.write_entries(&entries)?;
        Ok(())
    }

    fn lock_writer(&self) -> Result<WriterGuard<'_>> {
        let local = self
            .local
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let file_lock = self.acquire_file_lock()?;
        // file lock drops first, then the local guard
        Ok(WriterGuard::new((file_lock, local)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(&dir.path().join("store.json")).unwrap();
        assert_eq!(store.get("registeredUsers").unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_values_persist_across_handles() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.set("user", r#"{"email":"a@b.com"}"#).unwrap();
            store.set("allTransactions", "[]").unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("user").unwrap().as_deref(),
            Some(r#"{"email":"a@b.com"}"#)
        );
        reopened.remove("user").unwrap();
        assert_eq!(reopened.get("user").unwrap(), None);
        assert_eq!(reopened.get("allTransactions").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_corrupt_file_is_a_storage_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        let err = store.get("user").unwrap_err();
        assert!(err.to_string().contains("Storage error"));
    }

    #[test]
    fn test_writer_lock_blocks_second_handle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let first = FileStore::open(&path).unwrap();
        let second = FileStore::open(&path).unwrap();

        let guard = first.lock_writer().unwrap();
        let contender = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&second.lock_path)
            .unwrap();
        assert!(contender.try_lock_exclusive().is_err());

        drop(guard);
        assert!(contender.try_lock_exclusive().is_ok());
        FileExt::unlock(&contender).unwrap();
    }
}
