//! Adapter implementations
//!
//! Adapters implement the [`KeyValueStore`](crate::ports::KeyValueStore) port:
//! - In-process memory, for tests and embedding
//! - A single JSON file guarded by an OS file lock (default)
//! - DuckDB, one row per key

pub mod duckdb;
pub mod file;
pub mod memory;
