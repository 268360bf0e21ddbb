//! Fundline Core - ledger mutation protocol for an investment demo
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (UserAccount, Transaction, Session, forms)
//! - **ports**: The key-value store trait the ledger is written against
//! - **services**: Withdrawal, registration, session and status flows
//! - **adapters**: Concrete stores (memory, JSON file, DuckDB)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use adapters::duckdb::DuckDbStore;
use adapters::file::FileStore;
use config::{Config, StoreBackend};
use ports::KeyValueStore;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, ErrorKind, OperationResult, PolicyViolation, Result};
pub use domain::{
    RegistrationForm, Session, Transaction, TransactionId, TransactionKind, TransactionStatus,
    AccountId, UserAccount, WithdrawalForm,
};
pub use services::{EntryPoint, FlowState, FlowTracker, LogEvent, LoggingService};

/// Main context for Fundline operations
///
/// Holds the configuration, the store and all services built on it.
pub struct FundlineContext {
    pub config: Config,
    pub ledger: Ledger,
    pub withdrawal_service: WithdrawalService,
    pub registration_service: RegistrationService,
    pub session_service: SessionService,
    pub status_service: StatusService,
    store_path: Option<PathBuf>,
}

impl FundlineContext {
    /// Open the store configured for a data directory
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;

        let store_path = data_dir.join(config.store_backend.file_name());
        let store: Arc<dyn KeyValueStore> = match config.store_backend {
            StoreBackend::File => Arc::new(FileStore::open(&store_path)?),
            StoreBackend::DuckDb => Arc::new(DuckDbStore::new(&store_path)?),
        };

        let mut context = Self::with_store(config, store);
        context.store_path = Some(store_path);
        Ok(context)
    }

    /// Build a context over an already opened store
    pub fn with_store(config: Config, store: Arc<dyn KeyValueStore>) -> Self {
        let ledger = Ledger::new(store);

        Self {
            withdrawal_service: WithdrawalService::new(ledger.clone(), config.withdrawal_delay)
                .with_reset_hold(config.withdrawal_reset),
            registration_service: RegistrationService::new(
                ledger.clone(),
                config.registration_redirect,
            ),
            session_service: SessionService::new(ledger.clone()),
            status_service: StatusService::new(ledger.clone()),
            ledger,
            config,
            store_path: None,
        }
    }

    /// Location of the store on disk, None for stores built by the caller
    pub fn store_path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }
}
