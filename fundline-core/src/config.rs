//! Configuration management
//!
//! settings.json in the data directory:
//! ```json
//! {
//!   "app": { "storeBackend": "file" },
//!   "processing": {
//!     "withdrawalDelayMs": 1500,
//!     "withdrawalResetMs": 3000,
//!     "registrationRedirectMs": 2000
//!   }
//! }
//! ```
//! Fields this crate does not manage are kept when saving.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub const SETTINGS_FILE: &str = "settings.json";

/// Environment variable overriding the configured store backend
pub const STORE_BACKEND_ENV: &str = "FUNDLINE_STORE_BACKEND";

const DEFAULT_WITHDRAWAL_DELAY_MS: u64 = 1500;
const DEFAULT_WITHDRAWAL_RESET_MS: u64 = 3000;
const DEFAULT_REGISTRATION_REDIRECT_MS: u64 = 2000;

/// Which [`KeyValueStore`](crate::ports::KeyValueStore) adapter backs the ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    DuckDb,
}

impl StoreBackend {
    /// File name of the store inside the data directory
    pub fn file_name(&self) -> &'static str {
        match self {
            StoreBackend::File => "store.json",
            StoreBackend::DuckDb => "fundline.duckdb",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::File => f.write_str("file"),
            StoreBackend::DuckDb => f.write_str("duckdb"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" | "json" => Ok(StoreBackend::File),
            "duckdb" => Ok(StoreBackend::DuckDb),
            other => Err(anyhow!("Unknown store backend '{}' (expected file or duckdb)", other)),
        }
    }
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    processing: ProcessingSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    store_backend: StoreBackend,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessingSettings {
    #[serde(default = "default_withdrawal_delay")]
    withdrawal_delay_ms: u64,
    #[serde(default = "default_withdrawal_reset")]
    withdrawal_reset_ms: u64,
    #[serde(default = "default_registration_redirect")]
    registration_redirect_ms: u64,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            withdrawal_delay_ms: DEFAULT_WITHDRAWAL_DELAY_MS,
            withdrawal_reset_ms: DEFAULT_WITHDRAWAL_RESET_MS,
            registration_redirect_ms: DEFAULT_REGISTRATION_REDIRECT_MS,
            other: HashMap::new(),
        }
    }
}

fn default_withdrawal_delay() -> u64 {
    DEFAULT_WITHDRAWAL_DELAY_MS
}

fn default_withdrawal_reset() -> u64 {
    DEFAULT_WITHDRAWAL_RESET_MS
}

fn default_registration_redirect() -> u64 {
    DEFAULT_REGISTRATION_REDIRECT_MS
}

/// Fundline configuration (simplified view of settings)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store_backend: StoreBackend,
    /// How long an accepted withdrawal shows as processing
    pub withdrawal_delay: Duration,
    /// How long a submitted withdrawal stays on screen before the form clears
    pub withdrawal_reset: Duration,
    /// How long the registration success state shows before sign-in
    pub registration_redirect: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_backend: StoreBackend::default(),
            withdrawal_delay: Duration::from_millis(DEFAULT_WITHDRAWAL_DELAY_MS),
            withdrawal_reset: Duration::from_millis(DEFAULT_WITHDRAWAL_RESET_MS),
            registration_redirect: Duration::from_millis(DEFAULT_REGISTRATION_REDIRECT_MS),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing or unreadable settings.json yields the defaults. The store
    /// backend can be overridden with FUNDLINE_STORE_BACKEND.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut config = Self::load_file(data_dir)?;
        if let Ok(value) = std::env::var(STORE_BACKEND_ENV) {
            if !value.trim().is_empty() {
                config.store_backend = value.parse()?;
            }
        }
        Ok(config)
    }

    /// Load config exactly as settings.json has it, ignoring the environment
    pub fn load_file(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;

        Ok(Self {
            store_backend: raw.app.store_backend,
            withdrawal_delay: Duration::from_millis(raw.processing.withdrawal_delay_ms),
            withdrawal_reset: Duration::from_millis(raw.processing.withdrawal_reset_ms),
            registration_redirect: Duration::from_millis(raw.processing.registration_redirect_ms),
        })
    }

    /// Save config to the data directory
    /// Preserves other settings that this crate doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = read_settings(data_dir)?;

        settings.app.store_backend = self.store_backend;
        settings.processing.withdrawal_delay_ms = self.withdrawal_delay.as_millis() as u64;
        settings.processing.withdrawal_reset_ms = self.withdrawal_reset.as_millis() as u64;
        settings.processing.registration_redirect_ms =
            self.registration_redirect.as_millis() as u64;

        std::fs::create_dir_all(data_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    /// Config with no artificial delays
    pub fn without_delays(mut self) -> Self {
        self.withdrawal_delay = Duration::ZERO;
        self.withdrawal_reset = Duration::ZERO;
        self.registration_redirect = Duration::ZERO;
        self
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}
