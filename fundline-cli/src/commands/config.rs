//! Config command - show and change settings.json

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::time::Duration;

use fundline_core::config::{Config, StoreBackend, SETTINGS_FILE, STORE_BACKEND_ENV};
use fundline_core::LogEvent;

use super::{get_fundline_dir, get_logger, log_event};
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change settings; unspecified values are kept
    Set {
        /// Store backend (file or duckdb)
        #[arg(long)]
        store_backend: Option<StoreBackend>,
        /// How long an accepted withdrawal shows as processing
        #[arg(long)]
        withdrawal_delay_ms: Option<u64>,
        /// How long a submitted withdrawal stays shown before the form clears
        #[arg(long)]
        withdrawal_reset_ms: Option<u64>,
        /// How long registration success shows before sign-in
        #[arg(long)]
        registration_redirect_ms: Option<u64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn config_json(config: &Config) -> serde_json::Value {
    serde_json::json!({
        "storeBackend": config.store_backend.to_string(),
        "withdrawalDelayMs": config.withdrawal_delay.as_millis() as u64,
        "withdrawalResetMs": config.withdrawal_reset.as_millis() as u64,
        "registrationRedirectMs": config.registration_redirect.as_millis() as u64,
    })
}

fn print_config(config: &Config) {
    let mut table = output::create_table();
    table.set_header(vec!["Setting", "Value"]);
    table.add_row(vec!["Store backend".to_string(), config.store_backend.to_string()]);
    table.add_row(vec![
        "Withdrawal processing".to_string(),
        format!("{} ms", config.withdrawal_delay.as_millis()),
    ]);
    table.add_row(vec![
        "Withdrawal form reset".to_string(),
        format!("{} ms", config.withdrawal_reset.as_millis()),
    ]);
    table.add_row(vec![
        "Registration redirect".to_string(),
        format!("{} ms", config.registration_redirect.as_millis()),
    ]);
    println!("{}", table);
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let logger = get_logger();
    let data_dir = get_fundline_dir()?;

    match command {
        ConfigCommands::Show { json } => {
            log_event(&logger, LogEvent::new("command_executed").with_command("config show"));
            let config = Config::load(&data_dir)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&config_json(&config))?);
                return Ok(());
            }

            println!("{}", "Fundline Settings".bold());
            print_config(&config);
            if std::env::var(STORE_BACKEND_ENV).is_ok_and(|v| !v.trim().is_empty()) {
                output::info(&format!("Store backend overridden by {}", STORE_BACKEND_ENV));
            }
        }
        ConfigCommands::Set {
            store_backend,
            withdrawal_delay_ms,
            withdrawal_reset_ms,
            registration_redirect_ms,
            json,
        } => {
            log_event(&logger, LogEvent::new("command_executed").with_command("config set"));

            // Start from the file so an environment override is not persisted
            let mut config = Config::load_file(&data_dir)?;
            if let Some(backend) = store_backend {
                config.store_backend = backend;
            }
            if let Some(ms) = withdrawal_delay_ms {
                config.withdrawal_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = withdrawal_reset_ms {
                config.withdrawal_reset = Duration::from_millis(ms);
            }
            if let Some(ms) = registration_redirect_ms {
                config.registration_redirect = Duration::from_millis(ms);
            }
            config.save(&data_dir)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&config_json(&config))?);
                return Ok(());
            }

            output::success(&format!(
                "Saved {}",
                data_dir.join(SETTINGS_FILE).display()
            ));
            print_config(&config);
        }
    }

    Ok(())
}
