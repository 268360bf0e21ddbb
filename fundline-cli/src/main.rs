//! Fundline CLI - investor account demo in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{config, history, login, logout, logs, register, status, withdraw};

/// Fundline - register, sign in and withdraw from a demo investment account
#[derive(Parser)]
#[command(name = "fl", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account
    Register(register::RegisterArgs),

    /// Sign in to an account
    Login {
        /// Email address
        #[arg(long)]
        email: Option<String>,
        /// Password (or FUNDLINE_PASSWORD)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign out
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Request a withdrawal from the signed-in account
    Withdraw(withdraw::WithdrawArgs),

    /// Show store status and the signed-in account
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the signed-in account's transactions, newest first
    History {
        /// Show at most this many transactions
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register(args) => register::run(args),
        Commands::Login { email, password, json } => login::run(email, password, json),
        Commands::Logout { json } => logout::run(json),
        Commands::Withdraw(args) => withdraw::run(args),
        Commands::Status { json } => status::run(json),
        Commands::History { limit, json } => history::run(limit, json),
        Commands::Config { command } => config::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
