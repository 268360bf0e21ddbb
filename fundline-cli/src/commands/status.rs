//! Status command - show store summary and who is signed in

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use fundline_core::LogEvent;

use super::{get_context, get_logger, log_event};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("status"));

    let ctx = get_context()?;
    // Refreshes the session from the account store, dropping it if corrupt
    ctx.session_service.current()?;
    let status = ctx.status_service.get_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Fundline Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec!["Store", &status.backend]);
    table.add_row(vec!["Accounts", &status.total_accounts.to_string()]);
    table.add_row(vec!["Transactions", &status.total_transactions.to_string()]);
    table.add_row(vec![
        "Pending withdrawals".to_string(),
        format!(
            "{} ({})",
            status.pending_withdrawals,
            output::format_usd(status.pending_withdrawal_total)
        ),
    ]);
    if let Some(path) = ctx.store_path() {
        table.add_row(vec!["Location".to_string(), path.display().to_string()]);
    }

    println!("{}", table);
    println!();

    match &status.session {
        Some(session) => {
            println!("{} {} <{}>", "Signed in:".bold(), session.name, session.email);
            if let Some(balance) = session.balance {
                println!("  {} {}", "Balance:".dimmed(), output::format_usd(balance));
            }
            if !session.account_exists {
                output::error("The signed-in account no longer exists.");
            }
        }
        None => println!("{}", "Not signed in.".dimmed()),
    }

    Ok(())
}
