//! History command - transactions of the signed-in account

use anyhow::Result;

use fundline_core::{Error, LogEvent};

use super::{get_context, get_logger, log_event};
use crate::output;

pub fn run(limit: Option<usize>, json: bool) -> Result<()> {
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("history"));

    let ctx = get_context()?;
    let session = ctx.session_service.current()?.ok_or(Error::Unauthenticated)?;

    let mut transactions = ctx.status_service.history(&session.email)?;
    if let Some(limit) = limit {
        transactions.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&transactions)?);
        return Ok(());
    }

    if transactions.is_empty() {
        println!("No transactions yet.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Date", "Type", "Amount", "Method", "Status", "Reference"]);
    for tx in &transactions {
        table.add_row(vec![
            tx.date.to_string(),
            tx.kind.to_string(),
            format!("{:.2} {}", tx.amount, tx.currency),
            tx.method.clone(),
            tx.status.to_string(),
            tx.id.to_string(),
        ]);
    }
    println!("{}", table);

    Ok(())
}
