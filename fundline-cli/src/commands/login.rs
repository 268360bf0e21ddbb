//! Login command - sign in to an existing account

use anyhow::Result;
use colored::Colorize;

use fundline_core::LogEvent;

use super::{get_context, get_logger, log_event, log_outcome, password_or_prompt, value_or_prompt};
use crate::output;

pub fn run(email: Option<String>, password: Option<String>, json: bool) -> Result<()> {
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("login"));

    let ctx = get_context()?;
    let email = value_or_prompt(email, "Email", "--email")?;
    let password = password_or_prompt(password, "Password")?;

    let result = ctx.session_service.sign_in(&email, &password);
    log_outcome(&logger, "login", "login", &result);

    if json {
        return output::print_json_result(result);
    }

    let session = result?;
    output::success(&format!("Welcome back, {}!", session.display_name()));
    if let Some(balance) = session.balance {
        println!("  {} {}", "Balance:".dimmed(), output::format_usd(balance));
    }
    Ok(())
}
