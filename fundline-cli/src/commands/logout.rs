//! Logout command - clear the stored session

use anyhow::Result;

use fundline_core::LogEvent;

use super::{get_context, get_logger, log_event};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("logout"));

    let ctx = get_context()?;
    let result = ctx.session_service.sign_out();

    if json {
        return output::print_json_result(result.map(|signed_out| {
            serde_json::json!({ "signedOut": signed_out })
        }));
    }

    if result? {
        output::success("Signed out.");
    } else {
        output::info("No one is signed in.");
    }
    Ok(())
}
