//! CLI command implementations

pub mod config;
pub mod history;
pub mod login;
pub mod logout;
pub mod logs;
pub mod register;
pub mod status;
pub mod withdraw;

use std::future::Future;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use dialoguer::{Input, Password};
use fundline_core::{
    EntryPoint, FlowState, FlowTracker, FundlineContext, LogEvent, LoggingService,
};

use crate::output;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_fundline_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Log the outcome of a flow as `<flow>_completed` or `<flow>_rejected`
pub fn log_outcome<T>(
    logger: &Option<LoggingService>,
    flow: &str,
    command: &str,
    result: &fundline_core::Result<T>,
) {
    let event = match result {
        Ok(_) => LogEvent::completed(flow),
        Err(e) => LogEvent::from_error(flow, e),
    };
    log_event(logger, event.with_command(command));
}

/// Get the data directory from FUNDLINE_DIR or ~/.fundline
pub fn get_fundline_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("FUNDLINE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".fundline"))
        .ok_or_else(|| anyhow!("Could not find home directory; set FUNDLINE_DIR"))
}

/// Open the context for the data directory
pub fn get_context() -> Result<FundlineContext> {
    let data_dir = get_fundline_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create fundline directory: {:?}", data_dir))?;

    FundlineContext::new(&data_dir).context("Failed to initialize fundline context")
}

/// Use the flag value, or prompt for it when attached to a terminal
pub fn value_or_prompt(value: Option<String>, prompt: &str, required: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None if atty::is(atty::Stream::Stdin) => Ok(Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?),
        None => Err(anyhow!("{} is required", required)),
    }
}

/// Password from the flag, FUNDLINE_PASSWORD, or a hidden prompt
pub fn password_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    if let Some(p) = value {
        return Ok(p);
    }
    if let Ok(p) = std::env::var("FUNDLINE_PASSWORD") {
        return Ok(p);
    }
    if !atty::is(atty::Stream::Stdin) {
        return Err(anyhow!("Password is required (--password or FUNDLINE_PASSWORD)"));
    }
    Ok(Password::new()
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()?)
}

/// Drive a flow to completion, mirroring its state on a spinner
///
/// The spinner shows `processing` until the flow succeeds, then `succeeded`
/// for whatever delay the flow still holds. Background work the flow leaves
/// behind, such as clearing the form, ends with the runtime.
pub fn run_flow<T>(
    flow: impl Future<Output = fundline_core::Result<T>>,
    tracker: &FlowTracker,
    processing: &str,
    succeeded: &str,
    show_spinner: bool,
) -> Result<fundline_core::Result<T>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let spinner = show_spinner.then(|| output::spinner(processing));
    let mut states = tracker.subscribe();

    let result = runtime.block_on(async {
        tokio::pin!(flow);
        loop {
            tokio::select! {
                result = &mut flow => break result,
                changed = states.changed() => {
                    if changed.is_err() {
                        break (&mut flow).await;
                    }
                    let state = states.borrow_and_update().clone();
                    if let (Some(bar), FlowState::Succeeded) = (&spinner, &state) {
                        bar.set_message(succeeded.to_string());
                    }
                }
            }
        }
    });

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    Ok(result)
}
