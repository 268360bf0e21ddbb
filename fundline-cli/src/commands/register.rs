//! Register command - create a new investor account

use anyhow::Result;
use colored::Colorize;
use dialoguer::Password;

use fundline_core::{FlowTracker, LogEvent, RegistrationForm};

use super::{
    get_context, get_logger, log_event, log_outcome, password_or_prompt, run_flow, value_or_prompt,
};
use crate::output;

#[derive(clap::Args)]
pub struct RegisterArgs {
    /// Full name
    #[arg(long)]
    pub name: Option<String>,
    /// Email address (used to sign in)
    #[arg(long)]
    pub email: Option<String>,
    /// Password (or FUNDLINE_PASSWORD)
    #[arg(long)]
    pub password: Option<String>,
    /// Password confirmation; defaults to the password when it was not typed in
    #[arg(long)]
    pub confirm_password: Option<String>,
    /// Country
    #[arg(long, default_value = "")]
    pub country: String,
    /// Phone number
    #[arg(long, default_value = "")]
    pub phone: String,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: RegisterArgs) -> Result<()> {
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("register"));

    let ctx = get_context()?;

    let full_name = value_or_prompt(args.name, "Full name", "--name")?;
    let email = value_or_prompt(args.email, "Email", "--email")?;

    let password_given =
        args.password.is_some() || std::env::var("FUNDLINE_PASSWORD").is_ok();
    let password = password_or_prompt(args.password, "Password")?;
    let confirm_password = match args.confirm_password {
        Some(confirm) => confirm,
        None if password_given => password.clone(),
        None => Password::new()
            .with_prompt("Confirm password")
            .allow_empty_password(true)
            .interact()?,
    };

    let form = RegistrationForm {
        full_name,
        email,
        password,
        confirm_password,
        country: args.country,
        phone: args.phone,
    };

    let tracker = FlowTracker::new();
    let result = run_flow(
        ctx.registration_service.submit(&form, &tracker),
        &tracker,
        "Creating your account...",
        "Account created. Redirecting to sign in...",
        !args.json,
    )?;

    log_outcome(&logger, "registration", "register", &result);

    if args.json {
        return output::print_json_result(result);
    }

    let registered = result?;
    output::success("Account created successfully!");
    println!(
        "  {} {}",
        "Starting balance:".dimmed(),
        output::format_usd(registered.balance)
    );
    output::info(&format!("Sign in with: fl login --email {}", registered.email));
    Ok(())
}
