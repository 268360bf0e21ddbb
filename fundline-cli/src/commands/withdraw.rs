//! Withdraw command - request a withdrawal from the signed-in account

use anyhow::Result;
use colored::Colorize;

use fundline_core::{FlowTracker, LogEvent, WithdrawalForm};

use super::{get_context, get_logger, log_event, log_outcome, run_flow, value_or_prompt};
use crate::output;

#[derive(clap::Args)]
pub struct WithdrawArgs {
    /// Amount in USD (minimum 50)
    pub amount: Option<String>,
    /// Currency code
    #[arg(long, default_value = "USD")]
    pub currency: String,
    /// Payment method (bitcoin, ethereum, usdt)
    #[arg(long, default_value = "bitcoin")]
    pub method: String,
    /// Wallet address to pay out to
    #[arg(long)]
    pub wallet: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: WithdrawArgs) -> Result<()> {
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("withdraw"));

    let ctx = get_context()?;
    let amount = value_or_prompt(args.amount, "Amount (USD)", "An amount")?;

    let mut form = WithdrawalForm::new(amount, args.currency, args.method);
    if let Some(wallet) = args.wallet {
        form = form.with_wallet_address(wallet);
    }

    let tracker = FlowTracker::new();
    let result = run_flow(
        ctx.withdrawal_service.submit(&form, &tracker),
        &tracker,
        "Processing withdrawal...",
        "Withdrawal submitted",
        !args.json,
    )?;

    log_outcome(&logger, "withdrawal", "withdraw", &result);

    if args.json {
        return output::print_json_result(result);
    }

    let receipt = result?;
    output::success("Withdrawal request submitted successfully!");
    println!(
        "  {} {} via {}",
        "Amount:".dimmed(),
        output::format_usd(receipt.transaction.amount),
        receipt.transaction.method
    );
    println!("  {} {}", "Status:".dimmed(), receipt.transaction.status);
    println!("  {} {}", "Reference:".dimmed(), receipt.transaction.id);
    println!("  {} {}", "New balance:".dimmed(), output::format_usd(receipt.balance));
    Ok(())
}
