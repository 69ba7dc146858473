//! Delivery status refresh command.

use super::Context;
use clap::Args;
use console::style;
use reportcast_dispatch::{DeliveryTracker, RefreshOutcome};

/// Status command arguments.
#[derive(Args)]
pub struct StatusArgs {
    /// Ledger row id; refreshes every sent row when omitted
    pub log_id: Option<String>,

    /// Only refresh rows for this tenant
    #[arg(long)]
    pub tenant: Option<String>,

    /// Maximum rows to refresh
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

/// Run the status command.
pub async fn run(args: StatusArgs, ctx: &Context) -> anyhow::Result<()> {
    let tracker = DeliveryTracker::new(ctx.registry()?, ctx.ledger().await?);

    let outcomes = match args.log_id {
        Some(id) => vec![tracker.refresh(&id).await?],
        None => tracker.refresh_pending(args.tenant, args.limit).await?,
    };
    if outcomes.is_empty() {
        println!("No sent messages awaiting delivery confirmation");
        return Ok(());
    }

    for outcome in &outcomes {
        let log = outcome.log();
        let (mark, note) = match outcome {
            RefreshOutcome::Updated(_) => (style("✓").green(), "updated"),
            RefreshOutcome::Pending(_) => (style("…").yellow(), "pending"),
            RefreshOutcome::AlreadyFinal(_) => (style("=").dim(), "final"),
            RefreshOutcome::Unsupported(_) => (style("-").dim(), "no status api"),
        };
        println!(
            "  {} {:<40} {:<6} {:<10} {}",
            mark, log.id, log.channel, log.status, note
        );
        if let Some(reason) = &log.error_message {
            println!("      {}", reason);
        }
    }

    Ok(())
}
