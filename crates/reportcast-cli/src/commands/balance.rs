//! Provider balance command.

use super::Context;
use clap::Args;
use console::style;
use reportcast_channels::ChannelError;
use reportcast_core::Channel;
use std::collections::HashSet;

/// Balance command arguments.
#[derive(Args)]
pub struct BalanceArgs {
    /// Only check this channel
    #[arg(long)]
    pub channel: Option<Channel>,
}

/// Run the balance command.
pub async fn run(args: BalanceArgs, ctx: &Context) -> anyhow::Result<()> {
    let registry = ctx.registry()?;
    let channels = match args.channel {
        Some(channel) => vec![channel],
        None => registry.channels(),
    };
    if channels.is_empty() {
        println!("No messaging providers are configured");
        return Ok(());
    }

    // SMS and LMS share one gateway account
    let mut seen = HashSet::new();
    for channel in channels {
        let provider = registry.get(channel)?;
        if !seen.insert(provider.name().to_string()) {
            continue;
        }

        match provider.check_balance().await {
            Ok(balance) => println!(
                "  {} {:<8} {:<12} {} {}",
                style("✓").green(),
                channel,
                provider.name(),
                balance.balance,
                balance.currency
            ),
            Err(ChannelError::Unsupported { .. }) => println!(
                "  {} {:<8} {:<12} balance not available",
                style("-").dim(),
                channel,
                provider.name()
            ),
            Err(e) => println!(
                "  {} {:<8} {:<12} {}",
                style("✗").red(),
                channel,
                provider.name(),
                e
            ),
        }
    }

    Ok(())
}
