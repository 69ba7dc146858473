//! Delivery ledger inspection commands.

use super::Context;
use clap::Args;
use reportcast_core::{Channel, MessageStatus};
use reportcast_ledger::LedgerQuery;

/// Ledger command arguments.
#[derive(Args)]
pub struct LedgerArgs {
    #[command(subcommand)]
    pub command: LedgerCommand,
}

#[derive(clap::Subcommand)]
pub enum LedgerCommand {
    /// List attempts, newest first
    List {
        /// Filter by tenant
        #[arg(long)]
        tenant: Option<String>,

        /// Filter by channel
        #[arg(long)]
        channel: Option<Channel>,

        /// Filter by status (sent, delivered, failed)
        #[arg(long)]
        status: Option<MessageStatus>,

        /// Maximum rows
        #[arg(long, default_value_t = 50)]
        limit: usize,

        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one attempt as JSON
    Show {
        /// Ledger row id
        id: String,
    },
}

/// Run the ledger command.
pub async fn run(args: LedgerArgs, ctx: &Context) -> anyhow::Result<()> {
    let ledger = ctx.ledger().await?;

    match args.command {
        LedgerCommand::List {
            tenant,
            channel,
            status,
            limit,
            json,
        } => {
            let rows = ledger
                .list(&LedgerQuery {
                    tenant_id: tenant,
                    channel,
                    status,
                    limit,
                })
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }
            if rows.is_empty() {
                println!("No messages recorded");
                return Ok(());
            }

            println!(
                "  {:<40} {:<6} {:<10} {:<16} {}",
                "ID", "CHANNEL", "STATUS", "RECIPIENT", "CREATED"
            );
            println!("  {}", "-".repeat(100));
            for row in &rows {
                println!(
                    "  {:<40} {:<6} {:<10} {:<16} {}",
                    row.id,
                    row.channel,
                    row.status,
                    row.recipient_contact,
                    row.created_at.format("%Y-%m-%d %H:%M:%S")
                );
                if let Some(error) = &row.error_message {
                    println!("      {}", error);
                }
            }
        }

        LedgerCommand::Show { id } => match ledger.get(&id).await? {
            Some(row) => println!("{}", serde_json::to_string_pretty(&row)?),
            None => anyhow::bail!("Message log not found: {}", id),
        },
    }

    Ok(())
}
