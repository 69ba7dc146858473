//! ReportCast command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use commands::Context;

/// ReportCast - student report notifications for guardians
#[derive(Parser)]
#[command(name = "reportcast")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "REPORTCAST_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Generate and inspect reports
    Report(commands::report::ReportArgs),

    /// Send a report notification to a guardian
    Send(commands::send::SendArgs),

    /// Show remaining provider balance
    Balance(commands::balance::BalanceArgs),

    /// Refresh delivery status of sent messages
    Status(commands::status::StatusArgs),

    /// Inspect the delivery ledger
    Ledger(commands::ledger::LedgerArgs),

    /// Explain a raw failure message
    Classify(commands::classify::ClassifyArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Report(args) => commands::report::run(args, &Context::load(config_path)?).await,
        Commands::Send(args) => commands::send::run(args, &Context::load(config_path)?).await,
        Commands::Balance(args) => commands::balance::run(args, &Context::load(config_path)?).await,
        Commands::Status(args) => commands::status::run(args, &Context::load(config_path)?).await,
        Commands::Ledger(args) => commands::ledger::run(args, &Context::load(config_path)?).await,
        Commands::Classify(args) => {
            commands::classify::run(args, &Context::load(config_path)?).await
        }
        Commands::Config(args) => commands::config::run(args, config_path).await,
        Commands::Version => {
            println!("reportcast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
