//! ReportCast CLI entry point.

use clap::Parser;
use reportcast_cli::{run, Cli};
use reportcast_core::config::{LogFormat, LoggingConfig};
use reportcast_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // A broken config is reported by the command itself
    let logging = Config::load_or_default(cli.config.as_deref())
        .map(|c| c.logging)
        .unwrap_or_default();
    init_logging(&logging, cli.verbose);

    // Run the command
    run(cli).await
}

fn init_logging(logging: &LoggingConfig, verbose: u8) {
    let level = match verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("reportcast={}", level).into());

    // Logs go to stderr so command output stays pipeable
    let (json, pretty) = match logging.format {
        LogFormat::Json => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
            None,
        ),
        LogFormat::Pretty => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .init();
}
