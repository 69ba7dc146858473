//! Configuration management commands.

use anyhow::Context as _;
use clap::Args;
use reportcast_core::config::Config;
use reportcast_core::paths;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show configuration with credentials redacted
    Show,

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,
}

const SECRET_PATHS: &[&[&str]] = &[
    &["messaging", "sms", "api_key"],
    &["messaging", "kakao", "api_key"],
    &["messaging", "email", "password"],
];

/// Run the config command.
pub async fn run(args: ConfigArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load_or_default(config_path)?;
            println!("{}", serde_json::to_string_pretty(&redacted(&config)?)?);
        }

        ConfigCommand::Init { force } => {
            let path = resolve(config_path)?;

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {:?}. Use --force to overwrite.",
                    path
                );
            }

            Config::default()
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;

            println!("Created config file: {:?}", path);
            println!("  Tip: enable messaging.sms and set REPORTCAST_SMS_API_KEY to start sending.");
        }

        ConfigCommand::Path => {
            println!("{}", resolve(config_path)?.display());
        }

        ConfigCommand::Validate => {
            let path = resolve(config_path)?;
            match Config::load(&path) {
                Ok(mut config) => {
                    config.apply_env_overrides();
                    match config.validate() {
                        Ok(_) => println!("Configuration is valid"),
                        Err(e) => anyhow::bail!("Configuration error: {}", e),
                    }
                }
                Err(e) => anyhow::bail!("Failed to load config: {}", e),
            }
        }
    }

    Ok(())
}

fn resolve(config_path: Option<&Path>) -> anyhow::Result<PathBuf> {
    match config_path {
        Some(p) => Ok(p.to_path_buf()),
        None => Ok(paths::config_file()?),
    }
}

/// Serialize `config` with every non-empty credential replaced.
fn redacted(config: &Config) -> anyhow::Result<Value> {
    let mut json = serde_json::to_value(config)?;
    for path in SECRET_PATHS {
        let Some((leaf, parents)) = path.split_last() else {
            continue;
        };
        let parent = parents
            .iter()
            .try_fold(&mut json, |node, key| node.get_mut(*key));
        if let Some(Value::Object(map)) = parent {
            if let Some(value) = map.get_mut(*leaf) {
                if value.as_str().is_some_and(|s| !s.is_empty()) {
                    *value = Value::String("[REDACTED]".to_string());
                }
            }
        }
    }
    Ok(json)
}
