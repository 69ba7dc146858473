//! CLI command implementations.

pub mod balance;
pub mod classify;
pub mod config;
pub mod ledger;
pub mod report;
pub mod send;
pub mod status;

use anyhow::Context as _;
use console::style;
use reportcast_channels::ProviderRegistry;
use reportcast_core::Config;
use reportcast_dispatch::{
    DispatchOrchestrator, ErrorClassification, ErrorClassifier, FileReportStore, FormatContext,
    SnapshotActivitySource,
};
use reportcast_ledger::Ledger;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Loaded configuration plus constructors for the pipeline pieces.
pub struct Context {
    pub config: Config,
}

impl Context {
    /// Load and validate configuration from `path` or the default location.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = Config::load_or_default(path).context("Failed to load configuration")?;
        config.validate().context("Invalid configuration")?;
        debug!(
            "Ledger backend {:?}, reports in {}",
            config.ledger.backend,
            config.reports_dir()?.display()
        );
        Ok(Self { config })
    }

    pub fn registry(&self) -> anyhow::Result<ProviderRegistry> {
        ProviderRegistry::from_config(&self.config.messaging)
            .context("Failed to set up messaging providers")
    }

    pub async fn ledger(&self) -> anyhow::Result<Arc<dyn Ledger>> {
        reportcast_ledger::open(&self.config)
            .await
            .context("Failed to open delivery ledger")
    }

    pub async fn reports(&self) -> anyhow::Result<Arc<FileReportStore>> {
        let store = FileReportStore::new(self.config.reports_dir()?).await?;
        Ok(Arc::new(store))
    }

    pub async fn activity(&self) -> anyhow::Result<Arc<SnapshotActivitySource>> {
        let path = self.config.activity_file()?;
        let source = SnapshotActivitySource::load(&path)
            .await
            .with_context(|| format!("Failed to load activity snapshot {}", path.display()))?;
        Ok(Arc::new(source))
    }

    pub fn classifier(&self) -> anyhow::Result<ErrorClassifier> {
        ErrorClassifier::from_config(&self.config.classifier)
            .context("Invalid classifier rules")
    }

    pub async fn orchestrator(&self) -> anyhow::Result<DispatchOrchestrator> {
        let format = FormatContext::from_config(&self.config)?;
        Ok(DispatchOrchestrator::new(
            self.reports().await?,
            self.registry()?,
            self.ledger().await?,
            format,
        )
        .with_classifier(self.classifier()?))
    }
}

/// Print a classified failure for an operator.
pub(crate) fn print_classification(c: &ErrorClassification) {
    println!("  {} {} ({})", style("✗").red(), style(&c.title).bold(), c.code);
    println!("    {}", c.description);
    println!("    조치: {}", c.remedy);
    if let Some(link) = &c.help_link {
        println!("    참고: {}", link);
    }
    let retry = if c.retryable {
        style("재시도 가능").green()
    } else {
        style("재시도 불가").yellow()
    };
    println!("    [{}] {}", c.kind, retry);
}
