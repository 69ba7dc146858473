//! Path resolution utilities.

use crate::env;
use crate::error::ConfigError;
use std::path::PathBuf;

/// Get the ReportCast base directory (`$REPORTCAST_HOME` or `~/.reportcast`).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    if let Some(home) = env::get_var(env::vars::REPORTCAST_HOME) {
        return Ok(PathBuf::from(home));
    }
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".reportcast"))
}

/// Get the main config file path (~/.reportcast/reportcast.json5).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    if let Some(path) = env::get_var(env::vars::REPORTCAST_CONFIG) {
        return Ok(PathBuf::from(path));
    }
    Ok(base_dir()?.join("reportcast.json5"))
}

/// Get the default delivery ledger database (~/.reportcast/ledger.db).
pub fn ledger_db() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("ledger.db"))
}

/// Get the default report directory (~/.reportcast/reports).
pub fn reports_dir() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("reports"))
}

/// Get the default activity snapshot file (~/.reportcast/activity.json).
pub fn activity_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("activity.json"))
}
