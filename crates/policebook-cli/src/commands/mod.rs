//! CLI subcommands.

pub mod build;
pub mod config;
pub mod parse;

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use policebook_core::PolicebookConfig;

/// `{config_dir}/policebook/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("policebook")
        .join("config.json")
}

/// The config file to use: `-c` when given, the default path otherwise.
pub fn config_file(config_path: Option<&str>) -> PathBuf {
    config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path)
}

/// Load the configuration. An explicit file must exist; a missing default
/// file means defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<PolicebookConfig> {
    let path = config_file(config_path);

    if config_path.is_none() && !path.exists() {
        debug!("No config at {}, using defaults", path.display());
        return Ok(PolicebookConfig::default());
    }

    read_config(&path)
}

fn read_config(path: &Path) -> anyhow::Result<PolicebookConfig> {
    debug!("Loading config from {}", path.display());
    PolicebookConfig::from_file(path)
        .with_context(|| format!("Failed to load config {}", path.display()))
}
