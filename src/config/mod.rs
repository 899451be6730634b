//! Configuration loading and merging
//!
//! Handles loading from a settings file, environment variables, and CLI
//! arguments with proper precedence (CLI > Env > File > Defaults), then
//! resolves the result into the record the reconciliation loop consumes.

pub mod duration;
pub mod loader;
pub mod merge;

pub use duration::parse_interval;
pub use loader::load_config;
pub use merge::{merge_cli_with_config, CliOverrides};

use crate::domain::{Config, ResolvedConfig};
use crate::reload::reload_url;
use crate::scan::FragmentPattern;
use anyhow::{Context, Result};

/// Validate `config` and turn it into a [`ResolvedConfig`].
///
/// Every failure here is a startup error; nothing is re-read once the loop runs.
pub fn resolve(config: &Config) -> Result<ResolvedConfig> {
    let interval = parse_interval(&config.sleep)
        .with_context(|| format!("Invalid sleep interval '{}'", config.sleep))?;

    let pattern = FragmentPattern::new(&config.fragment_glob)
        .with_context(|| format!("Invalid fragment glob '{}'", config.fragment_glob))?;

    let reload_url = reload_url(
        &config.prometheus_scheme,
        &config.prometheus_hostname,
        config.prometheus_port,
    )?;

    let output_path = if config.output_file.is_absolute() {
        config.output_file.clone()
    } else {
        config.config_dir.join(&config.output_file)
    };

    Ok(ResolvedConfig {
        base_dir: config.config_dir.clone(),
        pattern,
        output_path,
        reload_url,
        interval,
    })
}
