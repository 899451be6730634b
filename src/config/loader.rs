//! Settings file loading

use crate::domain::Config;
use anyhow::{Context, Result};
use figment::providers::{Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;

/// Load settings, layering an optional YAML settings file over the defaults.
///
/// An explicitly requested file that does not exist is an error.
pub fn load_config(settings_path: Option<&Path>) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Some(path) = settings_path {
        if !path.is_file() {
            anyhow::bail!("Settings file not found: {}", path.display());
        }
        figment = figment.merge(Yaml::file(path));
    }

    let config: Config = figment.extract().with_context(|| match settings_path {
        Some(path) => format!("Invalid settings file: {}", path.display()),
        None => "Invalid default settings".to_string(),
    })?;

    tracing::debug!(?config, "loaded settings");
    Ok(config)
}
