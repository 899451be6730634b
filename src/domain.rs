//! Core domain types

use crate::scan::FragmentPattern;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_DIR: &str = "/etc/prometheus";
pub const DEFAULT_FRAGMENT_GLOB: &str = "conf.d/*.yml";
pub const DEFAULT_OUTPUT_FILE: &str = "prometheus.yml";
pub const DEFAULT_SLEEP: &str = "5s";

/// User-facing settings, as read from the settings file and command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prometheus configuration directory
    pub config_dir: PathBuf,
    /// Glob selecting fragment files, relative to `config_dir`
    pub fragment_glob: String,
    /// Merged output file; relative paths live under `config_dir`
    pub output_file: PathBuf,
    pub prometheus_scheme: String,
    pub prometheus_hostname: String,
    #[serde(deserialize_with = "port_from_number_or_string")]
    pub prometheus_port: u16,
    /// Pause between cycles, as a duration string such as `5s` or `1m30s`
    pub sleep: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            fragment_glob: DEFAULT_FRAGMENT_GLOB.to_string(),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            prometheus_scheme: "http".to_string(),
            prometheus_hostname: "localhost".to_string(),
            prometheus_port: 9090,
            sleep: DEFAULT_SLEEP.to_string(),
        }
    }
}

/// Ports may be written as `9090` or `"9090"`.
fn port_from_number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => {
            text.trim().parse().map_err(|_| de::Error::custom(format!("invalid port '{text}'")))
        }
    }
}

/// The validated, immutable record the reconciliation loop runs on.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_dir: PathBuf,
    pub pattern: FragmentPattern,
    pub output_path: PathBuf,
    pub reload_url: String,
    pub interval: Duration,
}
