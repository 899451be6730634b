//! Apply command-line overrides on top of file settings

use crate::domain::Config;
use std::path::PathBuf;

/// Values given on the command line or through their environment variables.
///
/// `None` means "not given", leaving the file/default value in place.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub config_dir: Option<PathBuf>,
    pub fragment_glob: Option<String>,
    pub output_file: Option<PathBuf>,
    pub prometheus_scheme: Option<String>,
    pub prometheus_hostname: Option<String>,
    pub prometheus_port: Option<u16>,
    pub sleep: Option<String>,
}

pub fn merge_cli_with_config(mut config: Config, cli: CliOverrides) -> Config {
    if let Some(dir) = cli.config_dir {
        config.config_dir = dir;
    }
    if let Some(glob) = cli.fragment_glob {
        config.fragment_glob = glob;
    }
    if let Some(output) = cli.output_file {
        config.output_file = output;
    }
    if let Some(scheme) = cli.prometheus_scheme {
        config.prometheus_scheme = scheme;
    }
    if let Some(hostname) = cli.prometheus_hostname {
        config.prometheus_hostname = hostname;
    }
    if let Some(port) = cli.prometheus_port {
        config.prometheus_port = port;
    }
    if let Some(sleep) = cli.sleep {
        config.sleep = sleep;
    }
    config
}
