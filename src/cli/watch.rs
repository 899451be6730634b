//! Watch command implementation

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::config::{self, load_config, merge_cli_with_config, CliOverrides};
use crate::reconcile::{CycleOutcome, IntervalTicker, Reconciler};
use crate::reload::HttpReloader;

#[derive(Args)]
pub struct WatchArgs {
    /// Prometheus configuration directory [default: /etc/prometheus]
    #[arg(short = 'c', long, value_name = "DIR", env = "PROMETHEUS_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Glob selecting fragment files, relative to the configuration directory [default: conf.d/*.yml]
    #[arg(long, value_name = "GLOB", env = "PROMETHEUS_CONFIG_MERGER_GLOB")]
    pub fragment_glob: Option<String>,

    /// Merged output file; relative paths live in the configuration directory.
    /// Replaced atomically when its directory is writable, otherwise overwritten in place
    /// [default: prometheus.yml]
    #[arg(short = 'o', long, value_name = "FILE", env = "PROMETHEUS_CONFIG_MERGER_OUTPUT")]
    pub output_file: Option<PathBuf>,

    /// Prometheus server scheme [default: http]
    #[arg(long, value_name = "SCHEME", env = "PROMETHEUS_SERVER_SCHEME")]
    pub prometheus_scheme: Option<String>,

    /// Prometheus server hostname [default: localhost]
    #[arg(long, value_name = "HOST", env = "PROMETHEUS_SERVER_HOSTNAME")]
    pub prometheus_hostname: Option<String>,

    /// Prometheus server port [default: 9090]
    #[arg(long, value_name = "PORT", env = "PROMETHEUS_SERVER_PORT")]
    pub prometheus_port: Option<u16>,

    /// Sleep time between checks, e.g. 5s, 500ms, 1m30s [default: 5s]
    #[arg(short = 's', long, value_name = "DURATION", env = "PROMETHEUS_CONFIG_MERGER_SLEEP")]
    pub sleep: Option<String>,

    /// YAML settings file providing defaults for the options above
    #[arg(long, value_name = "FILE", env = "PROMETHEUS_CONFIG_MERGER_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Run a single merge cycle and exit
    #[arg(long)]
    pub once: bool,
}

impl WatchArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config_dir: self.config_dir.clone(),
            fragment_glob: self.fragment_glob.clone(),
            output_file: self.output_file.clone(),
            prometheus_scheme: self.prometheus_scheme.clone(),
            prometheus_hostname: self.prometheus_hostname.clone(),
            prometheus_port: self.prometheus_port,
            sleep: self.sleep.clone(),
        }
    }
}

pub fn run(args: WatchArgs) -> Result<()> {
    let file_config = load_config(args.settings.as_deref())?;
    let merged = merge_cli_with_config(file_config, args.overrides());
    let resolved = config::resolve(&merged)?;

    let reloader = HttpReloader::new(resolved.reload_url.clone())?;
    let interval = resolved.interval;
    tracing::debug!(
        config_dir = %resolved.base_dir.display(),
        pattern = resolved.pattern.as_str(),
        output = %resolved.output_path.display(),
        reload_url = reloader.url(),
        "resolved configuration"
    );

    let mut reconciler = Reconciler::new(resolved, reloader);

    if args.once {
        let outcome = reconciler.run_cycle();
        reconciler.signal().wait_idle();
        if outcome == CycleOutcome::Failed {
            anyhow::bail!("Merge cycle failed, see log for details");
        }
        return Ok(());
    }

    tracing::info!(
        "Startup successful, now going to check for config changes every {:?}",
        interval
    );
    reconciler.run(IntervalTicker::new(interval))
}
