//! prometheus-config-merger: merge Prometheus configuration fragments
//!
//! Polls `conf.d/*.yml`, merges the fragments into `prometheus.yml` and
//! triggers `/-/reload` on the Prometheus server when the result changes.

use anyhow::Result;

fn main() -> Result<()> {
    prometheus_config_merger::cli::run()
}
