//! Error kinds raised inside a reconciliation cycle
//!
//! None of these are fatal: the loop logs them and carries on with a safe
//! default. Startup failures go through `anyhow` in the CLI layer instead.

use std::io;
use std::path::PathBuf;

/// A tree value that has no JSON-compatible representation.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("number {0} has no JSON representation")]
    NonFiniteNumber(String),

    #[error("mapping key must be a scalar, found {0}")]
    UnsupportedKey(&'static str),
}

/// Failures that can occur during one discover-fold-publish cycle.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("failed reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed parsing {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("failed serializing merged configuration: {0}")]
    Serialization(String),

    #[error("failed writing {path}: {source}")]
    Publish {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("reload request to {url} failed: {reason}")]
    Signal { url: String, reason: String },
}

impl From<TreeError> for CycleError {
    fn from(err: TreeError) -> Self {
        CycleError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for CycleError {
    fn from(err: serde_yaml::Error) -> Self {
        CycleError::Serialization(err.to_string())
    }
}
