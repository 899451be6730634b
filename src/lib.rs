//! prometheus-config-merger: merge Prometheus configuration fragments
//!
//! Watches a directory of YAML fragments, deep-merges them into a single
//! document and, whenever the merged result changes, publishes it and asks
//! Prometheus to reload.

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod reconcile;
pub mod reload;
pub mod scan;
pub mod tree;

pub use error::{CycleError, TreeError};
pub use tree::{merge, Tree};
