//! Untyped configuration trees
//!
//! A [`Tree`] is the JSON-compatible shape every fragment is converted into
//! before merging. Anything YAML can express but JSON cannot (non-finite
//! floats, composite mapping keys) is rejected at conversion time, so the
//! merge itself never fails.

pub mod merge;

pub use merge::{merge, merge_yaml};

use crate::error::{CycleError, TreeError};
use serde::Serialize;
use serde_json::Number;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// A JSON-compatible configuration value.
///
/// Mappings are kept in a `BTreeMap`, so rendered output always lists keys
/// in sorted order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Tree {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<Tree>),
    Mapping(BTreeMap<String, Tree>),
}

impl Tree {
    /// Convert a parsed YAML value into a tree.
    pub fn from_yaml(value: Value) -> Result<Self, TreeError> {
        match value {
            Value::Null => Ok(Tree::Null),
            Value::Bool(b) => Ok(Tree::Bool(b)),
            Value::Number(n) => convert_number(&n).map(Tree::Number),
            Value::String(s) => Ok(Tree::String(s)),
            Value::Sequence(items) => {
                items.into_iter().map(Tree::from_yaml).collect::<Result<_, _>>().map(Tree::Sequence)
            }
            Value::Mapping(mapping) => {
                let mut out = BTreeMap::new();
                for (key, value) in mapping {
                    out.insert(key_to_string(key)?, Tree::from_yaml(value)?);
                }
                Ok(Tree::Mapping(out))
            }
            // Tags carry no meaning for the merged document.
            Value::Tagged(tagged) => Tree::from_yaml(tagged.value),
        }
    }

    /// Render the tree as YAML bytes.
    pub fn to_yaml_bytes(&self) -> Result<Vec<u8>, CycleError> {
        Ok(serde_yaml::to_string(self)?.into_bytes())
    }

    /// An empty mapping, used in place of fragments that failed to parse.
    pub fn empty_mapping() -> Self {
        Tree::Mapping(BTreeMap::new())
    }
}

fn convert_number(n: &serde_yaml::Number) -> Result<Number, TreeError> {
    if let Some(i) = n.as_i64() {
        return Ok(Number::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Ok(Number::from(u));
    }
    n.as_f64()
        .and_then(Number::from_f64)
        .ok_or_else(|| TreeError::NonFiniteNumber(n.to_string()))
}

/// Scalar keys are stringified the way a JSON round-trip would.
fn key_to_string(key: Value) -> Result<String, TreeError> {
    match key {
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Tagged(tagged) => key_to_string(tagged.value),
        Value::Sequence(_) => Err(TreeError::UnsupportedKey("sequence")),
        Value::Mapping(_) => Err(TreeError::UnsupportedKey("mapping")),
    }
}
