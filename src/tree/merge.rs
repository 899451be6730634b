//! Asymmetric deep merge of configuration trees
//!
//! `dominant` wins every conflict except two: mappings are unioned key by
//! key (recursing on shared keys) and sequences are concatenated with the
//! dominant elements first. A null dominant yields to a subordinate mapping.

use super::Tree;
use crate::error::TreeError;
use serde_yaml::Value;

/// Merge `subordinate` into `dominant`.
///
/// | dominant   | subordinate | result                          |
/// |------------|-------------|---------------------------------|
/// | mapping    | mapping     | key union, shared keys merged   |
/// | sequence   | sequence    | dominant ++ subordinate         |
/// | null       | mapping     | subordinate                     |
/// | any other  | anything    | dominant                        |
pub fn merge(dominant: Tree, subordinate: Tree) -> Tree {
    match (dominant, subordinate) {
        (Tree::Mapping(mut dom), Tree::Mapping(sub)) => {
            for (key, sub_value) in sub {
                let merged = match dom.remove(&key) {
                    Some(dom_value) => merge(dom_value, sub_value),
                    None => sub_value,
                };
                dom.insert(key, merged);
            }
            Tree::Mapping(dom)
        }
        (Tree::Sequence(mut dom), Tree::Sequence(sub)) => {
            dom.extend(sub);
            Tree::Sequence(dom)
        }
        (Tree::Null, sub @ Tree::Mapping(_)) => sub,
        (dominant, _) => dominant,
    }
}

/// Merge two raw YAML values.
///
/// Fails only when either side has no JSON-compatible representation.
pub fn merge_yaml(dominant: &Value, subordinate: &Value) -> Result<Tree, TreeError> {
    let dominant = Tree::from_yaml(dominant.clone())?;
    let subordinate = Tree::from_yaml(subordinate.clone())?;
    Ok(merge(dominant, subordinate))
}
