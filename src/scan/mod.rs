//! Fragment discovery

pub mod scanner;

pub use scanner::{FragmentPattern, FragmentScanner};

use std::path::{Path, PathBuf};

/// List the fragment files under `base_dir` matching `pattern`, in merge order.
pub fn discover_fragments(base_dir: &Path, pattern: &FragmentPattern) -> Vec<PathBuf> {
    FragmentScanner::new(base_dir.to_path_buf(), pattern.clone()).scan()
}
