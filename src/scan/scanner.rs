//! Glob-driven fragment scanner

use anyhow::Result;
use globset::{GlobBuilder, GlobMatcher};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A validated fragment glob such as `conf.d/*.yml`.
///
/// Patterns are relative to the configuration directory and `*` never
/// crosses a path separator; use `**` to descend into nested directories.
#[derive(Debug, Clone)]
pub struct FragmentPattern {
    raw: String,
    matcher: GlobMatcher,
}

impl FragmentPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let glob = GlobBuilder::new(pattern).literal_separator(true).build()?;
        Ok(Self { raw: pattern.to_string(), matcher: glob.compile_matcher() })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_match(&self, relative: &Path) -> bool {
        self.matcher.is_match(relative)
    }

    /// Deepest directory level a match can live at, or `None` for `**` patterns.
    fn max_depth(&self) -> Option<usize> {
        if self.raw.contains("**") {
            None
        } else {
            Some(self.raw.split('/').filter(|part| !part.is_empty()).count())
        }
    }
}

/// Scanner that finds fragment files below a base directory.
pub struct FragmentScanner {
    base_dir: PathBuf,
    pattern: FragmentPattern,
}

impl FragmentScanner {
    pub fn new(base_dir: PathBuf, pattern: FragmentPattern) -> Self {
        Self { base_dir, pattern }
    }

    /// Scan for matching regular files.
    ///
    /// Files are returned sorted by path, which fixes merge precedence for the
    /// cycle. Walk errors are logged and the affected entries skipped.
    pub fn scan(&self) -> Vec<PathBuf> {
        if !self.base_dir.is_dir() {
            tracing::warn!(
                "Configuration directory {} does not exist or is not a directory",
                self.base_dir.display()
            );
            return Vec::new();
        }

        // Kubernetes config maps mount their files through symlinks.
        let mut walker = WalkDir::new(&self.base_dir).min_depth(1).follow_links(true);
        if let Some(depth) = self.pattern.max_depth() {
            walker = walker.max_depth(depth);
        }

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", self.base_dir.display(), err);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.base_dir) else {
                continue;
            };
            if self.pattern.is_match(relative) {
                files.push(entry.path().to_path_buf());
            }
        }

        files.sort();
        tracing::debug!(
            pattern = self.pattern.as_str(),
            count = files.len(),
            "discovered fragments"
        );
        files
    }
}
