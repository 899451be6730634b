//! The poll-diff-publish-reload loop
//!
//! Each cycle discovers the fragment files, folds them into one tree,
//! renders it, and publishes it plus a reload signal only when the rendered
//! bytes differ from what was last published. Every failure inside a cycle
//! is logged and absorbed; the loop itself never stops.

pub mod publish;
pub mod ticker;

pub use publish::publish;
pub use ticker::{IntervalTicker, Ticker};

use crate::domain::ResolvedConfig;
use crate::error::CycleError;
use crate::reload::ReloadSignal;
use crate::scan::discover_fragments;
use crate::tree::{merge, Tree};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What a single cycle ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Merged output matched the last published bytes; nothing written.
    Unchanged,
    /// New output was written. `signalled` is false if the reload could not be started.
    Published { signalled: bool },
    /// Rendering or writing failed; the next cycle starts over.
    Failed,
}

/// State carried from one cycle to the next.
#[derive(Debug, Default)]
pub struct LoopState {
    last_published: Option<Vec<u8>>,
}

impl LoopState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_published(&self) -> Option<&[u8]> {
        self.last_published.as_deref()
    }
}

/// Read and parse one fragment file.
///
/// Empty files are `Null`. Anything other than a mapping at the top level is
/// a parse error. YAML merge keys are resolved before conversion.
pub fn load_fragment(path: &Path) -> Result<Tree, CycleError> {
    let raw =
        fs::read(path).map_err(|source| CycleError::Read { path: path.to_path_buf(), source })?;
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Tree::Null);
    }

    let parse_err = |err: serde_yaml::Error| CycleError::Parse {
        path: path.to_path_buf(),
        reason: err.to_string(),
    };

    // Only the first document of a multi-document file counts.
    let mut value = match serde_yaml::Deserializer::from_slice(&raw).next() {
        Some(document) => serde_yaml::Value::deserialize(document).map_err(parse_err)?,
        None => return Ok(Tree::Null),
    };
    // Expand `<<: *anchor` merge keys so they never reach the output.
    value.apply_merge().map_err(parse_err)?;

    match Tree::from_yaml(value)? {
        tree @ (Tree::Mapping(_) | Tree::Null) => Ok(tree),
        _ => Err(CycleError::Parse {
            path: path.to_path_buf(),
            reason: "top-level value is not a mapping".to_string(),
        }),
    }
}

/// Fold fragments in discovery order.
///
/// Each fragment is merged as the dominant side over everything folded so
/// far: later fragments win scalar conflicts and their list items come first.
/// Unreadable fragments are skipped; unparsable ones count as `{}`.
pub fn fold_fragments(paths: &[PathBuf]) -> Tree {
    let mut merged = Tree::Null;
    for path in paths {
        let fragment = match load_fragment(path) {
            Ok(tree) => tree,
            Err(err @ CycleError::Read { .. }) => {
                tracing::warn!("{}", err);
                continue;
            }
            Err(err) => {
                tracing::warn!("{}; treating fragment as empty", err);
                Tree::empty_mapping()
            }
        };
        merged = merge(fragment, merged);
    }
    merged
}

/// Owns the loop's configuration, state and reload signal.
pub struct Reconciler<S> {
    config: ResolvedConfig,
    state: LoopState,
    signal: S,
}

impl<S: ReloadSignal> Reconciler<S> {
    pub fn new(config: ResolvedConfig, signal: S) -> Self {
        Self { config, state: LoopState::new(), signal }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn signal(&self) -> &S {
        &self.signal
    }

    /// Run one discover-fold-publish cycle.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let fragments = discover_fragments(&self.config.base_dir, &self.config.pattern);
        let merged = fold_fragments(&fragments);

        let data = match merged.to_yaml_bytes() {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!("{}", err);
                return CycleOutcome::Failed;
            }
        };

        if self.baseline() == data {
            tracing::debug!(fragments = fragments.len(), "merged config unchanged");
            self.state.last_published.get_or_insert(data);
            return CycleOutcome::Unchanged;
        }

        tracing::info!(
            output = %self.config.output_path.display(),
            fragments = fragments.len(),
            "Merged config differs from on-disk version, about to reload prometheus"
        );
        if let Err(err) = publish(&self.config.output_path, &data) {
            tracing::warn!("{}", err);
            return CycleOutcome::Failed;
        }
        self.state.last_published = Some(data);

        match self.signal.signal() {
            Ok(()) => CycleOutcome::Published { signalled: true },
            Err(err) => {
                tracing::warn!("{}", err);
                CycleOutcome::Published { signalled: false }
            }
        }
    }

    /// Run one cycle, then wait on `ticker`.
    pub fn step<T: Ticker>(&mut self, ticker: &mut T) -> CycleOutcome {
        let outcome = self.run_cycle();
        ticker.wait();
        outcome
    }

    /// Reconcile forever.
    pub fn run<T: Ticker>(mut self, mut ticker: T) -> ! {
        loop {
            self.step(&mut ticker);
        }
    }

    /// Bytes the next output is compared against. Before anything has been
    /// published this is the current output file, or nothing if it can't be read.
    fn baseline(&self) -> Vec<u8> {
        if let Some(published) = &self.state.last_published {
            return published.clone();
        }
        match fs::read(&self.config.output_path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(
                    "No previous output at {}",
                    self.config.output_path.display()
                );
                Vec::new()
            }
            Err(source) => {
                let err = CycleError::Read { path: self.config.output_path.clone(), source };
                tracing::warn!("{}", err);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::FragmentPattern;
    use std::cell::Cell;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingSignal {
        calls: Cell<usize>,
        fail: bool,
    }

    impl ReloadSignal for CountingSignal {
        fn signal(&self) -> Result<(), CycleError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(CycleError::Signal {
                    url: "http://localhost:9090/-/reload".to_string(),
                    reason: "refused".to_string(),
                });
            }
            Ok(())
        }
    }

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().expect("tmp");
            fs::create_dir_all(dir.path().join("conf.d")).expect("mkdir");
            Self { dir }
        }

        fn fragment(&self, name: &str, content: &str) {
            fs::write(self.dir.path().join("conf.d").join(name), content).expect("write");
        }

        fn output(&self) -> PathBuf {
            self.dir.path().join("prometheus.yml")
        }

        fn config(&self) -> ResolvedConfig {
            ResolvedConfig {
                base_dir: self.dir.path().to_path_buf(),
                pattern: FragmentPattern::new("conf.d/*.yml").expect("pattern"),
                output_path: self.output(),
                reload_url: "http://localhost:9090/-/reload".to_string(),
                interval: Duration::ZERO,
            }
        }

        fn reconciler(&self) -> Reconciler<CountingSignal> {
            Reconciler::new(self.config(), CountingSignal::default())
        }

        fn published(&self) -> String {
            fs::read_to_string(self.output()).expect("read output")
        }
    }

    fn render(src: &str) -> String {
        let tree = Tree::from_yaml(serde_yaml::from_str(src).expect("yaml")).expect("tree");
        String::from_utf8(tree.to_yaml_bytes().expect("render")).expect("utf8")
    }

    #[test]
    fn test_later_fragment_dominates_and_prepends_lists() {
        let fx = Fixture::new();
        fx.fragment("f1.yml", "targets: [a]\ntimeout: 5\n");
        fx.fragment("f2.yml", "targets: [b]\ntimeout: 10\n");

        let mut reconciler = fx.reconciler();
        assert_eq!(reconciler.run_cycle(), CycleOutcome::Published { signalled: true });
        assert_eq!(fx.published(), render("targets: [b, a]\ntimeout: 10\n"));
        assert_eq!(reconciler.signal().calls.get(), 1);
    }

    #[test]
    fn test_unchanged_fragments_do_not_republish() {
        let fx = Fixture::new();
        fx.fragment("jobs.yml", "scrape_configs:\n  - job_name: node\n");

        let mut reconciler = fx.reconciler();
        assert_eq!(reconciler.run_cycle(), CycleOutcome::Published { signalled: true });
        let first = fx.published();

        assert_eq!(reconciler.run_cycle(), CycleOutcome::Unchanged);
        assert_eq!(reconciler.run_cycle(), CycleOutcome::Unchanged);
        assert_eq!(fx.published(), first);
        assert_eq!(reconciler.signal().calls.get(), 1);
    }

    #[test]
    fn test_changed_fragment_republishes() {
        let fx = Fixture::new();
        fx.fragment("global.yml", "global:\n  scrape_interval: 15s\n");

        let mut reconciler = fx.reconciler();
        reconciler.run_cycle();

        fx.fragment("global.yml", "global:\n  scrape_interval: 30s\n");
        assert_eq!(reconciler.run_cycle(), CycleOutcome::Published { signalled: true });
        assert_eq!(fx.published(), render("global:\n  scrape_interval: 30s\n"));
        assert_eq!(reconciler.signal().calls.get(), 2);
        assert_eq!(reconciler.state().last_published(), Some(fx.published().as_bytes()));
    }

    #[test]
    fn test_empty_directory_publishes_null_once() {
        let fx = Fixture::new();
        fs::write(fx.output(), "global:\n  scrape_interval: 15s\n").expect("write");

        let mut reconciler = fx.reconciler();
        assert_eq!(reconciler.run_cycle(), CycleOutcome::Published { signalled: true });
        assert_eq!(fx.published(), "null\n");

        assert_eq!(reconciler.run_cycle(), CycleOutcome::Unchanged);
        assert_eq!(reconciler.signal().calls.get(), 1);
    }

    #[test]
    fn test_matching_output_on_disk_is_not_rewritten() {
        let fx = Fixture::new();
        fx.fragment("a.yml", "rule_files: [alerts.yml]\n");
        fs::write(fx.output(), render("rule_files: [alerts.yml]\n")).expect("write");

        let mut reconciler = fx.reconciler();
        assert_eq!(reconciler.run_cycle(), CycleOutcome::Unchanged);
        assert_eq!(reconciler.signal().calls.get(), 0);
        assert!(reconciler.state().last_published().is_some());
    }

    #[test]
    fn test_invalid_fragment_is_ignored() {
        let fx = Fixture::new();
        fx.fragment("a.yml", "scrape_configs:\n  - job_name: a\n");
        fx.fragment("b.yml", "scrape_configs: [unclosed\n");
        fx.fragment("c.yml", "scrape_configs:\n  - job_name: c\n");

        let mut reconciler = fx.reconciler();
        assert_eq!(reconciler.run_cycle(), CycleOutcome::Published { signalled: true });
        assert_eq!(
            fx.published(),
            render("scrape_configs:\n  - job_name: c\n  - job_name: a\n")
        );
    }

    #[test]
    fn test_only_invalid_fragment_yields_empty_mapping() {
        let fx = Fixture::new();
        fx.fragment("broken.yml", "key: [\n");

        let mut reconciler = fx.reconciler();
        reconciler.run_cycle();
        assert_eq!(fx.published(), "{}\n");
    }

    #[test]
    fn test_non_mapping_fragment_is_treated_as_empty() {
        let fx = Fixture::new();
        fx.fragment("a.yml", "timeout: 5\n");
        fx.fragment("b.yml", "- just\n- a list\n");

        let mut reconciler = fx.reconciler();
        reconciler.run_cycle();
        assert_eq!(fx.published(), render("timeout: 5\n"));
    }

    #[test]
    fn test_empty_fragment_changes_nothing() {
        let fx = Fixture::new();
        fx.fragment("a.yml", "timeout: 5\n");
        fx.fragment("b.yml", "");

        let mut reconciler = fx.reconciler();
        reconciler.run_cycle();
        assert_eq!(fx.published(), render("timeout: 5\n"));
    }

    #[test]
    fn test_unrepresentable_fragment_is_treated_as_empty() {
        let fx = Fixture::new();
        fx.fragment("a.yml", "timeout: 5\n");
        fx.fragment("b.yml", "ratio: .nan\n");

        let mut reconciler = fx.reconciler();
        reconciler.run_cycle();
        assert_eq!(fx.published(), render("timeout: 5\n"));
    }

    #[test]
    fn test_publish_failure_skips_signal_and_retries() {
        let fx = Fixture::new();
        fx.fragment("a.yml", "timeout: 5\n");
        fs::create_dir_all(fx.output()).expect("mkdir in place of output");

        let mut reconciler = fx.reconciler();
        assert_eq!(reconciler.run_cycle(), CycleOutcome::Failed);
        assert_eq!(reconciler.signal().calls.get(), 0);
        assert!(reconciler.state().last_published().is_none());

        fs::remove_dir(fx.output()).expect("rmdir");
        assert_eq!(reconciler.run_cycle(), CycleOutcome::Published { signalled: true });
        assert_eq!(reconciler.signal().calls.get(), 1);
    }

    #[test]
    fn test_signal_failure_still_records_publish() {
        let fx = Fixture::new();
        fx.fragment("a.yml", "timeout: 5\n");

        let mut reconciler =
            Reconciler::new(fx.config(), CountingSignal { fail: true, ..CountingSignal::default() });
        assert_eq!(reconciler.run_cycle(), CycleOutcome::Published { signalled: false });
        assert!(reconciler.state().last_published().is_some());

        // No retry of the reload once the output is stable.
        assert_eq!(reconciler.run_cycle(), CycleOutcome::Unchanged);
        assert_eq!(reconciler.signal().calls.get(), 1);
    }

    #[test]
    fn test_step_waits_after_the_cycle() {
        struct RecordingTicker {
            output: PathBuf,
            saw_output: Vec<bool>,
        }

        impl Ticker for RecordingTicker {
            fn wait(&mut self) {
                self.saw_output.push(self.output.exists());
            }
        }

        let fx = Fixture::new();
        fx.fragment("a.yml", "timeout: 5\n");

        let mut ticker = RecordingTicker { output: fx.output(), saw_output: Vec::new() };
        let mut reconciler = fx.reconciler();
        reconciler.step(&mut ticker);
        reconciler.step(&mut ticker);
        assert_eq!(ticker.saw_output, vec![true, true]);
    }

    #[test]
    fn test_merge_keys_are_expanded() {
        let fx = Fixture::new();
        fx.fragment(
            "jobs.yml",
            "defaults: &defaults\n  scrape_interval: 15s\n  scrape_timeout: 10s\n\
             job:\n  <<: *defaults\n  scrape_timeout: 5s\n  name: node\n",
        );

        let mut reconciler = fx.reconciler();
        reconciler.run_cycle();
        let published = fx.published();
        assert!(!published.contains("<<"), "merge key leaked: {published}");
        assert_eq!(
            published,
            render(
                "defaults:\n  scrape_interval: 15s\n  scrape_timeout: 10s\n\
                 job:\n  scrape_interval: 15s\n  scrape_timeout: 5s\n  name: node\n"
            )
        );
    }

    #[test]
    fn test_multi_document_fragment_uses_first_document() {
        let fx = Fixture::new();
        fx.fragment("a.yml", "timeout: 5\n---\ntimeout: 10\nextra: true\n");

        let mut reconciler = fx.reconciler();
        reconciler.run_cycle();
        assert_eq!(fx.published(), render("timeout: 5\n"));
    }

    #[test]
    fn test_comment_only_fragment_changes_nothing() {
        let fx = Fixture::new();
        fx.fragment("a.yml", "timeout: 5\n");
        fx.fragment("b.yml", "# placeholder\n");

        let mut reconciler = fx.reconciler();
        reconciler.run_cycle();
        assert_eq!(fx.published(), render("timeout: 5\n"));
    }

    #[test]
    fn test_fold_skips_unreadable_fragment() {
        let fx = Fixture::new();
        fx.fragment("a.yml", "timeout: 5\n");
        let paths =
            vec![fx.dir.path().join("conf.d/a.yml"), fx.dir.path().join("conf.d/missing.yml")];
        assert_eq!(
            fold_fragments(&paths),
            Tree::from_yaml(serde_yaml::from_str("timeout: 5\n").expect("yaml")).expect("tree")
        );
    }
}
