//! Ingestion passes: source → classifier → builder → atomic publish.
//!
//! A pass moves through `Idle → Fetching → Classifying → Finalizing → Ready`
//! and back to `Idle`. Errors from the source or a consistency violation send
//! it to `Failed` instead; the partial index set is dropped and the live
//! snapshot is left alone. Only one pass runs at a time; a second request while
//! one is in flight is rejected with [`FikiError::PassInProgress`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{FikiError, Result};
use crate::ingest::classifier::{classify, Classification, Listing};
use crate::ingest::entry::SourceEntry;
use crate::ingest::index::{IndexSet, SiteIndexBuilder};
use crate::ingest::live::LiveIndex;
use crate::ingest::markdown::{MarkdownRenderer, Renderer};
use crate::ingest::source::EntrySource;

/// Phase of the ingestion state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassState {
    Idle,
    Fetching,
    Classifying,
    Finalizing,
    Ready,
    Failed,
}

/// Counters collected during a pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassStats {
    pub entries: usize,
    pub ignored: usize,
    pub pages: usize,
    pub directories: usize,
    pub topics: usize,
}

/// Outcome of the most recent finished pass
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub source: String,
    pub stats: PassStats,
    pub elapsed_ms: u64,
    pub finished_at: DateTime<Utc>,
    /// Live generation published by this pass, if it succeeded
    pub generation: Option<u64>,
    pub error: Option<String>,
}

impl PassReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

pub struct IngestionCoordinator {
    source: Box<dyn EntrySource>,
    renderer: Box<dyn Renderer>,
    live: Arc<LiveIndex>,
    state: Mutex<PassState>,
    pass_guard: Mutex<()>,
    abandon: AtomicBool,
    last_report: Mutex<Option<PassReport>>,
}

impl IngestionCoordinator {
    pub fn new(source: Box<dyn EntrySource>, live: Arc<LiveIndex>) -> Self {
        Self {
            source,
            renderer: Box::new(MarkdownRenderer),
            live,
            state: Mutex::new(PassState::Idle),
            pass_guard: Mutex::new(()),
            abandon: AtomicBool::new(false),
            last_report: Mutex::new(None),
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn live(&self) -> &Arc<LiveIndex> {
        &self.live
    }

    pub fn state(&self) -> PassState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn last_report(&self) -> Option<PassReport> {
        self.last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Ask the running pass to stop before its next entry. It will not publish.
    pub fn abandon(&self) {
        self.abandon.store(true, Ordering::SeqCst);
    }

    /// Run one full pass and publish the result.
    ///
    /// Blocking: the archive fetch and directory walk happen on the calling
    /// thread. From async code use [`spawn_refresh`](Self::spawn_refresh) or
    /// `spawn_blocking`.
    pub fn run_pass(&self) -> Result<Arc<IndexSet>> {
        let _guard = match self.pass_guard.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(FikiError::PassInProgress),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        self.abandon.store(false, Ordering::SeqCst);
        let source = self.source.describe();
        let start = Instant::now();
        log::info!("Starting ingestion pass from {}", source);

        let mut stats = PassStats::default();
        let outcome = self.build(&mut stats);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(index) => {
                let index = Arc::new(index);
                let generation = self.live.publish(Arc::clone(&index));
                self.enter(PassState::Ready);

                log::info!(
                    "{} pages cached, {} topics, {} directories (generation {}, {} ms)",
                    stats.pages,
                    stats.topics,
                    stats.directories,
                    generation,
                    elapsed_ms
                );
                log::debug!("topics: {:?}", index.topics());

                self.record(PassReport {
                    source,
                    stats,
                    elapsed_ms,
                    finished_at: Utc::now(),
                    generation: Some(generation),
                    error: None,
                });
                self.enter(PassState::Idle);
                Ok(index)
            }
            Err(e) => {
                self.enter(PassState::Failed);
                log::warn!(
                    "Ingestion pass from {} failed after {} entries: {}",
                    source,
                    stats.entries,
                    e
                );

                self.record(PassReport {
                    source,
                    stats,
                    elapsed_ms,
                    finished_at: Utc::now(),
                    generation: None,
                    error: Some(e.to_string()),
                });
                self.enter(PassState::Idle);
                Err(e)
            }
        }
    }

    /// Start a pass on a blocking worker and return immediately
    pub fn spawn_refresh(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            if let Err(FikiError::PassInProgress) = coordinator.run_pass() {
                log::info!("Refresh dropped: an ingestion pass is already running");
            }
        })
    }

    fn build(&self, stats: &mut PassStats) -> Result<IndexSet> {
        self.enter(PassState::Fetching);
        let entries = self.source.entries()?;

        self.enter(PassState::Classifying);
        let mut builder = SiteIndexBuilder::new();

        for entry in entries {
            if self.abandon.load(Ordering::SeqCst) {
                return Err(FikiError::PassAbandoned);
            }

            let entry = entry?;
            stats.entries += 1;
            self.apply(&mut builder, &entry, stats)?;
        }

        self.enter(PassState::Finalizing);
        let index = builder.finalize();
        stats.pages = index.page_count();
        stats.directories = index.directory_count();
        stats.topics = index.topics().len();
        Ok(index)
    }

    fn apply(
        &self,
        builder: &mut SiteIndexBuilder,
        entry: &SourceEntry,
        stats: &mut PassStats,
    ) -> Result<()> {
        match classify(entry) {
            Classification::Ignore(reason) => {
                stats.ignored += 1;
                log::debug!("Ignoring {} ({:?})", entry.relative_path, reason);
            }
            Classification::Topic { name } => builder.register_topic(name),
            Classification::HierarchyChild { parent, name } => {
                builder.add_hierarchy_child(&parent, name)?;
            }
            Classification::Page { key, listing } => {
                let html = self.renderer.render(entry.content());
                builder.add_page(key, html)?;

                if let Some(Listing { parent, name }) = listing {
                    builder.add_tree_leaf(&parent, &name);
                    builder.add_hierarchy_child(&parent, name)?;
                }
            }
        }
        Ok(())
    }

    fn enter(&self, next: PassState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        log::debug!("ingestion: {:?} -> {:?}", *state, next);
        *state = next;
    }

    fn record(&self, report: PassReport) {
        *self
            .last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::source::{EntryStream, MemorySource};
    use std::sync::mpsc;
    use std::thread;

    fn coordinator(entries: Vec<SourceEntry>) -> IngestionCoordinator {
        IngestionCoordinator::new(
            Box::new(MemorySource::new(entries)),
            Arc::new(LiveIndex::new()),
        )
    }

    fn wiki() -> Vec<SourceEntry> {
        vec![
            SourceEntry::file("index.md", "# Home"),
            SourceEntry::file("about.md", "# About"),
            SourceEntry::directory("linux"),
            SourceEntry::file("linux/index.md", "# Linux"),
            SourceEntry::directory("linux/tools"),
            SourceEntry::file("linux/tools/tmux.md", "# Tmux"),
            SourceEntry::file("linux/vim.md", "# Vim"),
            SourceEntry::file("linux/screenshot.png", vec![0x89, 0x50, 0x4e, 0x47]),
            SourceEntry::directory("macos"),
            SourceEntry::file("macos/brew.md", "# Brew"),
            SourceEntry::directory(".github"),
            SourceEntry::file(".github/CONTRIBUTING.md", "# Contributing"),
        ]
    }

    #[test]
    fn test_single_index_page() {
        let coordinator = coordinator(vec![SourceEntry::file("index.md", "# Home")]);
        let index = coordinator.run_pass().unwrap();

        assert_eq!(index.lookup_page("index").unwrap().trim_end(), "<h1>Home</h1>");
        assert!(index.topics().is_empty());
        assert!(index.tree().children.is_empty());
        assert!(!index.tree().is_page);
    }

    #[test]
    fn test_topic_with_index_and_page() {
        let coordinator = coordinator(vec![
            SourceEntry::directory("linux"),
            SourceEntry::file("linux/index.md", "# Linux"),
            SourceEntry::file("linux/vim.md", "# Vim"),
        ]);
        let index = coordinator.run_pass().unwrap();

        let topics: Vec<&str> = index.topics().iter().map(String::as_str).collect();
        assert_eq!(topics, vec!["linux"]);
        assert_eq!(index.children_of("linux"), ["vim"]);
        assert!(index.lookup_page("linux/index").is_some());
        assert!(index.lookup_page("linux/vim").is_some());

        let linux = index.tree().child("linux").unwrap();
        assert!(!linux.is_page);
        assert!(linux.child("vim").unwrap().is_page);
        assert!(linux.child("index").is_none());
    }

    #[test]
    fn test_pages_match_markdown_entries() {
        let coordinator = coordinator(wiki());
        let index = coordinator.run_pass().unwrap();

        assert_eq!(
            index.page_keys(),
            vec![
                "about",
                "index",
                "linux/index",
                "linux/tools/tmux",
                "linux/vim",
                "macos/brew",
            ]
        );

        // Every non-index page has a leaf; index pages have none
        for key in index.page_keys() {
            let leaf = index.tree().find(key);
            if key.ends_with("index") {
                assert!(leaf.is_none(), "{} should not be in the tree", key);
            } else {
                assert!(leaf.unwrap().is_page, "{} should be a page leaf", key);
            }
        }
        assert!(!index.tree().find("linux/tools").unwrap().is_page);
    }

    #[test]
    fn test_hierarchy_and_topics() {
        let coordinator = coordinator(wiki());
        let index = coordinator.run_pass().unwrap();

        assert_eq!(index.children_of(""), ["about"]);
        assert_eq!(index.children_of("linux"), ["tools", "vim"]);
        assert_eq!(index.children_of("linux/tools"), ["tmux"]);
        assert_eq!(index.children_of("macos"), ["brew"]);
        assert_eq!(index.directory_count(), 4);

        let topics: Vec<&str> = index.topics().iter().map(String::as_str).collect();
        assert_eq!(topics, vec!["linux", "macos"]);

        let report = coordinator.last_report().unwrap();
        assert!(report.succeeded());
        assert_eq!(report.stats.entries, 12);
        assert_eq!(report.stats.ignored, 3);
        assert_eq!(report.stats.pages, 6);
        assert_eq!(report.generation, Some(1));
    }

    #[test]
    fn test_passes_are_idempotent() {
        let coordinator = coordinator(wiki());
        let first = coordinator.run_pass().unwrap();
        let second = coordinator.run_pass().unwrap();

        assert_eq!(*first, *second);
        assert_eq!(second.children_of("linux"), ["tools", "vim"]);
        assert_eq!(coordinator.live().generation(), 2);
        assert_eq!(coordinator.state(), PassState::Idle);
    }

    #[test]
    fn test_duplicate_page_aborts_pass() {
        let coordinator = coordinator(vec![
            SourceEntry::file("index.md", "# One"),
            SourceEntry::file("index.md", "# Two"),
        ]);

        let err = coordinator.run_pass().unwrap_err();
        assert!(err.is_consistency_violation());
        assert_eq!(coordinator.live().generation(), 0);
        assert!(coordinator.live().load().lookup_page("index").is_none());
        assert!(!coordinator.last_report().unwrap().succeeded());
    }

    /// Succeeds until `fail` is set, then breaks halfway through the stream.
    struct FlakySource {
        fail: Arc<AtomicBool>,
    }

    impl EntrySource for FlakySource {
        fn entries(&self) -> Result<EntryStream> {
            let mut entries: Vec<Result<SourceEntry>> = vec![
                Ok(SourceEntry::file("index.md", "# Home")),
                Ok(SourceEntry::directory("linux")),
            ];
            if self.fail.load(Ordering::SeqCst) {
                entries.push(Err(FikiError::Archive("unexpected end of file".to_string())));
            }
            entries.push(Ok(SourceEntry::file("linux/vim.md", "# Vim")));
            Ok(Box::new(entries.into_iter()))
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    #[test]
    fn test_failed_refresh_keeps_previous_snapshot() {
        let fail = Arc::new(AtomicBool::new(false));
        let live = Arc::new(LiveIndex::new());
        let coordinator = IngestionCoordinator::new(
            Box::new(FlakySource {
                fail: Arc::clone(&fail),
            }),
            Arc::clone(&live),
        );

        coordinator.run_pass().unwrap();
        let before = live.load();

        fail.store(true, Ordering::SeqCst);
        let err = coordinator.run_pass().unwrap_err();
        assert!(matches!(err, FikiError::Archive(_)));

        let after = live.load();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.lookup_page("linux/vim"), before.lookup_page("linux/vim"));
        assert_eq!(live.generation(), 1);
        assert_eq!(coordinator.state(), PassState::Idle);

        let report = coordinator.last_report().unwrap();
        assert!(report.error.unwrap().contains("unexpected end of file"));
        assert_eq!(report.generation, None);
    }

    /// Signals when a pass has opened it, then holds the stream until released.
    struct GatedSource {
        started: Mutex<mpsc::Sender<()>>,
        release: Arc<Mutex<mpsc::Receiver<()>>>,
    }

    impl EntrySource for GatedSource {
        fn entries(&self) -> Result<EntryStream> {
            self.started.lock().unwrap().send(()).unwrap();

            let mut gate = Some(Arc::clone(&self.release));
            let wait = std::iter::from_fn(move || -> Option<Result<SourceEntry>> {
                if let Some(release) = gate.take() {
                    release.lock().unwrap().recv().unwrap();
                }
                None
            });
            let entries = vec![Ok(SourceEntry::file("index.md", "# Home"))];
            Ok(Box::new(wait.chain(entries)))
        }

        fn describe(&self) -> String {
            "gated".to_string()
        }
    }

    fn gated() -> (Arc<IngestionCoordinator>, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let source = GatedSource {
            started: Mutex::new(started_tx),
            release: Arc::new(Mutex::new(release_rx)),
        };
        let coordinator = Arc::new(IngestionCoordinator::new(
            Box::new(source),
            Arc::new(LiveIndex::new()),
        ));
        (coordinator, started_rx, release_tx)
    }

    #[test]
    fn test_concurrent_pass_rejected() {
        let (coordinator, started, release) = gated();

        let running = Arc::clone(&coordinator);
        let handle = thread::spawn(move || running.run_pass());

        started.recv().unwrap();
        assert!(matches!(
            coordinator.state(),
            PassState::Fetching | PassState::Classifying
        ));
        assert!(matches!(coordinator.run_pass(), Err(FikiError::PassInProgress)));

        release.send(()).unwrap();
        let index = handle.join().unwrap().unwrap();
        assert!(index.lookup_page("index").is_some());
        assert_eq!(coordinator.live().generation(), 1);
    }

    #[test]
    fn test_abandoned_pass_never_publishes() {
        let (coordinator, started, release) = gated();

        let running = Arc::clone(&coordinator);
        let handle = thread::spawn(move || running.run_pass());

        started.recv().unwrap();
        coordinator.abandon();
        release.send(()).unwrap();

        let result = handle.join().unwrap();
        assert!(matches!(result, Err(FikiError::PassAbandoned)));
        assert_eq!(coordinator.live().generation(), 0);
        assert!(coordinator.live().load().lookup_page("index").is_none());
    }

    #[test]
    fn test_page_and_directory_with_same_name_abort_pass() {
        let coordinator = coordinator(vec![
            SourceEntry::directory("linux"),
            SourceEntry::file("linux/vim.md", "# Vim"),
            SourceEntry::directory("linux/vim"),
            SourceEntry::file("linux/vim/plugins.md", "# Plugins"),
        ]);

        let err = coordinator.run_pass().unwrap_err();
        assert!(matches!(
            &err,
            FikiError::DuplicateChild { parent, child } if parent == "linux" && child == "vim"
        ));
        assert!(err.is_consistency_violation());
        assert_eq!(coordinator.live().generation(), 0);
        assert!(coordinator.live().load().lookup_page("linux/vim").is_none());
        assert_eq!(coordinator.state(), PassState::Idle);
    }

    struct RawRenderer;

    impl Renderer for RawRenderer {
        fn render(&self, raw: &[u8]) -> String {
            String::from_utf8_lossy(raw).into_owned()
        }
    }

    #[test]
    fn test_custom_renderer() {
        let coordinator = coordinator(vec![SourceEntry::file("index.md", "# Home")])
            .with_renderer(Box::new(RawRenderer));

        let index = coordinator.run_pass().unwrap();
        assert_eq!(index.lookup_page("index"), Some("# Home"));
    }
}
