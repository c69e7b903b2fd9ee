//! Entry sources: the one capability the ingestion pipeline needs from a
//! content backend, a lazy stream of [`SourceEntry`] values.

pub mod archive;
pub mod local;

use crate::config::{SourceConfig, SourceKind};
use crate::error::{FikiError, Result};
use crate::ingest::entry::SourceEntry;

pub use archive::{archive_entries, ArchiveSource};
pub use local::LocalSource;

/// Lazy, finite stream of entries for one pass. Errors abort the pass.
pub type EntryStream = Box<dyn Iterator<Item = Result<SourceEntry>> + Send>;

/// Trait for content backends
pub trait EntrySource: Send + Sync {
    /// Start a fresh fetch/walk. Every call re-reads the backend.
    fn entries(&self) -> Result<EntryStream>;

    /// Human readable origin, for logs
    fn describe(&self) -> String;
}

/// Fixed in-memory entry list
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: Vec<SourceEntry>,
}

impl MemorySource {
    pub fn new(entries: Vec<SourceEntry>) -> Self {
        Self { entries }
    }
}

impl EntrySource for MemorySource {
    fn entries(&self) -> Result<EntryStream> {
        let stream = self.entries.clone().into_iter().map(Ok::<_, FikiError>);
        Ok(Box::new(stream))
    }

    fn describe(&self) -> String {
        format!("memory ({} entries)", self.entries.len())
    }
}

/// Build the configured backend
pub fn from_config(config: &SourceConfig) -> Result<Box<dyn EntrySource>> {
    match config.kind {
        SourceKind::Archive => Ok(Box::new(ArchiveSource::new(
            config.tarball_url(),
            config.fetch_timeout(),
        ))),
        SourceKind::Local => {
            let root = config.local_path.clone().ok_or_else(|| {
                FikiError::Config("source.local_path is required for a local source".to_string())
            })?;
            Ok(Box::new(LocalSource::new(root)))
        }
    }
}
