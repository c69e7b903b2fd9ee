use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::{EntrySource, EntryStream};
use crate::error::Result;
use crate::ingest::entry::SourceEntry;

/// Local directory tree, walked fresh on every pass
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl EntrySource for LocalSource {
    /// Walk the root recursively.
    ///
    /// The root itself is not emitted. Anything whose base name starts with a
    /// dot is skipped, and hidden directories are not descended into. Entries
    /// come out in file-name order within each directory.
    fn entries(&self) -> Result<EntryStream> {
        log::info!("Reading local directory: {}", self.root.display());

        let root = self.root.clone();
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry));

        let stream = walker.filter_map(move |entry| -> Option<Result<SourceEntry>> {
            match entry {
                Ok(entry) => to_source_entry(&root, &entry).map(Ok),
                Err(e) => Some(Err(e.into())),
            }
        });

        Ok(Box::new(stream))
    }

    fn describe(&self) -> String {
        format!("local {}", self.root.display())
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(segments.join("/"))
}

/// Turn a walk entry into a source entry. Unreadable files and anything that is
/// neither a regular file nor a directory are skipped.
fn to_source_entry(root: &Path, entry: &DirEntry) -> Option<SourceEntry> {
    let path = entry.path();
    let Some(relative) = relative_path(root, path) else {
        log::warn!("Skipping {} (outside of {})", path.display(), root.display());
        return None;
    };

    let file_type = entry.file_type();
    if file_type.is_dir() {
        return Some(SourceEntry::directory(relative));
    }

    if !file_type.is_file() {
        log::debug!("Skipping non-regular entry {}", relative);
        return None;
    }

    match std::fs::read(path) {
        Ok(content) => Some(SourceEntry::file(relative, content)),
        Err(e) => {
            log::warn!("error reading {}: {}", path.display(), e);
            None
        }
    }
}
