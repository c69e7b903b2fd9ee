//! Content entries as produced by an [`EntrySource`](super::source::EntrySource),
//! plus the path helpers shared by both backends.

/// Markdown file extension, including the dot
pub const MARKDOWN_EXT: &str = ".md";

/// Kind of a source entry. Sources never emit anything other than these two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    File(Vec<u8>),
    Directory,
}

/// One entry of a content tree, addressed relative to the content root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Forward-slash separated, no leading or trailing slash
    pub relative_path: String,
    pub kind: EntryKind,
}

impl SourceEntry {
    pub fn file(relative_path: impl AsRef<str>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            relative_path: normalize_path(relative_path.as_ref()),
            kind: EntryKind::File(content.into()),
        }
    }

    pub fn directory(relative_path: impl AsRef<str>) -> Self {
        Self {
            relative_path: normalize_path(relative_path.as_ref()),
            kind: EntryKind::Directory,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    /// Raw bytes of a file entry; empty for directories
    pub fn content(&self) -> &[u8] {
        match &self.kind {
            EntryKind::File(bytes) => bytes,
            EntryKind::Directory => &[],
        }
    }
}

/// Normalize separators to `/` and drop empty segments, so `a\\b/` and `/a//b`
/// both become `a/b`.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Strip the archive's wrapper directory (`owner-repo-sha/`) from a tar path.
///
/// Returns `None` for the wrapper itself and for anything with no segment left.
pub fn strip_root_segment(path: &str) -> Option<String> {
    let normalized = normalize_path(path);
    let (_, rest) = normalized.split_once('/')?;
    if rest.is_empty() {
        return None;
    }
    Some(rest.to_string())
}

/// Split `a/b/c` into (`a/b`, `c`). Root-level paths have the empty parent.
pub fn split_parent(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

/// Whether any segment of the path is hidden (starts with a dot)
pub fn is_hidden_path(path: &str) -> bool {
    path.split('/').any(|segment| segment.starts_with('.'))
}
