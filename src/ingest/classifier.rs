//! Entry classification: decides what a single [`SourceEntry`] contributes to
//! the site indexes. Both backends go through the same rules.

use crate::ingest::entry::{is_hidden_path, split_parent, SourceEntry, MARKDOWN_EXT};

/// Base name of a directory's own page
pub const INDEX_PAGE: &str = "index";

/// Why an entry contributes nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Hidden,
    NotMarkdown,
}

/// Where a non-index page is listed in navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Containing directory key; the content root is `""`
    pub parent: String,
    pub name: String,
}

/// Classification of one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Ignore(IgnoreReason),
    /// Root-level directory
    Topic { name: String },
    /// Nested directory, listed under its parent
    HierarchyChild { parent: String, name: String },
    /// Markdown page. Index pages have no listing: they are their directory's
    /// own page, never one of its children.
    Page { key: String, listing: Option<Listing> },
}

/// Classify one entry.
///
/// Rules, in order: hidden paths are ignored; directories are topics at the
/// root and hierarchy children below it; files without the `.md` extension are
/// ignored; everything else is a page keyed by its path minus the extension.
pub fn classify(entry: &SourceEntry) -> Classification {
    let path = entry.relative_path.as_str();

    if path.is_empty() || is_hidden_path(path) {
        return Classification::Ignore(IgnoreReason::Hidden);
    }

    if entry.is_dir() {
        return match path.rsplit_once('/') {
            None => Classification::Topic {
                name: path.to_string(),
            },
            Some((parent, name)) => Classification::HierarchyChild {
                parent: parent.to_string(),
                name: name.to_string(),
            },
        };
    }

    let Some(key) = path.strip_suffix(MARKDOWN_EXT) else {
        return Classification::Ignore(IgnoreReason::NotMarkdown);
    };

    let (parent, name) = split_parent(key);
    let listing = if name == INDEX_PAGE {
        None
    } else {
        Some(Listing {
            parent: parent.to_string(),
            name: name.to_string(),
        })
    };

    Classification::Page {
        key: key.to_string(),
        listing,
    }
}
