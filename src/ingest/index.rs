//! Site indexes: pages, directory hierarchy, navigation tree and topics.
//!
//! A [`SiteIndexBuilder`] is created empty for every pass, filled by the
//! coordinator and turned into an immutable [`IndexSet`] by `finalize()`.
//! Nothing is ever carried over from a previous pass.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::error::{FikiError, Result};

/// Name of the synthetic tree root
pub const TREE_ROOT: &str = "root";

/// Node of the navigation tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub name: String,
    /// Page key (for pages) or directory key (for intermediates)
    pub path: String,
    pub is_page: bool,
    pub children: BTreeMap<String, TreeNode>,
}

impl TreeNode {
    pub fn new(name: impl Into<String>, path: impl Into<String>, is_page: bool) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_page,
            children: BTreeMap::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(TREE_ROOT, "", false)
    }

    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children.get(name)
    }

    /// Walk a slash separated path from this node
    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |node, segment| node.children.get(segment))
    }

    /// Number of page leaves below this node
    pub fn page_count(&self) -> usize {
        self.children
            .values()
            .map(|c| usize::from(c.is_page) + c.page_count())
            .sum()
    }
}

impl Default for TreeNode {
    fn default() -> Self {
        Self::root()
    }
}

/// Completed, read-only index set of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexSet {
    pages: HashMap<String, String>,
    hierarchy: HashMap<String, Vec<String>>,
    topics: BTreeSet<String>,
    tree: TreeNode,
}

impl IndexSet {
    /// Rendered HTML of a page
    pub fn lookup_page(&self, key: &str) -> Option<&str> {
        self.pages.get(key).map(String::as_str)
    }

    /// Immediate children of a directory, in discovery order
    pub fn children_of(&self, dir: &str) -> &[String] {
        self.hierarchy.get(dir).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the directory has at least one listed child
    pub fn has_children(&self, dir: &str) -> bool {
        self.hierarchy.contains_key(dir)
    }

    pub fn topics(&self) -> &BTreeSet<String> {
        &self.topics
    }

    pub fn tree(&self) -> &TreeNode {
        &self.tree
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn directory_count(&self) -> usize {
        self.hierarchy.len()
    }

    /// Page keys in sorted order
    pub fn page_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.pages.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

/// Mutable index state for one pass
#[derive(Debug, Default)]
pub struct SiteIndexBuilder {
    pages: HashMap<String, String>,
    hierarchy: HashMap<String, Vec<String>>,
    seen_children: HashSet<(String, String)>,
    topics: BTreeSet<String>,
    tree: TreeNode,
}

impl SiteIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rendered page. A key can only be added once per pass.
    pub fn add_page(&mut self, key: impl Into<String>, html: impl Into<String>) -> Result<()> {
        let key = key.into();
        if self.pages.contains_key(&key) {
            return Err(FikiError::DuplicatePage(key));
        }
        self.pages.insert(key, html.into());
        Ok(())
    }

    /// Append a child name to a directory's listing
    pub fn add_hierarchy_child(&mut self, parent: &str, child: impl Into<String>) -> Result<()> {
        let child = child.into();
        if !self.seen_children.insert((parent.to_string(), child.clone())) {
            return Err(FikiError::DuplicateChild {
                parent: parent.to_string(),
                child,
            });
        }

        self.hierarchy
            .entry(parent.to_string())
            .or_default()
            .push(child);
        Ok(())
    }

    /// Insert a page leaf `name` under directory `parent`, creating the
    /// intermediate directory nodes on the way. An existing node with the same
    /// name is turned into a page and keeps its children.
    pub fn add_tree_leaf(&mut self, parent: &str, name: &str) {
        let mut node = &mut self.tree;
        let mut node_path = String::new();

        for segment in parent.split('/').filter(|s| !s.is_empty()) {
            if !node_path.is_empty() {
                node_path.push('/');
            }
            node_path.push_str(segment);

            node = node
                .children
                .entry(segment.to_string())
                .or_insert_with(|| TreeNode::new(segment, node_path.clone(), false));
        }

        let leaf_path = if node_path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", node_path, name)
        };

        node.children
            .entry(name.to_string())
            .and_modify(|existing| existing.is_page = true)
            .or_insert_with(|| TreeNode::new(name, leaf_path, true));
    }

    /// Record a root-level directory
    pub fn register_topic(&mut self, name: impl Into<String>) {
        self.topics.insert(name.into());
    }

    /// Freeze the pass into an immutable index set
    pub fn finalize(self) -> IndexSet {
        IndexSet {
            pages: self.pages,
            hierarchy: self.hierarchy,
            topics: self.topics,
            tree: self.tree,
        }
    }
}
