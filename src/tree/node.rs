//! A single cache entry.

use std::collections::BTreeSet;

use crate::types::{EntryStatus, Head};

/// One node of the tree cache, addressed by its path.
///
/// `data == None` marks a placeholder: the entry is known to exist (or
/// is an ancestor of something known) but its head has not been fetched,
/// or it was cleared by a removal.
#[derive(Debug, Clone)]
pub struct Node {
    pub(super) path: String,
    pub(super) data: Option<Head>,
    pub(super) status: EntryStatus,
    pub(super) parent: Option<String>,
    pub(super) children: BTreeSet<String>,
}

impl Node {
    pub(super) fn new(path: String, data: Option<Head>, parent: Option<String>) -> Self {
        Self {
            path,
            data,
            status: EntryStatus::default(),
            parent,
            children: BTreeSet::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn data(&self) -> Option<&Head> {
        self.data.as_ref()
    }

    pub fn status(&self) -> &EntryStatus {
        &self.status
    }

    /// Key of the parent node, `None` for the root.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Child keys in path order.
    pub fn children(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(String::as_str)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn has_child(&self, path: &str) -> bool {
        self.children.contains(path)
    }

    pub fn is_dir(&self) -> bool {
        self.data.as_ref().is_some_and(|head| head.is_dir)
    }

    pub fn is_placeholder(&self) -> bool {
        self.data.is_none()
    }

    pub(super) fn clear(&mut self) {
        self.data = None;
        self.status = EntryStatus::default();
    }
}
