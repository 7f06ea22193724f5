//! Path-indexed, partially populated mirror of adapter state.
//!
//! Nodes live in a flat map keyed by path. Each node records its parent key
//! and the keys of its children, so lookups are O(1) and upward walks follow
//! parent keys without any owning back-edges.
//!
//! The tree only knows what has been listed or fetched. [`Tree::insert`] and
//! [`Tree::insert_many`] answer `None` when the target directory is unknown;
//! resolving the parent chain is the caller's job.

mod node;

use std::collections::HashMap;

use tracing::trace;

pub use node::Node;

use crate::path::{dir_name, is_descendant};
use crate::types::{EntryStatus, Head, StatusPatch};

#[derive(Debug, Clone)]
pub struct Tree {
    root: String,
    nodes: HashMap<String, Node>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Tree {
    /// Creates a tree holding only a data-less root node.
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let mut nodes = HashMap::new();
        nodes.insert(root.clone(), Node::new(root.clone(), None, None));
        Self { root, nodes }
    }

    pub fn root_path(&self) -> &str {
        &self.root
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(&self.root)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only a data-less root is left.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.root().is_some_and(Node::is_placeholder)
    }

    pub fn find(&self, path: &str) -> Option<&Node> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Children of `path` in path order; empty if the node is unknown.
    pub fn children(&self, path: &str) -> Vec<&Node> {
        self.nodes
            .get(path)
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|child| self.nodes.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parent keys of `path`, nearest first.
    pub fn ancestors(&self, path: &str) -> Vec<&str> {
        let mut out = Vec::new();
        let mut cursor = self.nodes.get(path).and_then(|node| node.parent.as_deref());
        while let Some(parent) = cursor {
            out.push(parent);
            cursor = self.nodes.get(parent).and_then(|node| node.parent.as_deref());
        }
        out
    }

    /// Binds `head` below `dir`, creating the child on first sight and
    /// overwriting its data afterwards.
    ///
    /// With `dir == None` the head is bound to the root slot; the head must
    /// then address the root. Returns `None` if `dir` is not in the tree.
    pub fn insert(&mut self, dir: Option<&str>, head: Head) -> Option<&Node> {
        let Some(dir) = dir else {
            if head.path != self.root {
                trace!(path = %head.path, root = %self.root, "head without directory is not the root");
                return None;
            }
            let root = self.nodes.get_mut(&self.root)?;
            root.data = Some(head);
            return Some(&*root);
        };
        let path = self.attach(dir, head)?;
        self.nodes.get(&path)
    }

    /// Applies one page of heads below `dir` in a single pass.
    ///
    /// Existing children not in `heads` are kept. A page always belongs to
    /// a concrete directory, so `dir == None` answers `None`.
    pub fn insert_many(&mut self, dir: Option<&str>, heads: Vec<Head>) -> Option<Vec<&Node>> {
        let dir = dir?;
        if !self.nodes.contains_key(dir) {
            return None;
        }
        let paths: Vec<String> = heads
            .into_iter()
            .filter_map(|head| self.attach(dir, head))
            .collect();
        Some(paths.iter().filter_map(|path| self.nodes.get(path)).collect())
    }

    /// Makes sure a node exists at `dir`, creating data-less placeholders
    /// along the path-derived ancestor chain where needed.
    ///
    /// Answers `None` for paths outside the root.
    pub fn ensure_dir(&mut self, dir: &str) -> Option<&Node> {
        if !self.covers(dir) {
            trace!(%dir, root = %self.root, "directory outside the root");
            return None;
        }
        let mut missing = Vec::new();
        let mut cursor = Some(dir.to_string());
        let anchor = loop {
            match cursor {
                Some(path) if self.nodes.contains_key(&path) => break path,
                Some(path) => {
                    cursor = dir_name(&path);
                    missing.push(path);
                }
                None => return None,
            }
        };

        let mut parent = anchor;
        for path in missing.into_iter().rev() {
            trace!(%path, %parent, "placeholder node");
            self.nodes
                .insert(path.clone(), Node::new(path.clone(), None, Some(parent.clone())));
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.children.insert(path.clone());
            }
            parent = path;
        }
        self.nodes.get(dir)
    }

    /// Clears the root's data and status, or detaches any other node with
    /// its whole subtree. Returns false if `path` is unknown.
    pub fn remove(&mut self, path: &str) -> bool {
        if path == self.root {
            if let Some(root) = self.nodes.get_mut(&self.root) {
                root.clear();
            }
            return true;
        }
        self.detach(path)
    }

    /// Removes each path independently; true if at least one was removed.
    pub fn remove_many<S: AsRef<str>>(&mut self, paths: &[S]) -> bool {
        paths
            .iter()
            .fold(false, |removed, path| self.remove(path.as_ref()) || removed)
    }

    /// Detaches immediate children of `dir` by key. Keys that are not
    /// children of `dir` are ignored. Returns the number detached.
    pub fn remove_child<S: AsRef<str>>(&mut self, dir: &str, paths: &[S]) -> usize {
        let mut count = 0;
        for path in paths {
            let path = path.as_ref();
            if self.nodes.get(dir).is_some_and(|node| node.has_child(path)) && self.detach(path)
            {
                count += 1;
            }
        }
        count
    }

    /// Detaches every child of `dir` for which `keep` answers false.
    pub fn retain_children(&mut self, dir: &str, keep: impl Fn(&str) -> bool) -> Vec<String> {
        let stale: Vec<String> = match self.nodes.get(dir) {
            Some(node) => node
                .children
                .iter()
                .filter(|child| !keep(child.as_str()))
                .cloned()
                .collect(),
            None => return Vec::new(),
        };
        for path in &stale {
            self.detach(path);
        }
        stale
    }

    /// Merges `patch` into the status of `path`.
    pub fn update_status(&mut self, path: &str, patch: &StatusPatch) -> Option<&EntryStatus> {
        let node = self.nodes.get_mut(path)?;
        node.status.apply(patch);
        Some(&node.status)
    }

    /// Independent copy of the subtree rooted at `path`.
    pub fn subtree(&self, path: &str) -> Option<Tree> {
        let mut nodes = HashMap::new();
        let mut stack = vec![path.to_string()];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.children.iter().cloned());
                nodes.insert(current, node.clone());
            }
        }
        nodes.get_mut(path)?.parent = None;
        Some(Tree {
            root: path.to_string(),
            nodes,
        })
    }

    /// Checks the structural invariants: keys match node paths and head
    /// paths, every key lies at or below the root, parent and child links
    /// agree, and every node reaches the root.
    pub fn is_consistent(&self) -> bool {
        self.nodes.iter().all(|(key, node)| {
            let keyed = node.path == *key
                && self.covers(key)
                && node.data.as_ref().is_none_or(|head| head.path == *key);
            let linked = match node.parent.as_deref() {
                None => *key == self.root,
                Some(parent) => self
                    .nodes
                    .get(parent)
                    .is_some_and(|p| p.children.contains(key)),
            };
            let children_linked = node.children.iter().all(|child| {
                self.nodes
                    .get(child)
                    .is_some_and(|c| c.parent.as_deref() == Some(key.as_str()))
            });
            let rooted = *key == self.root
                || self.ancestors(key).last().is_some_and(|top| *top == self.root);
            keyed && linked && children_linked && rooted
        })
    }

    fn attach(&mut self, dir: &str, head: Head) -> Option<String> {
        if !self.nodes.contains_key(dir) {
            return None;
        }
        let path = head.path.clone();
        if !is_descendant(&path, &self.root) {
            trace!(%path, root = %self.root, "refusing a node outside the root");
            return None;
        }
        if path == dir || self.ancestors(dir).contains(&path.as_str()) {
            trace!(%path, %dir, "refusing to attach a node below itself");
            return None;
        }

        let previous_parent = self.nodes.get(&path).and_then(|node| node.parent.clone());
        if let Some(old) = previous_parent.as_deref().filter(|old| *old != dir) {
            if let Some(node) = self.nodes.get_mut(old) {
                node.children.remove(&path);
            }
        }

        match self.nodes.get_mut(&path) {
            Some(node) => {
                node.data = Some(head);
                node.parent = Some(dir.to_string());
            }
            None => {
                trace!(%path, %dir, "new node");
                self.nodes.insert(
                    path.clone(),
                    Node::new(path.clone(), Some(head), Some(dir.to_string())),
                );
            }
        }
        if let Some(parent) = self.nodes.get_mut(dir) {
            parent.children.insert(path.clone());
        }
        Some(path)
    }

    fn covers(&self, path: &str) -> bool {
        path == self.root || is_descendant(path, &self.root)
    }

    fn detach(&mut self, path: &str) -> bool {
        let Some(node) = self.nodes.remove(path) else {
            return false;
        };
        if let Some(parent) = node.parent.as_deref().and_then(|p| self.nodes.get_mut(p)) {
            parent.children.remove(path);
        }
        let mut stack: Vec<String> = node.children.into_iter().collect();
        while let Some(child) = stack.pop() {
            if let Some(removed) = self.nodes.remove(&child) {
                stack.extend(removed.children);
            }
        }
        trace!(%path, "detached");
        true
    }
}
