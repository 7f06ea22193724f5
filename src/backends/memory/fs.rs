//! Core MemoryAdapter implementation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::action::Capabilities;
use crate::adapter::Adapter;
use crate::error::{HfsError, HfsResult};
use crate::path::{dir_name, is_descendant, join, normalize_path};
use crate::types::{
    CopyOptions, DeleteOptions, GetOptions, Head, HeadPatch, ListOptions, ListPage, MoveOptions,
    PostOptions, PutHeadOptions, PutOptions,
};

use super::node::Node;

type Nodes<D> = HashMap<String, Node<D>>;

/// In-memory adapter holding heads and data in a flat path map.
///
/// Clones share the same storage. Every operation is implemented; use
/// [`MemoryAdapter::with_capabilities`] to advertise less.
#[derive(Debug, Clone)]
pub struct MemoryAdapter<D = Vec<u8>> {
    nodes: Arc<RwLock<Nodes<D>>>,
    capabilities: Capabilities,
}

impl<D: Clone + Send + Sync + 'static> MemoryAdapter<D> {
    /// Create an adapter holding only the root directory
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), Node::new_dir(Head::dir("/")));

        Self {
            nodes: Arc::new(RwLock::new(nodes)),
            capabilities: Capabilities::all(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Stores `head` directly, creating missing parent directories.
    /// Replaces whatever was stored at the same path.
    pub fn insert(&self, head: Head, data: Option<D>) -> HfsResult<()> {
        let path = normalize_path(&head.path)?;
        let mut nodes = self.nodes.write();

        let mut missing = Vec::new();
        let mut cursor = dir_name(&path);
        while let Some(dir) = cursor {
            match nodes.get(&dir) {
                Some(node) if node.is_dir() => break,
                Some(_) => return Err(HfsError::NotADirectory(dir)),
                None => {
                    cursor = dir_name(&dir);
                    missing.push(dir);
                }
            }
        }
        for dir in missing {
            nodes.insert(dir.clone(), Node::new_dir(Head::dir(dir)));
        }

        let head = Head { path: path.clone(), ..head };
        nodes.insert(path, Node::from_head(head, data));
        Ok(())
    }

    pub fn contains(&self, path: &str) -> bool {
        normalize_path(path).is_ok_and(|path| self.nodes.read().contains_key(&path))
    }

    /// Number of stored entries, root included
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// True when only the root is left.
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    /// Stored data of a file, bypassing capability checks.
    pub fn data(&self, path: &str) -> Option<D> {
        let path = normalize_path(path).ok()?;
        self.nodes.read().get(&path)?.data().cloned()
    }

    /// Number of `put` calls a file has seen.
    pub fn version(&self, path: &str) -> Option<u32> {
        let path = normalize_path(path).ok()?;
        self.nodes.read().get(&path).map(Node::version)
    }

    /// Immediate children of a directory, in path order
    fn get_dir_children(dir_path: &str, nodes: &Nodes<D>) -> Vec<String> {
        let mut children: Vec<String> = nodes
            .keys()
            .filter(|p| is_descendant(p, dir_path))
            // Only immediate children (no nested paths)
            .filter(|p| dir_name(p).as_deref() == Some(dir_path))
            .cloned()
            .collect();
        children.sort();
        children
    }

    /// Every stored path strictly below `dir_path`
    fn descendants(dir_path: &str, nodes: &Nodes<D>) -> Vec<String> {
        nodes
            .keys()
            .filter(|p| is_descendant(p, dir_path))
            .cloned()
            .collect()
    }

    fn ensure_parent_exists(path: &str, nodes: &Nodes<D>) -> HfsResult<()> {
        let Some(parent) = dir_name(path) else {
            return Ok(());
        };

        match nodes.get(&parent) {
            Some(node) if node.is_dir() => Ok(()),
            Some(_) => Err(HfsError::NotADirectory(parent)),
            None => Err(HfsError::NotFound(format!("parent directory: {}", parent))),
        }
    }

    /// Runs `apply` against a copy of the store and commits the copy only
    /// if every step succeeded.
    fn atomically<T>(&self, apply: impl FnOnce(&mut Nodes<D>) -> HfsResult<T>) -> HfsResult<T> {
        let mut nodes = self.nodes.write();
        let mut staged = nodes.clone();
        let out = apply(&mut staged)?;
        *nodes = staged;
        Ok(out)
    }

    fn remove_entry(path: &str, options: &DeleteOptions, nodes: &mut Nodes<D>) -> HfsResult<()> {
        // Can't remove root
        if path == "/" {
            return Err(HfsError::PermissionDenied("cannot remove root".into()));
        }

        let Some(node) = nodes.get(path) else {
            return if options.force {
                Ok(())
            } else {
                Err(HfsError::NotFound(path.to_string()))
            };
        };

        if node.is_dir() && !options.recursive && !Self::get_dir_children(path, nodes).is_empty() {
            return Err(HfsError::InvalidArguments("directory not empty".into()));
        }
        Self::remove_tree(path, nodes);
        Ok(())
    }

    fn remove_tree(path: &str, nodes: &mut Nodes<D>) {
        for child in Self::descendants(path, nodes) {
            nodes.remove(&child);
        }
        nodes.remove(path);
    }

    fn create(
        path: &str,
        head: &Head,
        data: Option<D>,
        overwrite: bool,
        nodes: &mut Nodes<D>,
    ) -> HfsResult<Head> {
        if path == "/" {
            return Err(HfsError::PermissionDenied("cannot replace root".into()));
        }
        Self::ensure_parent_exists(path, nodes)?;

        if nodes.contains_key(path) {
            if !overwrite {
                return Err(HfsError::AlreadyExists(path.to_string()));
            }
            Self::remove_tree(path, nodes);
        }

        let head = Head {
            path: path.to_string(),
            ..head.clone()
        };
        nodes.insert(path.to_string(), Node::from_head(head.clone(), data));
        Ok(head)
    }

    /// Copies (or moves, with `keep_source == false`) the subtree at `from`
    /// to `to` and returns the head stored at `to`.
    fn relocate(
        from: &str,
        to: &str,
        overwrite: bool,
        keep_source: bool,
        nodes: &mut Nodes<D>,
    ) -> HfsResult<Head> {
        if from == "/" {
            return Err(HfsError::PermissionDenied("cannot relocate root".into()));
        }
        if from == to {
            return nodes
                .get(from)
                .map(|node| node.head().clone())
                .ok_or_else(|| HfsError::NotFound(from.to_string()));
        }
        if is_descendant(to, from) || is_descendant(from, to) {
            return Err(HfsError::InvalidArguments(format!(
                "cannot relocate {} to {}",
                from, to
            )));
        }
        if !nodes.contains_key(from) {
            return Err(HfsError::NotFound(from.to_string()));
        }
        Self::ensure_parent_exists(to, nodes)?;

        if nodes.contains_key(to) {
            if !overwrite {
                return Err(HfsError::AlreadyExists(to.to_string()));
            }
            Self::remove_tree(to, nodes);
        }

        let mut sources = vec![from.to_string()];
        sources.extend(Self::descendants(from, nodes));
        for source in sources {
            let target = if source == from {
                to.to_string()
            } else {
                join(to, &source[from.len()..])
            };
            let node = if keep_source {
                nodes.get(&source).cloned()
            } else {
                nodes.remove(&source)
            };
            if let Some(node) = node {
                trace!(%source, %target, keep_source, "relocated");
                nodes.insert(target.clone(), node.relocated(&target));
            }
        }

        nodes
            .get(to)
            .map(|node| node.head().clone())
            .ok_or_else(|| HfsError::NotFound(to.to_string()))
    }

    fn patch_head(
        path: &str,
        patch: &HeadPatch,
        options: &PutHeadOptions,
        nodes: &mut Nodes<D>,
    ) -> HfsResult<Head> {
        let node = nodes
            .get_mut(path)
            .ok_or_else(|| HfsError::NotFound(path.to_string()))?;
        let updated = node.head().apply(patch, options.strategy);
        if updated.is_dir != node.is_dir() {
            return Err(HfsError::InvalidArguments(format!(
                "cannot change the kind of {}",
                path
            )));
        }
        node.set_head(updated.clone());
        Ok(updated)
    }

    fn relocate_many(
        from: &[String],
        to: &[String],
        overwrite: bool,
        keep_source: bool,
        nodes: &mut Nodes<D>,
    ) -> HfsResult<Vec<Head>> {
        if from.len() != to.len() {
            return Err(HfsError::length_mismatch());
        }
        from.iter()
            .zip(to)
            .map(|(from, to)| {
                let from = normalize_path(from)?;
                let to = normalize_path(to)?;
                Self::relocate(&from, &to, overwrite, keep_source, nodes)
            })
            .collect()
    }
}

impl<D: Clone + Send + Sync + 'static> Default for MemoryAdapter<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<D: Clone + Send + Sync + 'static> Adapter for MemoryAdapter<D> {
    type Data = D;

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn list(&self, path: &str, options: &ListOptions) -> HfsResult<ListPage> {
        let path = normalize_path(path)?;
        let nodes = self.nodes.read();

        let node = nodes
            .get(&path)
            .ok_or_else(|| HfsError::NotFound(path.clone()))?;
        if node.is_file() {
            return Err(HfsError::NotADirectory(path));
        }

        let children = Self::get_dir_children(&path, &nodes);
        let total = children.len();
        let start = options.start.unwrap_or(0).min(total);
        let end = options
            .limit
            .map_or(total, |limit| start.saturating_add(limit).min(total));

        let entries = children[start..end]
            .iter()
            .filter_map(|child| nodes.get(child))
            .map(|node| node.head().clone())
            .collect();
        Ok(ListPage {
            entries,
            has_next: end < total,
        })
    }

    async fn head(&self, path: &str) -> HfsResult<Option<Head>> {
        let path = normalize_path(path)?;
        Ok(self.nodes.read().get(&path).map(|node| node.head().clone()))
    }

    async fn heads(&self, paths: &[String]) -> HfsResult<Vec<Head>> {
        let nodes = self.nodes.read();
        paths
            .iter()
            .map(|path| {
                let path = normalize_path(path)?;
                nodes
                    .get(&path)
                    .map(|node| node.head().clone())
                    .ok_or(HfsError::NotFound(path))
            })
            .collect()
    }

    async fn put_head(
        &self,
        path: &str,
        patch: &HeadPatch,
        options: &PutHeadOptions,
    ) -> HfsResult<Option<Head>> {
        let path = normalize_path(path)?;
        let mut nodes = self.nodes.write();
        Self::patch_head(&path, patch, options, &mut nodes).map(Some)
    }

    async fn get(&self, path: &str, _options: &GetOptions) -> HfsResult<Option<D>> {
        let path = normalize_path(path)?;
        let nodes = self.nodes.read();
        match nodes.get(&path) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(Node::Dir { .. }) => Err(HfsError::IsADirectory(path)),
            None => Err(HfsError::NotFound(path)),
        }
    }

    async fn post(
        &self,
        path: &str,
        head: &Head,
        data: Option<D>,
        options: &PostOptions,
    ) -> HfsResult<Head> {
        let path = normalize_path(path)?;
        let mut nodes = self.nodes.write();
        Self::create(&path, head, data, options.overwrite, &mut nodes)
    }

    async fn post_many(
        &self,
        paths: &[String],
        heads: &[Head],
        data: Vec<Option<D>>,
        options: &PostOptions,
    ) -> HfsResult<Option<Vec<Head>>> {
        if paths.len() != heads.len() || paths.len() != data.len() {
            return Err(HfsError::length_mismatch());
        }
        let paths = paths
            .iter()
            .map(|path| normalize_path(path))
            .collect::<HfsResult<Vec<_>>>()?;

        self.atomically(|nodes| {
            paths
                .iter()
                .zip(heads)
                .zip(data)
                .map(|((path, head), data)| Self::create(path, head, data, options.overwrite, nodes))
                .collect::<HfsResult<Vec<_>>>()
                .map(Some)
        })
    }

    async fn put(&self, path: &str, new_data: D, _options: &PutOptions) -> HfsResult<()> {
        let path = normalize_path(path)?;
        let mut nodes = self.nodes.write();
        let node = nodes
            .get_mut(&path)
            .ok_or_else(|| HfsError::NotFound(path.clone()))?;

        match node {
            Node::File { data, version, .. } => {
                *data = Some(new_data);
                *version += 1;
                Ok(())
            }
            Node::Dir { .. } => Err(HfsError::IsADirectory(path)),
        }
    }

    async fn remove(&self, path: &str, options: &DeleteOptions) -> HfsResult<()> {
        let path = normalize_path(path)?;
        let mut nodes = self.nodes.write();
        Self::remove_entry(&path, options, &mut nodes)
    }

    async fn remove_many(&self, paths: &[String], options: &DeleteOptions) -> HfsResult<()> {
        let paths = paths
            .iter()
            .map(|path| normalize_path(path))
            .collect::<HfsResult<Vec<_>>>()?;
        self.atomically(|nodes| {
            paths
                .iter()
                .try_for_each(|path| Self::remove_entry(path, options, nodes))
        })
    }

    async fn move_entry(&self, from: &str, to: &str, options: &MoveOptions) -> HfsResult<Head> {
        let from = normalize_path(from)?;
        let to = normalize_path(to)?;
        let mut nodes = self.nodes.write();
        Self::relocate(&from, &to, options.overwrite, false, &mut nodes)
    }

    async fn copy_entry(&self, from: &str, to: &str, options: &CopyOptions) -> HfsResult<Head> {
        let from = normalize_path(from)?;
        let to = normalize_path(to)?;
        let mut nodes = self.nodes.write();
        Self::relocate(&from, &to, options.overwrite, true, &mut nodes)
    }

    async fn mkdir(&self, path: &str, head: Option<&HeadPatch>) -> HfsResult<Head> {
        let path = normalize_path(path)?;
        let mut head = head
            .cloned()
            .map(|patch| patch.into_head(&path))
            .unwrap_or_else(|| Head::dir(path.clone()));
        head.is_dir = true;

        let mut nodes = self.nodes.write();
        Self::create(&path, &head, None, false, &mut nodes)
    }

    async fn move_many(
        &self,
        from: &[String],
        to: &[String],
        options: &MoveOptions,
    ) -> HfsResult<Vec<Head>> {
        self.atomically(|nodes| Self::relocate_many(from, to, options.overwrite, false, nodes))
    }

    async fn copy_many(
        &self,
        from: &[String],
        to: &[String],
        options: &CopyOptions,
    ) -> HfsResult<Vec<Head>> {
        self.atomically(|nodes| Self::relocate_many(from, to, options.overwrite, true, nodes))
    }

    async fn put_heads(
        &self,
        paths: &[String],
        patches: &[HeadPatch],
        options: &PutHeadOptions,
    ) -> HfsResult<Option<Vec<Head>>> {
        if paths.len() != patches.len() {
            return Err(HfsError::length_mismatch());
        }
        self.atomically(|nodes| {
            paths
                .iter()
                .zip(patches)
                .map(|(path, patch)| {
                    let path = normalize_path(path)?;
                    Self::patch_head(&path, patch, options, nodes)
                })
                .collect::<HfsResult<Vec<_>>>()
                .map(Some)
        })
    }
}
