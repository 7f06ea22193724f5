//! Coordination layer.
//!
//! [`Hfs`] wraps one adapter and is the only writer of the tree cache. Every
//! public operation follows the same shape:
//!
//! 1. optional operations are checked against the adapter capabilities and
//!    fail with [`HfsError::NotImplemented`] before anything else happens;
//! 2. the adapter call is bracketed by `actionStart` / `actionFinish` events
//!    sharing one [`ActionId`], including on failure;
//! 3. on success the result is applied to the tree and the structural
//!    events follow, always after `actionFinish`.
//!
//! Nothing here serializes overlapping calls. The existence guards of
//! `post`, `mkdir`, `move` and `copy` are check-then-act conveniences; two
//! concurrent calls on one path can both pass them.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::try_join_all;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::action::{Action, ActionId, Capabilities};
use crate::adapter::Adapter;
use crate::config::HfsConfig;
use crate::error::{HfsError, HfsResult};
use crate::event::{Event, EventBus, EventKind, ListenerId};
use crate::tree::{Node, Tree};
use crate::types::{
    CopyOptions, DeleteOptions, GetOptions, Head, HeadPatch, ListOptions, ListPage, MoveOptions,
    PostOptions, PutHeadOptions, PutOptions, StatusPatch,
};

pub struct Hfs<A: Adapter> {
    adapter: A,
    tree: Mutex<Tree>,
    events: EventBus,
    config: HfsConfig,
    next_action: AtomicU64,
}

impl<A: Adapter> Hfs<A> {
    pub fn new(adapter: A) -> Self {
        Self::build(adapter, HfsConfig::default())
    }

    /// Validates `config` first; the tree is rooted at the normalized root.
    pub fn with_config(adapter: A, config: HfsConfig) -> HfsResult<Self> {
        Ok(Self::build(adapter, config.validate()?))
    }

    fn build(adapter: A, config: HfsConfig) -> Self {
        Self {
            adapter,
            tree: Mutex::new(Tree::new(config.root.clone())),
            events: EventBus::new(),
            config,
            next_action: AtomicU64::new(1),
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn config(&self) -> &HfsConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.events.on(kind, listener)
    }

    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.events.off(kind, id)
    }

    pub fn capabilities(&self) -> Capabilities {
        self.adapter.capabilities()
    }

    pub fn supports(&self, action: Action) -> bool {
        self.adapter.capabilities().contains(action)
    }

    /// Directory of `head`, as the adapter derives it.
    pub fn extract_dir(&self, head: &Head) -> Option<String> {
        self.adapter.extract_dir(head)
    }

    /// Copy of the cached node at `path`.
    pub fn find(&self, path: &str) -> Option<Node> {
        self.tree.lock().find(path).cloned()
    }

    /// Copy of the whole tree cache.
    pub fn snapshot(&self) -> Tree {
        self.tree.lock().clone()
    }

    pub fn subtree(&self, path: &str) -> Option<Tree> {
        self.tree.lock().subtree(path)
    }

    /// Read access to the tree cache. `f` must not call back into `self`.
    pub fn with_tree<R>(&self, f: impl FnOnce(&Tree) -> R) -> R {
        f(&self.tree.lock())
    }

    /// Merges `patch` into the status of a cached node and emits
    /// `statusChange`. Returns false if the node is not cached.
    pub fn update_status(&self, path: &str, patch: StatusPatch) -> bool {
        let status = self.mutate_tree(|tree| tree.update_status(path, &patch).cloned());
        match status {
            Some(status) => {
                self.emit(Event::StatusChange {
                    path: path.to_string(),
                    status,
                });
                true
            }
            None => false,
        }
    }

    // ---- reads -------------------------------------------------------------

    /// Lists one page of `path` and attaches the entries below it.
    ///
    /// An uncached directory is resolved through `head` first. A first page
    /// without `hasNext` is a complete listing: cached children that were
    /// not returned are dropped.
    pub async fn list(&self, path: &str, options: ListOptions) -> HfsResult<ListPage> {
        self.resolve_dir(path).await?;
        self.update_status(path, StatusPatch::default().loading(true));

        let result = self
            .run(
                vec![path.to_string()],
                Action::List,
                self.adapter.list(path, &options),
            )
            .await;
        let page = match result {
            Ok(page) => page,
            Err(err) => {
                self.update_status(path, StatusPatch::default().loading(false).error(err.clone()));
                return Err(err);
            }
        };

        let complete = options.starts_at_beginning() && !page.has_next;
        let attached = self.mutate_tree(|tree| {
            if !tree.contains(path) {
                tree.ensure_dir(path);
            }
            let attached = tree.insert_many(Some(path), page.entries.clone()).is_some();
            if attached && complete {
                prune_children(tree, path, &page.entries);
            }
            attached
        });
        if attached {
            self.emit(Event::ChildrenChange {
                dir: path.to_string(),
            });
        }
        self.update_status(path, StatusPatch::default().loading(false).clear_error());
        Ok(page)
    }

    /// Page `page` (zero based) of `path`, sized by the configured page size.
    pub async fn list_page(&self, path: &str, page: usize) -> HfsResult<ListPage> {
        let size = self.config.page_size;
        self.list(path, ListOptions::page(page * size, size)).await
    }

    /// Walks every page of `path` and returns all entries.
    pub async fn list_all(&self, path: &str) -> HfsResult<Vec<Head>> {
        let mut entries = Vec::new();
        let mut page = 0;
        loop {
            let result = self.list_page(path, page).await?;
            let done = !result.has_next || result.entries.is_empty();
            entries.extend(result.entries);
            if done {
                break;
            }
            page += 1;
        }
        if page > 0 {
            self.mutate_tree(|tree| prune_children(tree, path, &entries));
        }
        Ok(entries)
    }

    /// Fetches the head of `path` and caches it.
    ///
    /// On failure a cached node keeps its last known data and records the
    /// error in its status; unknown paths are not added.
    pub async fn head(&self, path: &str) -> HfsResult<Option<Head>> {
        let result = self
            .run(vec![path.to_string()], Action::Head, self.adapter.head(path))
            .await;
        match result {
            Ok(Some(head)) => {
                self.attach(head.clone());
                Ok(Some(head))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                self.update_status(path, StatusPatch::default().error(err.clone()));
                Err(err)
            }
        }
    }

    /// Heads of all `paths`; fails with `NotFound` if any is missing.
    ///
    /// Without adapter support this issues one `head` per path.
    pub async fn heads(&self, paths: &[String]) -> HfsResult<Vec<Head>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        if !self.supports(Action::Heads) {
            return try_join_all(paths.iter().map(|path| self.existing_head(path))).await;
        }
        let heads = self
            .run(paths.to_vec(), Action::Heads, self.adapter.heads(paths))
            .await?;
        for head in &heads {
            self.attach(head.clone());
        }
        Ok(heads)
    }

    pub async fn exists(&self, path: &str) -> HfsResult<bool> {
        Ok(self.head(path).await?.is_some())
    }

    pub async fn get(&self, path: &str, options: GetOptions) -> HfsResult<Option<A::Data>> {
        self.require(Action::Get)?;
        self.run(
            vec![path.to_string()],
            Action::Get,
            self.adapter.get(path, &options),
        )
        .await
    }

    // ---- writes ------------------------------------------------------------

    /// Creates an entry at `path`. The head is completed with `path`.
    pub async fn post(
        &self,
        path: &str,
        head: HeadPatch,
        data: Option<A::Data>,
        options: PostOptions,
    ) -> HfsResult<Head> {
        self.require(Action::Post)?;
        let head = head.into_head(path);
        let created = self
            .run(vec![path.to_string()], Action::Post, async {
                if !options.overwrite {
                    self.ensure_vacant(path).await?;
                }
                self.adapter.post(path, &head, data, &options).await
            })
            .await?;

        self.attach(created.clone());
        self.emit(Event::DataChange {
            path: path.to_string(),
        });
        self.emit_created(&created, None);
        Ok(created)
    }

    /// Creates several entries. `paths`, `heads` and `data` are parallel.
    pub async fn post_many(
        &self,
        paths: &[String],
        heads: Vec<HeadPatch>,
        data: Vec<Option<A::Data>>,
        options: PostOptions,
    ) -> HfsResult<Vec<Head>> {
        self.require(Action::PostMany)?;
        if paths.is_empty() && heads.is_empty() && data.is_empty() {
            return Ok(Vec::new());
        }
        let created = self
            .run(paths.to_vec(), Action::PostMany, async {
                check_lengths(&[paths.len(), heads.len(), data.len()])?;
                if !options.overwrite {
                    self.ensure_all_vacant(paths).await?;
                }
                let heads: Vec<Head> = heads
                    .into_iter()
                    .zip(paths)
                    .map(|(patch, path)| patch.into_head(path))
                    .collect();
                let returned = self.adapter.post_many(paths, &heads, data, &options).await?;
                Ok::<_, HfsError>(returned.unwrap_or(heads))
            })
            .await?;

        self.attach_batch(&created);
        for head in &created {
            self.emit(Event::DataChange {
                path: head.path.clone(),
            });
            self.emit(Event::CreateNode {
                path: head.path.clone(),
                old_path: None,
            });
            self.emit(Event::HeadChange {
                path: head.path.clone(),
            });
        }
        self.emit_children_changed(created.first());
        Ok(created)
    }

    /// Writes entry data; the head is left alone.
    pub async fn put(&self, path: &str, data: A::Data, options: PutOptions) -> HfsResult<()> {
        self.require(Action::Put)?;
        self.run(
            vec![path.to_string()],
            Action::Put,
            self.adapter.put(path, data, &options),
        )
        .await?;
        self.emit(Event::DataChange {
            path: path.to_string(),
        });
        Ok(())
    }

    pub async fn mkdir(&self, path: &str, head: Option<HeadPatch>) -> HfsResult<Head> {
        self.require(Action::Mkdir)?;
        let created = self
            .run(vec![path.to_string()], Action::Mkdir, async {
                self.ensure_vacant(path).await?;
                self.adapter.mkdir(path, head.as_ref()).await
            })
            .await?;

        self.attach(created.clone());
        self.emit_created(&created, None);
        Ok(created)
    }

    /// Removes `path`. Returns `Ok(false)` without calling the adapter if
    /// nothing exists there.
    pub async fn remove(&self, path: &str, options: DeleteOptions) -> HfsResult<bool> {
        self.require(Action::Remove)?;
        let Some(current) = self.head(path).await? else {
            return Ok(false);
        };
        self.run(
            vec![path.to_string()],
            Action::Remove,
            self.adapter.remove(path, &options),
        )
        .await?;

        self.mutate_tree(|tree| tree.remove(&current.path));
        self.emit_removed(&current, None);
        Ok(true)
    }

    /// Removes the existing entries among `paths` and returns their last
    /// known heads.
    pub async fn remove_many(
        &self,
        paths: &[String],
        options: DeleteOptions,
    ) -> HfsResult<Vec<Head>> {
        self.require(Action::RemoveMany)?;
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let found = try_join_all(paths.iter().map(|path| self.head(path))).await?;
        let current: Vec<Head> = found.into_iter().flatten().collect();
        if current.is_empty() {
            return Ok(current);
        }
        let existing: Vec<String> = current.iter().map(|head| head.path.clone()).collect();
        self.run(
            existing.clone(),
            Action::RemoveMany,
            self.adapter.remove_many(&existing, &options),
        )
        .await?;

        self.mutate_tree(|tree| tree.remove_many(&existing));
        for head in &current {
            self.emit(Event::RemoveNode {
                path: head.path.clone(),
                new_path: None,
                head: head.clone(),
            });
        }
        self.emit_children_changed(current.first());
        Ok(current)
    }

    /// Moves `from` to `to`, observed as a removal of `from` followed by a
    /// creation of `to`.
    pub async fn move_entry(&self, from: &str, to: &str, options: MoveOptions) -> HfsResult<Head> {
        self.require(Action::Move)?;
        if from == to {
            return self.existing_head(from).await;
        }
        let (current, moved) = self
            .run(vec![from.to_string(), to.to_string()], Action::Move, async {
                let current = self.existing_head(from).await?;
                if !options.overwrite {
                    self.ensure_vacant(to).await?;
                }
                let moved = self.adapter.move_entry(from, to, &options).await?;
                Ok::<_, HfsError>((current, moved))
            })
            .await?;

        self.mutate_tree(|tree| tree.remove(&current.path));
        self.attach(moved.clone());
        self.emit_removed(&current, Some(to));
        self.emit_created(&moved, Some(from));
        Ok(moved)
    }

    pub async fn copy_entry(&self, from: &str, to: &str, options: CopyOptions) -> HfsResult<Head> {
        self.require(Action::Copy)?;
        if from == to {
            return self.existing_head(from).await;
        }
        let copied = self
            .run(vec![from.to_string(), to.to_string()], Action::Copy, async {
                self.existing_head(from).await?;
                if !options.overwrite {
                    self.ensure_vacant(to).await?;
                }
                self.adapter.copy_entry(from, to, &options).await
            })
            .await?;

        self.attach(copied.clone());
        self.emit_created(&copied, Some(from));
        Ok(copied)
    }

    /// Moves `from[i]` to `to[i]`.
    ///
    /// New heads are attached below the directory of the first one, so all
    /// destinations are expected to share a directory.
    pub async fn move_many(
        &self,
        from: &[String],
        to: &[String],
        options: MoveOptions,
    ) -> HfsResult<Vec<Head>> {
        self.require(Action::MoveMany)?;
        if from.is_empty() && to.is_empty() {
            return Ok(Vec::new());
        }
        let (current, moved) = self
            .run([from, to].concat(), Action::MoveMany, async {
                check_lengths(&[from.len(), to.len()])?;
                let current = self.heads(from).await?;
                if !options.overwrite {
                    self.ensure_all_vacant(to).await?;
                }
                let moved = self.adapter.move_many(from, to, &options).await?;
                Ok::<_, HfsError>((current, moved))
            })
            .await?;

        self.mutate_tree(|tree| {
            for head in &current {
                tree.remove(&head.path);
            }
        });
        self.attach_batch(&moved);

        for (i, head) in current.iter().enumerate() {
            self.emit(Event::RemoveNode {
                path: head.path.clone(),
                new_path: to.get(i).cloned(),
                head: head.clone(),
            });
        }
        self.emit_children_changed(current.first());
        self.emit_created_batch(&moved, from);
        Ok(moved)
    }

    /// Copies `from[i]` to `to[i]`; same single-directory attachment as
    /// [`Hfs::move_many`].
    pub async fn copy_many(
        &self,
        from: &[String],
        to: &[String],
        options: CopyOptions,
    ) -> HfsResult<Vec<Head>> {
        self.require(Action::CopyMany)?;
        if from.is_empty() && to.is_empty() {
            return Ok(Vec::new());
        }
        let copied = self
            .run([from, to].concat(), Action::CopyMany, async {
                check_lengths(&[from.len(), to.len()])?;
                self.heads(from).await?;
                if !options.overwrite {
                    self.ensure_all_vacant(to).await?;
                }
                self.adapter.copy_many(from, to, &options).await
            })
            .await?;

        self.attach_batch(&copied);
        self.emit_created_batch(&copied, from);
        Ok(copied)
    }

    /// Updates the head of an existing entry. If the adapter returns no
    /// head, the patch is applied locally using `options.strategy`.
    pub async fn put_head(
        &self,
        path: &str,
        patch: HeadPatch,
        options: PutHeadOptions,
    ) -> HfsResult<Head> {
        self.require(Action::PutHead)?;
        let updated = self
            .run(vec![path.to_string()], Action::PutHead, async {
                let current = self.existing_head(path).await?;
                let returned = self.adapter.put_head(path, &patch, &options).await?;
                Ok::<_, HfsError>(
                    returned.unwrap_or_else(|| current.apply(&patch, options.strategy)),
                )
            })
            .await?;

        self.attach(updated.clone());
        self.emit(Event::HeadChange {
            path: path.to_string(),
        });
        Ok(updated)
    }

    pub async fn put_heads(
        &self,
        paths: &[String],
        patches: &[HeadPatch],
        options: PutHeadOptions,
    ) -> HfsResult<Vec<Head>> {
        self.require(Action::PutHeads)?;
        if paths.is_empty() && patches.is_empty() {
            return Ok(Vec::new());
        }
        let updated = self
            .run(paths.to_vec(), Action::PutHeads, async {
                check_lengths(&[paths.len(), patches.len()])?;
                let current = self.heads(paths).await?;
                let returned = self.adapter.put_heads(paths, patches, &options).await?;
                Ok::<_, HfsError>(returned.unwrap_or_else(|| {
                    current
                        .iter()
                        .zip(patches)
                        .map(|(head, patch)| head.apply(patch, options.strategy))
                        .collect()
                }))
            })
            .await?;

        for head in &updated {
            self.attach(head.clone());
        }
        for head in &updated {
            self.emit(Event::HeadChange {
                path: head.path.clone(),
            });
        }
        Ok(updated)
    }

    // ---- internals ---------------------------------------------------------

    fn require(&self, action: Action) -> HfsResult<()> {
        if self.supports(action) {
            Ok(())
        } else {
            debug!(%action, "adapter does not implement action");
            Err(HfsError::NotImplemented(action))
        }
    }

    fn next_action_id(&self) -> ActionId {
        ActionId(self.next_action.fetch_add(1, Ordering::Relaxed))
    }

    /// Brackets `work` with `actionStart` / `actionFinish`.
    async fn run<T, F>(&self, paths: Vec<String>, action: Action, work: F) -> HfsResult<T>
    where
        F: Future<Output = HfsResult<T>>,
    {
        let id = self.next_action_id();
        debug!(%id, %action, ?paths, "action started");
        self.emit(Event::ActionStart {
            paths: paths.clone(),
            action,
            id,
        });

        let result = work.await;
        match &result {
            Ok(_) => debug!(%id, %action, "action finished"),
            Err(HfsError::NotImplemented(missing)) if *missing == action => {
                warn!(%id, %action, "adapter advertises an action it does not implement")
            }
            Err(err) => warn!(%id, %action, error = %err, "action failed"),
        }
        self.emit(Event::ActionFinish {
            paths,
            action,
            id,
            error: result.as_ref().err().cloned(),
        });
        result
    }

    fn emit(&self, event: Event) {
        self.events.emit(&event);
    }

    fn mutate_tree<R>(&self, f: impl FnOnce(&mut Tree) -> R) -> R {
        let mut tree = self.tree.lock();
        f(&mut tree)
    }

    async fn resolve_dir(&self, path: &str) -> HfsResult<()> {
        let known = self.with_tree(|tree| tree.find(path).is_some_and(|node| node.data().is_some()));
        if !known && self.head(path).await?.is_none() {
            debug!(path, "listing a directory without a head");
        }
        Ok(())
    }

    async fn existing_head(&self, path: &str) -> HfsResult<Head> {
        self.head(path)
            .await?
            .ok_or_else(|| HfsError::NotFound(path.to_string()))
    }

    async fn ensure_vacant(&self, path: &str) -> HfsResult<()> {
        if self.exists(path).await? {
            return Err(HfsError::AlreadyExists(path.to_string()));
        }
        Ok(())
    }

    async fn ensure_all_vacant(&self, paths: &[String]) -> HfsResult<()> {
        try_join_all(paths.iter().map(|path| self.ensure_vacant(path))).await?;
        Ok(())
    }

    /// Inserts `head` at its derived directory, creating placeholder
    /// ancestors if the directory is not cached yet.
    ///
    /// The configured root binds to the root slot whatever its derived
    /// directory; heads outside the root are not cached.
    fn attach(&self, head: Head) -> bool {
        let dir = self.extract_dir(&head);
        self.mutate_tree(|tree| {
            if head.path == tree.root_path() {
                return tree.insert(None, head).is_some();
            }
            if let Some(dir) = dir.as_deref() {
                if !tree.contains(dir) && tree.ensure_dir(dir).is_none() {
                    trace!(path = %head.path, root = %tree.root_path(), "head outside the root");
                    return false;
                }
            }
            tree.insert(dir.as_deref(), head).is_some()
        })
    }

    /// Inserts a batch below the directory of its first head.
    fn attach_batch(&self, heads: &[Head]) {
        let Some(first) = heads.first() else {
            return;
        };
        match self.extract_dir(first) {
            Some(dir) if first.path != self.config.root => self.mutate_tree(|tree| {
                if !tree.contains(&dir) {
                    tree.ensure_dir(&dir);
                }
                if tree.insert_many(Some(&dir), heads.to_vec()).is_none() {
                    trace!(%dir, "batch not attached");
                }
            }),
            _ => {
                for head in heads {
                    self.attach(head.clone());
                }
            }
        }
    }

    fn emit_children_changed(&self, head: Option<&Head>) {
        if let Some(dir) = head.and_then(|head| self.extract_dir(head)) {
            self.emit(Event::ChildrenChange { dir });
        }
    }

    fn emit_created(&self, head: &Head, old_path: Option<&str>) {
        self.emit(Event::CreateNode {
            path: head.path.clone(),
            old_path: old_path.map(str::to_string),
        });
        self.emit(Event::HeadChange {
            path: head.path.clone(),
        });
        self.emit_children_changed(Some(head));
    }

    fn emit_created_batch(&self, heads: &[Head], old_paths: &[String]) {
        for (i, head) in heads.iter().enumerate() {
            self.emit(Event::CreateNode {
                path: head.path.clone(),
                old_path: old_paths.get(i).cloned(),
            });
            self.emit(Event::HeadChange {
                path: head.path.clone(),
            });
        }
        self.emit_children_changed(heads.first());
    }

    fn emit_removed(&self, head: &Head, new_path: Option<&str>) {
        self.emit(Event::RemoveNode {
            path: head.path.clone(),
            new_path: new_path.map(str::to_string),
            head: head.clone(),
        });
        self.emit_children_changed(Some(head));
    }
}

impl<A: Adapter> Drop for Hfs<A> {
    fn drop(&mut self) {
        self.events.clear();
    }
}

fn check_lengths(lengths: &[usize]) -> HfsResult<()> {
    match lengths.split_first() {
        Some((first, rest)) if rest.iter().any(|len| len != first) => {
            Err(HfsError::length_mismatch())
        }
        _ => Ok(()),
    }
}

/// Drops cached children of `dir` that a complete listing did not return.
fn prune_children(tree: &mut Tree, dir: &str, listed: &[Head]) {
    let listed: HashSet<&str> = listed.iter().map(|head| head.path.as_str()).collect();
    let stale = tree.retain_children(dir, |child| listed.contains(child));
    if !stale.is_empty() {
        trace!(%dir, ?stale, "pruned children missing from listing");
    }
}
