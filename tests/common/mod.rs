#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hfs::*;
use parking_lot::Mutex;

pub fn paths(list: &[&str]) -> Vec<String> {
    list.iter().map(|p| p.to_string()).collect()
}

/// Memory adapter holding `files` below the root.
pub fn memory(files: &[&str]) -> MemoryAdapter {
    let mem = MemoryAdapter::new();
    for file in files {
        mem.insert(Head::file(*file), Some(file.as_bytes().to_vec()))
            .unwrap();
    }
    mem
}

/// Records every event an `Hfs` instance emits, in order.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn attach<A: Adapter>(hfs: &Hfs<A>) -> Self {
        let recorder = Self::default();
        let sink = recorder.events.clone();
        hfs.events()
            .on_many(&EventKind::ALL, move |event| sink.lock().push(event.clone()));
        recorder
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(Event::kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn structural(&self) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind().is_structural())
            .cloned()
            .collect()
    }

    /// Start events of `action`.
    pub fn started(&self, action: Action) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, Event::ActionStart { action: a, .. } if *a == action))
            .count()
    }

    /// The last finish event of `action`.
    pub fn finished(&self, action: Action) -> Option<Event> {
        self.events
            .lock()
            .iter()
            .rev()
            .find(|e| matches!(e, Event::ActionFinish { action: a, .. } if *a == action))
            .cloned()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// Memory-backed adapter whose reads can be made to fail.
///
/// Supports only `mkdir` and `putHead`; `putHead` leaves deriving the new
/// head to the caller. Hidden paths still list but have no head.
pub struct FlakyAdapter {
    pub inner: MemoryAdapter,
    fail_head: AtomicBool,
    fail_list: AtomicBool,
    hidden: Mutex<Vec<String>>,
}

impl FlakyAdapter {
    pub fn new(inner: MemoryAdapter) -> Self {
        Self {
            inner,
            fail_head: AtomicBool::new(false),
            fail_list: AtomicBool::new(false),
            hidden: Mutex::new(Vec::new()),
        }
    }

    pub fn hide(&self, path: &str) {
        self.hidden.lock().push(path.to_string());
    }

    pub fn fail_head(&self, fail: bool) {
        self.fail_head.store(fail, Ordering::SeqCst);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Adapter for FlakyAdapter {
    type Data = Vec<u8>;

    fn capabilities(&self) -> Capabilities {
        Capabilities::of(&[Action::Mkdir, Action::PutHead])
    }

    async fn list(&self, path: &str, options: &ListOptions) -> HfsResult<ListPage> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(HfsError::rejected_with_message("list refused"));
        }
        self.inner.list(path, options).await
    }

    async fn head(&self, path: &str) -> HfsResult<Option<Head>> {
        if self.fail_head.load(Ordering::SeqCst) {
            return Err(HfsError::rejected_with_message("head refused"));
        }
        if self.hidden.lock().iter().any(|hidden| hidden == path) {
            return Ok(None);
        }
        self.inner.head(path).await
    }

    async fn mkdir(&self, path: &str, head: Option<&HeadPatch>) -> HfsResult<Head> {
        self.inner.mkdir(path, head).await
    }

    async fn put_head(
        &self,
        path: &str,
        patch: &HeadPatch,
        options: &PutHeadOptions,
    ) -> HfsResult<Option<Head>> {
        self.inner.put_head(path, patch, options).await?;
        Ok(None)
    }
}

/// Advertises `put` without providing it.
pub struct OverpromisingAdapter(pub MemoryAdapter);

#[async_trait::async_trait]
impl Adapter for OverpromisingAdapter {
    type Data = Vec<u8>;

    fn capabilities(&self) -> Capabilities {
        Capabilities::of(&[Action::Put])
    }

    async fn list(&self, path: &str, options: &ListOptions) -> HfsResult<ListPage> {
        self.0.list(path, options).await
    }

    async fn head(&self, path: &str) -> HfsResult<Option<Head>> {
        self.0.head(path).await
    }
}
