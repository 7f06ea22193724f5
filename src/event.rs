//! Lifecycle events and the per-instance listener registry.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::error;

use crate::action::{Action, ActionId};
use crate::error::HfsError;
use crate::types::{EntryStatus, Head};

/// Event names; listeners subscribe per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ActionStart,
    ActionFinish,
    CreateNode,
    RemoveNode,
    HeadChange,
    DataChange,
    ChildrenChange,
    StatusChange,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::ActionStart,
        EventKind::ActionFinish,
        EventKind::CreateNode,
        EventKind::RemoveNode,
        EventKind::HeadChange,
        EventKind::DataChange,
        EventKind::ChildrenChange,
        EventKind::StatusChange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ActionStart => "actionStart",
            EventKind::ActionFinish => "actionFinish",
            EventKind::CreateNode => "createNode",
            EventKind::RemoveNode => "removeNode",
            EventKind::HeadChange => "headChange",
            EventKind::DataChange => "dataChange",
            EventKind::ChildrenChange => "childrenChange",
            EventKind::StatusChange => "statusChange",
        }
    }

    /// Create/remove/head/data/children changes.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            EventKind::CreateNode
                | EventKind::RemoveNode
                | EventKind::HeadChange
                | EventKind::DataChange
                | EventKind::ChildrenChange
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    ActionStart {
        paths: Vec<String>,
        action: Action,
        id: ActionId,
    },
    /// `error` is `None` on success.
    ActionFinish {
        paths: Vec<String>,
        action: Action,
        id: ActionId,
        error: Option<HfsError>,
    },
    CreateNode {
        path: String,
        old_path: Option<String>,
    },
    /// `head` is the last known head before removal.
    RemoveNode {
        path: String,
        new_path: Option<String>,
        head: Head,
    },
    HeadChange {
        path: String,
    },
    DataChange {
        path: String,
    },
    ChildrenChange {
        dir: String,
    },
    StatusChange {
        path: String,
        status: EntryStatus,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ActionStart { .. } => EventKind::ActionStart,
            Event::ActionFinish { .. } => EventKind::ActionFinish,
            Event::CreateNode { .. } => EventKind::CreateNode,
            Event::RemoveNode { .. } => EventKind::RemoveNode,
            Event::HeadChange { .. } => EventKind::HeadChange,
            Event::DataChange { .. } => EventKind::DataChange,
            Event::ChildrenChange { .. } => EventKind::ChildrenChange,
            Event::StatusChange { .. } => EventKind::StatusChange,
        }
    }

    /// Id of the action this event brackets, if any.
    pub fn action_id(&self) -> Option<ActionId> {
        match self {
            Event::ActionStart { id, .. } | Event::ActionFinish { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Path the event is about. Action events report their first path.
    pub fn path(&self) -> Option<&str> {
        match self {
            Event::ActionStart { paths, .. } | Event::ActionFinish { paths, .. } => {
                paths.first().map(String::as_str)
            }
            Event::CreateNode { path, .. }
            | Event::RemoveNode { path, .. }
            | Event::HeadChange { path }
            | Event::DataChange { path }
            | Event::StatusChange { path, .. } => Some(path),
            Event::ChildrenChange { dir } => Some(dir),
        }
    }
}

pub type Listener = Arc<dyn Fn(&Event) + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered, synchronous publish/subscribe registry keyed by event kind.
///
/// Listeners for one kind run in subscription order. A panicking listener
/// is logged and skipped; the remaining listeners still run. Channel
/// subscriptions are fed after the listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<HashMap<EventKind, Vec<(ListenerId, Listener)>>>,
    channels: Mutex<Vec<Channel>>,
    next_id: AtomicU64,
}

struct Channel {
    kinds: Vec<EventKind>,
    tx: mpsc::UnboundedSender<Event>,
}

impl Channel {
    fn is_open_for(&self, kind: EventKind) -> bool {
        self.kinds.contains(&kind) && !self.tx.is_closed()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.lock();
        let counts: HashMap<&str, usize> = listeners
            .iter()
            .map(|(kind, set)| (kind.as_str(), set.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("listeners", &counts)
            .field("channels", &self.channels.lock().len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Subscribes the same listener to several kinds.
    pub fn on_many<F>(&self, kinds: &[EventKind], listener: F) -> Vec<ListenerId>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        kinds
            .iter()
            .map(|kind| {
                let listener = listener.clone();
                self.on(*kind, move |event| listener(event))
            })
            .collect()
    }

    /// Returns false if the listener was not registered for `kind`.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(set) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = set.len();
        set.retain(|(listener_id, _)| *listener_id != id);
        before != set.len()
    }

    pub fn clear(&self) {
        self.listeners.lock().clear();
        self.channels.lock().clear();
    }

    /// Listeners plus open channel subscriptions for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        let listeners = self.listeners.lock().get(&kind).map_or(0, Vec::len);
        let channels = self
            .channels
            .lock()
            .iter()
            .filter(|channel| channel.is_open_for(kind))
            .count();
        listeners + channels
    }

    /// Delivers `event` to the listeners of its kind.
    ///
    /// The registry lock is released before listeners run, so listeners may
    /// subscribe or unsubscribe; such changes apply from the next dispatch.
    pub fn emit(&self, event: &Event) {
        let kind = event.kind();
        let snapshot: Vec<Listener> = self
            .listeners
            .lock()
            .get(&kind)
            .map(|set| set.iter().map(|(_, listener)| listener.clone()).collect())
            .unwrap_or_default();
        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!(event = %kind, "event listener panicked");
            }
        }

        // Closed channels are dropped here.
        self.channels.lock().retain(|channel| {
            if !channel.kinds.contains(&kind) {
                return !channel.tx.is_closed();
            }
            channel.tx.send(event.clone()).is_ok()
        });
    }

    /// Forwards events of the given kinds into a channel.
    ///
    /// The subscription ends when the receiver is dropped or on `clear`.
    pub fn subscribe(&self, kinds: &[EventKind]) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut channels = self.channels.lock();
        channels.retain(|channel| !channel.tx.is_closed());
        channels.push(Channel {
            kinds: kinds.to_vec(),
            tx,
        });
        rx
    }
}
