//! hfs: adapter-agnostic hierarchical file store.
//!
//! An [`Adapter`] talks to some storage. [`Hfs`] wraps it, mirrors what it
//! has seen in a path-indexed [`Tree`] and reports every operation and
//! every cache change through an [`EventBus`].

pub mod action;
pub mod adapter;
pub mod api;
pub mod backends;
pub mod config;
pub mod error;
pub mod event;
pub mod path;
pub mod tree;
pub mod types;

// Re-export
pub use action::{Action, ActionId, Capabilities};
pub use adapter::Adapter;
pub use api::Hfs;
pub use backends::MemoryAdapter;
pub use config::HfsConfig;
pub use error::{HfsError, HfsResult};
pub use event::{Event, EventBus, EventKind, Listener, ListenerId};
pub use tree::{Node, Tree};
pub use types::*;
