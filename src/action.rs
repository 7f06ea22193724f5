//! Action kinds, action ids and the adapter capability set.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a tracked coordination-layer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Create,
    List,
    Head,
    Heads,
    PutHead,
    Get,
    Post,
    PostMany,
    Put,
    Remove,
    RemoveMany,
    Move,
    Copy,
    Mkdir,
    MoveMany,
    CopyMany,
    PutHeads,
}

impl Action {
    pub const ALL: [Action; 17] = [
        Action::Create,
        Action::List,
        Action::Head,
        Action::Heads,
        Action::PutHead,
        Action::Get,
        Action::Post,
        Action::PostMany,
        Action::Put,
        Action::Remove,
        Action::RemoveMany,
        Action::Move,
        Action::Copy,
        Action::Mkdir,
        Action::MoveMany,
        Action::CopyMany,
        Action::PutHeads,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::List => "list",
            Action::Head => "head",
            Action::Heads => "heads",
            Action::PutHead => "putHead",
            Action::Get => "get",
            Action::Post => "post",
            Action::PostMany => "postMany",
            Action::Put => "put",
            Action::Remove => "remove",
            Action::RemoveMany => "removeMany",
            Action::Move => "move",
            Action::Copy => "copy",
            Action::Mkdir => "mkdir",
            Action::MoveMany => "moveMany",
            Action::CopyMany => "copyMany",
            Action::PutHeads => "putHeads",
        }
    }

    /// `list` and `head` are part of every adapter.
    pub fn is_required(&self) -> bool {
        matches!(self, Action::List | Action::Head)
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of one in-flight action, unique per coordination-layer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub u64);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "act-{}", self.0)
    }
}

/// Set of optional operations an adapter implements.
///
/// Required operations (`list`, `head`) are always reported as present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    bits: u32,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities { bits: 0 };

    pub fn all() -> Self {
        Action::ALL
            .iter()
            .fold(Self::NONE, |caps, action| caps.with(*action))
    }

    pub fn of(actions: &[Action]) -> Self {
        actions
            .iter()
            .fold(Self::NONE, |caps, action| caps.with(*action))
    }

    pub fn with(mut self, action: Action) -> Self {
        self.bits |= action.bit();
        self
    }

    pub fn without(mut self, action: Action) -> Self {
        self.bits &= !action.bit();
        self
    }

    pub fn contains(&self, action: Action) -> bool {
        action.is_required() || self.bits & action.bit() != 0
    }
}
