//! Core types: heads, head patches, operation options and entry status.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use crate::error::HfsError;

/// Backend-reported metadata for one entry.
///
/// `path` is the globally unique identifier; backend specific fields
/// (name, timestamps, ids, ...) live in `meta` and are flattened on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Head {
    pub path: String,
    pub is_dir: bool,
    #[serde(flatten)]
    pub meta: Map<String, Value>,
}

impl Head {
    pub fn new(path: impl Into<String>, is_dir: bool) -> Self {
        Self {
            path: path.into(),
            is_dir,
            meta: Map::new(),
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self::new(path, false)
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self::new(path, true)
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    /// Applies `patch` to a copy of this head. The path never changes.
    pub fn apply(&self, patch: &HeadPatch, strategy: HeadStrategy) -> Head {
        match strategy {
            HeadStrategy::Merge => {
                let mut merged = self.clone();
                if let Some(is_dir) = patch.is_dir {
                    merged.is_dir = is_dir;
                }
                for (key, value) in &patch.meta {
                    merged.meta.insert(key.clone(), value.clone());
                }
                merged
            }
            HeadStrategy::Replace => Head {
                path: self.path.clone(),
                is_dir: patch.is_dir.unwrap_or(self.is_dir),
                meta: patch.meta.clone(),
            },
        }
    }
}

/// Partial head used for creation and head updates.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadPatch {
    pub path: Option<String>,
    pub is_dir: Option<bool>,
    #[serde(flatten)]
    pub meta: Map<String, Value>,
}

impl HeadPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dir(mut self, is_dir: bool) -> Self {
        self.is_dir = Some(is_dir);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Completes the patch into a head addressed by `path`.
    pub fn into_head(self, path: &str) -> Head {
        Head {
            path: path.to_string(),
            is_dir: self.is_dir.unwrap_or(false),
            meta: self.meta,
        }
    }
}

impl From<Head> for HeadPatch {
    fn from(head: Head) -> Self {
        HeadPatch {
            path: Some(head.path),
            is_dir: Some(head.is_dir),
            meta: head.meta,
        }
    }
}

/// How a head patch is combined with the current head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeadStrategy {
    #[default]
    Merge,
    Replace,
}

/// One page of directory entries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub entries: Vec<Head>,
    pub has_next: bool,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListOptions {
    pub start: Option<usize>,
    pub limit: Option<usize>,
}

impl ListOptions {
    pub fn page(start: usize, limit: usize) -> Self {
        Self {
            start: Some(start),
            limit: Some(limit),
        }
    }

    /// True for the first page of a listing.
    pub(crate) fn starts_at_beginning(&self) -> bool {
        self.start.unwrap_or(0) == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetOptions {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PutOptions {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PostOptions {
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MoveOptions {
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CopyOptions {
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteOptions {
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PutHeadOptions {
    #[serde(default)]
    pub strategy: HeadStrategy,
}

impl PostOptions {
    pub fn overwrite() -> Self {
        Self { overwrite: true }
    }
}

impl MoveOptions {
    pub fn overwrite() -> Self {
        Self { overwrite: true }
    }
}

impl CopyOptions {
    pub fn overwrite() -> Self {
        Self { overwrite: true }
    }
}

/// Mutable per-node status.
#[derive(Debug, Clone, Default)]
pub struct EntryStatus {
    pub open: bool,
    pub loading: bool,
    pub error: Option<HfsError>,
}

impl EntryStatus {
    pub fn apply(&mut self, patch: &StatusPatch) {
        if let Some(open) = patch.open {
            self.open = open;
        }
        if let Some(loading) = patch.loading {
            self.loading = loading;
        }
        if let Some(error) = &patch.error {
            self.error = error.clone();
        }
    }
}

/// Partial status update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct StatusPatch {
    pub open: Option<bool>,
    pub loading: Option<bool>,
    pub error: Option<Option<HfsError>>,
}

impl StatusPatch {
    pub fn open(mut self, open: bool) -> Self {
        self.open = Some(open);
        self
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = Some(loading);
        self
    }

    pub fn error(mut self, error: HfsError) -> Self {
        self.error = Some(Some(error));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.error = Some(None);
        self
    }
}
