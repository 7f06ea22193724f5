use crate::action::{Action, Capabilities};
use crate::error::{HfsError, HfsResult};
use crate::path::dir_name;
use crate::types::{
    CopyOptions, DeleteOptions, GetOptions, Head, HeadPatch, ListOptions, ListPage, MoveOptions,
    PostOptions, PutHeadOptions, PutOptions,
};

/// Storage backend contract.
///
/// `list` and `head` are required. Every other operation is optional: an
/// adapter advertises what it implements through [`Adapter::capabilities`]
/// and overrides the matching methods. The defaults answer
/// [`HfsError::NotImplemented`].
///
/// Options are hints; their behaviour is up to the adapter.
#[async_trait::async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Entry payload type.
    type Data: Clone + Send + Sync + 'static;

    /// Optional actions this adapter implements.
    ///
    /// Every advertised action must have its method overridden. `Hfs` only
    /// checks this set before an action starts; an advertised action that
    /// falls through to the default fails inside its `actionStart` /
    /// `actionFinish` bracket instead.
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    /// Directory the entry described by `head` lives in. Defaults to
    /// stripping the last path segment.
    fn extract_dir(&self, head: &Head) -> Option<String> {
        dir_name(&head.path)
    }

    async fn list(&self, path: &str, options: &ListOptions) -> HfsResult<ListPage>;

    /// `Ok(None)` when nothing exists at `path`.
    async fn head(&self, path: &str) -> HfsResult<Option<Head>>;

    /// Fails with `NotFound` if any path does not exist.
    async fn heads(&self, _paths: &[String]) -> HfsResult<Vec<Head>> {
        Err(HfsError::NotImplemented(Action::Heads))
    }

    /// Returns the new head, or `None` to let the caller derive it.
    async fn put_head(
        &self,
        _path: &str,
        _patch: &HeadPatch,
        _options: &PutHeadOptions,
    ) -> HfsResult<Option<Head>> {
        Err(HfsError::NotImplemented(Action::PutHead))
    }

    async fn get(&self, _path: &str, _options: &GetOptions) -> HfsResult<Option<Self::Data>> {
        Err(HfsError::NotImplemented(Action::Get))
    }

    async fn post(
        &self,
        _path: &str,
        _head: &Head,
        _data: Option<Self::Data>,
        _options: &PostOptions,
    ) -> HfsResult<Head> {
        Err(HfsError::NotImplemented(Action::Post))
    }

    /// Returns the created heads, or `None` to accept the posted ones.
    async fn post_many(
        &self,
        _paths: &[String],
        _heads: &[Head],
        _data: Vec<Option<Self::Data>>,
        _options: &PostOptions,
    ) -> HfsResult<Option<Vec<Head>>> {
        Err(HfsError::NotImplemented(Action::PostMany))
    }

    async fn put(&self, _path: &str, _data: Self::Data, _options: &PutOptions) -> HfsResult<()> {
        Err(HfsError::NotImplemented(Action::Put))
    }

    async fn remove(&self, _path: &str, _options: &DeleteOptions) -> HfsResult<()> {
        Err(HfsError::NotImplemented(Action::Remove))
    }

    async fn remove_many(&self, _paths: &[String], _options: &DeleteOptions) -> HfsResult<()> {
        Err(HfsError::NotImplemented(Action::RemoveMany))
    }

    /// Returns the head of the entry at its new location.
    async fn move_entry(&self, _from: &str, _to: &str, _options: &MoveOptions) -> HfsResult<Head> {
        Err(HfsError::NotImplemented(Action::Move))
    }

    /// Returns the head of the new copy.
    async fn copy_entry(&self, _from: &str, _to: &str, _options: &CopyOptions) -> HfsResult<Head> {
        Err(HfsError::NotImplemented(Action::Copy))
    }

    async fn mkdir(&self, _path: &str, _head: Option<&HeadPatch>) -> HfsResult<Head> {
        Err(HfsError::NotImplemented(Action::Mkdir))
    }

    /// `from[i]` moves to `to[i]`; returns the new heads in the same order.
    async fn move_many(
        &self,
        _from: &[String],
        _to: &[String],
        _options: &MoveOptions,
    ) -> HfsResult<Vec<Head>> {
        Err(HfsError::NotImplemented(Action::MoveMany))
    }

    async fn copy_many(
        &self,
        _from: &[String],
        _to: &[String],
        _options: &CopyOptions,
    ) -> HfsResult<Vec<Head>> {
        Err(HfsError::NotImplemented(Action::CopyMany))
    }

    async fn put_heads(
        &self,
        _paths: &[String],
        _patches: &[HeadPatch],
        _options: &PutHeadOptions,
    ) -> HfsResult<Option<Vec<Head>>> {
        Err(HfsError::NotImplemented(Action::PutHeads))
    }
}
