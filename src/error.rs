use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::action::Action;

/// Shared, cloneable handle to a foreign error kept as the cause of a rejection.
pub type ErrorCause = Arc<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Clone, Error)]
pub enum HfsError {
    /// The adapter does not implement an optional operation.
    #[error("not implemented: {0}")]
    NotImplemented(Action),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("destination already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Anything the adapter raised that is not one of the variants above.
    #[error("rejected: {message}")]
    Rejected {
        message: String,
        #[source]
        cause: Option<ErrorCause>,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    // std::io::Error is not Clone, so it is stringified
    #[error("system I/O error: {0}")]
    SystemIo(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HfsError {
    /// Wraps a foreign error, keeping it reachable through `Error::source`.
    pub fn rejected(cause: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        let cause: Box<dyn StdError + Send + Sync + 'static> = cause.into();
        HfsError::Rejected {
            message: cause.to_string(),
            cause: Some(Arc::from(cause)),
        }
    }

    /// A rejection without an underlying error value.
    pub fn rejected_with_message(message: impl Into<String>) -> Self {
        HfsError::Rejected {
            message: message.into(),
            cause: None,
        }
    }

    pub fn length_mismatch() -> Self {
        HfsError::InvalidArguments("length mismatch".into())
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, HfsError::NotImplemented(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, HfsError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, HfsError::AlreadyExists(_))
    }

    pub fn is_invalid_arguments(&self) -> bool {
        matches!(self, HfsError::InvalidArguments(_))
    }
}

impl From<std::io::Error> for HfsError {
    fn from(e: std::io::Error) -> Self {
        HfsError::SystemIo(e.to_string())
    }
}

impl From<serde_json::Error> for HfsError {
    fn from(e: serde_json::Error) -> Self {
        HfsError::Config(e.to_string())
    }
}

pub type HfsResult<T> = Result<T, HfsError>;
