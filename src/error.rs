//! Domain error types for hivemux
//!
//! Provides structured error types for different domains:
//! - `StoreError` for group/session tree mutations
//! - `WatchError` for the background status watcher
//! - `HivemuxError` as the top-level error type

use thiserror::Error;

/// Top-level error type for hivemux
#[derive(Debug, Error)]
pub enum HivemuxError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors returned by `GroupTree` mutations.
///
/// Mutations are all-or-nothing: any of these errors means the tree is
/// unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Group '{0}' already exists")]
    PathConflict(String),

    #[error("Invalid group path '{0}'")]
    InvalidPath(String),

    #[error("Group '{0}' does not exist")]
    InvalidGroup(String),

    #[error("'{0}' not found")]
    NotFound(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Group '{0}' is not empty")]
    GroupNotEmpty(String),
}

/// Errors related to the background status watcher
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Status watch unavailable: {0}")]
    WatchUnavailable(String),
}

/// Result type alias for HivemuxError
pub type Result<T> = std::result::Result<T, HivemuxError>;

/// Result type alias for StoreError
pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<anyhow::Error> for HivemuxError {
    fn from(err: anyhow::Error) -> Self {
        HivemuxError::Other(err.to_string())
    }
}

impl From<String> for HivemuxError {
    fn from(msg: String) -> Self {
        HivemuxError::Other(msg)
    }
}

impl From<&str> for HivemuxError {
    fn from(msg: &str) -> Self {
        HivemuxError::Other(msg.to_string())
    }
}
