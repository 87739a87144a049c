//! Cached pull-request badges.
//!
//! The core never fetches PR data itself: an external fetcher owns a
//! `PrCacheWriter` and refreshes entries on its own schedule. The render
//! path does a synchronous, non-blocking lookup and simply shows no badge on
//! a miss. Only sessions backed by a worktree ever have an entry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::store::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrState {
    Open,
    Merged,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksState {
    Pending,
    Passing,
    Failing,
}

/// Snapshot of a session's pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrInfo {
    pub number: u64,
    pub state: PrState,
    pub checks: ChecksState,
}

type Shared = Arc<RwLock<HashMap<SessionId, PrInfo>>>;

/// Read side handed to the UI.
#[derive(Clone, Default)]
pub struct PrStatusCache {
    inner: Shared,
}

impl PrStatusCache {
    pub fn new() -> (Self, PrCacheWriter) {
        let inner: Shared = Arc::default();
        (
            Self {
                inner: Arc::clone(&inner),
            },
            PrCacheWriter { inner },
        )
    }

    /// Non-blocking lookup. A contended lock reads as a miss rather than
    /// stalling the render loop.
    pub fn get(&self, id: &SessionId) -> Option<PrInfo> {
        self.inner.try_read().ok()?.get(id).cloned()
    }
}

/// Write side owned by the external fetcher.
pub struct PrCacheWriter {
    inner: Shared,
}

impl PrCacheWriter {
    pub fn put(&self, id: SessionId, info: PrInfo) {
        let mut map = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.insert(id, info);
    }

    pub fn remove(&self, id: &SessionId) {
        let mut map = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.remove(id);
    }
}
