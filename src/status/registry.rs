use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::store::{SessionId, StatusCell};

/// Shared map of session id to status cell.
///
/// The UI loop registers a cell when a session is created and unregisters it
/// on deletion; the watcher thread only ever resolves ids to cells and writes
/// through the cell's synchronized setter. It never touches the tree itself.
#[derive(Default)]
pub struct StatusRegistry {
    cells: RwLock<HashMap<SessionId, Arc<StatusCell>>>,
}

impl StatusRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, id: SessionId, cell: Arc<StatusCell>) {
        let mut cells = self
            .cells
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cells.insert(id, cell);
    }

    pub fn unregister(&self, id: &SessionId) {
        let mut cells = self
            .cells
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cells.remove(id);
    }

    pub fn cell(&self, id: &SessionId) -> Option<Arc<StatusCell>> {
        let cells = self
            .cells
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cells.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.cells
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SessionStatus, Tool};

    #[test]
    fn register_resolve_unregister() {
        let registry = StatusRegistry::new();
        let id = SessionId::new("s1");
        let cell = Arc::new(StatusCell::new(SessionStatus::Starting, Tool::Claude));

        registry.register(id.clone(), Arc::clone(&cell));
        registry
            .cell(&id)
            .unwrap()
            .set(SessionStatus::Running, Tool::Claude);
        assert_eq!(cell.status(), SessionStatus::Running);

        registry.unregister(&id);
        assert!(registry.cell(&id).is_none());
    }
}
