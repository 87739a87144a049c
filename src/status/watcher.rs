//! Background status watcher.
//!
//! Agent-side hook scripts write `<status_dir>/<session-id>.json` files
//! containing the session's current status and tool. A `notify` watcher on
//! that directory feeds raw fs events to a dedicated worker thread, which
//! re-reads the changed files, writes the parsed values through the
//! session's `StatusCell`, and posts a single coalesced `StatusEvent` into
//! the UI loop's message queue. The watcher never calls into the tree,
//! projector, or view state.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{Receiver as StdReceiver, channel};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::error::WatchError;
use crate::log;
use crate::store::{SessionId, SessionStatus, Tool};

use super::registry::StatusRegistry;

/// Inbound notification to the UI loop: session statuses may have changed.
/// Carries no payload; the UI re-reads current values rather than diffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEvent;

/// Contents of a hook status file.
#[derive(Debug, Deserialize)]
struct HookStatus {
    status: SessionStatus,
    /// Optional; absent means the tool is unchanged.
    tool: Option<Tool>,
}

/// Owns the notify watcher and its worker thread. Dropping this tears both
/// down: the fs-event channel disconnects, the worker exits, and the UI side
/// of the feed sees end-of-stream.
pub struct StatusWatcher {
    _watcher: RecommendedWatcher,
}

impl StatusWatcher {
    /// Establish a watch on `status_dir` and start the worker thread.
    ///
    /// Fails with `WatchUnavailable` if the directory cannot be created or
    /// the underlying notification mechanism cannot be established. This is
    /// non-fatal for the caller: the UI keeps running with stale statuses.
    pub fn spawn(
        status_dir: PathBuf,
        registry: Arc<StatusRegistry>,
        tx: mpsc::Sender<StatusEvent>,
    ) -> Result<Self, WatchError> {
        std::fs::create_dir_all(&status_dir)
            .map_err(|e| WatchError::WatchUnavailable(e.to_string()))?;

        let (fs_tx, fs_rx) = channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = fs_tx.send(event);
            }
        })
        .map_err(|e| WatchError::WatchUnavailable(e.to_string()))?;

        watcher
            .watch(&status_dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::WatchUnavailable(e.to_string()))?;

        // Apply any status files that already exist so a restart recovers
        // the last known statuses before the first hook fires.
        if scan_existing(&status_dir, &registry) {
            let _ = tx.try_send(StatusEvent);
        }

        std::thread::Builder::new()
            .name("status-watcher".to_string())
            .spawn(move || worker_loop(fs_rx, registry, tx))
            .map_err(|e| WatchError::WatchUnavailable(e.to_string()))?;

        Ok(Self { _watcher: watcher })
    }
}

/// UI-side handle for receiving status notifications.
///
/// A feed without a watcher behind it is valid and required: `recv` then
/// resolves immediately with `None` - no notification, no error - so the UI
/// loop runs unchanged in degraded mode.
pub struct StatusFeed {
    rx: Option<mpsc::Receiver<StatusEvent>>,
}

impl StatusFeed {
    pub fn new(rx: mpsc::Receiver<StatusEvent>) -> Self {
        Self { rx: Some(rx) }
    }

    pub fn disabled() -> Self {
        Self { rx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.rx.is_some()
    }

    /// Wait for the next notification. Returns `None` immediately when the
    /// feed is disabled, and promptly after the watcher is dropped.
    pub async fn recv(&mut self) -> Option<StatusEvent> {
        match &mut self.rx {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }
}

fn worker_loop(
    fs_rx: StdReceiver<Event>,
    registry: Arc<StatusRegistry>,
    tx: mpsc::Sender<StatusEvent>,
) {
    // Exits when the watcher is dropped and the fs channel disconnects.
    while let Ok(event) = fs_rx.recv() {
        let mut changed = apply_fs_event(&event, &registry);

        // Drain whatever else piled up so one burst of hook writes becomes
        // one notification.
        while let Ok(event) = fs_rx.try_recv() {
            changed |= apply_fs_event(&event, &registry);
        }

        if changed {
            match tx.try_send(StatusEvent) {
                Ok(()) => {}
                // Queue full: an undrained notification already covers this
                // change, re-reading is idempotent.
                Err(mpsc::error::TrySendError::Full(_)) => {}
                Err(mpsc::error::TrySendError::Closed(_)) => return,
            }
        }
    }
}

fn apply_fs_event(event: &Event, registry: &StatusRegistry) -> bool {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return false;
    }
    let mut changed = false;
    for path in &event.paths {
        changed |= apply_hook_file(path, registry);
    }
    changed
}

/// Re-read one hook status file and write it into the matching cell.
/// Returns true when a cell was updated. Malformed or unknown files are
/// skipped, not errors.
fn apply_hook_file(path: &Path, registry: &StatusRegistry) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return false;
    }
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    let id = SessionId::new(stem);
    let Some(cell) = registry.cell(&id) else {
        return false;
    };

    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        // The hook may still be mid-write; the next Modify event retries.
        Err(_) => return false,
    };
    let hook: HookStatus = match serde_json::from_str(&contents) {
        Ok(h) => h,
        Err(e) => {
            log::log(&format!("Ignoring malformed status file {}: {}", path.display(), e));
            return false;
        }
    };

    match hook.tool {
        Some(tool) => cell.set(hook.status, tool),
        None => cell.set_status(hook.status),
    }
    true
}

fn scan_existing(status_dir: &Path, registry: &StatusRegistry) -> bool {
    let mut changed = false;
    if let Ok(entries) = std::fs::read_dir(status_dir) {
        for entry in entries.flatten() {
            changed |= apply_hook_file(&entry.path(), registry);
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StatusCell;
    use std::time::Duration;

    fn registry_with(id: &str) -> (Arc<StatusRegistry>, Arc<StatusCell>) {
        let registry = StatusRegistry::new();
        let cell = Arc::new(StatusCell::new(SessionStatus::Starting, Tool::Claude));
        registry.register(SessionId::new(id), Arc::clone(&cell));
        (registry, cell)
    }

    #[tokio::test]
    async fn disabled_feed_returns_none_immediately() {
        let mut feed = StatusFeed::disabled();
        // Must resolve without waiting; the timeout is only a safety net.
        let result = tokio::time::timeout(Duration::from_millis(50), feed.recv()).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn hook_write_delivers_one_notification() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, cell) = registry_with("s1");
        let (tx, rx) = mpsc::channel(8);

        let watcher = StatusWatcher::spawn(dir.path().to_path_buf(), registry, tx).unwrap();
        let mut feed = StatusFeed::new(rx);

        std::fs::write(
            dir.path().join("s1.json"),
            r#"{"status": "running", "tool": "claude"}"#,
        )
        .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), feed.recv())
            .await
            .expect("notification within the window");
        assert_eq!(event, Some(StatusEvent));
        assert_eq!(cell.get(), (SessionStatus::Running, Tool::Claude));

        drop(watcher);
    }

    #[tokio::test]
    async fn dropping_the_watcher_ends_the_feed() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _cell) = registry_with("s1");
        let (tx, rx) = mpsc::channel(8);

        let watcher = StatusWatcher::spawn(dir.path().to_path_buf(), registry, tx).unwrap();
        let mut feed = StatusFeed::new(rx);

        drop(watcher);

        let result = tokio::time::timeout(Duration::from_secs(5), feed.recv()).await;
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn existing_files_are_applied_on_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, cell) = registry_with("s7");
        std::fs::write(
            dir.path().join("s7.json"),
            r#"{"status": "waiting"}"#,
        )
        .unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let _watcher = StatusWatcher::spawn(dir.path().to_path_buf(), registry, tx).unwrap();

        // Tool omitted: status updates, tool untouched.
        assert_eq!(cell.get(), (SessionStatus::Waiting, Tool::Claude));
        assert!(matches!(rx.try_recv(), Ok(StatusEvent)));
    }

    #[test]
    fn malformed_and_unknown_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, cell) = registry_with("s1");

        let bad = dir.path().join("s1.json");
        std::fs::write(&bad, "not json").unwrap();
        assert!(!apply_hook_file(&bad, &registry));
        assert_eq!(cell.status(), SessionStatus::Starting);

        let unknown = dir.path().join("ghost.json");
        std::fs::write(&unknown, r#"{"status": "idle"}"#).unwrap();
        assert!(!apply_hook_file(&unknown, &registry));

        let wrong_ext = dir.path().join("s1.tmp");
        std::fs::write(&wrong_ext, r#"{"status": "idle"}"#).unwrap();
        assert!(!apply_hook_file(&wrong_ext, &registry));
    }
}
