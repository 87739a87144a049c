use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use serde::{Deserialize, Deserializer};

/// Opaque session identifier, unique across the whole store and immutable
/// after creation. Also used as the file stem of hook status files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The external agent tool backing a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tool {
    Claude,
    Gemini,
    Codex,
    Aider,
    Cursor,
    Shell,
    Opencode,
    /// User-defined tool identifier from config or a hook file.
    Custom(String),
}

impl Tool {
    /// Parse a tool name as written by hook scripts. Unknown names become
    /// `Custom` rather than an error, so new tools work without a release.
    pub fn from_name(name: &str) -> Self {
        match name {
            "claude" => Tool::Claude,
            "gemini" => Tool::Gemini,
            "codex" => Tool::Codex,
            "aider" => Tool::Aider,
            "cursor" => Tool::Cursor,
            "shell" => Tool::Shell,
            "opencode" => Tool::Opencode,
            other => Tool::Custom(other.to_string()),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Tool::Claude => "claude",
            Tool::Gemini => "gemini",
            Tool::Codex => "codex",
            Tool::Aider => "aider",
            Tool::Cursor => "cursor",
            Tool::Shell => "shell",
            Tool::Opencode => "opencode",
            Tool::Custom(name) => name,
        }
    }
}

impl<'de> Deserialize<'de> for Tool {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Tool::from_name(&name))
    }
}

/// Live status of a session, written concurrently by the status watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Running,
    Waiting,
    Error,
    Starting,
}

impl SessionStatus {
    #[allow(dead_code)]
    pub fn display(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Running => "running",
            SessionStatus::Waiting => "waiting",
            SessionStatus::Error => "error",
            SessionStatus::Starting => "starting...",
        }
    }

    #[allow(dead_code)]
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Running | SessionStatus::Starting)
    }
}

/// The only session fields mutated outside the UI loop, behind a lock.
///
/// The watcher thread writes through `set`, render passes read through
/// `get`; neither side can observe a torn (status, tool) pair.
#[derive(Debug)]
pub struct StatusCell {
    inner: RwLock<(SessionStatus, Tool)>,
}

impl StatusCell {
    pub fn new(status: SessionStatus, tool: Tool) -> Self {
        Self {
            inner: RwLock::new((status, tool)),
        }
    }

    pub fn get(&self) -> (SessionStatus, Tool) {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.get().0
    }

    pub fn set(&self, status: SessionStatus, tool: Tool) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = (status, tool);
    }

    pub fn set_status(&self, status: SessionStatus) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.0 = status;
    }
}

/// One managed agent session. All fields except the status cell are owned
/// and mutated by the UI loop only.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub title: String,
    /// Path of the owning group; empty string = ungrouped root session.
    pub group_path: String,
    /// Set when this session was created by forking another session.
    pub parent_session_id: Option<SessionId>,
    /// Shared with the status watcher; the only cross-thread state.
    pub status: Arc<StatusCell>,
    /// Present when the session is backed by an isolated checkout; gates
    /// pull-request badge lookups.
    pub worktree_path: Option<PathBuf>,
    /// Tool runs with all permission prompts auto-accepted. Rendering only.
    pub yolo_mode: bool,
    pub created_at: SystemTime,
}

impl Session {
    pub fn new(
        id: SessionId,
        title: String,
        group_path: String,
        tool: Tool,
        worktree_path: Option<PathBuf>,
        yolo_mode: bool,
    ) -> Self {
        Self {
            id,
            title,
            group_path,
            parent_session_id: None,
            status: Arc::new(StatusCell::new(SessionStatus::Starting, tool)),
            worktree_path,
            yolo_mode,
            created_at: SystemTime::now(),
        }
    }

    pub fn is_sub_session(&self) -> bool {
        self.parent_session_id.is_some()
    }

    pub fn tool(&self) -> Tool {
        self.status.get().1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_from_name_known_and_custom() {
        assert_eq!(Tool::from_name("claude"), Tool::Claude);
        assert_eq!(Tool::from_name("opencode"), Tool::Opencode);
        assert_eq!(
            Tool::from_name("my-agent"),
            Tool::Custom("my-agent".to_string())
        );
    }

    #[test]
    fn status_cell_roundtrip() {
        let cell = StatusCell::new(SessionStatus::Starting, Tool::Shell);
        cell.set(SessionStatus::Running, Tool::Claude);
        assert_eq!(cell.get(), (SessionStatus::Running, Tool::Claude));
    }

    #[test]
    fn concurrent_status_writes_never_tear() {
        use std::sync::Arc;
        use std::thread;

        let cell = Arc::new(StatusCell::new(SessionStatus::Idle, Tool::Claude));

        // Writer flips between two internally-consistent pairs; the reader
        // must only ever observe one of those exact pairs.
        let writer = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || {
                for i in 0..5_000 {
                    if i % 2 == 0 {
                        cell.set(SessionStatus::Running, Tool::Claude);
                    } else {
                        cell.set(SessionStatus::Waiting, Tool::Gemini);
                    }
                }
            })
        };

        let reader = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || {
                for _ in 0..5_000 {
                    let pair = cell.get();
                    assert!(
                        pair == (SessionStatus::Running, Tool::Claude)
                            || pair == (SessionStatus::Waiting, Tool::Gemini)
                            || pair == (SessionStatus::Idle, Tool::Claude),
                        "torn read: {:?}",
                        pair
                    );
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
    }
}
