use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{StoreError, StoreResult};

use super::session::{Session, SessionId, Tool};

const MAX_NAME_LEN: usize = 80;

/// A named, hierarchically-pathed container of sessions and subgroups.
///
/// Paths are slash-delimited; a group's parent is its path minus the last
/// segment. Cycles are impossible because parentage is derived by string
/// prefixing, never by object references.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub path: String,
    pub name: String,
    /// In-memory UI toggle; collapsing never changes session counts.
    pub expanded: bool,
    /// Session ids placed directly in this group (forks included), in
    /// insertion order. Not recursive.
    pub sessions: Vec<SessionId>,
}

impl Group {
    fn new(path: String, name: String) -> Self {
        Self {
            path,
            name,
            expanded: true,
            sessions: vec![],
        }
    }

    /// Parent group path, or `None` for a root group.
    #[allow(dead_code)]
    pub fn parent_path(&self) -> Option<&str> {
        self.path.rsplit_once('/').map(|(parent, _)| parent)
    }

    pub fn is_root(&self) -> bool {
        !self.path.contains('/')
    }
}

/// The canonical session/group tree.
///
/// Owns the `path -> Group` mapping and every session. All mutations are
/// synchronous, run on the UI loop, and are all-or-nothing: an error leaves
/// the tree untouched. Only per-session status cells are shared with other
/// threads (see `StatusCell`).
pub struct GroupTree {
    // BTreeMap gives deterministic ascending-path iteration, which the
    // projector relies on for stable root group ordering and hotkeys.
    groups: BTreeMap<String, Group>,
    sessions: BTreeMap<SessionId, Session>,
    /// Sessions with an empty group path, in insertion order.
    ungrouped: Vec<SessionId>,
    next_id: u64,
}

impl GroupTree {
    pub fn new() -> Self {
        Self {
            groups: BTreeMap::new(),
            sessions: BTreeMap::new(),
            ungrouped: vec![],
            next_id: 1,
        }
    }

    // --- lookups ---

    pub fn group(&self, path: &str) -> Option<&Group> {
        self.groups.get(path)
    }

    pub fn session(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// All groups in ascending path order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Root groups in ascending path order.
    pub fn root_groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values().filter(|g| g.is_root())
    }

    /// Direct subgroups of `path`, in ascending path order.
    pub fn child_groups(&self, path: &str) -> Vec<&Group> {
        let prefix = format!("{}/", path);
        self.groups
            .range(prefix.clone()..)
            .take_while(|(p, _)| p.starts_with(&prefix))
            .filter(|(p, _)| !p[prefix.len()..].contains('/'))
            .map(|(_, g)| g)
            .collect()
    }

    /// Session ids directly in `path` ("" = ungrouped), insertion order.
    pub fn sessions_in(&self, path: &str) -> &[SessionId] {
        if path.is_empty() {
            &self.ungrouped
        } else {
            self.groups.get(path).map(|g| g.sessions.as_slice()).unwrap_or(&[])
        }
    }

    /// Forks of `parent`, in the owning collection's stored order.
    pub fn forks_of(&self, parent: &SessionId) -> Vec<&Session> {
        let group_path = match self.sessions.get(parent) {
            Some(s) => s.group_path.as_str(),
            None => return vec![],
        };
        self.sessions_in(group_path)
            .iter()
            .filter_map(|id| self.sessions.get(id))
            .filter(|s| s.parent_session_id.as_ref() == Some(parent))
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty() && self.groups.is_empty()
    }

    /// Number of sessions in `path` and every group below it. Independent of
    /// any group's expanded state.
    pub fn recursive_session_count(&self, path: &str) -> usize {
        let prefix = format!("{}/", path);
        self.groups
            .iter()
            .filter(|(p, _)| *p == path || p.starts_with(&prefix))
            .map(|(_, g)| g.sessions.len())
            .sum()
    }

    // --- mutations ---

    /// Create a group at `path`. Parent segments must already exist; there is
    /// no implicit mkdir -p.
    pub fn create_group(&mut self, path: &str, name: &str) -> StoreResult<()> {
        validate_path(path)?;
        let name = validate_name(name)?;

        if self.groups.contains_key(path) {
            return Err(StoreError::PathConflict(path.to_string()));
        }
        if let Some((parent, _)) = path.rsplit_once('/') {
            if !self.groups.contains_key(parent) {
                return Err(StoreError::InvalidPath(path.to_string()));
            }
        }

        self.groups
            .insert(path.to_string(), Group::new(path.to_string(), name));
        Ok(())
    }

    /// Create a session directly in `group_path` ("" = ungrouped root).
    pub fn create_session(
        &mut self,
        group_path: &str,
        title: &str,
        tool: Tool,
        worktree_path: Option<PathBuf>,
        yolo_mode: bool,
    ) -> StoreResult<SessionId> {
        let title = validate_name(title)?;
        if !group_path.is_empty() && !self.groups.contains_key(group_path) {
            return Err(StoreError::InvalidGroup(group_path.to_string()));
        }

        let id = self.alloc_id();
        let session = Session::new(
            id.clone(),
            title,
            group_path.to_string(),
            tool,
            worktree_path,
            yolo_mode,
        );
        self.sessions.insert(id.clone(), session);
        self.owning_list_mut(group_path).push(id.clone());
        Ok(id)
    }

    /// Fork `parent_id` into a sub-session. The fork inherits the parent's
    /// group path (it counts toward that group) but is rendered nested under
    /// the parent, not under the group directly.
    pub fn fork_session(&mut self, parent_id: &SessionId, title: &str) -> StoreResult<SessionId> {
        let title = validate_name(title)?;
        let (group_path, tool, worktree, yolo) = match self.sessions.get(parent_id) {
            Some(parent) => (
                parent.group_path.clone(),
                parent.tool(),
                parent.worktree_path.clone(),
                parent.yolo_mode,
            ),
            None => return Err(StoreError::NotFound(parent_id.to_string())),
        };

        let id = self.alloc_id();
        let mut session = Session::new(id.clone(), title, group_path.clone(), tool, worktree, yolo);
        session.parent_session_id = Some(parent_id.clone());
        self.sessions.insert(id.clone(), session);
        self.owning_list_mut(&group_path).push(id.clone());
        Ok(id)
    }

    /// Delete a session. Forks of the deleted session are reparented to its
    /// parent; forks of a direct session become direct sessions of the group.
    pub fn delete_session(&mut self, id: &SessionId) -> StoreResult<Session> {
        let session = self
            .sessions
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let list = self.owning_list_mut(&session.group_path);
        list.retain(|s| s != id);

        let grandparent = session.parent_session_id.clone();
        for other in self.sessions.values_mut() {
            if other.parent_session_id.as_ref() == Some(id) {
                other.parent_session_id = grandparent.clone();
            }
        }

        Ok(session)
    }

    /// Delete an empty group. Groups with direct sessions or subgroups are
    /// refused; recursive deletion is a caller policy composed from these
    /// primitives.
    pub fn delete_group(&mut self, path: &str) -> StoreResult<Group> {
        let group = self
            .groups
            .get(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

        let prefix = format!("{}/", path);
        let has_subgroups = self.groups.keys().any(|p| p.starts_with(&prefix));
        if !group.sessions.is_empty() || has_subgroups {
            return Err(StoreError::GroupNotEmpty(path.to_string()));
        }

        self.groups
            .remove(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    /// Toggle a group's expanded flag, returning the new value.
    pub fn toggle_expanded(&mut self, path: &str) -> StoreResult<bool> {
        let group = self
            .groups
            .get_mut(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        group.expanded = !group.expanded;
        Ok(group.expanded)
    }

    fn alloc_id(&mut self) -> SessionId {
        let id = SessionId::new(format!("s{}", self.next_id));
        self.next_id += 1;
        id
    }

    fn owning_list_mut(&mut self, group_path: &str) -> &mut Vec<SessionId> {
        if group_path.is_empty() {
            &mut self.ungrouped
        } else {
            // The caller validated the group; a missing entry here is a bug.
            &mut self
                .groups
                .get_mut(group_path)
                .expect("session references missing group")
                .sessions
        }
    }
}

impl Default for GroupTree {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_path(path: &str) -> StoreResult<()> {
    let malformed = path.is_empty()
        || path.starts_with('/')
        || path.ends_with('/')
        || path.split('/').any(|seg| seg.is_empty());
    if malformed {
        Err(StoreError::InvalidPath(path.to_string()))
    } else {
        Ok(())
    }
}

fn validate_name(name: &str) -> StoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidName("name is empty".to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(StoreError::InvalidName(format!(
            "name exceeds {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}
