//! Tree-to-list projection.
//!
//! `flatten` turns the group/session tree into the ordered sequence of
//! display items that every keystroke and redraw addresses. It is a pure
//! function of the tree: same tree, same output, same order. Both the
//! renderer and the viewport index math depend on that determinism.

mod viewport;

pub use viewport::ViewState;

use crate::store::{GroupTree, Session, SessionId, SessionStatus, Tool};

/// Identity of a projected row, used for cursor re-resolution across
/// rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Group(String),
    Session(SessionId),
}

/// One row of the projected list. Ephemeral: rebuilt wholesale on every
/// projection pass and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub key: ItemKey,
    pub title: String,
    /// Absolute position in the projected sequence.
    pub index: usize,
    /// Rendering nesting depth. Forks are one step deeper than their parent
    /// session regardless of how deep the owning group is nested.
    pub level: usize,
    /// 1-9 hotkey for the first nine root groups.
    pub root_group_num: Option<u8>,
    /// True for the last session/subgroup emitted directly under its group;
    /// picks the terminal vs. mid tree-guide glyph.
    pub is_last_in_group: bool,
    pub is_sub_session: bool,
    /// True for the last fork of its parent session.
    pub is_last_sub_session: bool,
    /// Copied from the parent row before emission so the renderer never
    /// needs sibling lookahead: decides continuation guide vs. blank indent.
    pub parent_is_last_in_group: bool,

    // Group rows.
    pub expanded: bool,
    /// Recursive session count; unaffected by collapsing.
    pub session_count: usize,

    // Session rows: snapshots taken at projection time.
    pub status: Option<SessionStatus>,
    pub tool: Option<Tool>,
    pub has_worktree: bool,
    pub yolo_mode: bool,
}

impl Item {
    pub fn is_group(&self) -> bool {
        matches!(self.key, ItemKey::Group(_))
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        match &self.key {
            ItemKey::Session(id) => Some(id),
            ItemKey::Group(_) => None,
        }
    }

    pub fn group_path(&self) -> Option<&str> {
        match &self.key {
            ItemKey::Group(path) => Some(path),
            ItemKey::Session(_) => None,
        }
    }

    fn group(tree: &GroupTree, path: &str, name: &str, level: usize) -> Self {
        let group = tree.group(path);
        Self {
            key: ItemKey::Group(path.to_string()),
            title: name.to_string(),
            index: 0,
            level,
            root_group_num: None,
            is_last_in_group: false,
            is_sub_session: false,
            is_last_sub_session: false,
            parent_is_last_in_group: false,
            expanded: group.map(|g| g.expanded).unwrap_or(true),
            session_count: tree.recursive_session_count(path),
            status: None,
            tool: None,
            has_worktree: false,
            yolo_mode: false,
        }
    }

    fn session(session: &Session, level: usize) -> Self {
        let (status, tool) = session.status.get();
        Self {
            key: ItemKey::Session(session.id.clone()),
            title: session.title.clone(),
            index: 0,
            level,
            root_group_num: None,
            is_last_in_group: false,
            is_sub_session: session.is_sub_session(),
            is_last_sub_session: false,
            parent_is_last_in_group: false,
            expanded: false,
            session_count: 0,
            status: Some(status),
            tool: Some(tool),
            has_worktree: session.worktree_path.is_some(),
            yolo_mode: session.yolo_mode,
        }
    }
}

/// Project the tree into its display sequence.
///
/// Depth-first pre-order per root group in ascending path order, then the
/// ungrouped root sessions. Collapsed groups contribute their row only;
/// their recursive counts are computed regardless.
pub fn flatten(tree: &GroupTree) -> Vec<Item> {
    let mut items = vec![];

    let roots: Vec<_> = tree.root_groups().collect();
    let root_count = roots.len();
    for (i, group) in roots.into_iter().enumerate() {
        let num = if i < 9 { Some((i + 1) as u8) } else { None };
        emit_group(tree, &group.path, 0, num, i + 1 == root_count, &mut items);
    }

    let ungrouped = direct_sessions(tree, "");
    let last = ungrouped.len();
    for (i, session) in ungrouped.into_iter().enumerate() {
        emit_session(tree, session, 0, i + 1 == last, false, &mut items);
    }

    for (index, item) in items.iter_mut().enumerate() {
        item.index = index;
    }
    items
}

/// Direct (non-fork) sessions of a group in stored order.
fn direct_sessions<'a>(tree: &'a GroupTree, path: &str) -> Vec<&'a Session> {
    tree.sessions_in(path)
        .iter()
        .filter_map(|id| tree.session(id))
        .filter(|s| !s.is_sub_session())
        .collect()
}

fn emit_group(
    tree: &GroupTree,
    path: &str,
    level: usize,
    root_num: Option<u8>,
    is_last_in_parent: bool,
    items: &mut Vec<Item>,
) {
    let Some(group) = tree.group(path) else {
        return;
    };

    let mut item = Item::group(tree, path, &group.name, level);
    item.root_group_num = root_num;
    item.is_last_in_group = is_last_in_parent;
    let expanded = item.expanded;
    items.push(item);

    if !expanded {
        return;
    }

    let sessions = direct_sessions(tree, path);
    let subgroups = tree.child_groups(path);

    // "Last in group" spans sessions and subgroups together: only the final
    // direct child of the group gets the terminal guide.
    let session_count = sessions.len();
    for (i, session) in sessions.into_iter().enumerate() {
        let is_last = i + 1 == session_count && subgroups.is_empty();
        emit_session(tree, session, level + 1, is_last, false, items);
    }

    let subgroup_count = subgroups.len();
    for (i, subgroup) in subgroups.into_iter().enumerate() {
        emit_group(
            tree,
            &subgroup.path,
            level + 1,
            None,
            i + 1 == subgroup_count,
            items,
        );
    }
}

fn emit_session(
    tree: &GroupTree,
    session: &Session,
    level: usize,
    is_last: bool,
    parent_is_last: bool,
    items: &mut Vec<Item>,
) {
    let mut item = Item::session(session, level);
    if session.is_sub_session() {
        item.is_last_sub_session = is_last;
        item.parent_is_last_in_group = parent_is_last;
    } else {
        item.is_last_in_group = is_last;
    }
    items.push(item);

    // Forks nest immediately under their parent, one level deeper. The
    // parent's own "last" flag propagates down so indentation guides are
    // decided here, not in the renderer.
    let forks = tree.forks_of(&session.id);
    let fork_count = forks.len();
    for (i, fork) in forks.into_iter().enumerate() {
        emit_session(tree, fork, level + 1, i + 1 == fork_count, is_last, items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Tool;

    fn demo_tree() -> GroupTree {
        let mut tree = GroupTree::new();
        tree.create_group("backend", "backend").unwrap();
        tree
    }

    #[test]
    fn projection_is_deterministic() {
        let mut tree = GroupTree::new();
        tree.create_group("b", "b").unwrap();
        tree.create_group("a", "a").unwrap();
        tree.create_group("a/sub", "sub").unwrap();
        let s = tree.create_session("a", "one", Tool::Claude, None, false).unwrap();
        tree.fork_session(&s, "two").unwrap();
        tree.create_session("a/sub", "three", Tool::Codex, None, false).unwrap();

        let first = flatten(&tree);
        let second = flatten(&tree);
        assert_eq!(first, second);
        assert!(!first.is_empty());
        for (i, item) in first.iter().enumerate() {
            assert_eq!(item.index, i);
        }
    }

    #[test]
    fn group_with_session_and_fork() {
        // create "backend", session S1, fork S1 -> S2.
        let mut tree = demo_tree();
        let s1 = tree
            .create_session("backend", "S1", Tool::Claude, None, false)
            .unwrap();
        let s2 = tree.fork_session(&s1, "S2").unwrap();

        let items = flatten(&tree);
        assert_eq!(items.len(), 3);

        assert_eq!(items[0].key, ItemKey::Group("backend".to_string()));
        assert_eq!(items[0].level, 0);
        assert_eq!(items[0].root_group_num, Some(1));
        assert_eq!(items[0].session_count, 2);

        assert_eq!(items[1].key, ItemKey::Session(s1));
        assert_eq!(items[1].level, 1);
        assert!(items[1].is_last_in_group);
        assert!(!items[1].is_sub_session);

        assert_eq!(items[2].key, ItemKey::Session(s2));
        assert_eq!(items[2].level, 2);
        assert!(items[2].is_sub_session);
        assert!(items[2].is_last_sub_session);
        assert!(items[2].parent_is_last_in_group);
    }

    #[test]
    fn root_groups_are_numbered_in_path_order() {
        let mut tree = GroupTree::new();
        tree.create_group("b", "b").unwrap();
        tree.create_group("a", "a").unwrap();

        let items = flatten(&tree);
        assert_eq!(items[0].group_path(), Some("a"));
        assert_eq!(items[0].root_group_num, Some(1));
        assert_eq!(items[1].group_path(), Some("b"));
        assert_eq!(items[1].root_group_num, Some(2));
    }

    #[test]
    fn only_first_nine_root_groups_get_hotkeys() {
        let mut tree = GroupTree::new();
        for i in 0..11 {
            let path = format!("g{:02}", i);
            tree.create_group(&path, &path).unwrap();
        }
        let items = flatten(&tree);
        assert_eq!(items[8].root_group_num, Some(9));
        assert_eq!(items[9].root_group_num, None);
        assert_eq!(items[10].root_group_num, None);
    }

    #[test]
    fn collapsed_group_emits_no_descendants_but_keeps_count() {
        let mut tree = demo_tree();
        tree.create_group("backend/api", "api").unwrap();
        tree.create_session("backend", "s1", Tool::Claude, None, false).unwrap();
        tree.create_session("backend/api", "s2", Tool::Claude, None, false).unwrap();

        tree.toggle_expanded("backend").unwrap();
        let items = flatten(&tree);

        assert_eq!(items.len(), 1);
        assert!(!items[0].expanded);
        assert_eq!(items[0].session_count, 2);
    }

    #[test]
    fn last_in_group_spans_sessions_and_subgroups() {
        let mut tree = demo_tree();
        tree.create_group("backend/api", "api").unwrap();
        let s = tree
            .create_session("backend", "s", Tool::Claude, None, false)
            .unwrap();

        let items = flatten(&tree);
        // group, session, subgroup
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].key, ItemKey::Session(s));
        // A subgroup follows, so the session is not the terminal child.
        assert!(!items[1].is_last_in_group);
        assert_eq!(items[2].group_path(), Some("backend/api"));
        assert_eq!(items[2].level, 1);
        assert!(items[2].is_last_in_group);
        assert_eq!(items[2].root_group_num, None);
    }

    #[test]
    fn fork_flags_for_multiple_and_nested_forks() {
        let mut tree = demo_tree();
        let a = tree.create_session("backend", "a", Tool::Claude, None, false).unwrap();
        let b = tree.create_session("backend", "b", Tool::Claude, None, false).unwrap();
        let f1 = tree.fork_session(&a, "f1").unwrap();
        let f2 = tree.fork_session(&a, "f2").unwrap();
        let deep = tree.fork_session(&f2, "deep").unwrap();

        let items = flatten(&tree);
        let keys: Vec<_> = items.iter().map(|i| i.key.clone()).collect();
        assert_eq!(
            keys,
            vec![
                ItemKey::Group("backend".to_string()),
                ItemKey::Session(a),
                ItemKey::Session(f1.clone()),
                ItemKey::Session(f2.clone()),
                ItemKey::Session(deep.clone()),
                ItemKey::Session(b),
            ]
        );

        let f1_item = &items[2];
        assert!(f1_item.is_sub_session && !f1_item.is_last_sub_session);
        // a is not the group's last session (b follows).
        assert!(!f1_item.parent_is_last_in_group);

        let f2_item = &items[3];
        assert!(f2_item.is_last_sub_session);

        let deep_item = &items[4];
        assert_eq!(deep_item.level, 3);
        assert!(deep_item.is_last_sub_session);
        // deep's parent (f2) was the last fork of a.
        assert!(deep_item.parent_is_last_in_group);
    }

    #[test]
    fn ungrouped_sessions_follow_root_groups_at_level_zero() {
        let mut tree = demo_tree();
        let loose = tree.create_session("", "loose", Tool::Shell, None, false).unwrap();

        let items = flatten(&tree);
        assert_eq!(items.len(), 2);
        let last = &items[1];
        assert_eq!(last.key, ItemKey::Session(loose));
        assert_eq!(last.level, 0);
        assert_eq!(last.root_group_num, None);
        assert!(last.is_last_in_group);
    }

    #[test]
    fn session_rows_snapshot_status_and_tool() {
        let mut tree = demo_tree();
        let id = tree
            .create_session("backend", "s", Tool::Gemini, Some("/tmp/wt".into()), true)
            .unwrap();
        tree.session(&id)
            .unwrap()
            .status
            .set(SessionStatus::Waiting, Tool::Gemini);

        let items = flatten(&tree);
        let row = &items[1];
        assert_eq!(row.status, Some(SessionStatus::Waiting));
        assert_eq!(row.tool, Some(Tool::Gemini));
        assert!(row.has_worktree);
        assert!(row.yolo_mode);
    }
}
