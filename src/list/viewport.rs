//! Cursor, scroll offset, and bulk-select state over the projected list.
//!
//! The view never stores raw indexes across rebuilds: the cursor is
//! remembered by item identity and re-resolved against the new sequence, so
//! inserts and deletes above the cursor cannot leave it on an unrelated row.

use std::collections::HashSet;

use crate::store::{GroupTree, SessionId};

use super::{Item, ItemKey};

#[derive(Debug, Default)]
pub struct ViewState {
    cursor: usize,
    view_offset: usize,
    visible_count: usize,
    /// Identity of the row under the cursor, for re-resolution on rebuild.
    cursor_key: Option<ItemKey>,
    bulk_select: bool,
    selected: HashSet<SessionId>,
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            visible_count: 1,
            ..Self::default()
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn view_offset(&self) -> usize {
        self.view_offset
    }

    pub fn bulk_select(&self) -> bool {
        self.bulk_select
    }

    pub fn selected(&self) -> &HashSet<SessionId> {
        &self.selected
    }

    pub fn is_selected(&self, id: &SessionId) -> bool {
        self.selected.contains(id)
    }

    /// Called by the renderer with the list pane height before index math.
    pub fn set_visible_count(&mut self, count: usize) {
        self.visible_count = count.max(1);
        self.scroll_into_view();
    }

    pub fn current_item<'a>(&self, items: &'a [Item]) -> Option<&'a Item> {
        items.get(self.cursor)
    }

    // --- cursor movement ---

    pub fn move_down(&mut self, items: &[Item]) {
        if self.cursor + 1 < items.len() {
            self.cursor += 1;
        }
        self.after_move(items);
    }

    pub fn move_up(&mut self, items: &[Item]) {
        self.cursor = self.cursor.saturating_sub(1);
        self.after_move(items);
    }

    pub fn jump_first(&mut self, items: &[Item]) {
        self.cursor = 0;
        self.after_move(items);
    }

    pub fn jump_last(&mut self, items: &[Item]) {
        self.cursor = items.len().saturating_sub(1);
        self.after_move(items);
    }

    /// Jump to the row with the given identity, if present.
    pub fn jump_to_key(&mut self, items: &[Item], key: &ItemKey) {
        if let Some(pos) = items.iter().position(|item| &item.key == key) {
            self.cursor = pos;
            self.after_move(items);
        }
    }

    fn after_move(&mut self, items: &[Item]) {
        self.cursor_key = items.get(self.cursor).map(|item| item.key.clone());
        self.scroll_into_view();
    }

    /// Re-establish `view_offset <= cursor < view_offset + visible_count` by
    /// scrolling the offset; the cursor is never clamped to fit the window.
    fn scroll_into_view(&mut self) {
        if self.cursor < self.view_offset {
            self.view_offset = self.cursor;
        } else if self.cursor >= self.view_offset + self.visible_count {
            self.view_offset = self.cursor + 1 - self.visible_count;
        }
    }

    // --- rebuild ---

    /// Re-derive cursor and selection validity after the store mutated and
    /// the list was re-projected. The cursor follows its remembered identity
    /// when the row still exists, and clamps to the nearest valid index only
    /// when it vanished. Selected ids for deleted sessions are pruned.
    pub fn rebuild(&mut self, items: &[Item], tree: &GroupTree) {
        if items.is_empty() {
            self.cursor = 0;
            self.view_offset = 0;
            self.cursor_key = None;
        } else {
            let resolved = self
                .cursor_key
                .as_ref()
                .and_then(|key| items.iter().position(|item| &item.key == key));
            self.cursor = resolved.unwrap_or_else(|| self.cursor.min(items.len() - 1));
            self.after_move(items);
        }

        self.selected.retain(|id| tree.session(id).is_some());
    }

    // --- bulk select ---

    pub fn enter_bulk_select(&mut self) {
        self.bulk_select = true;
    }

    pub fn exit_bulk_select(&mut self) {
        self.bulk_select = false;
        self.selected.clear();
    }

    pub fn toggle_bulk_select(&mut self) {
        if self.bulk_select {
            self.exit_bulk_select();
        } else {
            self.enter_bulk_select();
        }
    }

    /// Toggle membership of the session under the cursor. Group rows are not
    /// selectable members; outside bulk mode this is a no-op.
    pub fn toggle_mark(&mut self, items: &[Item]) {
        if !self.bulk_select {
            return;
        }
        let Some(id) = items.get(self.cursor).and_then(|item| item.session_id()) else {
            return;
        };
        if !self.selected.remove(id) {
            self.selected.insert(id.clone());
        }
    }

    /// Check the viewport invariant; exposed for tests.
    #[cfg(test)]
    fn invariant_holds(&self, items: &[Item]) -> bool {
        items.is_empty()
            || (self.view_offset <= self.cursor
                && self.cursor < self.view_offset + self.visible_count
                && self.cursor < items.len())
    }
}
