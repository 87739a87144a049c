use std::sync::Arc;

use crate::config::Config;
use crate::error::StoreError;
use crate::list::{self, Item, ItemKey, ViewState};
use crate::prcache::PrStatusCache;
use crate::status::StatusRegistry;
use crate::store::{GroupTree, SessionId, Tool};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,        // Navigation mode
    NewGroup,      // Entering a path for a new group
    NewSession,    // Entering a title for a new session
    ForkSession,   // Entering a title for a fork of the cursor session
    ConfirmDelete, // y/n confirmation before deleting
    Help,          // Help popup showing all hotkeys
}

/// Minimal single-line text input shared by the naming dialogs.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    pub buffer: String,
    pub cursor_position: usize,
}

impl TextInput {
    pub fn input_char(&mut self, c: char) {
        self.buffer.insert(self.cursor_position, c);
        self.cursor_position += c.len_utf8();
    }

    pub fn input_backspace(&mut self) {
        if self.cursor_position > 0 {
            let prev = self.buffer[..self.cursor_position]
                .chars()
                .next_back()
                .map(|c| c.len_utf8())
                .unwrap_or(0);
            self.cursor_position -= prev;
            self.buffer.remove(self.cursor_position);
        }
    }

    pub fn input_left(&mut self) {
        if self.cursor_position > 0 {
            let prev = self.buffer[..self.cursor_position]
                .chars()
                .next_back()
                .map(|c| c.len_utf8())
                .unwrap_or(0);
            self.cursor_position -= prev;
        }
    }

    pub fn input_right(&mut self) {
        if self.cursor_position < self.buffer.len() {
            let next = self.buffer[self.cursor_position..]
                .chars()
                .next()
                .map(|c| c.len_utf8())
                .unwrap_or(0);
            self.cursor_position += next;
        }
    }

    pub fn input_home(&mut self) {
        self.cursor_position = 0;
    }

    pub fn input_end(&mut self) {
        self.cursor_position = self.buffer.len();
    }
}

/// State for the naming dialogs (new group / new session / fork).
#[derive(Debug, Clone)]
pub struct NameDialog {
    pub input: TextInput,
    /// Group the new session lands in, or the path prefix for a new group.
    pub group_path: String,
    /// Parent for fork dialogs.
    pub fork_parent: Option<SessionId>,
    /// Inline validation error, shown next to the input, never fatal.
    pub error: Option<String>,
}

impl NameDialog {
    fn new(group_path: String, fork_parent: Option<SessionId>) -> Self {
        Self {
            input: TextInput::default(),
            group_path,
            fork_parent,
            error: None,
        }
    }
}

/// State for the delete confirmation.
#[derive(Debug, Clone)]
pub struct ConfirmDelete {
    pub targets: Vec<ItemKey>,
    pub summary: String,
}

pub struct App {
    pub tree: GroupTree,
    /// Latest projection; superseded wholesale by every rebuild.
    pub items: Vec<Item>,
    pub view: ViewState,
    pub registry: Arc<StatusRegistry>,
    pub pr_cache: PrStatusCache,
    pub config: Config,
    pub input_mode: InputMode,
    pub dialog: Option<NameDialog>,
    pub confirm: Option<ConfirmDelete>,
    /// True while the status watcher is running; false = degraded mode.
    pub watch_active: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: Config, registry: Arc<StatusRegistry>, pr_cache: PrStatusCache) -> Self {
        let mut app = Self {
            tree: GroupTree::new(),
            items: vec![],
            view: ViewState::new(),
            registry,
            pr_cache,
            config,
            input_mode: InputMode::Normal,
            dialog: None,
            confirm: None,
            watch_active: false,
            should_quit: false,
        };
        app.rebuild();
        app
    }

    /// Re-project the tree and re-derive cursor/scroll/selection validity.
    /// Called after every store mutation and every status notification.
    pub fn rebuild(&mut self) {
        self.items = list::flatten(&self.tree);
        self.view.rebuild(&self.items, &self.tree);
    }

    pub fn current_item(&self) -> Option<&Item> {
        self.view.current_item(&self.items)
    }

    // --- dialogs ---

    pub fn open_new_group(&mut self) {
        // New groups nest under the group row at the cursor, if any.
        let prefix = match self.current_item() {
            Some(item) => match &item.key {
                ItemKey::Group(path) => format!("{}/", path),
                ItemKey::Session(_) => String::new(),
            },
            None => String::new(),
        };
        let mut dialog = NameDialog::new(String::new(), None);
        for c in prefix.chars() {
            dialog.input.input_char(c);
        }
        self.dialog = Some(dialog);
        self.input_mode = InputMode::NewGroup;
    }

    pub fn open_new_session(&mut self) {
        // Sessions land in the group under the cursor; on a session row they
        // join that session's group, on an empty list they are ungrouped.
        let group_path = match self.current_item() {
            Some(item) => match &item.key {
                ItemKey::Group(path) => path.clone(),
                ItemKey::Session(id) => self
                    .tree
                    .session(id)
                    .map(|s| s.group_path.clone())
                    .unwrap_or_default(),
            },
            None => String::new(),
        };
        self.dialog = Some(NameDialog::new(group_path, None));
        self.input_mode = InputMode::NewSession;
    }

    pub fn open_fork(&mut self) {
        let Some(parent) = self.current_item().and_then(|i| i.session_id()).cloned() else {
            return;
        };
        self.dialog = Some(NameDialog::new(String::new(), Some(parent)));
        self.input_mode = InputMode::ForkSession;
    }

    pub fn close_dialog(&mut self) {
        self.dialog = None;
        self.input_mode = InputMode::Normal;
    }

    /// Submit the open naming dialog. Store errors come back inline on the
    /// dialog; the dialog closes only on success.
    pub fn submit_dialog(&mut self) {
        let Some(dialog) = self.dialog.clone() else {
            return;
        };
        let text = dialog.input.buffer.trim().to_string();

        let result = match self.input_mode {
            InputMode::NewGroup => self.submit_new_group(&text),
            InputMode::NewSession => self.submit_new_session(&dialog.group_path, &text),
            InputMode::ForkSession => match &dialog.fork_parent {
                Some(parent) => self.submit_fork(parent.clone(), &text),
                None => return,
            },
            _ => return,
        };

        match result {
            Ok(key) => {
                self.close_dialog();
                self.rebuild();
                self.view.jump_to_key(&self.items, &key);
            }
            Err(e) => {
                if let Some(dialog) = &mut self.dialog {
                    dialog.error = Some(e.to_string());
                }
            }
        }
    }

    fn submit_new_group(&mut self, path: &str) -> Result<ItemKey, StoreError> {
        let name = path.rsplit('/').next().unwrap_or(path);
        self.tree.create_group(path, name)?;
        Ok(ItemKey::Group(path.to_string()))
    }

    fn submit_new_session(&mut self, group_path: &str, title: &str) -> Result<ItemKey, StoreError> {
        let tool = self.config.default_tool();
        let id = self
            .tree
            .create_session(group_path, title, tool, None, false)?;
        self.register_status(&id);
        Ok(ItemKey::Session(id))
    }

    fn submit_fork(&mut self, parent: SessionId, title: &str) -> Result<ItemKey, StoreError> {
        let id = self.tree.fork_session(&parent, title)?;
        self.register_status(&id);
        Ok(ItemKey::Session(id))
    }

    fn register_status(&self, id: &SessionId) {
        if let Some(session) = self.tree.session(id) {
            self.registry
                .register(id.clone(), Arc::clone(&session.status));
        }
    }

    // --- deletion ---

    /// Open the confirmation dialog for the pending delete: the bulk
    /// selection when active and non-empty, the cursor row otherwise.
    pub fn request_delete(&mut self) {
        let targets: Vec<ItemKey> = if self.view.bulk_select() && !self.view.selected().is_empty() {
            let mut ids: Vec<_> = self.view.selected().iter().cloned().collect();
            ids.sort();
            ids.into_iter().map(ItemKey::Session).collect()
        } else {
            match self.current_item() {
                Some(item) => vec![item.key.clone()],
                None => return,
            }
        };

        let summary = match targets.as_slice() {
            [ItemKey::Group(path)] => {
                let count = self.tree.recursive_session_count(path);
                format!("Delete group '{}' and its {} session(s)?", path, count)
            }
            [ItemKey::Session(id)] => {
                let title = self
                    .tree
                    .session(id)
                    .map(|s| s.title.clone())
                    .unwrap_or_else(|| id.to_string());
                format!("Delete session '{}'?", title)
            }
            many => format!("Delete {} selected session(s)?", many.len()),
        };

        self.confirm = Some(ConfirmDelete { targets, summary });
        self.input_mode = InputMode::ConfirmDelete;
    }

    pub fn cancel_delete(&mut self) {
        self.confirm = None;
        self.input_mode = InputMode::Normal;
    }

    pub fn confirm_delete(&mut self) {
        let Some(confirm) = self.confirm.take() else {
            return;
        };
        for target in confirm.targets {
            match target {
                ItemKey::Session(id) => self.delete_session(&id),
                ItemKey::Group(path) => self.delete_group_recursive(&path),
            }
        }
        self.input_mode = InputMode::Normal;
        self.rebuild();
        if self.view.bulk_select() && self.view.selected().is_empty() {
            self.view.exit_bulk_select();
        }
    }

    fn delete_session(&mut self, id: &SessionId) {
        if self.tree.delete_session(id).is_ok() {
            self.registry.unregister(id);
        }
    }

    /// Recursive group deletion, composed from the store's all-or-nothing
    /// primitives: sessions first, then groups bottom-up.
    fn delete_group_recursive(&mut self, path: &str) {
        let prefix = format!("{}/", path);
        let mut group_paths: Vec<String> = self
            .tree
            .groups()
            .map(|g| g.path.clone())
            .filter(|p| p == path || p.starts_with(&prefix))
            .collect();

        for group_path in &group_paths {
            let ids: Vec<SessionId> = self.tree.sessions_in(group_path).to_vec();
            for id in ids {
                self.delete_session(&id);
            }
        }

        // Deepest paths first so every delete_group sees an empty group.
        group_paths.sort_by(|a, b| b.len().cmp(&a.len()).then(b.cmp(a)));
        for group_path in group_paths {
            if let Err(e) = self.tree.delete_group(&group_path) {
                crate::log::log(&format!("Failed to delete group {}: {}", group_path, e));
            }
        }
    }

    // --- navigation ---

    pub fn toggle_expand_under_cursor(&mut self) {
        let Some(path) = self.current_item().and_then(|i| i.group_path()) else {
            return;
        };
        let path = path.to_string();
        if self.tree.toggle_expanded(&path).is_ok() {
            self.rebuild();
            // Keep the cursor on the toggled group row.
            self.view.jump_to_key(&self.items, &ItemKey::Group(path));
        }
    }

    /// Jump to the root group with the given 1-9 hotkey.
    pub fn jump_root_group(&mut self, num: u8) {
        let key = self
            .items
            .iter()
            .find(|item| item.root_group_num == Some(num))
            .map(|item| item.key.clone());
        if let Some(key) = key {
            self.view.jump_to_key(&self.items, &key);
        }
    }

    /// Seed a few groups and sessions for UI development.
    #[allow(dead_code)]
    pub fn with_mock_data(mut self) -> Self {
        self.tree.create_group("backend", "backend").unwrap();
        self.tree.create_group("frontend", "frontend").unwrap();
        let s = self
            .tree
            .create_session("backend", "api-refactor", Tool::Claude, None, false)
            .unwrap();
        self.tree.fork_session(&s, "api-refactor-alt").unwrap();
        self.tree
            .create_session("frontend", "landing-page", Tool::Codex, None, false)
            .unwrap();
        self.rebuild();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        let (cache, _writer) = PrStatusCache::new();
        App::new(Config::default(), StatusRegistry::new(), cache)
    }

    #[test]
    fn dialog_error_is_inline_and_keeps_dialog_open() {
        let mut app = app();
        app.open_new_group();
        // Empty path is invalid; the dialog must stay open with an error.
        app.submit_dialog();
        assert_eq!(app.input_mode, InputMode::NewGroup);
        assert!(app.dialog.as_ref().unwrap().error.is_some());
    }

    #[test]
    fn create_group_then_session_then_fork_via_dialogs() {
        let mut app = app();
        app.open_new_group();
        for c in "backend".chars() {
            app.dialog.as_mut().unwrap().input.input_char(c);
        }
        app.submit_dialog();
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.tree.group("backend").is_some());

        // Cursor is on the new group row; a new session joins it.
        app.open_new_session();
        for c in "S1".chars() {
            app.dialog.as_mut().unwrap().input.input_char(c);
        }
        app.submit_dialog();
        assert_eq!(app.tree.recursive_session_count("backend"), 1);
        assert_eq!(app.registry.len(), 1);

        // Cursor followed the new session; fork it.
        app.open_fork();
        for c in "S2".chars() {
            app.dialog.as_mut().unwrap().input.input_char(c);
        }
        app.submit_dialog();
        assert_eq!(app.tree.recursive_session_count("backend"), 2);
        assert_eq!(app.items.len(), 3);
        assert_eq!(app.registry.len(), 2);
    }

    #[test]
    fn group_delete_is_recursive_and_unregisters() {
        let mut app = app();
        app.tree.create_group("g", "g").unwrap();
        app.tree.create_group("g/sub", "sub").unwrap();
        let a = app.tree.create_session("g", "a", Tool::Claude, None, false).unwrap();
        let b = app
            .tree
            .create_session("g/sub", "b", Tool::Claude, None, false)
            .unwrap();
        app.register_status(&a);
        app.register_status(&b);
        app.rebuild();

        app.view.jump_first(&app.items);
        app.request_delete();
        assert_eq!(app.input_mode, InputMode::ConfirmDelete);
        app.confirm_delete();

        assert!(app.tree.is_empty());
        assert!(app.items.is_empty());
        assert!(app.registry.is_empty());
    }

    #[test]
    fn bulk_delete_acts_on_the_selection() {
        let mut app = app();
        app.tree.create_group("g", "g").unwrap();
        let a = app.tree.create_session("g", "a", Tool::Claude, None, false).unwrap();
        let _b = app.tree.create_session("g", "b", Tool::Claude, None, false).unwrap();
        app.rebuild();

        app.view.toggle_bulk_select();
        app.view.jump_to_key(&app.items, &ItemKey::Session(a.clone()));
        app.view.toggle_mark(&app.items);

        app.request_delete();
        app.confirm_delete();

        assert!(app.tree.session(&a).is_none());
        assert_eq!(app.tree.session_count(), 1);
        // Selection drained; bulk mode ends with it.
        assert!(!app.view.bulk_select());
    }

    #[test]
    fn expand_toggle_keeps_cursor_on_the_group() {
        let mut app = app();
        app.tree.create_group("g", "g").unwrap();
        app.tree.create_session("g", "s", Tool::Claude, None, false).unwrap();
        app.rebuild();

        app.toggle_expand_under_cursor();
        assert_eq!(app.items.len(), 1);
        assert_eq!(app.current_item().unwrap().group_path(), Some("g"));

        app.toggle_expand_under_cursor();
        assert_eq!(app.items.len(), 2);
    }

    #[test]
    fn hotkey_jumps_to_root_group() {
        let mut app = app();
        app.tree.create_group("a", "a").unwrap();
        app.tree.create_group("b", "b").unwrap();
        app.tree.create_session("a", "s", Tool::Claude, None, false).unwrap();
        app.rebuild();

        app.jump_root_group(2);
        assert_eq!(app.current_item().unwrap().group_path(), Some("b"));
        app.jump_root_group(1);
        assert_eq!(app.current_item().unwrap().group_path(), Some("a"));
    }
}
