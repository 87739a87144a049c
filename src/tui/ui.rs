use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::app::{App, InputMode};
use crate::list::Item;
use crate::prcache::{ChecksState, PrState};
use crate::store::SessionStatus;

use super::theme::Theme;

pub fn render(frame: &mut Frame, app: &mut App, theme: &Theme) {
    let area = frame.area();

    // Main vertical layout: logo, list, status/dialog line, hotkeys
    let main_layout = Layout::vertical([
        Constraint::Length(2), // Logo + spacing
        Constraint::Min(0),    // Session list
        Constraint::Length(1), // Dialog / inline message
        Constraint::Length(1), // Hotkeys
    ])
    .split(area);

    render_logo(frame, main_layout[0], theme);

    // The list pane height drives the viewport window.
    app.view.set_visible_count(main_layout[1].height as usize);
    render_list(frame, main_layout[1], app, theme);

    render_message_line(frame, main_layout[2], app, theme);
    render_hotkeys(frame, main_layout[3], app, theme);

    if app.input_mode == InputMode::Help {
        render_help(frame, area, theme);
    }
}

fn render_logo(frame: &mut Frame, area: Rect, theme: &Theme) {
    let padding = (area.width.saturating_sub(7)) / 2;
    let centered = Line::from(vec![
        Span::raw(" ".repeat(padding as usize)),
        Span::styled("hi", Style::new().fg(theme.logo_coral).bold()),
        Span::styled("ve", Style::new().fg(theme.logo_gold).bold()),
        Span::styled("mux", Style::new().fg(theme.logo_blue).bold()),
    ]);

    frame.render_widget(Paragraph::new(centered), area);
}

fn render_list(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let mut lines: Vec<Line> = vec![];

    let visible = app
        .items
        .iter()
        .skip(app.view.view_offset())
        .take(area.height as usize);

    for item in visible {
        let is_cursor = item.index == app.view.cursor();
        lines.push(render_item(item, is_cursor, app, theme));
    }

    if app.items.is_empty() {
        lines.push(Line::styled("No sessions", Style::new().fg(theme.text_dim)));
        lines.push(Line::styled(
            "Press [N] to create a group, [n] to create a session",
            Style::new().fg(theme.text_dim),
        ));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_item<'a>(item: &'a Item, is_cursor: bool, app: &App, theme: &Theme) -> Line<'a> {
    let mut spans = vec![Span::raw(if is_cursor { "> " } else { "  " })];

    spans.push(guide_prefix(item, theme));

    if item.is_group() {
        if let Some(num) = item.root_group_num {
            spans.push(Span::styled(
                format!("{}. ", num),
                Style::new().fg(theme.text_dim),
            ));
        }
        let marker = if item.expanded { "▾ " } else { "▸ " };
        spans.push(Span::styled(marker, Style::new().fg(theme.text_dim)));
        spans.push(Span::styled(
            item.title.as_str(),
            if is_cursor {
                Style::new().fg(theme.text).bold()
            } else {
                Style::new().fg(theme.text)
            },
        ));
        spans.push(Span::styled(
            format!(" ({})", item.session_count),
            Style::new().fg(theme.text_dim),
        ));
        return Line::from(spans);
    }

    // Session row: bulk-select mark, status glyph, title, tool, badges.
    if app.view.bulk_select() {
        let marked = item
            .session_id()
            .map(|id| app.view.is_selected(id))
            .unwrap_or(false);
        let mark = if marked { "[x] " } else { "[ ] " };
        spans.push(Span::styled(mark, Style::new().fg(theme.select_mark)));
    }

    if let Some(status) = item.status {
        spans.push(Span::styled("● ", Style::new().fg(status_color(status, theme))));
    }

    spans.push(Span::styled(
        item.title.as_str(),
        if is_cursor {
            Style::new().fg(theme.text).bold()
        } else {
            Style::new().fg(theme.text)
        },
    ));

    if let Some(tool) = &item.tool {
        spans.push(Span::styled(
            format!(" [{}]", tool.display_name()),
            Style::new().fg(theme.text_dim),
        ));
    }

    if item.yolo_mode {
        spans.push(Span::styled(" ⚡", Style::new().fg(theme.logo_gold)));
    }

    if item.has_worktree {
        if let Some(id) = item.session_id() {
            if let Some(pr) = app.pr_cache.get(id) {
                let color = match pr.state {
                    PrState::Open => theme.badge_open,
                    PrState::Merged => theme.badge_merged,
                    PrState::Closed => theme.badge_closed,
                };
                let checks = match pr.checks {
                    ChecksState::Pending => "○",
                    ChecksState::Passing => "✓",
                    ChecksState::Failing => "✗",
                };
                spans.push(Span::styled(
                    format!(" #{} {}", pr.number, checks),
                    Style::new().fg(color),
                ));
            }
        }
    }

    Line::from(spans)
}

/// Tree guides computed purely from the item's own flags; no sibling
/// lookahead, no re-walking the tree.
fn guide_prefix<'a>(item: &Item, theme: &Theme) -> Span<'a> {
    let style = Style::new().fg(theme.guide);

    if item.is_group() {
        let mut prefix = "  ".repeat(item.level);
        if item.level > 0 {
            prefix.push_str(if item.is_last_in_group { "└ " } else { "├ " });
        }
        return Span::styled(prefix, style);
    }

    if item.is_sub_session {
        // One guide column for the parent, then this fork's connector. The
        // parent flag decides continuation guide vs. blank space.
        let mut prefix = "   ".repeat(item.level.saturating_sub(2));
        prefix.push_str(if item.parent_is_last_in_group { "   " } else { "│  " });
        prefix.push_str(if item.is_last_sub_session { "└─ " } else { "├─ " });
        return Span::styled(prefix, style);
    }

    let mut prefix = "  ".repeat(item.level.saturating_sub(1));
    if item.level > 0 {
        prefix.push_str(if item.is_last_in_group { "└─ " } else { "├─ " });
    }
    Span::styled(prefix, style)
}

fn status_color(status: SessionStatus, theme: &Theme) -> ratatui::style::Color {
    match status {
        SessionStatus::Running => theme.status_running,
        SessionStatus::Waiting => theme.status_waiting,
        SessionStatus::Idle => theme.status_idle,
        SessionStatus::Error => theme.status_error,
        SessionStatus::Starting => theme.status_starting,
    }
}

fn render_message_line(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let line = match app.input_mode {
        InputMode::NewGroup | InputMode::NewSession | InputMode::ForkSession => {
            let Some(dialog) = &app.dialog else {
                return;
            };
            let label = match app.input_mode {
                InputMode::NewGroup => "New group path: ",
                InputMode::NewSession => "New session title: ",
                _ => "Fork title: ",
            };
            let mut spans = vec![
                Span::styled(label, Style::new().fg(theme.text_dim)),
                Span::styled(dialog.input.buffer.as_str(), Style::new().fg(theme.text)),
                Span::styled("▏", Style::new().fg(theme.text_dim)),
            ];
            // Inline error next to the offending input, never a dialog.
            if let Some(error) = &dialog.error {
                spans.push(Span::styled(
                    format!("  {}", error),
                    Style::new().fg(theme.error),
                ));
            }
            Line::from(spans)
        }
        InputMode::ConfirmDelete => {
            let Some(confirm) = &app.confirm else {
                return;
            };
            Line::from(vec![
                Span::styled(confirm.summary.as_str(), Style::new().fg(theme.error)),
                Span::styled("  [y/n]", Style::new().fg(theme.text_dim)),
            ])
        }
        _ => {
            if app.watch_active {
                return;
            }
            // Degraded mode: statuses are stale, nothing interrupts.
            Line::styled(
                "status updates unavailable",
                Style::new().fg(theme.text_dim),
            )
        }
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn render_hotkeys(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let keys: &[(&str, &str)] = match app.input_mode {
        InputMode::Normal => {
            if app.view.bulk_select() {
                &[
                    ("space", "mark"),
                    ("x", "delete marked"),
                    ("v", "leave select"),
                    ("q", "quit"),
                ]
            } else {
                &[
                    ("j/k", "move"),
                    ("1-9", "group"),
                    ("tab", "fold"),
                    ("N", "new group"),
                    ("n", "new session"),
                    ("f", "fork"),
                    ("x", "delete"),
                    ("v", "select"),
                    ("?", "help"),
                    ("q", "quit"),
                ]
            }
        }
        InputMode::ConfirmDelete => &[("y", "confirm"), ("n/esc", "cancel")],
        InputMode::Help => &[("esc", "close")],
        _ => &[("enter", "confirm"), ("esc", "cancel")],
    };

    let mut spans = vec![];
    for (key, desc) in keys {
        spans.push(Span::styled(
            format!(" {} ", key),
            Style::new().fg(theme.logo_gold),
        ));
        spans.push(Span::styled(
            format!("{} ", desc),
            Style::new().fg(theme.text_dim),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_help(frame: &mut Frame, area: Rect, theme: &Theme) {
    let width = 52.min(area.width);
    let height = 16.min(area.height);
    let popup = Rect {
        x: (area.width.saturating_sub(width)) / 2,
        y: (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    let entries = [
        ("j / k, arrows", "move cursor"),
        ("g / G", "first / last row"),
        ("1-9", "jump to root group"),
        ("tab / enter", "expand / collapse group"),
        ("N", "create group"),
        ("n", "create session"),
        ("f", "fork session under cursor"),
        ("x", "delete (asks first)"),
        ("v", "bulk-select mode"),
        ("space", "mark session in bulk-select"),
        ("?", "this help"),
        ("q", "quit"),
    ];

    let mut lines = vec![Line::raw("")];
    for (key, desc) in entries {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<14}", key), Style::new().fg(theme.logo_gold)),
            Span::styled(desc, Style::new().fg(theme.text)),
        ]));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" keys ")
        .style(Style::new().fg(theme.text_dim));

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}
