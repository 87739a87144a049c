mod app;
mod config;
mod error;
mod list;
mod log;
mod prcache;
mod status;
mod store;
mod tui;

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::prelude::*;
use std::io::stdout;
use tokio::sync::mpsc;

use app::{App, InputMode};
use config::Config;
use prcache::PrStatusCache;
use status::{StatusFeed, StatusRegistry, StatusWatcher};
use tui::theme::Theme;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging and panic hook
    if let Ok(log_path) = log::init() {
        log::log(&format!("Log file: {}", log_path.display()));
        log::install_panic_hook();
    }

    // Parse CLI arguments
    let args: Vec<String> = std::env::args().collect();
    let mut status_dir_override: Option<std::path::PathBuf> = None;
    let mut mock = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--status-dir" | "-s" => {
                if i + 1 < args.len() {
                    status_dir_override = Some(std::path::PathBuf::from(&args[i + 1]));
                    i += 2;
                    continue;
                } else {
                    eprintln!("Warning: --status-dir requires a path argument");
                }
            }
            "--mock" => mock = true,
            arg => eprintln!("Warning: ignoring unknown argument '{}'", arg),
        }
        i += 1;
    }

    // Load config with precedence: CLI > env var > config file > default
    let config = Config::load().with_overrides(status_dir_override);
    let theme = Theme::from_name(config.theme.as_deref());

    let registry = StatusRegistry::new();
    let (pr_cache, _pr_writer) = PrStatusCache::new();

    let mut app = App::new(config, registry.clone(), pr_cache);
    if mock {
        app = app.with_mock_data();
    }

    // Start the status watcher. Failure is degraded mode, never fatal: the
    // UI stays fully interactive, statuses just stop updating.
    let (status_tx, status_rx) = mpsc::channel(16);
    let (_watcher, mut feed) =
        match StatusWatcher::spawn(app.config.status_dir(), registry, status_tx) {
            Ok(watcher) => {
                app.watch_active = true;
                (Some(watcher), StatusFeed::new(status_rx))
            }
            Err(e) => {
                log::log(&format!("Status watching disabled: {}", e));
                (None, StatusFeed::disabled())
            }
        };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &mut feed, &theme).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(result?)
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    feed: &mut StatusFeed,
    theme: &Theme,
) -> error::Result<()> {
    let mut event_stream = EventStream::new();

    loop {
        terminal.draw(|frame| tui::ui::render(frame, app, theme))?;

        tokio::select! {
            // Terminal events (keyboard)
            maybe_event = event_stream.next() => {
                if let Some(Ok(Event::Key(key))) = maybe_event {
                    if key.kind == KeyEventKind::Press {
                        handle_key(app, key.code);
                    }
                }
            }
            // Status notifications from the watcher. No payload: the rebuild
            // re-reads every status cell, so re-delivery is harmless.
            notification = feed.recv(), if feed.is_enabled() => {
                match notification {
                    Some(_) => app.rebuild(),
                    None => {
                        // Watcher went away; keep running with stale status.
                        app.watch_active = false;
                        *feed = StatusFeed::disabled();
                    }
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, code: KeyCode) {
    match app.input_mode {
        InputMode::Normal => handle_normal_key(app, code),
        InputMode::NewGroup | InputMode::NewSession | InputMode::ForkSession => {
            handle_dialog_key(app, code)
        }
        InputMode::ConfirmDelete => match code {
            KeyCode::Char('y') | KeyCode::Enter => app.confirm_delete(),
            KeyCode::Char('n') | KeyCode::Esc => app.cancel_delete(),
            _ => {}
        },
        InputMode::Help => match code {
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => {
                app.input_mode = InputMode::Normal;
            }
            _ => {}
        },
    }
}

fn handle_normal_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.input_mode = InputMode::Help,

        KeyCode::Char('j') | KeyCode::Down => app.view.move_down(&app.items),
        KeyCode::Char('k') | KeyCode::Up => app.view.move_up(&app.items),
        KeyCode::Char('g') => app.view.jump_first(&app.items),
        KeyCode::Char('G') => app.view.jump_last(&app.items),

        // Number keys jump to root groups
        KeyCode::Char(c @ '1'..='9') => {
            app.jump_root_group(c as u8 - b'0');
        }

        KeyCode::Tab | KeyCode::Enter => app.toggle_expand_under_cursor(),

        KeyCode::Char('N') => app.open_new_group(),
        KeyCode::Char('n') => app.open_new_session(),
        KeyCode::Char('f') => app.open_fork(),
        KeyCode::Char('x') => app.request_delete(),

        KeyCode::Char('v') => app.view.toggle_bulk_select(),
        KeyCode::Char(' ') => app.view.toggle_mark(&app.items),

        _ => {}
    }
}

fn handle_dialog_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => app.close_dialog(),
        KeyCode::Enter => app.submit_dialog(),
        _ => {
            let Some(dialog) = &mut app.dialog else {
                return;
            };
            match code {
                KeyCode::Char(c) => {
                    dialog.input.input_char(c);
                    dialog.error = None;
                }
                KeyCode::Backspace => {
                    dialog.input.input_backspace();
                    dialog.error = None;
                }
                KeyCode::Left => dialog.input.input_left(),
                KeyCode::Right => dialog.input.input_right(),
                KeyCode::Home => dialog.input.input_home(),
                KeyCode::End => dialog.input.input_end(),
                _ => {}
            }
        }
    }
}
