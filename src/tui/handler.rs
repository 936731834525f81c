//! Async event loop for the gallery TUI.

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use is_terminal::IsTerminal;
use ratatui::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{
    app::{App, InputMode},
    events::TuiEvent,
    ui::render_ui,
};
use crate::{
    config::Config,
    gallery::{normalized_click, GallerySession, Intent},
    resource::ResourceFetcher,
    webeval::{coerce_string_list, snippets, EvalClient, Vars},
};

/// Run the gallery TUI until the user quits.
pub async fn run_gallery(cfg: &Config) -> Result<()> {
    if !io::stdout().is_terminal() {
        return Err(anyhow::anyhow!("gallery mode requires a proper terminal environment"));
    }

    let client = EvalClient::from_config(cfg)?;
    let fetcher = ResourceFetcher::from_config(cfg)?;
    let mut session = GallerySession::from_config(cfg);

    // glob_search must exist remotely before the first listing call
    if !cfg.get_bool("DISABLE_BOOTSTRAP") {
        match client.exeval(snippets::BOOTSTRAP, Vars::new(), true).await {
            Ok(_) => info!("bootstrap complete"),
            Err(e) => session.notices.push(e.to_string()),
        }
    }

    let mut app = App::new(session, cfg.selection_path());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (event_tx, event_rx) = mpsc::unbounded_channel::<TuiEvent>();
    let result = run_app(&mut terminal, &mut app, client, fetcher, event_tx, event_rx).await;

    // Restore terminal
    disable_raw_mode()?;
    terminal.backend_mut().execute(DisableMouseCapture)?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    client: EvalClient,
    fetcher: ResourceFetcher,
    event_tx: mpsc::UnboundedSender<TuiEvent>,
    mut event_rx: mpsc::UnboundedReceiver<TuiEvent>,
) -> Result<()> {
    // Spawn input handler
    let input_tx = event_tx.clone();
    tokio::task::spawn_blocking(move || loop {
        if event::poll(Duration::from_millis(100)).unwrap_or(false) {
            let forwarded = match event::read() {
                Ok(Event::Key(key)) => input_tx.send(TuiEvent::Key(key)),
                Ok(Event::Mouse(mouse)) => input_tx.send(TuiEvent::Mouse(mouse)),
                Ok(Event::Resize(_, _)) => input_tx.send(TuiEvent::Resize),
                _ => Ok(()),
            };
            if forwarded.is_err() {
                break; // Channel closed
            }
        }
    });

    loop {
        start_listing(app, &client, &event_tx);

        // the draw fits the page to the grid, so fetch only what it shows
        terminal.draw(|frame| render_ui(frame, app))?;
        start_tile_fetches(app, &fetcher, &event_tx);

        if let Ok(tui_event) = event_rx.try_recv() {
            match tui_event {
                TuiEvent::Key(key) => {
                    if handle_key_event(app, key) {
                        break; // Quit requested
                    }
                }
                TuiEvent::Mouse(mouse) => handle_mouse_event(app, mouse),
                TuiEvent::Resize => {}
                TuiEvent::ListingArrived { query, result } => {
                    app.dispatch(Intent::ListingArrived { query, result });
                }
                TuiEvent::TileLoaded { path, url, bytes } => {
                    app.dispatch(Intent::TileLoaded { path, url, bytes });
                }
                TuiEvent::TileFailed { path, url, reason } => {
                    app.dispatch(Intent::TileFailed { path, url, reason });
                }
            }
            continue;
        }

        // Small delay to prevent busy waiting
        tokio::time::sleep(Duration::from_millis(16)).await;
    }

    Ok(())
}

/// Issue a listing request when the path controls changed since the last one.
/// Earlier requests are not cancelled.
fn start_listing(app: &mut App, client: &EvalClient, event_tx: &mpsc::UnboundedSender<TuiEvent>) {
    let Some(query) = app.session.listing_needed() else {
        return;
    };
    app.dispatch(Intent::ListingStarted(query.clone()));

    let (code, vars) = query.to_call();
    let client = client.clone();
    let tx = event_tx.clone();
    tokio::spawn(async move {
        let result = client
            .exeval(&code, vars, false)
            .await
            .map(coerce_string_list)
            .map_err(|e| e.to_string());
        let _ = tx.send(TuiEvent::ListingArrived { query, result });
    });
}

/// Fetch every visible tile whose URL changed.
fn start_tile_fetches(app: &mut App, fetcher: &ResourceFetcher, event_tx: &mpsc::UnboundedSender<TuiEvent>) {
    for request in app.session.sync_tiles() {
        debug!(path = %request.path, "fetching tile");
        let fetcher = fetcher.clone();
        let tx = event_tx.clone();
        tokio::spawn(async move {
            let event = match fetcher.fetch(&request.url).await {
                Ok(bytes) => TuiEvent::TileLoaded { path: request.path, url: request.url, bytes: bytes.len() },
                Err(e) => TuiEvent::TileFailed { path: request.path, url: request.url, reason: e.reason },
            };
            let _ = tx.send(event);
        });
    }
}

/// Handle keyboard events. Returns true when the user asked to quit.
fn handle_key_event(app: &mut App, key: KeyEvent) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if app.input_mode != InputMode::Normal {
        match key.code {
            KeyCode::Enter => app.commit_edit(),
            KeyCode::Esc => app.cancel_edit(),
            KeyCode::Backspace => app.backspace(),
            KeyCode::Left => app.move_input_cursor(-1),
            KeyCode::Right => app.move_input_cursor(1),
            KeyCode::Char(c) => app.insert_char(c),
            _ => {}
        }
        return false;
    }

    if app.show_help {
        app.toggle_help();
        return false;
    }

    let page_size = app.session.pagination.page_size as i64;
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::F(1) | KeyCode::Char('?') => app.toggle_help(),
        KeyCode::Left => app.move_cursor(-1, 0),
        KeyCode::Right => app.move_cursor(1, 0),
        KeyCode::Up => app.move_cursor(0, -1),
        KeyCode::Down => app.move_cursor(0, 1),
        KeyCode::PageDown | KeyCode::Char('n') => app.dispatch(Intent::NextPage),
        KeyCode::PageUp | KeyCode::Char('p') => app.dispatch(Intent::PrevPage),
        KeyCode::Char(']') => app.dispatch(Intent::Roll(1)),
        KeyCode::Char('[') => app.dispatch(Intent::Roll(-1)),
        KeyCode::Char('}') => app.dispatch(Intent::Roll(page_size)),
        KeyCode::Char('{') => app.dispatch(Intent::Roll(-page_size)),
        KeyCode::Char(' ') => {
            if let Some(path) = app.cursor_path() {
                app.dispatch(Intent::ToggleSelection(path));
            }
        }
        KeyCode::Char('s') => {
            let show = !app.session.filter.show_selected;
            app.dispatch(Intent::SetShowSelected(show));
        }
        KeyCode::Char('d') => {
            let show = !app.session.filter.show_deselected;
            app.dispatch(Intent::SetShowDeselected(show));
        }
        KeyCode::Char('R') => app.dispatch(Intent::Reload),
        KeyCode::Char('e') => app.export_selection(),
        KeyCode::Char('i') => app.import_selection(),
        KeyCode::Char('/') => app.start_edit(InputMode::EditQuery),
        KeyCode::Char('v') => app.start_edit(InputMode::EditVars),
        KeyCode::Char('+') => app.step_first_var(1),
        KeyCode::Char('-') => app.step_first_var(-1),
        _ => {}
    }
    false
}

/// Left click moves the cursor to a tile and records where inside it.
fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
        return;
    }
    let hit = app.tile_areas.iter().position(|r| {
        mouse.column >= r.x && mouse.column < r.right() && mouse.row >= r.y && mouse.row < r.bottom()
    });
    let Some(index) = hit else {
        return;
    };
    let area = app.tile_areas[index];
    app.cursor = index;
    if let Some(path) = app.cursor_path() {
        let (x, y) = normalized_click(mouse.column - area.x, mouse.row - area.y, area.width, area.height);
        debug!(%path, x, y, "tile clicked");
        app.last_click = Some((path, x, y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn app_with(paths: &[&str]) -> App {
        let mut session = GallerySession::new("/b", "image/png");
        session.controls =
            crate::gallery::controls::ControlPanel::path_searcher("/img/*{x}*", BTreeMap::from([("x".to_string(), 0)]));
        session.resources = paths.iter().map(|p| p.to_string()).collect();
        App::new(session, PathBuf::from("/tmp/unused.json"))
    }

    #[test]
    fn keys_drive_intents() {
        let mut app = app_with(&["/a", "/b", "/c"]);
        assert!(!handle_key_event(&mut app, key(KeyCode::Char(' '))));
        assert!(app.session.selection.contains("/a"));

        handle_key_event(&mut app, key(KeyCode::Char(']')));
        assert_eq!(app.session.visible_window(), vec!["/b", "/c", "/a"]);

        handle_key_event(&mut app, key(KeyCode::Char('R')));
        assert_eq!(app.session.epoch.value(), 1);

        // hiding the selected "/a" leaves two tiles, still rolled by one
        handle_key_event(&mut app, key(KeyCode::Char('s')));
        assert_eq!(app.session.visible_window(), vec!["/c", "/b"]);

        assert!(handle_key_event(&mut app, key(KeyCode::Char('q'))));
    }

    #[test]
    fn edit_mode_captures_characters() {
        let mut app = app_with(&[]);
        handle_key_event(&mut app, key(KeyCode::Char('/')));
        assert_eq!(app.input_mode, InputMode::EditQuery);
        // 'q' is text while editing, not quit
        assert!(!handle_key_event(&mut app, key(KeyCode::Char('q'))));
        handle_key_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.session.controls.path_query(), "/img/*{x}*q");
        assert!(app.session.listing_needed().is_some());
    }

    #[test]
    fn click_moves_cursor_and_records_position() {
        let mut app = app_with(&["/a", "/b"]);
        app.tile_areas = vec![Rect::new(0, 0, 10, 4), Rect::new(10, 0, 10, 4)];
        handle_mouse_event(
            &mut app,
            MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: 15,
                row: 2,
                modifiers: KeyModifiers::NONE,
            },
        );
        assert_eq!(app.cursor, 1);
        assert_eq!(app.last_click, Some(("/b".to_string(), 0.5, 0.5)));
    }
}
