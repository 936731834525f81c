//! UI layout and rendering logic for the gallery.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::app::{App, InputMode};
use crate::gallery::{
    controls::{highlight_segments, Control, PATH_QUERY},
    RequestState, TileLoadState,
};
use crate::resource::suggested_filename;
use crate::utils::unicode::truncate_start;

/// Minimum tile width in cells; decides the column count.
const TILE_WIDTH: u16 = 24;
const TILE_HEIGHT: u16 = 5;

/// Render the main UI
pub fn render_ui(frame: &mut Frame, app: &mut App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Controls
            Constraint::Min(TILE_HEIGHT), // Grid
            Constraint::Length(3), // Notices
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_controls(frame, app, main_layout[0]);
    render_grid(frame, app, main_layout[1]);
    render_notices(frame, app, main_layout[2]);
    render_status_bar(frame, app, main_layout[3]);

    if app.input_mode != InputMode::Normal {
        render_input_popup(frame, app);
    }
    if app.show_help {
        render_help_overlay(frame);
    }
}

/// Path query (with variables highlighted) and the listing state.
fn render_controls(frame: &mut Frame, app: &App, area: Rect) {
    let session = &app.session;
    let mut query_spans = vec![Span::styled("query ", Style::default().fg(Color::DarkGray))];
    if let Some(Control::TaggedText { value, tags }) = session.controls.get(PATH_QUERY) {
        for (segment, highlighted) in highlight_segments(value, tags) {
            let style = if highlighted {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            query_spans.push(Span::styled(segment.to_string(), style));
        }
    }

    let vars = session
        .controls
        .path_vars()
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("  ");

    let listing = match &session.listing {
        RequestState::Idle => Span::raw("idle"),
        RequestState::Fetching(_) => Span::styled("fetching…", Style::default().fg(Color::Yellow)),
        RequestState::Succeeded(_) => {
            Span::styled(format!("{} paths", session.resources.len()), Style::default().fg(Color::Green))
        }
        RequestState::Failed { .. } => Span::styled("listing failed", Style::default().fg(Color::Red)),
    };

    let lines = vec![
        Line::from(query_spans),
        Line::from(vec![
            Span::styled("vars  ", Style::default().fg(Color::DarkGray)),
            Span::raw(vars),
            Span::raw("   "),
            listing,
        ]),
    ];

    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("Path Search"));
    frame.render_widget(paragraph, area);
}

/// Number of whole tiles that fit in `area` with `columns` per row.
pub fn grid_capacity(area: Rect, columns: usize) -> usize {
    columns.max(1) * usize::from(area.height / TILE_HEIGHT)
}

/// Split `area` into a grid of up to `count` cells, `columns` per row. Cells
/// that would fall below `area` are not produced.
pub fn grid_cells(area: Rect, count: usize, columns: usize) -> Vec<Rect> {
    let columns = columns.max(1);
    let cell_w = u16::try_from(usize::from(area.width) / columns).unwrap_or(0);
    (0..count.min(grid_capacity(area, columns)))
        .map(|i| {
            // row < area.height / TILE_HEIGHT, so these products stay within u16
            let col = u16::try_from(i % columns).unwrap_or(u16::MAX);
            let row = u16::try_from(i / columns).unwrap_or(u16::MAX);
            Rect {
                x: area.x.saturating_add(col.saturating_mul(cell_w)),
                y: area.y.saturating_add(row.saturating_mul(TILE_HEIGHT)),
                width: cell_w,
                height: TILE_HEIGHT,
            }
        })
        .collect()
}

fn render_grid(frame: &mut Frame, app: &mut App, area: Rect) {
    let inner = Block::default().borders(Borders::ALL).inner(area);
    let columns = (inner.width / TILE_WIDTH).max(1) as usize;
    app.fit_page_to_grid(grid_capacity(inner, columns));

    let session = &app.session;
    let window = session.visible_window();
    let title = format!(
        "Page {}/{} | roll {} | epoch {} | selected {}{}{}",
        session.current_page(),
        session.total_pages().max(1),
        session.pagination.roll_shift,
        session.epoch.value(),
        session.selection.len(),
        if session.filter.show_selected { "" } else { " | hiding selected" },
        if session.filter.show_deselected { "" } else { " | hiding deselected" },
    );
    frame.render_widget(Block::default().borders(Borders::ALL).title(title), area);

    let cells = grid_cells(inner, window.len(), columns);

    for (i, (path, cell)) in window.iter().zip(cells.iter()).enumerate() {
        let selected = session.selection.contains(path);
        let tile = session.tiles.get(path);

        let (body, body_style) = match tile.map(|t| t.state) {
            Some(TileLoadState::Loaded) => (
                format!("loaded {}", format_bytes(tile.and_then(|t| t.bytes).unwrap_or(0))),
                Style::default().fg(Color::Green),
            ),
            Some(TileLoadState::Errored) => (
                format!("error: {}", tile.and_then(|t| t.error.clone()).unwrap_or_default()),
                Style::default().fg(Color::White).bg(Color::Red),
            ),
            Some(TileLoadState::Loading) | None => ("loading…".to_string(), Style::default().fg(Color::DarkGray)),
        };

        let mut border_style = if selected { Style::default().fg(Color::Green) } else { Style::default() };
        let mut border_type = BorderType::Plain;
        if i == app.cursor {
            border_style = border_style.add_modifier(Modifier::BOLD).fg(Color::Yellow);
            border_type = BorderType::Thick;
        }

        let name_width = cell.width.saturating_sub(6) as usize;
        let marker = if selected { "[x] " } else { "[ ] " };
        let title = format!("{}{}", marker, truncate_start(&suggested_filename(path), name_width));

        let paragraph = Paragraph::new(Line::from(Span::styled(body, body_style)))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(border_type)
                    .border_style(border_style)
                    .title(title),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, *cell);
    }

    app.columns = columns;
    app.tile_areas = cells;
}

fn render_notices(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = app
        .session
        .notices
        .iter()
        .rev()
        .take(1)
        .map(|n| Line::from(Span::styled(n.clone(), Style::default().fg(Color::Yellow))))
        .collect();
    if let Some((path, x, y)) = &app.last_click {
        lines.push(Line::from(format!("clicked {} at ({:.2}, {:.2})", suggested_filename(path), x, y)));
    }
    let paragraph = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL).title("Notices"));
    frame.render_widget(paragraph, area);
}

/// Render the status bar
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status_text = match app.cursor_path() {
        Some(path) => format!("{} | {}", app.status_message, path),
        None => app.status_message.clone(),
    };
    let status_paragraph =
        Paragraph::new(status_text).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(status_paragraph, area);
}

fn render_input_popup(frame: &mut Frame, app: &App) {
    let area = centered_rect(70, 20, frame.area());
    frame.render_widget(Clear, area);
    let title = match app.input_mode {
        InputMode::EditQuery => "Path query (python format string)",
        InputMode::EditVars => "Path variables (name=value ...)",
        InputMode::Normal => "",
    };
    let paragraph = Paragraph::new(app.input.as_str())
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame) {
    let popup_area = centered_rect(70, 70, frame.area());
    frame.render_widget(Clear, popup_area);

    let help_lines = vec![
        Line::from("Gallery Help"),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  arrows     - Move between tiles"),
        Line::from("  n / PgDn   - Next page"),
        Line::from("  p / PgUp   - Previous page"),
        Line::from("  ] / [      - Roll by one"),
        Line::from("  } / {      - Roll by a page"),
        Line::from(""),
        Line::from("Selection:"),
        Line::from("  space      - Toggle tile"),
        Line::from("  s / d      - Show/hide selected, deselected"),
        Line::from("  e / i      - Export / import selection file"),
        Line::from(""),
        Line::from("Search:"),
        Line::from("  /          - Edit path query"),
        Line::from("  v          - Edit path variables"),
        Line::from("  + / -      - Step first variable"),
        Line::from("  R          - Reload all tiles"),
        Line::from("  q, Ctrl+C  - Quit"),
    ];

    let help_paragraph = Paragraph::new(Text::from(help_lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help")
                .title_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(help_paragraph, popup_area);
}

fn format_bytes(n: usize) -> String {
    if n < 1024 {
        format!("{} B", n)
    } else if n < 1024 * 1024 {
        format!("{:.1} KiB", n as f64 / 1024.0)
    } else {
        format!("{:.1} MiB", n as f64 / (1024.0 * 1024.0))
    }
}

/// Helper function to create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::GallerySession;
    use ratatui::{backend::TestBackend, Terminal};
    use std::path::PathBuf;

    #[test]
    fn grid_cells_fill_rows() {
        let area = Rect { x: 1, y: 1, width: 48, height: 10 };
        let cells = grid_cells(area, 5, 2);
        // two rows of height 5 fit, the fifth tile does not
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[1], Rect { x: 25, y: 1, width: 24, height: 5 });
        assert_eq!(cells[2].y, 6);
    }

    #[test]
    fn oversized_counts_stop_at_the_last_row() {
        let area = Rect { x: 0, y: 0, width: 24, height: 10 };
        let cells = grid_cells(area, 20_000, 1);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[1].y, 5);
        assert_eq!(grid_capacity(area, 1), 2);
        assert!(grid_cells(Rect { x: 0, y: 0, width: 24, height: 4 }, 3, 1).is_empty());
    }

    #[test]
    fn drawn_tiles_match_the_page() {
        let mut session = GallerySession::new("/b", "image/png");
        session.resources = (0..30).map(|i| format!("/img/{i:02}.png")).collect();
        let mut app = App::new(session, PathBuf::from("/tmp/unused.json"));
        assert_eq!(app.session.pagination.page_size, 12);

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render_ui(frame, &mut app)).unwrap();

        // 78x14 inside the border: 3 columns by 2 rows
        assert_eq!(app.tile_areas.len(), 6);
        assert_eq!(app.session.visible_window().len(), app.tile_areas.len());
        app.move_cursor(1, 5);
        assert_eq!(app.cursor, 5);
    }

    #[test]
    fn byte_sizes() {
        assert_eq!(format_bytes(10), "10 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }
}
