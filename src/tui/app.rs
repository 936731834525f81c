//! TUI application state for the gallery.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ratatui::layout::Rect;

use crate::gallery::{
    controls::{parse_tag_values, ControlValue, PATH_QUERY, PATH_VARS},
    GallerySession, Intent,
};
use crate::utils::unicode::char_to_byte_index;

/// Input mode for the TUI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Grid navigation
    Normal,
    /// Editing the path query template
    EditQuery,
    /// Editing path variables as `name=value` pairs
    EditVars,
}

/// Application state for the gallery TUI
#[derive(Debug)]
pub struct App {
    pub session: GallerySession,
    /// Index of the highlighted tile within the visible window
    pub cursor: usize,
    /// Tiles per grid row, updated from the last draw
    pub columns: usize,
    pub input_mode: InputMode,
    /// Input buffer while editing
    pub input: String,
    /// Cursor position in input (char index)
    pub input_cursor: usize,
    pub show_help: bool,
    pub status_message: String,
    /// Last click inside a tile, normalized to the tile
    pub last_click: Option<(String, f64, f64)>,
    /// Screen areas of the tiles from the last draw
    pub tile_areas: Vec<Rect>,
    /// Where export/import read and write the selection
    pub selection_path: PathBuf,
    /// Page size asked for by configuration; the grid may show fewer
    pub requested_page_size: usize,
}

impl App {
    pub fn new(session: GallerySession, selection_path: PathBuf) -> Self {
        let session_page_size = session.pagination.page_size;
        Self {
            session,
            cursor: 0,
            columns: 4,
            input_mode: InputMode::Normal,
            input: String::new(),
            input_cursor: 0,
            show_help: false,
            status_message: NORMAL_STATUS.to_string(),
            last_click: None,
            tile_areas: Vec::new(),
            selection_path,
            requested_page_size: session_page_size,
        }
    }

    pub fn dispatch(&mut self, intent: Intent) {
        self.session.dispatch(intent);
        self.clamp_cursor();
    }

    /// Path under the cursor, if the window is not empty.
    pub fn cursor_path(&self) -> Option<String> {
        self.session.visible_window().get(self.cursor).cloned()
    }

    pub fn clamp_cursor(&mut self) {
        let len = self.session.visible_window().len();
        self.cursor = if len == 0 { 0 } else { self.cursor.min(len - 1) };
    }

    pub fn move_cursor(&mut self, dx: isize, dy: isize) {
        let len = self.session.visible_window().len();
        if len == 0 {
            return;
        }
        let step = dx + dy * self.columns.max(1) as isize;
        let next = (self.cursor as isize + step).clamp(0, len as isize - 1);
        self.cursor = next as usize;
    }

    /// Shrink the page to the tiles the grid can draw, never beyond the
    /// requested size. A grid with no room still shows one tile per page.
    pub fn fit_page_to_grid(&mut self, capacity: usize) {
        let size = self.requested_page_size.min(capacity).max(1);
        if size != self.session.pagination.page_size {
            self.dispatch(Intent::SetPageSize(size));
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    // ----- Editing -----

    pub fn start_edit(&mut self, mode: InputMode) {
        self.input = match mode {
            InputMode::EditQuery => self.session.controls.path_query(),
            InputMode::EditVars => format_vars(&self.session.controls.path_vars()),
            InputMode::Normal => String::new(),
        };
        self.input_cursor = self.input.chars().count();
        self.input_mode = mode;
        self.status_message = "Enter=apply  Esc=cancel".to_string();
    }

    pub fn cancel_edit(&mut self) {
        self.input.clear();
        self.input_cursor = 0;
        self.input_mode = InputMode::Normal;
        self.status_message = NORMAL_STATUS.to_string();
    }

    /// Turn the edit buffer into intents and leave edit mode.
    pub fn commit_edit(&mut self) {
        let text = std::mem::take(&mut self.input);
        match self.input_mode {
            InputMode::EditQuery => self.dispatch(Intent::SetValue {
                name: PATH_QUERY.to_string(),
                value: ControlValue::Text(text),
            }),
            InputMode::EditVars => match parse_tag_values(&text) {
                Ok(vars) => {
                    self.dispatch(Intent::SetValue {
                        name: PATH_VARS.to_string(),
                        value: ControlValue::Tags(vars.keys().cloned().collect()),
                    });
                    for (tag, value) in vars {
                        self.dispatch(Intent::SetValue {
                            name: PATH_VARS.to_string(),
                            value: ControlValue::TagValue(tag, value),
                        });
                    }
                }
                Err(e) => self.session.notices.push(e),
            },
            InputMode::Normal => {}
        }
        self.cancel_edit();
    }

    /// Step the first path variable by `delta`.
    pub fn step_first_var(&mut self, delta: i64) {
        if let Some((tag, value)) = self.session.controls.path_vars().into_iter().next() {
            self.dispatch(Intent::SetValue {
                name: PATH_VARS.to_string(),
                value: ControlValue::TagValue(tag, value + delta),
            });
        }
    }

    pub fn insert_char(&mut self, c: char) {
        let at = char_to_byte_index(&self.input, self.input_cursor);
        self.input.insert(at, c);
        self.input_cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.input_cursor == 0 {
            return;
        }
        let at = char_to_byte_index(&self.input, self.input_cursor - 1);
        self.input.remove(at);
        self.input_cursor -= 1;
    }

    pub fn move_input_cursor(&mut self, delta: isize) {
        let len = self.input.chars().count() as isize;
        self.input_cursor = (self.input_cursor as isize + delta).clamp(0, len) as usize;
    }

    // ----- Selection interchange -----

    pub fn export_selection(&mut self) {
        match self.session.selection.save_to(&self.selection_path) {
            Ok(()) => {
                self.status_message = format!(
                    "exported {} paths to {}",
                    self.session.selection.len(),
                    self.selection_path.display()
                )
            }
            Err(e) => self.session.notices.push(e.to_string()),
        }
    }

    pub fn import_selection(&mut self) {
        let mut imported = crate::gallery::SelectionSet::default();
        match imported.load_from(&self.selection_path) {
            Ok(()) => self.dispatch(Intent::CommitSelection(imported.to_sorted_vec())),
            Err(e) => self.session.notices.push(e.to_string()),
        }
    }
}

const NORMAL_STATUS: &str = "arrows=move  space=select  n/p=page  [/]=roll  R=reload  F1 help";

fn format_vars(vars: &BTreeMap<String, i64>) -> String {
    vars.iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}
