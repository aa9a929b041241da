use std::path::PathBuf;
use std::time::{Duration, Instant};

use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::components::help::HelpState;
use crate::editor::flatten::FlatTable;
use crate::editor::persist::{save_with, FileSink};
use crate::error::AppError;
use crate::event::Event;
use crate::session::{DeferredAction, Session};
use crate::theme::ThemeColors;
use crate::tree::layout::{Point, Viewport};
use crate::tree::model::NodeId;
use crate::tree::search::SearchHit;

/// The kind of dialog being displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogKind {
    EditNode { id: NodeId },
    OpenDocument,
    Error { message: String },
}

/// Application mode.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum AppMode {
    #[default]
    Normal,
    Search,
    Table,
    Help,
    Dialog(DialogKind),
}

/// Single-line text input with a byte-offset cursor.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TextInput {
    pub input: String,
    pub cursor_position: usize,
}

impl TextInput {
    /// Input prefilled with `text`, cursor at the end.
    pub fn with_text(text: impl Into<String>) -> Self {
        let input = text.into();
        Self {
            cursor_position: input.len(),
            input,
        }
    }

    /// Insert a character at the current cursor position.
    pub fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor_position, c);
        self.cursor_position += c.len_utf8();
    }

    /// Delete the character before the cursor (backspace).
    pub fn delete_char(&mut self) {
        if let Some(prev) = self.input[..self.cursor_position].chars().next_back() {
            self.cursor_position -= prev.len_utf8();
            self.input.remove(self.cursor_position);
        }
    }

    /// Move cursor left by one character.
    pub fn move_left(&mut self) {
        if let Some(prev) = self.input[..self.cursor_position].chars().next_back() {
            self.cursor_position -= prev.len_utf8();
        }
    }

    /// Move cursor right by one character.
    pub fn move_right(&mut self) {
        if let Some(next) = self.input[self.cursor_position..].chars().next() {
            self.cursor_position += next.len_utf8();
        }
    }

    pub fn home(&mut self) {
        self.cursor_position = 0;
    }

    pub fn end(&mut self) {
        self.cursor_position = self.input.len();
    }
}

/// State of the search overlay.
#[derive(Debug, Default)]
pub struct SearchState {
    pub query: TextInput,
    pub results: Vec<SearchHit>,
    pub selected_index: usize,
}

/// Which input of the edit dialog has the cursor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    #[default]
    Label,
    Biography,
}

/// State of the node edit dialog.
///
/// The biography is edited on one line with line breaks shown as `\n`.
#[derive(Debug, Default)]
pub struct EditState {
    pub label: TextInput,
    pub biography: TextInput,
    pub field: EditField,
}

impl EditState {
    pub fn active_input(&mut self) -> &mut TextInput {
        match self.field {
            EditField::Label => &mut self.label,
            EditField::Biography => &mut self.biography,
        }
    }
}

/// State of the flat table editor.
#[derive(Debug, Default)]
pub struct TableState {
    pub table: FlatTable,
    pub row: usize,
    pub col: usize,
    /// First row shown.
    pub scroll: usize,
    /// Cell being edited, if any.
    pub editing: Option<TextInput>,
    /// Whether rows differ from what the model last received.
    pub dirty: bool,
}

impl TableState {
    pub fn new(table: FlatTable) -> Self {
        Self {
            table,
            ..Default::default()
        }
    }

    pub fn current_column(&self) -> Option<&str> {
        self.table.columns.get(self.col).map(String::as_str)
    }

    pub fn move_row(&mut self, delta: isize) {
        let max = self.table.rows.len().saturating_sub(1);
        self.row = self.row.saturating_add_signed(delta).min(max);
    }

    pub fn move_col(&mut self, delta: isize) {
        let max = self.table.columns.len().saturating_sub(1);
        self.col = self.col.saturating_add_signed(delta).min(max);
    }

    /// Keep the cursor row inside a window of `height` rows.
    pub fn update_scroll(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.row < self.scroll {
            self.scroll = self.row;
        } else if self.row >= self.scroll + height {
            self.scroll = self.row + 1 - height;
        }
    }

    /// Start editing the cursor cell.
    pub fn begin_edit(&mut self) {
        let Some(column) = self.current_column() else {
            return;
        };
        let text = self
            .table
            .rows
            .get(self.row)
            .map(|r| escape_newlines(&r.cell_text(column)))
            .unwrap_or_default();
        self.editing = Some(TextInput::with_text(text));
    }

    /// Write the edited text back into the row.
    pub fn commit_edit(&mut self) {
        let Some(input) = self.editing.take() else {
            return;
        };
        let Some(column) = self.current_column().map(str::to_string) else {
            return;
        };
        if let Some(row) = self.table.rows.get_mut(self.row) {
            let before = row.values.get(&column).cloned();
            row.set_cell(&column, &unescape_newlines(&input.input));
            if row.values.get(&column) != before.as_ref() {
                self.dirty = true;
            }
        }
    }
}

/// Show line breaks as a literal `\n` so text fits on one line.
pub fn escape_newlines(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Inverse of [`escape_newlines`].
pub fn unescape_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Main application state.
pub struct App {
    pub session: Session,
    pub document_path: PathBuf,
    /// Where `s` writes the document.
    pub output_path: PathBuf,
    pub mode: AppMode,
    pub search: SearchState,
    pub edit: EditState,
    pub table: Option<TableState>,
    /// Path typed into the open dialog.
    pub open_path: TextInput,
    pub help: HelpState,
    pub theme: ThemeColors,
    pub mouse_enabled: bool,
    /// Inner area of the diagram from the last draw, for mouse hit tests.
    pub diagram_area: Rect,
    pub should_quit: bool,
    /// Unsaved changes exist.
    pub dirty: bool,
    /// Message, error flag, time shown.
    pub status_message: Option<(String, bool, Instant)>,
    transition: Duration,
    event_tx: Option<UnboundedSender<Event>>,
    deferred_task: Option<JoinHandle<()>>,
}

impl App {
    pub fn new(session: Session, document_path: PathBuf, theme: ThemeColors) -> Self {
        Self {
            session,
            output_path: document_path.clone(),
            document_path,
            mode: AppMode::Normal,
            search: SearchState::default(),
            edit: EditState::default(),
            table: None,
            open_path: TextInput::default(),
            help: HelpState::default(),
            theme,
            mouse_enabled: true,
            diagram_area: Rect::default(),
            should_quit: false,
            dirty: false,
            status_message: None,
            transition: Duration::from_millis(crate::config::DEFAULT_TRANSITION_MS),
            event_tx: None,
            deferred_task: None,
        }
    }

    pub fn with_output_path(mut self, path: PathBuf) -> Self {
        self.output_path = path;
        self
    }

    pub fn with_transition(mut self, transition: Duration) -> Self {
        self.transition = transition;
        self
    }

    pub fn with_mouse(mut self, enabled: bool) -> Self {
        self.mouse_enabled = enabled;
        self
    }

    /// Route deferred actions through the event loop. Without a sender,
    /// navigations only reveal and centre.
    pub fn set_event_sender(&mut self, tx: UnboundedSender<Event>) {
        self.event_tx = Some(tx);
    }

    /// Quit the application.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Set a status message with current timestamp.
    pub fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), false, Instant::now()));
    }

    pub fn set_status_error(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), true, Instant::now()));
    }

    /// Clear the status message if it has been displayed for more than 3 seconds.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, _, ref created)) = self.status_message {
            if created.elapsed().as_secs() > 3 {
                self.status_message = None;
            }
        }
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.mode = AppMode::Dialog(DialogKind::Error {
            message: message.into(),
        });
    }

    // ── Diagram ──────────────────────────────────────────────────────────

    /// Click the focused node.
    pub fn click_focused(&mut self) {
        let id = self.session.focused();
        self.session.click(id);
    }

    /// Click at a viewport point (mouse).
    pub fn click_at(&mut self, point: Point) {
        self.session.click_at(point);
    }

    pub fn resize_viewport(&mut self, viewport: Viewport) {
        if self.session.viewport() != viewport {
            self.session.set_viewport(viewport);
        }
    }

    pub fn reset_view(&mut self) {
        self.cancel_deferred();
        match self.session.reset() {
            Ok(()) => {
                self.dirty = false;
                self.table = None;
                self.set_status_message("View reset");
            }
            Err(e) => self.show_error(e.to_string()),
        }
    }

    // ── Search ───────────────────────────────────────────────────────────

    pub fn open_search(&mut self) {
        self.search = SearchState::default();
        self.mode = AppMode::Search;
    }

    pub fn close_search(&mut self) {
        self.mode = AppMode::Normal;
    }

    /// Re-run the query after the input changed.
    pub fn update_search(&mut self) {
        self.search.results = self.session.search(&self.search.query.input);
        self.search.selected_index = 0;
    }

    pub fn search_select_next(&mut self) {
        if self.search.selected_index + 1 < self.search.results.len() {
            self.search.selected_index += 1;
        }
    }

    pub fn search_select_prev(&mut self) {
        self.search.selected_index = self.search.selected_index.saturating_sub(1);
    }

    /// Navigate to the highlighted suggestion.
    pub fn confirm_search(&mut self) {
        let Some(hit) = self.search.results.get(self.search.selected_index) else {
            return;
        };
        let id = hit.id;
        self.mode = AppMode::Normal;
        self.navigate(id);
    }

    /// Reveal and centre `id`, then open its details once the transition
    /// delay has passed.
    pub fn navigate(&mut self, id: NodeId) {
        let Some(deferred) = self.session.navigate_to(id) else {
            return;
        };
        self.cancel_deferred();
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let delay = self.transition;
        let token = deferred.token;
        self.deferred_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Event::Deferred(token));
        }));
    }

    fn cancel_deferred(&mut self) {
        if let Some(task) = self.deferred_task.take() {
            task.abort();
        }
    }

    /// A deferred action came due.
    pub fn handle_deferred(&mut self, token: u64) {
        if let Some(DeferredAction::OpenDetails(id)) = self.session.fire(token) {
            tracing::debug!(node = %id, "details toggled after navigation");
        }
    }

    // ── Node editing ─────────────────────────────────────────────────────

    /// Open the edit dialog for the selected node, or the focused one.
    pub fn open_edit(&mut self) {
        let id = self.session.selected().unwrap_or(self.session.focused());
        self.open_edit_for(id);
    }

    fn open_edit_for(&mut self, id: NodeId) {
        let Some(node) = self.session.model().lookup(id) else {
            return;
        };
        self.edit = EditState {
            label: TextInput::with_text(node.label()),
            biography: TextInput::with_text(escape_newlines(node.biography())),
            field: EditField::Label,
        };
        self.mode = AppMode::Dialog(DialogKind::EditNode { id });
    }

    pub fn toggle_edit_field(&mut self) {
        self.edit.field = match self.edit.field {
            EditField::Label => EditField::Biography,
            EditField::Biography => EditField::Label,
        };
    }

    pub fn confirm_edit(&mut self) {
        let AppMode::Dialog(DialogKind::EditNode { id }) = self.mode else {
            return;
        };
        let label = self.edit.label.input.trim().to_string();
        if label.is_empty() {
            self.set_status_error("Name cannot be empty");
            return;
        }
        let biography = unescape_newlines(&self.edit.biography.input);
        if self.session.edit_node(id, &label, &biography) {
            self.dirty = true;
            self.refresh_table();
            self.set_status_message(format!("Updated {}", label));
        }
        self.close_dialog();
    }

    /// Close the current dialog and return to normal mode.
    pub fn close_dialog(&mut self) {
        self.mode = if self.table.is_some() {
            AppMode::Table
        } else {
            AppMode::Normal
        };
        self.edit = EditState::default();
    }

    // ── Table ────────────────────────────────────────────────────────────

    pub fn open_table(&mut self) {
        self.table = Some(TableState::new(self.session.table()));
        self.mode = AppMode::Table;
    }

    /// Edit the person on the cursor row in the node dialog. Pending cell
    /// edits go to the model first so the dialog shows them.
    pub fn edit_table_row(&mut self) {
        let Some(id) = self
            .table
            .as_ref()
            .and_then(|t| t.table.rows.get(t.row))
            .map(|row| row.id)
        else {
            return;
        };
        self.apply_table();
        self.open_edit_for(id);
    }

    /// Rebuild the open table's rows from the model, keeping the cursor.
    fn refresh_table(&mut self) {
        let Some(state) = self.table.as_mut() else {
            return;
        };
        state.table = self.session.table();
        state.dirty = false;
        state.move_row(0);
        state.move_col(0);
    }

    /// Push table edits into the model. Returns whether anything was sent.
    pub fn apply_table(&mut self) -> bool {
        let Some(table) = self.table.as_mut() else {
            return false;
        };
        if !table.dirty {
            return false;
        }
        let report = self.session.apply_table(&table.table.rows);
        table.dirty = false;
        self.dirty = true;
        if report.missed.is_empty() {
            self.set_status_message(format!("Applied {} rows", report.applied));
        } else {
            self.set_status_error(format!(
                "Applied {} rows, {} no longer match a node",
                report.applied,
                report.missed.len()
            ));
        }
        true
    }

    /// Apply pending edits and go back to the diagram.
    pub fn close_table(&mut self) {
        self.apply_table();
        self.table = None;
        self.mode = AppMode::Normal;
    }

    // ── Persistence ──────────────────────────────────────────────────────

    pub fn save(&mut self) {
        self.apply_table();
        let sink = FileSink::new(&self.output_path);
        let document = self.session.document();
        match save_with(&sink, &document) {
            Ok(receipt) => {
                self.session.mark_saved(&document);
                self.dirty = false;
                self.set_status_message(receipt.message);
            }
            Err(e) => self.set_status_error(e.to_string()),
        }
    }

    /// Ask for a document path, prefilled with the current one.
    pub fn open_document_prompt(&mut self) {
        self.open_path = TextInput::with_text(self.document_path.display().to_string());
        self.mode = AppMode::Dialog(DialogKind::OpenDocument);
    }

    pub fn confirm_open(&mut self) {
        let path = PathBuf::from(self.open_path.input.trim());
        self.open_path = TextInput::default();
        self.close_dialog();
        if path.as_os_str().is_empty() {
            return;
        }
        self.open_document(path);
    }

    /// Replace the document with the one at `path`. On failure the current
    /// tree stays and an error dialog is shown. Saves go to the new file.
    pub fn open_document(&mut self, path: PathBuf) -> bool {
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                let err = AppError::InvalidPath(format!("{}: {}", path.display(), e));
                tracing::warn!(error = %err, "open failed");
                self.show_error(err.to_string());
                return false;
            }
        };
        if let Err(e) = self.session.load(&text) {
            self.show_error(e.to_string());
            return false;
        }
        self.cancel_deferred();
        self.table = None;
        self.mode = AppMode::Normal;
        self.dirty = false;
        self.output_path = path.clone();
        self.document_path = path;
        tracing::info!(path = %self.document_path.display(), "document opened");
        self.set_status_message(format!("Opened {}", self.document_name()));
        true
    }

    // ── Help ─────────────────────────────────────────────────────────────

    pub fn toggle_help(&mut self) {
        self.mode = match self.mode {
            AppMode::Help => AppMode::Normal,
            _ => {
                self.help = HelpState::default();
                AppMode::Help
            }
        };
    }

    /// Short file name for the status bar.
    pub fn document_name(&self) -> String {
        self.document_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.document_path.display().to_string())
    }
}
