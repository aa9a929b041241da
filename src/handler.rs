use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::{App, AppMode, DialogKind, TextInput};
use crate::components::diagram::{cell_to_point, CELL_HEIGHT, CELL_WIDTH};

/// Columns moved by one pan step.
const PAN_COLUMNS: f64 = 6.0;
/// Rows moved by one pan step.
const PAN_ROWS: f64 = 3.0;

/// Handle a key event.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    match app.mode.clone() {
        AppMode::Normal => handle_normal_mode(app, key),
        AppMode::Search => handle_search_mode(app, key),
        AppMode::Table => handle_table_mode(app, key),
        AppMode::Help => handle_help_mode(app, key),
        AppMode::Dialog(kind) => handle_dialog_mode(app, key, &kind),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    let step_x = PAN_COLUMNS * CELL_WIDTH;
    let step_y = PAN_ROWS * CELL_HEIGHT;
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('j') | KeyCode::Down => {
            app.session.focus_next();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.session.focus_prev();
        }
        KeyCode::Char('h') | KeyCode::Left => {
            app.session.focus_parent();
        }
        KeyCode::Char('l') | KeyCode::Right => {
            app.session.focus_first_child();
        }
        // Pan: the view moves, so the content moves the other way
        KeyCode::Char('H') => app.session.pan(step_x, 0.0),
        KeyCode::Char('L') => app.session.pan(-step_x, 0.0),
        KeyCode::Char('K') => app.session.pan(0.0, step_y),
        KeyCode::Char('J') => app.session.pan(0.0, -step_y),
        KeyCode::Char('c') => {
            let id = app.session.focused();
            app.session.center_on(id);
        }
        KeyCode::Enter | KeyCode::Char(' ') => app.click_focused(),
        KeyCode::Esc => app.session.deselect(),
        KeyCode::Char('/') => app.open_search(),
        KeyCode::Char('e') => app.open_edit(),
        KeyCode::Char('o') => app.open_document_prompt(),
        KeyCode::Char('t') => app.open_table(),
        KeyCode::Char('s') => app.save(),
        KeyCode::Char('r') => app.reset_view(),
        KeyCode::Char('?') => app.toggle_help(),
        _ => {}
    }
}

/// Shared editing keys for single-line inputs. Returns whether the key was
/// consumed.
fn edit_input(input: &mut TextInput, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(c) => input.insert_char(c),
        KeyCode::Backspace => input.delete_char(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        _ => return false,
    }
    true
}

fn handle_search_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_search(),
        KeyCode::Enter => app.confirm_search(),
        KeyCode::Down | KeyCode::Tab => app.search_select_next(),
        KeyCode::Up | KeyCode::BackTab => app.search_select_prev(),
        _ => {
            let before = app.search.query.input.len();
            if edit_input(&mut app.search.query, key) && app.search.query.input.len() != before {
                app.update_search();
            }
        }
    }
}

fn handle_dialog_mode(app: &mut App, key: KeyEvent, kind: &DialogKind) {
    match kind {
        DialogKind::Error { .. } => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                app.close_dialog();
            }
        }
        DialogKind::EditNode { .. } => match key.code {
            KeyCode::Esc => app.close_dialog(),
            KeyCode::Enter => app.confirm_edit(),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                app.toggle_edit_field()
            }
            _ => {
                edit_input(app.edit.active_input(), key);
            }
        },
        DialogKind::OpenDocument => match key.code {
            KeyCode::Esc => app.close_dialog(),
            KeyCode::Enter => app.confirm_open(),
            _ => {
                edit_input(&mut app.open_path, key);
            }
        },
    }
}

fn handle_table_mode(app: &mut App, key: KeyEvent) {
    let Some(table) = app.table.as_mut() else {
        app.mode = AppMode::Normal;
        return;
    };

    if let Some(input) = table.editing.as_mut() {
        match key.code {
            KeyCode::Enter => table.commit_edit(),
            KeyCode::Esc => table.editing = None,
            _ => {
                edit_input(input, key);
            }
        }
        return;
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.close_table(),
        KeyCode::Char('j') | KeyCode::Down => table.move_row(1),
        KeyCode::Char('k') | KeyCode::Up => table.move_row(-1),
        KeyCode::Char('h') | KeyCode::Left => table.move_col(-1),
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Tab => table.move_col(1),
        KeyCode::BackTab => table.move_col(-1),
        KeyCode::PageDown => table.move_row(10),
        KeyCode::PageUp => table.move_row(-10),
        KeyCode::Home | KeyCode::Char('g') => table.move_row(isize::MIN / 2),
        KeyCode::End | KeyCode::Char('G') => table.move_row(isize::MAX / 2),
        KeyCode::Enter => table.begin_edit(),
        KeyCode::Char('e') => app.edit_table_row(),
        KeyCode::Char('s') => app.save(),
        KeyCode::Char('?') => app.toggle_help(),
        _ => {}
    }
}

fn handle_help_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.help.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.help.scroll_up(),
        KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => close_help(app),
        _ => {}
    }
}

/// Help opened from the table returns to it.
fn close_help(app: &mut App) {
    app.mode = if app.table.is_some() {
        AppMode::Table
    } else {
        AppMode::Normal
    };
}

/// Handle a mouse event. Only the diagram reacts to the mouse.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    if !app.mouse_enabled || app.mode != AppMode::Normal {
        return;
    }
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(point) = cell_to_point(app.diagram_area, mouse.column, mouse.row) {
                app.click_at(point);
            }
        }
        MouseEventKind::ScrollDown => app.session.pan(0.0, -PAN_ROWS * CELL_HEIGHT),
        MouseEventKind::ScrollUp => app.session.pan(0.0, PAN_ROWS * CELL_HEIGHT),
        MouseEventKind::ScrollRight => app.session.pan(-PAN_COLUMNS * CELL_WIDTH, 0.0),
        MouseEventKind::ScrollLeft => app.session.pan(PAN_COLUMNS * CELL_WIDTH, 0.0),
        _ => {}
    }
}
