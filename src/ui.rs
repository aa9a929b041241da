use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Borders},
    Frame,
};

use crate::app::{App, AppMode, DialogKind};
use crate::components::details::DetailsWidget;
use crate::components::diagram::{viewport_for, DiagramWidget};
use crate::components::dialog::DialogWidget;
use crate::components::help::HelpOverlay;
use crate::components::search::SearchWidget;
use crate::components::status_bar::StatusBarWidget;
use crate::components::table::TableWidget;

/// Width of the details panel when a person is selected.
const DETAILS_WIDTH: u16 = 40;
/// Narrowest diagram kept beside the details panel.
const MIN_DIAGRAM_WIDTH: u16 = 30;

const NORMAL_HINTS: &str = " /:search  e:edit  o:open  t:table  s:save  ?:help ";
const TABLE_HINTS: &str = " Enter:edit cell  e:edit person  s:save  Esc:back ";
const SEARCH_HINTS: &str = " Enter:go  ↑↓:select  Esc:close ";
const DIALOG_HINTS: &str = " Tab:field  Enter:save  Esc:cancel ";
const OPEN_HINTS: &str = " Enter:open  Esc:cancel ";
const HELP_HINTS: &str = " ↑↓:scroll  Esc:close ";

/// Render the application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let main_area = outer[0];
    let status_area = outer[1];

    if app.table.is_some() {
        render_table(app, frame, main_area);
    } else {
        render_diagram(app, frame, main_area);
    }

    render_status_bar(app, frame, status_area);

    // Overlays
    match app.mode {
        AppMode::Search => {
            frame.render_widget(SearchWidget::new(&app.search, &app.theme), main_area);
        }
        AppMode::Help => {
            frame.render_widget(
                HelpOverlay::new(&app.theme, app.help.scroll_offset),
                main_area,
            );
        }
        AppMode::Dialog(_) => {
            frame.render_widget(
                DialogWidget::new(&app.mode, &app.edit, &app.theme).open_path(&app.open_path),
                area,
            );
        }
        AppMode::Normal | AppMode::Table => {}
    }
}

fn render_diagram(app: &mut App, frame: &mut Frame, area: Rect) {
    let selected = app.session.selected();
    let (diagram_area, details_area) = match selected {
        Some(_) if area.width >= DETAILS_WIDTH + MIN_DIAGRAM_WIDTH => {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Min(MIN_DIAGRAM_WIDTH),
                    Constraint::Length(DETAILS_WIDTH),
                ])
                .split(area);
            (chunks[0], Some(chunks[1]))
        }
        _ => (area, None),
    };

    let model = app.session.model();
    let root_label = model
        .lookup(model.root())
        .map(|n| n.label())
        .unwrap_or("Family");
    let block = Block::default()
        .title(format!(" {} ", root_label))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border_fg));
    let inner = block.inner(diagram_area);

    // The view follows the terminal size before the frame is drawn.
    app.diagram_area = inner;
    app.resize_viewport(viewport_for(inner));

    frame.render_widget(
        DiagramWidget::new(&app.session, &app.theme).block(block),
        diagram_area,
    );

    if let (Some(id), Some(details_area)) = (selected, details_area) {
        frame.render_widget(
            DetailsWidget::new(app.session.model(), id, &app.theme),
            details_area,
        );
    }
}

fn render_table(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(table) = app.table.as_mut() else {
        return;
    };
    // Borders and header row
    table.update_scroll(area.height.saturating_sub(3) as usize);
    frame.render_widget(TableWidget::new(table, &app.theme), area);
}

fn render_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let document = app.document_name();
    let model = app.session.model();
    let shown = app.session.layout().order().len();
    let tree_info = match &app.table {
        Some(table) => format!("{} rows", table.table.rows.len()),
        None => format!("{} people · {} shown", model.len(), shown),
    };

    let hints = match app.mode {
        AppMode::Normal => NORMAL_HINTS,
        AppMode::Table => TABLE_HINTS,
        AppMode::Search => SEARCH_HINTS,
        AppMode::Dialog(DialogKind::OpenDocument) => OPEN_HINTS,
        AppMode::Dialog(_) => DIALOG_HINTS,
        AppMode::Help => HELP_HINTS,
    };

    let mut widget = StatusBarWidget::new(&document, &tree_info, &app.theme)
        .key_hints(hints)
        .dirty(app.dirty || app.table.as_ref().is_some_and(|t| t.dirty));
    if let Some((msg, is_error, _)) = &app.status_message {
        widget = widget.status_message(msg, *is_error);
    }
    frame.render_widget(widget, area);
}
