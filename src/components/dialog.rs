use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Paragraph, Widget, Wrap},
};

use crate::app::{AppMode, DialogKind, EditField, EditState, TextInput};
use crate::theme::ThemeColors;

/// Dialog widget that renders a centered modal overlay.
pub struct DialogWidget<'a> {
    mode: &'a AppMode,
    edit: &'a EditState,
    open_path: Option<&'a TextInput>,
    theme: &'a ThemeColors,
}

impl<'a> DialogWidget<'a> {
    pub fn new(mode: &'a AppMode, edit: &'a EditState, theme: &'a ThemeColors) -> Self {
        Self {
            mode,
            edit,
            open_path: None,
            theme,
        }
    }

    /// Input shown by the open document dialog.
    pub fn open_path(mut self, input: &'a TextInput) -> Self {
        self.open_path = Some(input);
        self
    }
}

/// Calculate a centered rectangle within the given area.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(x, y, w, h)
}

impl<'a> Widget for DialogWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let kind = match &self.mode {
            AppMode::Dialog(kind) => kind,
            _ => return,
        };

        match kind {
            DialogKind::EditNode { .. } => render_edit_dialog(self.edit, self.theme, area, buf),
            DialogKind::OpenDocument => {
                let empty = TextInput::default();
                let input = self.open_path.unwrap_or(&empty);
                render_open_dialog(input, self.theme, area, buf)
            }
            DialogKind::Error { message } => render_error_dialog(message, self.theme, area, buf),
        }
    }
}

/// One input line: visible tail of the text with a block cursor.
fn input_line<'t>(input: &'t TextInput, active: bool, width: usize, theme: &ThemeColors) -> Line<'t> {
    let text = &input.input;
    let cursor = input.cursor_position.min(text.len());
    let (before, rest) = text.split_at(cursor);
    let mut rest_chars = rest.chars();
    let cursor_char = rest_chars.next();
    let after = rest_chars.as_str();

    // Keep the cursor in view by dropping characters from the left.
    let before_len = before.chars().count();
    let skip = before_len.saturating_sub(width.saturating_sub(2));
    let before_display = before
        .char_indices()
        .nth(skip)
        .map(|(i, _)| &before[i..])
        .unwrap_or("");

    let input_style = Style::default().fg(theme.node_fg);
    let cursor_style = Style::default()
        .bg(theme.node_fg)
        .fg(theme.dialog_bg)
        .add_modifier(Modifier::BOLD);

    let mut spans = vec![Span::styled(before_display, input_style)];
    if active {
        spans.push(Span::styled(
            cursor_char.map(String::from).unwrap_or_else(|| " ".into()),
            cursor_style,
        ));
    } else if let Some(c) = cursor_char {
        spans.push(Span::styled(String::from(c), input_style));
    }
    spans.push(Span::styled(after, input_style));
    Line::from(spans)
}

fn render_edit_dialog(edit: &EditState, theme: &ThemeColors, area: Rect, buf: &mut Buffer) {
    let dialog_width = 60.min(area.width.saturating_sub(4));
    let dialog_height = 8;
    let rect = centered_rect(dialog_width, dialog_height, area);

    Clear.render(rect, buf);

    let block = Block::default()
        .title(" Edit Person ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.dialog_border_fg))
        .style(Style::default().bg(theme.dialog_bg))
        .padding(Padding::horizontal(1));

    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height < 4 || inner.width == 0 {
        return;
    }

    let width = inner.width as usize;
    let label_style = |active: bool| {
        let style = Style::default().fg(theme.table_header_fg);
        if active {
            style.add_modifier(Modifier::BOLD)
        } else {
            style.add_modifier(Modifier::DIM)
        }
    };

    let name_active = edit.field == EditField::Label;
    buf.set_line(
        inner.x,
        inner.y,
        &Line::from(Span::styled("Name", label_style(name_active))),
        inner.width,
    );
    buf.set_line(
        inner.x,
        inner.y + 1,
        &input_line(&edit.label, name_active, width, theme),
        inner.width,
    );
    buf.set_line(
        inner.x,
        inner.y + 2,
        &Line::from(Span::styled(
            "Biography (\\n for line breaks)",
            label_style(!name_active),
        )),
        inner.width,
    );
    buf.set_line(
        inner.x,
        inner.y + 3,
        &input_line(&edit.biography, !name_active, width, theme),
        inner.width,
    );

    // Render hint at bottom
    let hint = "[Tab] Switch field  [Enter] Save  [Esc] Cancel";
    let hint_style = Style::default()
        .fg(theme.dim_fg)
        .add_modifier(Modifier::DIM);
    let hint_line = Line::from(Span::styled(hint, hint_style));
    if inner.height > 4 {
        buf.set_line(inner.x, inner.y + inner.height - 1, &hint_line, inner.width);
    }
}

fn render_open_dialog(input: &TextInput, theme: &ThemeColors, area: Rect, buf: &mut Buffer) {
    let dialog_width = 60.min(area.width.saturating_sub(4));
    let rect = centered_rect(dialog_width, 6, area);

    Clear.render(rect, buf);

    let block = Block::default()
        .title(" Open Document ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.dialog_border_fg))
        .style(Style::default().bg(theme.dialog_bg))
        .padding(Padding::horizontal(1));

    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height < 2 || inner.width == 0 {
        return;
    }

    buf.set_line(
        inner.x,
        inner.y,
        &Line::from(Span::styled(
            "Path",
            Style::default()
                .fg(theme.table_header_fg)
                .add_modifier(Modifier::BOLD),
        )),
        inner.width,
    );
    buf.set_line(
        inner.x,
        inner.y + 1,
        &input_line(input, true, inner.width as usize, theme),
        inner.width,
    );

    let hint = "[Enter] Open  [Esc] Cancel";
    let hint_style = Style::default()
        .fg(theme.dim_fg)
        .add_modifier(Modifier::DIM);
    if inner.height > 2 {
        buf.set_line(
            inner.x,
            inner.y + inner.height - 1,
            &Line::from(Span::styled(hint, hint_style)),
            inner.width,
        );
    }
}

fn render_error_dialog(message: &str, theme: &ThemeColors, area: Rect, buf: &mut Buffer) {
    let dialog_width = (message.chars().count() as u16 + 6)
        .clamp(30, 70)
        .min(area.width.saturating_sub(4));
    let text_width = dialog_width.saturating_sub(4).max(1) as usize;
    let message_rows = (message.chars().count() / text_width + 1) as u16;
    let dialog_height = message_rows + 4;
    let rect = centered_rect(dialog_width, dialog_height, area);

    Clear.render(rect, buf);

    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.error_fg))
        .style(Style::default().bg(theme.dialog_bg))
        .padding(Padding::horizontal(1));

    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let body = Rect::new(
        inner.x,
        inner.y,
        inner.width,
        inner.height.saturating_sub(1).max(1),
    );
    Paragraph::new(Span::styled(message, Style::default().fg(theme.error_fg)))
        .wrap(Wrap { trim: true })
        .render(body, buf);

    // Hint
    let hint = "[Enter/Esc] Dismiss";
    let hint_style = Style::default()
        .fg(theme.dim_fg)
        .add_modifier(Modifier::DIM);
    let hint_line = Line::from(Span::styled(hint, hint_style));
    if inner.height > 1 {
        buf.set_line(inner.x, inner.y + inner.height - 1, &hint_line, inner.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;
    use crate::tree::model::NodeId;

    fn buffer_to_string(buf: &Buffer, area: Rect) -> String {
        let mut s = String::new();
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                s.push_str(buf.cell((x, y)).unwrap().symbol());
            }
            s.push('\n');
        }
        s
    }

    #[test]
    fn test_edit_dialog_renders() {
        let mode = AppMode::Dialog(DialogKind::EditNode {
            id: NodeId::from_raw(3),
        });
        let edit = EditState {
            label: TextInput::with_text("Brita"),
            biography: TextInput::with_text("Weaver.\\nLived in Visby."),
            field: EditField::Biography,
        };
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        DialogWidget::new(&mode, &edit, &tc).render(area, &mut buf);

        let content = buffer_to_string(&buf, area);
        assert!(content.contains("Edit Person"));
        assert!(content.contains("Brita"));
        assert!(content.contains("Weaver.\\nLived in Visby."));
    }

    #[test]
    fn test_error_dialog_renders() {
        let mode = AppMode::Dialog(DialogKind::Error {
            message: "Invalid document: root is not an object".to_string(),
        });
        let edit = EditState::default();
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        DialogWidget::new(&mode, &edit, &tc).render(area, &mut buf);

        let content = buffer_to_string(&buf, area);
        assert!(content.contains("Error"));
        assert!(content.contains("root is not an object"));
    }

    #[test]
    fn test_open_dialog_renders() {
        let mode = AppMode::Dialog(DialogKind::OpenDocument);
        let edit = EditState::default();
        let path = TextInput::with_text("trees/lind.json");
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        DialogWidget::new(&mode, &edit, &tc)
            .open_path(&path)
            .render(area, &mut buf);

        let content = buffer_to_string(&buf, area);
        assert!(content.contains("Open Document"));
        assert!(content.contains("trees/lind.json"));
        assert!(content.contains("[Enter] Open"));
    }

    #[test]
    fn test_long_input_keeps_cursor_visible() {
        let input = TextInput::with_text("a".repeat(100) + "END");
        let tc = theme::dark_theme();
        let line = input_line(&input, true, 20, &tc);
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(text.ends_with("END "));
        assert!(text.chars().count() <= 20);
    }

    #[test]
    fn test_no_dialog_mode_noop() {
        let mode = AppMode::Normal;
        let edit = EditState::default();
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        DialogWidget::new(&mode, &edit, &tc).render(area, &mut buf);

        // Buffer should be empty (all spaces)
        let content = buffer_to_string(&buf, area);
        assert!(content.trim().is_empty());
    }
}
