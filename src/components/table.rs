use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

use crate::app::{escape_newlines, TableState};
use crate::theme::ThemeColors;

/// Widest a column is drawn, in cells.
const MAX_COLUMN_WIDTH: usize = 28;
const MIN_COLUMN_WIDTH: usize = 6;

/// Flat table of every node's fields, one row per node.
pub struct TableWidget<'a> {
    state: &'a TableState,
    theme: &'a ThemeColors,
}

impl<'a> TableWidget<'a> {
    pub fn new(state: &'a TableState, theme: &'a ThemeColors) -> Self {
        Self { state, theme }
    }

    fn column_width(&self, column: &str) -> usize {
        self.state
            .table
            .rows
            .iter()
            .map(|r| escape_newlines(&r.cell_text(column)).chars().count())
            .chain(std::iter::once(column.chars().count()))
            .max()
            .unwrap_or(0)
            .clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
    }

    /// First column to draw so the cursor column fits in `width`.
    fn first_column(widths: &[usize], cursor: usize, width: usize) -> usize {
        let mut first = cursor.min(widths.len().saturating_sub(1));
        let mut used = widths.get(first).copied().unwrap_or(0) + 1;
        while first > 0 && used + widths[first - 1] + 1 <= width {
            first -= 1;
            used += widths[first] + 1;
        }
        first
    }
}

fn pad(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count > width {
        let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    } else {
        format!("{}{}", text, " ".repeat(width - count))
    }
}

impl Widget for TableWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.state.dirty {
            " Table ● "
        } else {
            " Table "
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border_fg));
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height < 2 {
            return;
        }

        let columns = &self.state.table.columns;
        let widths: Vec<usize> = columns.iter().map(|c| self.column_width(c)).collect();
        let first = if columns.is_empty() {
            0
        } else {
            Self::first_column(&widths, self.state.col, inner.width as usize)
        };

        let header_style = Style::default()
            .fg(self.theme.table_header_fg)
            .add_modifier(Modifier::BOLD);
        let cell_style = Style::default().fg(self.theme.node_fg);
        let cursor_style = Style::default()
            .bg(self.theme.focused_bg)
            .fg(self.theme.node_fg)
            .add_modifier(Modifier::BOLD);
        let edit_style = Style::default()
            .bg(self.theme.node_fg)
            .fg(self.theme.status_bg);

        let header: Vec<Span> = columns
            .iter()
            .zip(&widths)
            .skip(first)
            .map(|(c, &w)| Span::styled(format!("{} ", pad(c, w)), header_style))
            .collect();
        buf.set_line(inner.x, inner.y, &Line::from(header), inner.width);

        let body_height = (inner.height - 1) as usize;
        let scroll = self.state.scroll;
        for (i, row) in self
            .state
            .table
            .rows
            .iter()
            .enumerate()
            .skip(scroll)
            .take(body_height)
        {
            let mut spans = Vec::new();
            for (j, (column, &w)) in columns.iter().zip(&widths).enumerate().skip(first) {
                let is_cursor = i == self.state.row && j == self.state.col;
                let (text, style) = match (&self.state.editing, is_cursor) {
                    (Some(input), true) => (input.input.clone(), edit_style),
                    (None, true) => (escape_newlines(&row.cell_text(column)), cursor_style),
                    _ => (escape_newlines(&row.cell_text(column)), cell_style),
                };
                spans.push(Span::styled(pad(&text, w), style));
                spans.push(Span::raw(" "));
            }
            let y = inner.y + 1 + (i - scroll) as u16;
            buf.set_line(inner.x, y, &Line::from(spans), inner.width);
        }
    }
}
