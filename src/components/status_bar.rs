use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::ThemeColors;

/// Status bar: document name, tree counts and key hints, or a transient
/// status message.
pub struct StatusBarWidget<'a> {
    document: &'a str,
    tree_info: &'a str,
    key_hints: &'a str,
    theme: &'a ThemeColors,
    status_message: Option<&'a str>,
    is_error: bool,
    dirty: bool,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(document: &'a str, tree_info: &'a str, theme: &'a ThemeColors) -> Self {
        Self {
            document,
            tree_info,
            key_hints: " /:search  e:edit  t:table  s:save  ?:help ",
            theme,
            status_message: None,
            is_error: false,
            dirty: false,
        }
    }

    pub fn key_hints(mut self, hints: &'a str) -> Self {
        self.key_hints = hints;
        self
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }

    /// Mark the document as having unsaved changes.
    pub fn dirty(mut self, dirty: bool) -> Self {
        self.dirty = dirty;
        self
    }
}

/// Keep the last `budget` characters, prefixed with `...` when cut.
fn tail(text: &str, budget: usize) -> String {
    let count = text.chars().count();
    if count <= budget {
        return text.to_string();
    }
    if budget <= 3 {
        return text.chars().take(budget).collect();
    }
    let kept: String = text.chars().skip(count - (budget - 3)).collect();
    format!("...{}", kept)
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = area.width as usize;
        buf.set_style(
            Rect::new(area.x, area.y, area.width, 1),
            Style::default().bg(self.theme.status_bg),
        );

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default()
                    .bg(self.theme.error_fg)
                    .fg(self.theme.status_fg)
            } else {
                Style::default()
                    .bg(self.theme.status_bg)
                    .fg(self.theme.success_fg)
            };

            // Pad or truncate message to fill full width
            let display: String = if msg.chars().count() >= width {
                msg.chars().take(width).collect()
            } else {
                format!("{:<width$}", msg, width = width)
            };

            let line = Line::from(Span::styled(display, style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        // Normal bar: [document ●] [tree_info] [key_hints]
        let hints_len = self.key_hints.chars().count();
        let remaining = width.saturating_sub(hints_len);
        let marker = if self.dirty { " ●" } else { "" };
        let info_len = self.tree_info.chars().count();
        let doc_budget = remaining
            .saturating_sub(info_len)
            .saturating_sub(marker.chars().count() + 1);
        let doc_display = tail(self.document, doc_budget);

        let used = doc_display.chars().count() + marker.chars().count();
        let info_display = tail(self.tree_info, remaining.saturating_sub(used + 1));
        let gap = remaining
            .saturating_sub(used)
            .saturating_sub(info_display.chars().count());

        let doc_style = Style::default()
            .fg(self.theme.status_fg)
            .add_modifier(Modifier::BOLD);
        let marker_style = Style::default().fg(self.theme.accent_fg);
        let info_style = Style::default().fg(self.theme.node_border_fg);
        let hints_style = Style::default()
            .fg(self.theme.dim_fg)
            .add_modifier(Modifier::DIM);

        let spans = vec![
            Span::styled(doc_display, doc_style),
            Span::styled(marker, marker_style),
            Span::raw(" ".repeat(gap)),
            Span::styled(info_display, info_style),
            Span::styled(self.key_hints, hints_style),
        ];

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
