use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Widget},
};

use crate::app::SearchState;
use crate::theme::ThemeColors;
use crate::tree::search::{MAX_RESULTS, MIN_QUERY_CHARS};

/// Name search overlay (`/`).
pub struct SearchWidget<'a> {
    state: &'a SearchState,
    theme: &'a ThemeColors,
}

impl<'a> SearchWidget<'a> {
    pub fn new(state: &'a SearchState, theme: &'a ThemeColors) -> Self {
        Self { state, theme }
    }

    fn top_rect(width: u16, height: u16, area: Rect) -> Rect {
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height / 6;
        let w = width.min(area.width);
        let h = height.min(area.bottom().saturating_sub(y));
        Rect::new(x, y, w, h)
    }
}

/// Char range of the first case-insensitive occurrence of `query` in
/// `label`.
fn match_range(label: &str, query: &str) -> Option<(usize, usize)> {
    let hay: Vec<char> = label.chars().collect();
    let needle: Vec<char> = query.chars().collect();
    if needle.is_empty() || needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len())
        .find(|&start| {
            hay[start..start + needle.len()]
                .iter()
                .zip(&needle)
                .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
        })
        .map(|start| (start, start + needle.len()))
}

impl<'a> Widget for SearchWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 5 || area.width < 20 {
            return;
        }

        // Input, separator, up to MAX_RESULTS suggestions, hint, borders
        let dialog_width = (area.width * 60 / 100).clamp(30, 70);
        let dialog_height = (MAX_RESULTS as u16) + 5;
        let rect = Self::top_rect(dialog_width, dialog_height, area);

        Clear.render(rect, buf);

        let block = Block::default()
            .title(" Search ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.dialog_border_fg))
            .style(Style::default().bg(self.theme.dialog_bg))
            .padding(Padding::horizontal(1));

        let inner = block.inner(rect);
        block.render(rect, buf);

        if inner.height == 0 || inner.width == 0 {
            return;
        }

        // Row 0: input with cursor
        let query = &self.state.query.input;
        let cursor_pos = self.state.query.cursor_position;
        let (before, rest) = query.split_at(cursor_pos.min(query.len()));
        let mut rest_chars = rest.chars();
        let cursor_char = rest_chars
            .next()
            .map(|c| c.to_string())
            .unwrap_or_else(|| " ".to_string());
        let after: String = rest_chars.collect();

        let input_style = Style::default().fg(self.theme.node_fg);
        let cursor_style = Style::default()
            .bg(self.theme.node_fg)
            .fg(self.theme.dialog_bg)
            .add_modifier(Modifier::BOLD);
        let prompt_style = Style::default()
            .fg(self.theme.accent_fg)
            .add_modifier(Modifier::BOLD);

        let input_line = Line::from(vec![
            Span::styled("/ ", prompt_style),
            Span::styled(before, input_style),
            Span::styled(cursor_char, cursor_style),
            Span::styled(after, input_style),
        ]);
        buf.set_line(inner.x, inner.y, &input_line, inner.width);

        // Row 1: separator + result count
        if inner.height > 1 {
            let count_str = if query.chars().count() < MIN_QUERY_CHARS {
                format!("Type at least {} characters", MIN_QUERY_CHARS)
            } else {
                match self.state.results.len() {
                    0 => "No matches".to_string(),
                    1 => "1 match".to_string(),
                    n => format!("{} matches", n),
                }
            };
            let sep_line = Line::from(Span::styled(
                format!("─── {} ", count_str),
                Style::default().fg(self.theme.dim_fg),
            ));
            buf.set_line(inner.x, inner.y + 1, &sep_line, inner.width);
        }

        // Row 2+: suggestions
        let results_start = 2u16;
        let visible_results = inner.height.saturating_sub(results_start + 1) as usize;
        let base_style = Style::default().fg(self.theme.node_fg);
        let highlight_style = Style::default()
            .fg(self.theme.accent_fg)
            .add_modifier(Modifier::BOLD);

        for (i, hit) in self.state.results.iter().take(visible_results).enumerate() {
            let row = inner.y + results_start + i as u16;
            let mut spans = Vec::new();
            if i == self.state.selected_index {
                spans.push(Span::styled("▸ ", highlight_style));
            } else {
                spans.push(Span::raw("  "));
            }

            match match_range(&hit.label, query) {
                Some((start, end)) => {
                    let chars: Vec<char> = hit.label.chars().collect();
                    spans.push(Span::styled(
                        chars[..start].iter().collect::<String>(),
                        base_style,
                    ));
                    spans.push(Span::styled(
                        chars[start..end].iter().collect::<String>(),
                        highlight_style,
                    ));
                    spans.push(Span::styled(
                        chars[end..].iter().collect::<String>(),
                        base_style,
                    ));
                }
                None => spans.push(Span::styled(hit.label.clone(), base_style)),
            }

            buf.set_line(inner.x, row, &Line::from(spans), inner.width);
        }

        // Hint at bottom
        if inner.height > 3 {
            let hint = "[Enter] Go  [Esc] Close  [↑↓] Select";
            let hint_style = Style::default()
                .fg(self.theme.dim_fg)
                .add_modifier(Modifier::DIM);
            let hint_line = Line::from(Span::styled(hint, hint_style));
            buf.set_line(inner.x, inner.y + inner.height - 1, &hint_line, inner.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::TextInput;
    use crate::theme;
    use crate::tree::model::NodeId;
    use crate::tree::search::SearchHit;

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

    fn hit(raw: u32, label: &str) -> SearchHit {
        SearchHit {
            id: NodeId::from_raw(raw),
            label: label.to_string(),
        }
    }

    #[test]
    fn test_empty_search_renders() {
        let state = SearchState::default();
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        SearchWidget::new(&state, &tc).render(area, &mut buf);

        let content = buffer_to_string(&buf, area);
        assert!(content.contains("Search"));
        assert!(content.contains("Type at least 2 characters"));
    }

    #[test]
    fn test_search_with_results_renders() {
        let state = SearchState {
            query: TextInput::with_text("jo"),
            results: vec![hit(1, "Johan"), hit(4, "Marjorie")],
            selected_index: 1,
        };
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        SearchWidget::new(&state, &tc).render(area, &mut buf);

        let content = buffer_to_string(&buf, area);
        assert!(content.contains("Johan"));
        assert!(content.contains("Marjorie"));
        assert!(content.contains("2 matches"));
        assert!(content.contains("▸ Marjorie"));
    }

    #[test]
    fn test_no_matches_message() {
        let state = SearchState {
            query: TextInput::with_text("zz"),
            ..Default::default()
        };
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        SearchWidget::new(&state, &tc).render(area, &mut buf);
        assert!(buffer_to_string(&buf, area).contains("No matches"));
    }

    #[test]
    fn test_match_range_is_case_insensitive() {
        assert_eq!(match_range("Marjorie", "JO"), Some((3, 5)));
        assert_eq!(match_range("Åsa Jonsdotter", "jon"), Some((4, 7)));
        assert_eq!(match_range("Anna", "xyz"), None);
        assert_eq!(match_range("An", "Anna"), None);
    }

    #[test]
    fn test_small_area_no_panic() {
        let state = SearchState::default();
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 10, 3);
        let mut buf = Buffer::empty(area);
        SearchWidget::new(&state, &tc).render(area, &mut buf);
    }
}
