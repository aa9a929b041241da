//! Terminal rendering of the laid-out tree.
//!
//! Layout units map to cells at a fixed scale: one column is
//! [`CELL_WIDTH`] units and one row is [`CELL_HEIGHT`] units, so the default
//! 180×60 node box becomes 18×3 cells and generations sit 30 columns apart.

use std::collections::HashMap;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Widget},
};

use crate::session::Session;
use crate::theme::ThemeColors;
use crate::tree::layout::{Point, Viewport};
use crate::tree::model::NodeId;

/// Layout units per terminal column.
pub const CELL_WIDTH: f64 = 10.0;
/// Layout units per terminal row.
pub const CELL_HEIGHT: f64 = 20.0;

/// Viewport, in layout units, covered by a diagram area.
pub fn viewport_for(area: Rect) -> Viewport {
    Viewport {
        width: f64::from(area.width) * CELL_WIDTH,
        height: f64::from(area.height) * CELL_HEIGHT,
    }
}

/// Viewport point at the centre of the cell `(col, row)`, or `None` if the
/// cell is outside `area`.
pub fn cell_to_point(area: Rect, col: u16, row: u16) -> Option<Point> {
    if col < area.x || row < area.y || col >= area.right() || row >= area.bottom() {
        return None;
    }
    Some(Point {
        x: (f64::from(col - area.x) + 0.5) * CELL_WIDTH,
        y: (f64::from(row - area.y) + 0.5) * CELL_HEIGHT,
    })
}

/// Diagram widget: node boxes joined by elbow connectors.
pub struct DiagramWidget<'a> {
    session: &'a Session,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
}

impl<'a> DiagramWidget<'a> {
    pub fn new(session: &'a Session, theme: &'a ThemeColors) -> Self {
        Self {
            session,
            theme,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

/// Draw surface clipped to one area, addressed in signed cell coordinates.
struct Canvas<'b> {
    area: Rect,
    buf: &'b mut Buffer,
}

impl Canvas<'_> {
    fn put(&mut self, x: i32, y: i32, symbol: &str, style: Style) {
        let inside = x >= i32::from(self.area.x)
            && y >= i32::from(self.area.y)
            && x < i32::from(self.area.right())
            && y < i32::from(self.area.bottom());
        if !inside {
            return;
        }
        if let Some(cell) = self.buf.cell_mut((x as u16, y as u16)) {
            cell.set_symbol(symbol).set_style(style);
        }
    }

    fn text(&mut self, x: i32, y: i32, text: &str, style: Style) {
        for (i, c) in text.chars().enumerate() {
            let mut tmp = [0u8; 4];
            self.put(x + i as i32, y, c.encode_utf8(&mut tmp), style);
        }
    }
}

/// Box-drawing glyph for a connector cell open towards the given sides.
fn junction(up: bool, down: bool, left: bool, right: bool) -> &'static str {
    match (up, down, left, right) {
        (true, true, true, true) => "┼",
        (true, true, true, false) => "┤",
        (true, true, false, true) => "├",
        (true, true, false, false) => "│",
        (false, true, true, true) => "┬",
        (true, false, true, true) => "┴",
        (false, true, true, false) => "┐",
        (false, true, false, true) => "┌",
        (true, false, true, false) => "┘",
        (true, false, false, true) => "└",
        (false, false, _, _) => "─",
        (true, false, false, false) | (false, true, false, false) => "│",
    }
}

/// Truncate `text` to `width` characters, marking the cut with `…`.
fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

impl Widget for DiagramWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.render(area, buf);
                inner
            }
            None => area,
        };
        if inner.width == 0 || inner.height == 0 {
            return;
        }
        buf.set_style(inner, Style::default().bg(self.theme.diagram_bg));

        let session = self.session;
        let config = session.layout_config();
        let layout = session.layout();
        let transform = session.transform();
        let half_w = ((config.node_width / CELL_WIDTH) / 2.0).round() as i32;
        let half_h = ((config.node_height / CELL_HEIGHT) / 2.0).floor() as i32;

        // Cell holding a layout point.
        let cell_at = |point: Point| -> (i32, i32) {
            let p = transform.apply(point);
            (
                i32::from(inner.x) + (p.x / CELL_WIDTH).floor() as i32,
                i32::from(inner.y) + (p.y / CELL_HEIGHT).floor() as i32,
            )
        };
        let cell_of = |id: NodeId| layout.position(id).map(cell_at);

        let mut canvas = Canvas { area: inner, buf };
        let edge_style = Style::default().fg(self.theme.edge_fg);

        // ── Connectors ──
        // edges grouped by parent, in first-seen order
        let mut groups: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
        let mut group_of: HashMap<NodeId, usize> = HashMap::new();
        for edge in layout.edges() {
            let slot = *group_of.entry(edge.from).or_insert_with(|| {
                groups.push((edge.from, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(edge.to);
        }

        for (parent, children) in &groups {
            let Some((px, py)) = cell_of(*parent) else {
                continue;
            };
            let rows: Vec<(i32, i32)> = children.iter().filter_map(|&c| cell_of(c)).collect();
            let Some(&(cx, _)) = rows.first() else {
                continue;
            };
            let start = px + half_w + 1;
            let end = cx - half_w - 1;
            let mid = (start + end) / 2;

            for x in start..mid {
                canvas.put(x, py, "─", edge_style);
            }
            let top = rows.iter().map(|&(_, y)| y).min().unwrap_or(py).min(py);
            let bottom = rows.iter().map(|&(_, y)| y).max().unwrap_or(py).max(py);
            for y in top..=bottom {
                let glyph = junction(
                    y > top,
                    y < bottom,
                    y == py,
                    rows.iter().any(|&(_, cy)| cy == y),
                );
                canvas.put(mid, y, glyph, edge_style);
            }
            for &(_, cy) in &rows {
                for x in mid + 1..=end {
                    canvas.put(x, cy, "─", edge_style);
                }
            }
        }

        // ── Nodes ──
        let focused = session.focused();
        let selected = session.selected();
        let label_width = (half_w * 2 - 1).max(1) as usize;

        for desc in layout.descriptors(session.model(), session.visibility()) {
            let (cx, cy) = cell_at(Point {
                x: desc.x,
                y: desc.y,
            });
            let mut border = Style::default().fg(if desc.has_hidden_children {
                self.theme.node_collapsed_fg
            } else {
                self.theme.node_border_fg
            });
            let mut fill = Style::default().fg(self.theme.node_fg);
            if Some(desc.id) == selected {
                border = border
                    .fg(self.theme.selected_border_fg)
                    .add_modifier(Modifier::BOLD);
                fill = fill.add_modifier(Modifier::BOLD);
            }
            if desc.id == focused {
                border = border.bg(self.theme.focused_bg);
                fill = fill.bg(self.theme.focused_bg);
            }

            let (left, right) = (cx - half_w, cx + half_w);
            let (top, bottom) = (cy - half_h, cy + half_h);
            for y in top..=bottom {
                for x in left..=right {
                    let glyph = match (x, y) {
                        _ if x == left && y == top => "╭",
                        _ if x == right && y == top => "╮",
                        _ if x == left && y == bottom => "╰",
                        _ if x == right && y == bottom => "╯",
                        _ if y == top || y == bottom => "─",
                        _ if x == left || x == right => "│",
                        _ => " ",
                    };
                    let style = if glyph == " " { fill } else { border };
                    canvas.put(x, y, glyph, style);
                }
            }

            let label = fit(&desc.label, label_width.saturating_sub(1));
            let offset = (label_width - label.chars().count()) as i32 / 2;
            canvas.text(left + 1 + offset, cy, &label, fill);
            if desc.is_expanded {
                canvas.put(right, cy, "├", border);
            }
            if desc.has_hidden_children {
                canvas.put(right, cy, "+", border);
                // hidden child count on the bottom edge
                let hidden = session.visibility().total_children(desc.id).len().to_string();
                canvas.text(right - hidden.len() as i32 - 1, bottom, &hidden, border);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;
    use crate::tree::layout::LayoutConfig;

    const DOC: &str = r#"{
        "name": "Root",
        "children": [
            { "name": "Alpha", "children": [ { "name": "Hidden" } ] },
            { "name": "Beta" }
        ]
    }"#;

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

    fn session(area: Rect) -> Session {
        Session::open(DOC, LayoutConfig::default(), viewport_for(area)).unwrap()
    }

    #[test]
    fn renders_visible_nodes_only() {
        let area = Rect::new(0, 0, 100, 20);
        let s = session(area);
        let tc = theme::dark_theme();
        let mut buf = Buffer::empty(area);
        DiagramWidget::new(&s, &tc).render(area, &mut buf);

        let content = buffer_to_string(&buf, area);
        assert!(content.contains("Root"));
        assert!(content.contains("Alpha"));
        assert!(content.contains("Beta"));
        assert!(!content.contains("Hidden"));
        // collapsed marker and hidden count on Alpha
        assert!(content.contains('+'));
        assert!(content.contains("1─╯"));
    }

    #[test]
    fn root_is_centred() {
        let area = Rect::new(0, 0, 100, 20);
        let s = session(area);
        let tc = theme::dark_theme();
        let mut buf = Buffer::empty(area);
        DiagramWidget::new(&s, &tc).render(area, &mut buf);

        let row: String = (0..area.width)
            .map(|x| buf.cell((x, 10)).unwrap().symbol().to_string())
            .collect();
        let col = row.find("Root").unwrap();
        assert!((46..=50).contains(&col), "Root at column {}", col);
    }

    #[test]
    fn connectors_branch_to_children() {
        let area = Rect::new(0, 0, 100, 20);
        let s = session(area);
        let tc = theme::dark_theme();
        let mut buf = Buffer::empty(area);
        DiagramWidget::new(&s, &tc).render(area, &mut buf);

        let content = buffer_to_string(&buf, area);
        assert!(content.contains('┤'));
        assert!(content.contains("├─"));
        assert!(content.contains('┌'));
        assert!(content.contains('└'));
    }

    #[test]
    fn expanding_shows_grandchild() {
        let area = Rect::new(0, 0, 100, 20);
        let mut s = session(area);
        let alpha = s.model().find_by_label("Alpha").unwrap();
        s.click(alpha);
        let tc = theme::dark_theme();
        let mut buf = Buffer::empty(area);
        DiagramWidget::new(&s, &tc).render(area, &mut buf);
        assert!(buffer_to_string(&buf, area).contains("Hidden"));
    }

    #[test]
    fn cell_points_hit_nodes() {
        let area = Rect::new(2, 1, 100, 20);
        let s = session(area);
        let point = cell_to_point(area, 2 + 50, 1 + 10).unwrap();
        assert_eq!(s.hit_test(point), Some(s.model().root()));
        assert!(cell_to_point(area, 0, 0).is_none());
        assert!(cell_to_point(area, 102, 5).is_none());
    }

    #[test]
    fn junction_glyphs() {
        assert_eq!(junction(true, true, true, true), "┼");
        assert_eq!(junction(false, true, true, true), "┬");
        assert_eq!(junction(true, false, false, true), "└");
        assert_eq!(junction(false, false, true, true), "─");
    }

    #[test]
    fn long_labels_are_truncated() {
        assert_eq!(fit("Short", 10), "Short");
        assert_eq!(fit("Maximilian Gyllencreutz", 8), "Maximil…");
    }

    #[test]
    fn tiny_area_no_panic() {
        let area = Rect::new(0, 0, 3, 1);
        let s = session(area);
        let tc = theme::dark_theme();
        let mut buf = Buffer::empty(area);
        DiagramWidget::new(&s, &tc).render(area, &mut buf);
    }
}
