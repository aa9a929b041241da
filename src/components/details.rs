use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Paragraph, Widget, Wrap},
};
use serde_json::Value;

use crate::theme::ThemeColors;
use crate::tree::model::{NodeId, TreeModel, NAME_KEY};

/// Side panel with the selected person's name, lineage and biography.
pub struct DetailsWidget<'a> {
    model: &'a TreeModel,
    id: NodeId,
    theme: &'a ThemeColors,
}

impl<'a> DetailsWidget<'a> {
    pub fn new(model: &'a TreeModel, id: NodeId, theme: &'a ThemeColors) -> Self {
        Self { model, id, theme }
    }

    fn build_lines(&self) -> Vec<Line<'a>> {
        let Some(node) = self.model.lookup(self.id) else {
            return Vec::new();
        };
        let mut lines = Vec::new();

        lines.push(Line::from(Span::styled(
            node.label().to_string(),
            Style::default()
                .fg(self.theme.accent_fg)
                .add_modifier(Modifier::BOLD),
        )));

        // Root first, parent last
        let mut lineage: Vec<&str> = self
            .model
            .ancestors(self.id)
            .filter_map(|a| self.model.lookup(a))
            .map(|n| n.label())
            .collect();
        lineage.reverse();
        if !lineage.is_empty() {
            lines.push(Line::from(Span::styled(
                lineage.join(" › "),
                Style::default().fg(self.theme.dim_fg),
            )));
        }
        lines.push(Line::from(Span::styled(
            format!("Generation {}", node.depth() + 1),
            Style::default().fg(self.theme.dim_fg),
        )));
        lines.push(Line::from(""));

        let biography = node.biography();
        if biography.is_empty() {
            lines.push(Line::from(Span::styled(
                "No biography.",
                Style::default()
                    .fg(self.theme.dim_fg)
                    .add_modifier(Modifier::ITALIC),
            )));
        } else {
            for text in biography.lines() {
                lines.push(Line::from(Span::styled(
                    text.to_string(),
                    Style::default().fg(self.theme.node_fg),
                )));
            }
        }

        let extra: Vec<(&String, &Value)> = node
            .fields()
            .iter()
            .filter(|(k, _)| k.as_str() != NAME_KEY)
            .collect();
        if !extra.is_empty() {
            lines.push(Line::from(""));
            for (key, value) in extra {
                let shown = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("{}: ", key),
                        Style::default().fg(self.theme.table_header_fg),
                    ),
                    Span::styled(shown, Style::default().fg(self.theme.node_fg)),
                ]));
            }
        }

        let children = self.model.children_of(self.id).len();
        if children > 0 {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!(
                    "{} {}",
                    children,
                    if children == 1 { "child" } else { "children" }
                ),
                Style::default().fg(self.theme.dim_fg),
            )));
        }

        lines
    }
}

impl Widget for DetailsWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 4 || area.height < 3 {
            return;
        }
        Clear.render(area, buf);
        let block = Block::default()
            .title(" Details ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border_fg))
            .padding(Padding::horizontal(1));
        Paragraph::new(self.build_lines())
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;

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

    fn model() -> TreeModel {
        TreeModel::parse(
            r#"{
                "name": "Karl",
                "children": [
                    { "name": "Erik\nFarmer in Öland.\nMarried twice.", "born": 1801 }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn shows_label_lineage_and_biography() {
        let model = model();
        let erik = model.find_by_label("Erik").unwrap();
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 40, 14);
        let mut buf = Buffer::empty(area);
        DetailsWidget::new(&model, erik, &tc).render(area, &mut buf);

        let content = buffer_to_string(&buf, area);
        assert!(content.contains("Details"));
        assert!(content.contains("Erik"));
        assert!(content.contains("Karl"));
        assert!(content.contains("Farmer in Öland."));
        assert!(content.contains("Married twice."));
        assert!(content.contains("born: 1801"));
        assert!(content.contains("Generation 2"));
    }

    #[test]
    fn root_without_biography() {
        let model = model();
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 40, 10);
        let mut buf = Buffer::empty(area);
        DetailsWidget::new(&model, model.root(), &tc).render(area, &mut buf);

        let content = buffer_to_string(&buf, area);
        assert!(content.contains("No biography."));
        assert!(content.contains("1 child"));
    }

    #[test]
    fn small_area_no_panic() {
        let model = model();
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 3, 2);
        let mut buf = Buffer::empty(area);
        DetailsWidget::new(&model, model.root(), &tc).render(area, &mut buf);
    }
}
