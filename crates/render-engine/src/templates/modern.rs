//! Two-column bordered grid with corner logos and a top hashtag.

use asipuc_model::settings::Resolution;
use asipuc_model::tally::Row;
use asipuc_model::template::TemplateId;
use asipuc_model::theme::{Color, Theme};

use super::{
    baseline, centered_baseline, fit_column, line_height, theme_shadow, Corner, Frame,
    SlideTemplate,
};
use crate::tree::{Node, Stroke, TextAnchor, TextStyle, VisualTree};

const COLUMNS: usize = 2;
const TOTAL_GAP: f32 = 40.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct ModernTemplate;

impl SlideTemplate for ModernTemplate {
    fn id(&self) -> TemplateId {
        TemplateId::Modern
    }

    fn render(&self, rows: &[Row], total: u64, theme: &Theme, resolution: Resolution) -> VisualTree {
        let frame = Frame::new(resolution);
        let colors = &theme.colors;
        let sizes = &theme.sizes;
        let spacing = &theme.spacing;
        let effects = &theme.effects;

        let padding = spacing.padding;
        let grid_w = spacing.grid_width.clamp(0.1, 1.0) * (frame.width - 2.0 * padding);
        let grid_x = (frame.width - grid_w) / 2.0;
        let cell_w = grid_w / COLUMNS as f32;
        let row_h = line_height(sizes.label.max(sizes.number)) + 2.0 * spacing.cell_padding_y;
        let row_count = rows.len().div_ceil(COLUMNS).max(1);
        let grid_h = row_h * row_count as f32;

        let title_h = line_height(sizes.title);
        let grid_y = title_h + spacing.header_gap;
        let total_y = grid_y + grid_h + TOTAL_GAP;
        let column_h = total_y + line_height(sizes.total);

        let mut column = Vec::with_capacity(rows.len() * 2 + 6);

        column.push(Node::text(
            frame.center_x(),
            baseline(0.0, sizes.title),
            theme.title.to_uppercase(),
            TextStyle::new(&theme.fonts.primary, sizes.title, 900, colors.slide_text)
                .with_anchor(TextAnchor::Middle)
                .with_spacing(effects.title_letter_spacing)
                .with_shadow(theme_shadow(theme, 4.0, 8.0)),
        ));

        column.push(
            Node::rect(grid_x, grid_y, grid_w, grid_h)
                .fill(Color::rgba(0, 0, 0, 51))
                .stroke(colors.slide_border, effects.border_width)
                .into(),
        );
        let divider = Stroke {
            color: colors.slide_border,
            width: effects.grid_border_width,
        };
        for col in 1..COLUMNS {
            let x = grid_x + cell_w * col as f32;
            column.push(Node::line(x, grid_y, x, grid_y + grid_h, divider));
        }
        for r in 1..row_count {
            let y = grid_y + row_h * r as f32;
            column.push(Node::line(grid_x, y, grid_x + grid_w, y, divider));
        }

        for (i, row) in rows.iter().enumerate() {
            let cell_x = grid_x + cell_w * (i % COLUMNS) as f32;
            let center_y = grid_y + row_h * (i / COLUMNS) as f32 + row_h / 2.0;
            column.push(Node::text(
                cell_x + spacing.cell_padding_x,
                centered_baseline(center_y, sizes.label),
                row.label,
                TextStyle::new(&theme.fonts.primary, sizes.label, 700, colors.slide_text)
                    .with_spacing(2.0),
            ));
            column.push(Node::text(
                cell_x + cell_w - spacing.cell_padding_x,
                centered_baseline(center_y, sizes.number),
                row.value.to_string(),
                TextStyle::new(&theme.fonts.secondary, sizes.number, 700, colors.slide_text)
                    .with_anchor(TextAnchor::End),
            ));
        }

        column.push(Node::text(
            padding,
            baseline(total_y, sizes.total),
            format!("TOTAL: {total}"),
            TextStyle::new(&theme.fonts.primary, sizes.total, 700, colors.slide_text)
                .with_spacing(4.0)
                .with_shadow(theme_shadow(theme, 4.0, 8.0)),
        ));

        let mut layers = frame.backdrop(theme);
        layers.extend(frame.logo(&theme.logos.main, Corner::TopLeft));
        layers.extend(frame.logo(&theme.logos.secondary, Corner::TopRight));
        layers.extend(frame.top_hashtag(theme));
        layers.push(fit_column(
            &frame,
            padding,
            frame.height - padding,
            column_h,
            column,
        ));
        layers.extend(frame.logo(&theme.logos.watermark, Corner::BottomRight));

        frame.finish(theme, resolution, layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asipuc_model::tally::{Category, Tally};
    use crate::tree::Node;

    #[test]
    fn test_labels_and_numbers_share_a_row() {
        let rows = Tally::from_counts([(Category::Seniors, 3), (Category::Adults, 20)]).to_rows();
        let tree = ModernTemplate.render(&rows, 23, &Theme::modern(), Resolution::FULL_HD);
        let texts = tree.texts();

        let seniors = texts.iter().find(|t| t.content == "SENIORS").unwrap();
        let adults = texts.iter().find(|t| t.content == "ADULTS").unwrap();
        // Seniors and adults are the two cells of the first grid row.
        assert!(adults.x > seniors.x);
        assert!(
            (centered_row(seniors.y, seniors.style.size) - centered_row(adults.y, adults.style.size))
                .abs()
                < 1e-3
        );

        assert!(texts.iter().any(|t| t.content == "TOTAL: 23"));
        assert!(texts.iter().any(|t| t.content == "ATTENDANCE"));
    }

    fn centered_row(baseline: f32, size: f32) -> f32 {
        baseline - size * 0.35
    }

    #[test]
    fn test_watermark_is_painted_last() {
        let mut theme = Theme::modern();
        theme.logos.watermark.enabled = true;
        theme.logos.watermark.url = Some("file:///mark.png".into());
        theme.logos.watermark.opacity = 0.4;
        let tree = ModernTemplate.render(&[], 0, &theme, Resolution::FULL_HD);

        let Node::Group(root) = &tree.nodes[1] else {
            panic!("expected scaled root group");
        };
        let Some(Node::Image(mark)) = root.children.last() else {
            panic!("expected watermark last");
        };
        assert_eq!(mark.href, "file:///mark.png");
        assert!((mark.opacity - 0.4).abs() < 1e-6);
        assert!((mark.x + mark.width + 40.0 - 1920.0).abs() < 1e-3);
    }
}
