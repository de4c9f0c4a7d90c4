//! Serif title with an underline over a ruled single-column list.

use asipuc_model::settings::Resolution;
use asipuc_model::tally::Row;
use asipuc_model::template::TemplateId;
use asipuc_model::theme::{Color, Theme};

use super::{
    baseline, centered_baseline, fit_column, line_height, soft_shadow, theme_shadow, Corner,
    Frame, SlideTemplate,
};
use crate::tree::{Node, Stroke, TextAnchor, TextStyle, VisualTree};

const SERIF: &str = "Georgia, serif";
const NUMBER_FONT: &str = "Arial, sans-serif";

const PADDING: f32 = 80.0;
const TITLE_SIZE: f32 = 110.0;
const UNDERLINE_GAP: f32 = 20.0;
const UNDERLINE_WIDTH: f32 = 4.0;
const TITLE_GAP: f32 = 80.0;
const LABEL_SIZE: f32 = 52.0;
const NUMBER_SIZE: f32 = 62.0;
const ITEM_PAD_Y: f32 = 15.0;
const ITEM_PAD_X: f32 = 40.0;
const ITEM_GAP: f32 = 25.0;
const TOTAL_GAP: f32 = 100.0;
const TOTAL_SIZE: f32 = 100.0;
const TOTAL_PAD: f32 = 30.0;
const TOTAL_RULE: f32 = 5.0;
const HASHTAG_SIZE: f32 = 32.0;
const HASHTAG_BOTTOM: f32 = 30.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicTemplate;

impl SlideTemplate for ClassicTemplate {
    fn id(&self) -> TemplateId {
        TemplateId::Classic
    }

    fn render(&self, rows: &[Row], total: u64, theme: &Theme, resolution: Resolution) -> VisualTree {
        let frame = Frame::new(resolution);
        let text = theme.colors.slide_text;
        let cx = frame.center_x();
        let left = PADDING;
        let right = frame.width - PADDING;

        let mut column = Vec::with_capacity(rows.len() * 3 + 6);
        let mut y = 0.0;

        column.push(Node::text(
            cx,
            baseline(y, TITLE_SIZE),
            theme.title.to_uppercase(),
            TextStyle::new(SERIF, TITLE_SIZE, 400, text)
                .with_anchor(TextAnchor::Middle)
                .with_spacing(12.0)
                .with_shadow(theme_shadow(theme, 3.0, 6.0)),
        ));
        y += line_height(TITLE_SIZE) + UNDERLINE_GAP;
        // Underline spans the centre third of the slide.
        let underline = frame.width / 3.0;
        column.push(Node::line(
            cx - underline / 2.0,
            y,
            cx + underline / 2.0,
            y,
            Stroke {
                color: text,
                width: UNDERLINE_WIDTH,
            },
        ));
        y += UNDERLINE_WIDTH + TITLE_GAP;

        let item_h = line_height(LABEL_SIZE.max(NUMBER_SIZE)) + 2.0 * ITEM_PAD_Y;
        let separator = Stroke {
            color: Color::rgba(255, 255, 255, 77),
            width: 2.0,
        };
        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                y += ITEM_GAP;
            }
            let center_y = y + item_h / 2.0;
            column.push(Node::text(
                left + ITEM_PAD_X,
                centered_baseline(center_y, LABEL_SIZE),
                row.label,
                TextStyle::new(SERIF, LABEL_SIZE, 400, text).with_spacing(3.0),
            ));
            column.push(Node::text(
                right - ITEM_PAD_X,
                centered_baseline(center_y, NUMBER_SIZE),
                row.value.to_string(),
                TextStyle::new(NUMBER_FONT, NUMBER_SIZE, 700, text).with_anchor(TextAnchor::End),
            ));
            y += item_h;
            column.push(Node::line(left, y, right, y, separator));
        }

        y += TOTAL_GAP;
        let rule = Stroke {
            color: text,
            width: TOTAL_RULE,
        };
        column.push(Node::line(left, y, right, y, rule));
        y += TOTAL_RULE + TOTAL_PAD;
        column.push(Node::text(
            cx,
            baseline(y, TOTAL_SIZE),
            format!("TOTAL: {total}"),
            TextStyle::new(SERIF, TOTAL_SIZE, 700, text)
                .with_anchor(TextAnchor::Middle)
                .with_spacing(8.0)
                .with_shadow(theme_shadow(theme, 4.0, 10.0)),
        ));
        y += line_height(TOTAL_SIZE) + TOTAL_PAD;
        column.push(Node::line(left, y, right, y, rule));
        y += TOTAL_RULE;

        let mut layers = frame.backdrop(theme);
        layers.extend(frame.logo(&theme.logos.main, Corner::TopCenter));
        layers.push(fit_column(&frame, PADDING, frame.height - PADDING, y, column));
        if let Some(tag) = theme.hashtag.visible_text() {
            layers.push(Node::text(
                cx,
                frame.height - HASHTAG_BOTTOM - line_height(HASHTAG_SIZE) + baseline(0.0, HASHTAG_SIZE),
                tag,
                TextStyle::new(SERIF, HASHTAG_SIZE, 400, theme.hashtag_color())
                    .with_anchor(TextAnchor::Middle)
                    .with_spacing(4.0)
                    .with_shadow(Some(soft_shadow(2.0, 6.0)))
                    .italic(),
            ));
        }

        frame.finish(theme, resolution, layers)
    }
}
