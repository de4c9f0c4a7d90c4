//! Thin type on translucent cards, three to a row.

use asipuc_model::settings::Resolution;
use asipuc_model::tally::Row;
use asipuc_model::template::TemplateId;
use asipuc_model::theme::{Color, Theme};

use super::{baseline, fit_column, line_height, Corner, Frame, SlideTemplate};
use crate::tree::{Node, TextAnchor, TextStyle, VisualTree};

const FONT: &str = "Helvetica, Arial, sans-serif";

const PADDING: f32 = 100.0;
const MAX_WIDTH: f32 = 1000.0;
const TITLE_SIZE: f32 = 140.0;
const TITLE_GAP: f32 = 100.0;
const COLUMNS: usize = 3;
const CARD_GAP: f32 = 40.0;
const CARD_PAD: f32 = 30.0;
const CARD_LABEL: f32 = 28.0;
const CARD_INNER_GAP: f32 = 20.0;
const CARD_NUMBER: f32 = 90.0;
const TOTAL_GAP: f32 = 140.0;
const TOTAL_PAD: f32 = 40.0;
const TOTAL_LABEL: f32 = 36.0;
const TOTAL_INNER_GAP: f32 = 15.0;
const TOTAL_VALUE: f32 = 140.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct MinimalTemplate;

impl SlideTemplate for MinimalTemplate {
    fn id(&self) -> TemplateId {
        TemplateId::Minimal
    }

    fn render(&self, rows: &[Row], total: u64, theme: &Theme, resolution: Resolution) -> VisualTree {
        let frame = Frame::new(resolution);
        let text = theme.colors.slide_text;
        let muted = text.with_opacity(0.7 * text.opacity());

        let content_w = MAX_WIDTH.min(frame.width - 2.0 * PADDING);
        let left = (frame.width - content_w) / 2.0;
        let cx = frame.center_x();

        let mut column = Vec::with_capacity(rows.len() * 3 + 4);
        let mut y = 0.0;

        column.push(Node::text(
            left,
            baseline(y, TITLE_SIZE),
            theme.title.to_uppercase(),
            TextStyle::new(FONT, TITLE_SIZE, 100, text.with_opacity(0.95 * text.opacity()))
                .with_spacing(20.0),
        ));
        y += line_height(TITLE_SIZE) + TITLE_GAP;

        let card_w = (content_w - CARD_GAP * (COLUMNS - 1) as f32) / COLUMNS as f32;
        let card_h =
            2.0 * CARD_PAD + line_height(CARD_LABEL) + CARD_INNER_GAP + line_height(CARD_NUMBER);
        let card_rows = rows.len().div_ceil(COLUMNS);
        for (i, row) in rows.iter().enumerate() {
            let x = left + (card_w + CARD_GAP) * (i % COLUMNS) as f32;
            let top = y + (card_h + CARD_GAP) * (i / COLUMNS) as f32;
            let mid = x + card_w / 2.0;
            column.push(
                Node::rect(x, top, card_w, card_h)
                    .fill(Color::rgba(255, 255, 255, 13))
                    .radius(8.0)
                    .into(),
            );
            column.push(Node::text(
                mid,
                baseline(top + CARD_PAD, CARD_LABEL),
                row.label,
                TextStyle::new(FONT, CARD_LABEL, 300, muted)
                    .with_anchor(TextAnchor::Middle)
                    .with_spacing(4.0),
            ));
            column.push(Node::text(
                mid,
                baseline(
                    top + CARD_PAD + line_height(CARD_LABEL) + CARD_INNER_GAP,
                    CARD_NUMBER,
                ),
                row.value.to_string(),
                TextStyle::new(FONT, CARD_NUMBER, 100, text).with_anchor(TextAnchor::Middle),
            ));
        }
        if card_rows > 0 {
            y += card_h * card_rows as f32 + CARD_GAP * (card_rows - 1) as f32;
        }

        y += TOTAL_GAP;
        let box_h = 2.0 * TOTAL_PAD + line_height(TOTAL_LABEL) + TOTAL_INNER_GAP + line_height(TOTAL_VALUE);
        column.push(
            Node::rect(left, y, content_w, box_h)
                .fill(Color::rgba(255, 255, 255, 20))
                .radius(12.0)
                .into(),
        );
        column.push(Node::text(
            cx,
            baseline(y + TOTAL_PAD, TOTAL_LABEL),
            "TOTAL",
            TextStyle::new(FONT, TOTAL_LABEL, 300, muted)
                .with_anchor(TextAnchor::Middle)
                .with_spacing(8.0),
        ));
        column.push(Node::text(
            cx,
            baseline(y + TOTAL_PAD + line_height(TOTAL_LABEL) + TOTAL_INNER_GAP, TOTAL_VALUE),
            total.to_string(),
            TextStyle::new(FONT, TOTAL_VALUE, 100, text).with_anchor(TextAnchor::Middle),
        ));
        y += box_h;

        let mut layers = frame.backdrop(theme);
        layers.extend(frame.logo(&theme.logos.main, Corner::TopRight));
        layers.push(fit_column(&frame, PADDING, frame.height - PADDING, y, column));
        frame.finish(theme, resolution, layers)
    }
}
