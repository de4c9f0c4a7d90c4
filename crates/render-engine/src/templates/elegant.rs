//! Gold-accented framed panel with ornamental rules.

use asipuc_model::settings::Resolution;
use asipuc_model::tally::Row;
use asipuc_model::template::TemplateId;
use asipuc_model::theme::{Color, Theme};

use super::{baseline, fit_column, line_height, theme_shadow, Corner, Frame, SlideTemplate};
use crate::tree::{GradientStop, Node, Paint, Stroke, TextAnchor, TextStyle, VisualTree};

const GOLD: Color = Color::rgb(0xd4, 0xaf, 0x37);
const TITLE_FONT: &str = "Didot, Georgia, serif";
const BODY_FONT: &str = "Georgia, serif";
const NUMBER_FONT: &str = "Arial, sans-serif";

const PADDING: f32 = 80.0;
const MAX_WIDTH: f32 = 1100.0;
const INNER_PAD: f32 = 60.0;
const ORNAMENT_W: f32 = 150.0;
const ORNAMENT_H: f32 = 3.0;
const ORNAMENT_GAP: f32 = 30.0;
const TITLE_SIZE: f32 = 110.0;
const TITLE_GAP: f32 = 50.0;
const COLUMNS: usize = 2;
const GRID_GAP: f32 = 30.0;
const ITEM_PAD_X: f32 = 30.0;
const ITEM_PAD_Y: f32 = 20.0;
const LABEL_SIZE: f32 = 48.0;
const NUMBER_SIZE: f32 = 56.0;
const SECTION_GAP: f32 = 50.0;
const TOTAL_SIZE: f32 = 90.0;
const TOTAL_PAD: f32 = 20.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct ElegantTemplate;

impl SlideTemplate for ElegantTemplate {
    fn id(&self) -> TemplateId {
        TemplateId::Elegant
    }

    fn render(&self, rows: &[Row], total: u64, theme: &Theme, resolution: Resolution) -> VisualTree {
        let frame = Frame::new(resolution);
        let text = theme.colors.slide_text;
        let cx = frame.center_x();

        let panel_w = MAX_WIDTH.min(frame.width - 2.0 * PADDING);
        let panel_x = (frame.width - panel_w) / 2.0;
        let left = panel_x + INNER_PAD;
        let inner_w = panel_w - 2.0 * INNER_PAD;

        // Panel rect is pushed first once its height is known.
        let mut content = Vec::with_capacity(rows.len() * 3 + 8);
        let mut y = INNER_PAD;

        content.push(ornament(cx, y));
        y += ORNAMENT_H + ORNAMENT_GAP;

        content.push(Node::text(
            cx,
            baseline(y, TITLE_SIZE),
            theme.title.to_uppercase(),
            TextStyle::new(TITLE_FONT, TITLE_SIZE, 700, GOLD)
                .with_anchor(TextAnchor::Middle)
                .with_spacing(15.0)
                .with_shadow(theme_shadow(theme, 3.0, 6.0)),
        ));
        y += line_height(TITLE_SIZE) + TITLE_GAP;

        let item_w = (inner_w - GRID_GAP * (COLUMNS - 1) as f32) / COLUMNS as f32;
        let item_h = line_height(LABEL_SIZE.max(NUMBER_SIZE)) + 2.0 * ITEM_PAD_Y;
        let underline = Stroke {
            color: GOLD,
            width: 2.0,
        };
        let grid_rows = rows.len().div_ceil(COLUMNS);
        for (i, row) in rows.iter().enumerate() {
            let x = left + (item_w + GRID_GAP) * (i % COLUMNS) as f32;
            let top = y + (item_h + GRID_GAP) * (i / COLUMNS) as f32;
            let line_top = top + ITEM_PAD_Y;
            content.push(Node::text(
                x + ITEM_PAD_X,
                baseline(line_top, LABEL_SIZE.max(NUMBER_SIZE)),
                row.label,
                TextStyle::new(BODY_FONT, LABEL_SIZE, 400, text).with_spacing(3.0),
            ));
            content.push(Node::text(
                x + item_w - ITEM_PAD_X,
                baseline(line_top, LABEL_SIZE.max(NUMBER_SIZE)),
                row.value.to_string(),
                TextStyle::new(NUMBER_FONT, NUMBER_SIZE, 700, GOLD).with_anchor(TextAnchor::End),
            ));
            let bottom = top + item_h;
            content.push(Node::line(x, bottom, x + item_w, bottom, underline));
        }
        if grid_rows > 0 {
            y += item_h * grid_rows as f32 + GRID_GAP * (grid_rows - 1) as f32;
        }

        y += SECTION_GAP;
        content.push(ornament(cx, y));
        y += ORNAMENT_H + ORNAMENT_GAP;

        let box_h = line_height(TOTAL_SIZE) + 2.0 * TOTAL_PAD;
        content.push(
            Node::rect(left, y, inner_w, box_h)
                .fill(Color::rgba(0, 0, 0, 77))
                .stroke(GOLD, 3.0)
                .radius(10.0)
                .into(),
        );
        content.push(Node::text(
            cx,
            baseline(y + TOTAL_PAD, TOTAL_SIZE),
            format!("TOTAL: {total}"),
            TextStyle::new(TITLE_FONT, TOTAL_SIZE, 700, GOLD)
                .with_anchor(TextAnchor::Middle)
                .with_spacing(10.0)
                .with_shadow(theme_shadow(theme, 3.0, 8.0)),
        ));
        y += box_h + INNER_PAD;

        let mut column = Vec::with_capacity(content.len() + 1);
        column.push(
            Node::rect(panel_x, 0.0, panel_w, y)
                .fill(Color::rgba(0, 0, 0, 102))
                .stroke(GOLD, 3.0)
                .radius(20.0)
                .into(),
        );
        column.extend(content);

        let mut layers = frame.backdrop(theme);
        layers.extend(frame.logo(&theme.logos.main, Corner::TopLeft));
        layers.push(fit_column(&frame, PADDING, frame.height - PADDING, y, column));
        frame.finish(theme, resolution, layers)
    }
}

/// Short rule fading in and out of gold, centred on `cx`.
fn ornament(cx: f32, top: f32) -> Node {
    let fade = GOLD.with_opacity(0.0);
    Node::rect(cx - ORNAMENT_W / 2.0, top, ORNAMENT_W, ORNAMENT_H)
        .fill(Paint::HorizontalGradient(vec![
            GradientStop {
                offset: 0.0,
                color: fade,
            },
            GradientStop {
                offset: 0.5,
                color: GOLD,
            },
            GradientStop {
                offset: 1.0,
                color: fade,
            },
        ]))
        .into()
}
