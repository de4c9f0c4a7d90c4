//! Slide templates.
//!
//! Every template lays its slide out in reference units, where the slide is
//! 1080 units high and `width * 1080 / height` units wide. The layout is
//! wrapped in one group scaled to the target resolution, so the resulting
//! tree always measures exactly `resolution` pixels with an identity root
//! transform.

mod classic;
mod elegant;
mod minimal;
mod modern;

use asipuc_model::settings::Resolution;
use asipuc_model::tally::Row;
use asipuc_model::template::TemplateId;
use asipuc_model::theme::{Color, HashtagPosition, LogoConfig, Theme};

use crate::tree::{
    Align, GroupNode, ImageNode, Node, ObjectFit, Shadow, TextAnchor, TextStyle, Transform,
    VisualTree,
};

pub use classic::ClassicTemplate;
pub use elegant::ElegantTemplate;
pub use minimal::MinimalTemplate;
pub use modern::ModernTemplate;

/// Turns formatted rows into a visual tree.
///
/// Rendering must be deterministic: identical inputs give identical trees.
pub trait SlideTemplate: Send + Sync {
    fn id(&self) -> TemplateId;

    fn render(&self, rows: &[Row], total: u64, theme: &Theme, resolution: Resolution) -> VisualTree;
}

static TEMPLATES: [(TemplateId, &(dyn SlideTemplate)); 4] = [
    (TemplateId::Modern, &ModernTemplate),
    (TemplateId::Classic, &ClassicTemplate),
    (TemplateId::Minimal, &MinimalTemplate),
    (TemplateId::Elegant, &ElegantTemplate),
];

/// Template registered for `id`.
pub fn template_for(id: TemplateId) -> &'static dyn SlideTemplate {
    TEMPLATES
        .iter()
        .find(|(template_id, _)| *template_id == id)
        .map(|(_, template)| *template)
        .unwrap_or(&ModernTemplate)
}

/// Render rows with the template registered for `id`.
pub fn render_slide(
    id: TemplateId,
    rows: &[Row],
    total: u64,
    theme: &Theme,
    resolution: Resolution,
) -> VisualTree {
    template_for(id).render(rows, total, theme, resolution)
}

/// Reference-space canvas shared by the templates.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame {
    pub width: f32,
    pub height: f32,
    scale: f32,
}

impl Frame {
    pub fn new(resolution: Resolution) -> Self {
        let scale = resolution.scale();
        Self {
            width: resolution.width as f32 / scale,
            height: Resolution::REFERENCE_HEIGHT as f32,
            scale,
        }
    }

    pub fn center_x(&self) -> f32 {
        self.width / 2.0
    }

    /// Assemble the final tree: slide background plus reference-space layers.
    pub fn finish(self, theme: &Theme, resolution: Resolution, layers: Vec<Node>) -> VisualTree {
        let mut tree = VisualTree::new(resolution, theme.colors.slide_background);
        tree.font_sources = theme.font_sources.clone();
        tree.push(
            Node::rect(0.0, 0.0, resolution.width as f32, resolution.height as f32)
                .fill(theme.colors.slide_background),
        );
        tree.push(Node::Group(GroupNode {
            transform: Transform::scale(self.scale),
            opacity: 1.0,
            children: layers,
        }));
        tree
    }

    /// Background image (cover) and its veil, when the theme has one.
    pub fn backdrop(&self, theme: &Theme) -> Vec<Node> {
        let Some(url) = theme.background_image.as_deref() else {
            return Vec::new();
        };
        vec![
            Node::Image(ImageNode {
                x: 0.0,
                y: 0.0,
                width: self.width,
                height: self.height,
                href: url.to_string(),
                fit: ObjectFit::Cover,
                align_x: Align::Center,
                align_y: Align::Center,
                opacity: 1.0,
            }),
            Node::rect(0.0, 0.0, self.width, self.height)
                .fill(theme.colors.slide_overlay)
                .into(),
        ]
    }

    /// Logo slot placed relative to a corner.
    pub fn logo(&self, logo: &LogoConfig, corner: Corner) -> Option<Node> {
        let url = logo.visible_url()?;
        let size = logo.size;
        let (x, align_x) = match corner {
            Corner::TopLeft => (logo.offset_x, Align::Start),
            Corner::TopCenter => (self.center_x() - size / 2.0, Align::Center),
            Corner::TopRight | Corner::BottomRight => {
                (self.width - logo.offset_x - size, Align::End)
            }
        };
        let (y, align_y) = match corner {
            Corner::BottomRight => (self.height - logo.offset_y - size, Align::End),
            _ => (logo.offset_y, Align::Start),
        };
        Some(Node::Image(ImageNode {
            x,
            y,
            width: size,
            height: size,
            href: url.to_string(),
            fit: ObjectFit::Contain,
            align_x,
            align_y,
            opacity: logo.opacity.clamp(0.0, 1.0),
        }))
    }

    /// Hashtag along the top edge at the configured position.
    pub fn top_hashtag(&self, theme: &Theme) -> Option<Node> {
        let text = theme.hashtag.visible_text()?;
        let (x, anchor) = match theme.hashtag.position {
            HashtagPosition::TopLeft => (180.0, TextAnchor::Start),
            HashtagPosition::TopRight => (self.width - 180.0, TextAnchor::End),
            HashtagPosition::TopCenter => (self.center_x(), TextAnchor::Middle),
        };
        let size = theme.sizes.hashtag;
        let style = TextStyle {
            family: theme.fonts.secondary.clone(),
            size,
            weight: 400,
            italic: false,
            letter_spacing: 2.0,
            color: theme.hashtag_color(),
            anchor,
            shadow: Some(soft_shadow(2.0, 6.0)),
        };
        Some(Node::text(x, baseline(20.0, size), text, style))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Corner {
    TopLeft,
    TopCenter,
    TopRight,
    BottomRight,
}

/// Line box height for a font size.
pub(crate) fn line_height(size: f32) -> f32 {
    size * 1.2
}

/// Baseline of a single text line whose line box starts at `top`.
pub(crate) fn baseline(top: f32, size: f32) -> f32 {
    top + (line_height(size) - size) / 2.0 + size * 0.8
}

/// Baseline that visually centres a line of text on `center_y`.
pub(crate) fn centered_baseline(center_y: f32, size: f32) -> f32 {
    center_y + size * 0.35
}

pub(crate) fn soft_shadow(offset: f32, blur: f32) -> Shadow {
    Shadow {
        dx: offset,
        dy: offset,
        blur,
        color: Color::rgba(0, 0, 0, 204),
    }
}

/// Theme text shadow, when enabled.
pub(crate) fn theme_shadow(theme: &Theme, offset: f32, blur: f32) -> Option<Shadow> {
    theme.effects.text_shadow.then_some(Shadow {
        dx: offset,
        dy: offset,
        blur,
        color: theme.colors.text_shadow,
    })
}

/// Centre a column of `height` units vertically inside `[top, bottom]`.
///
/// Columns taller than the space are shrunk uniformly about the horizontal
/// centre so nothing is clipped.
pub(crate) fn fit_column(frame: &Frame, top: f32, bottom: f32, height: f32, nodes: Vec<Node>) -> Node {
    let available = (bottom - top).max(1.0);
    let k = if height > available { available / height } else { 1.0 };
    let offset_y = top + (available - height * k) / 2.0;
    let offset_x = frame.center_x() * (1.0 - k);
    Node::Group(GroupNode {
        transform: Transform {
            scale_x: k,
            scale_y: k,
            translate_x: offset_x,
            translate_y: offset_y,
        },
        opacity: 1.0,
        children: nodes,
    })
}
