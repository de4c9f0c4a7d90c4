//! Retained-mode visual tree produced by templates.
//!
//! Coordinates are absolute pixels within the tree's own `width × height`
//! box. The root `transform` is whatever the host applies when displaying
//! the tree (e.g. a fit-to-window preview scale); capture resets it.

use serde::{Deserialize, Serialize};

use asipuc_model::settings::Resolution;
use asipuc_model::theme::Color;

/// Axis-aligned scale followed by translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub scale_x: f32,
    pub scale_y: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        scale_x: 1.0,
        scale_y: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
    };

    pub fn scale(factor: f32) -> Self {
        Self {
            scale_x: factor,
            scale_y: factor,
            ..Self::IDENTITY
        }
    }

    pub fn translate(x: f32, y: f32) -> Self {
        Self {
            translate_x: x,
            translate_y: y,
            ..Self::IDENTITY
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position along the gradient in `[0, 1]`.
    pub offset: f32,
    pub color: Color,
}

/// Fill or stroke paint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Paint {
    Solid(Color),
    /// Left-to-right gradient across the shape's bounding box.
    HorizontalGradient(Vec<GradientStop>),
}

impl From<Color> for Paint {
    fn from(color: Color) -> Self {
        Paint::Solid(color)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    pub dx: f32,
    pub dy: f32,
    pub blur: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAnchor {
    #[default]
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// CSS font-family list.
    pub family: String,
    pub size: f32,
    pub weight: u16,
    pub italic: bool,
    pub letter_spacing: f32,
    pub color: Color,
    pub anchor: TextAnchor,
    pub shadow: Option<Shadow>,
}

impl TextStyle {
    pub fn new(family: &str, size: f32, weight: u16, color: Color) -> Self {
        Self {
            family: family.to_string(),
            size,
            weight,
            italic: false,
            letter_spacing: 0.0,
            color,
            anchor: TextAnchor::Start,
            shadow: None,
        }
    }

    pub fn with_anchor(mut self, anchor: TextAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_spacing(mut self, letter_spacing: f32) -> Self {
        self.letter_spacing = letter_spacing;
        self
    }

    pub fn with_shadow(mut self, shadow: Option<Shadow>) -> Self {
        self.shadow = shadow;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

/// How an image fills its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectFit {
    /// Scale to cover the box, cropping overflow.
    Cover,
    /// Scale to fit inside the box.
    Contain,
}

/// Alignment of a fitted image along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Align {
    Start,
    #[default]
    Center,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectNode {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub radius: f32,
    pub fill: Option<Paint>,
    pub stroke: Option<Stroke>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineNode {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub stroke: Stroke,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub x: f32,
    /// Baseline position.
    pub y: f32,
    pub content: String,
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageNode {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Resource URL (`file://`, plain path or `data:`).
    pub href: String,
    pub fit: ObjectFit,
    pub align_x: Align,
    pub align_y: Align,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    pub transform: Transform,
    pub opacity: f32,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Rect(RectNode),
    Line(LineNode),
    Text(TextNode),
    Image(ImageNode),
    Group(GroupNode),
}

impl Node {
    pub fn rect(x: f32, y: f32, width: f32, height: f32) -> RectNode {
        RectNode {
            x,
            y,
            width,
            height,
            radius: 0.0,
            fill: None,
            stroke: None,
        }
    }

    pub fn line(x1: f32, y1: f32, x2: f32, y2: f32, stroke: Stroke) -> Node {
        Node::Line(LineNode {
            x1,
            y1,
            x2,
            y2,
            stroke,
        })
    }

    pub fn text(x: f32, y: f32, content: impl Into<String>, style: TextStyle) -> Node {
        Node::Text(TextNode {
            x,
            y,
            content: content.into(),
            style,
        })
    }

    fn collect_images<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Node::Image(image) => out.push(&image.href),
            Node::Group(group) => {
                for child in &group.children {
                    child.collect_images(out);
                }
            }
            _ => {}
        }
    }
}

impl RectNode {
    pub fn fill(mut self, paint: impl Into<Paint>) -> Self {
        self.fill = Some(paint.into());
        self
    }

    pub fn stroke(mut self, color: Color, width: f32) -> Self {
        self.stroke = Some(Stroke { color, width });
        self
    }

    pub fn radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }
}

impl From<RectNode> for Node {
    fn from(rect: RectNode) -> Self {
        Node::Rect(rect)
    }
}

/// A complete slide ready to be staged and rasterized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualTree {
    pub width: u32,
    pub height: u32,
    pub background: Color,
    /// Transform applied by the host when displaying the tree.
    pub transform: Transform,
    pub nodes: Vec<Node>,
    /// Font files (URLs) the text nodes may reference.
    pub font_sources: Vec<String>,
}

impl VisualTree {
    pub fn new(resolution: Resolution, background: Color) -> Self {
        Self {
            width: resolution.width,
            height: resolution.height,
            background,
            transform: Transform::IDENTITY,
            nodes: Vec::new(),
            font_sources: Vec::new(),
        }
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.nodes.push(node.into());
    }

    pub fn resolution(&self) -> Resolution {
        Resolution {
            width: self.width,
            height: self.height,
        }
    }

    /// Image URLs in paint order, duplicates removed.
    pub fn image_sources(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.collect_images(&mut out);
        }
        let mut seen = std::collections::HashSet::new();
        out.retain(|url| seen.insert(*url));
        out
    }

    /// Text nodes in paint order, for inspection.
    pub fn texts(&self) -> Vec<&TextNode> {
        fn walk<'a>(nodes: &'a [Node], out: &mut Vec<&'a TextNode>) {
            for node in nodes {
                match node {
                    Node::Text(text) => out.push(text),
                    Node::Group(group) => walk(&group.children, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out
    }
}
