//! Serialises a staged visual tree into a self-contained SVG document.
//!
//! Image references are replaced with inline `data:` URLs taken from the
//! resolved resource set, so parsing the document never touches the
//! filesystem.

use std::fmt::{self, Write as _};

use asipuc_model::theme::Color;

use crate::error::RasterError;
use crate::resources::ResourceSet;
use crate::tree::{
    Align, ImageNode, LineNode, Node, ObjectFit, Paint, RectNode, Shadow, TextAnchor, TextNode,
    Transform, VisualTree,
};

/// Render `tree` as SVG markup, embedding every image from `resources`.
pub fn to_svg(tree: &VisualTree, resources: &ResourceSet) -> Result<String, RasterError> {
    let mut writer = SvgWriter {
        resources,
        defs: String::new(),
        body: String::new(),
        next_id: 0,
        missing: None,
    };
    writer
        .write_document(tree)
        .map_err(|e| RasterError::Backend(format!("svg serialisation failed: {e}")))?;
    if let Some(url) = writer.missing {
        return Err(RasterError::resource(url, "resource was not resolved"));
    }

    let mut out = String::with_capacity(writer.defs.len() + writer.body.len() + 256);
    write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = tree.width,
        h = tree.height
    )
    .map_err(|e| RasterError::Backend(e.to_string()))?;
    if !writer.defs.is_empty() {
        out.push_str("<defs>");
        out.push_str(&writer.defs);
        out.push_str("</defs>");
    }
    out.push_str(&writer.body);
    out.push_str("</svg>");
    Ok(out)
}

struct SvgWriter<'a> {
    resources: &'a ResourceSet,
    defs: String,
    body: String,
    next_id: u32,
    missing: Option<String>,
}

impl SvgWriter<'_> {
    fn write_document(&mut self, tree: &VisualTree) -> fmt::Result {
        let wrap = !tree.transform.is_identity();
        if wrap {
            write!(self.body, r#"<g transform="{}">"#, matrix(&tree.transform))?;
        }
        for node in &tree.nodes {
            self.write_node(node)?;
        }
        if wrap {
            self.body.push_str("</g>");
        }
        Ok(())
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn write_node(&mut self, node: &Node) -> fmt::Result {
        match node {
            Node::Rect(rect) => self.write_rect(rect),
            Node::Line(line) => self.write_line(line),
            Node::Text(text) => self.write_text(text),
            Node::Image(image) => self.write_image(image),
            Node::Group(group) => {
                self.body.push_str("<g");
                if !group.transform.is_identity() {
                    write!(self.body, r#" transform="{}""#, matrix(&group.transform))?;
                }
                if group.opacity < 1.0 {
                    write!(self.body, r#" opacity="{}""#, num(group.opacity.max(0.0)))?;
                }
                self.body.push('>');
                for child in &group.children {
                    self.write_node(child)?;
                }
                self.body.push_str("</g>");
                Ok(())
            }
        }
    }

    fn write_rect(&mut self, rect: &RectNode) -> fmt::Result {
        let fill = match &rect.fill {
            Some(paint) => self.paint(paint)?,
            None => r#"fill="none""#.to_string(),
        };
        write!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" {fill}"#,
            num(rect.x),
            num(rect.y),
            num(rect.width.max(0.0)),
            num(rect.height.max(0.0)),
        )?;
        if rect.radius > 0.0 {
            write!(self.body, r#" rx="{r}" ry="{r}""#, r = num(rect.radius))?;
        }
        if let Some(stroke) = &rect.stroke {
            write!(
                self.body,
                r#" stroke="{}" stroke-opacity="{}" stroke-width="{}""#,
                stroke.color.to_hex(),
                num(stroke.color.opacity()),
                num(stroke.width)
            )?;
        }
        self.body.push_str("/>");
        Ok(())
    }

    fn write_line(&mut self, line: &LineNode) -> fmt::Result {
        write!(
            self.body,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-opacity="{}" stroke-width="{}"/>"#,
            num(line.x1),
            num(line.y1),
            num(line.x2),
            num(line.y2),
            line.stroke.color.to_hex(),
            num(line.stroke.color.opacity()),
            num(line.stroke.width)
        )
    }

    fn write_text(&mut self, text: &TextNode) -> fmt::Result {
        let style = &text.style;
        let filter = match &style.shadow {
            Some(shadow) => format!(r#" filter="url(#{})""#, self.shadow_filter(shadow)?),
            None => String::new(),
        };
        let anchor = match style.anchor {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        };
        write!(
            self.body,
            r#"<text x="{}" y="{}" font-family="{}" font-size="{}" font-weight="{}" text-anchor="{anchor}" fill="{}" fill-opacity="{}"{filter}"#,
            num(text.x),
            num(text.y),
            escape(&style.family),
            num(style.size),
            style.weight,
            style.color.to_hex(),
            num(style.color.opacity()),
        )?;
        if style.italic {
            self.body.push_str(r#" font-style="italic""#);
        }
        if style.letter_spacing != 0.0 {
            write!(self.body, r#" letter-spacing="{}""#, num(style.letter_spacing))?;
        }
        write!(self.body, ">{}</text>", escape(&text.content))
    }

    fn write_image(&mut self, image: &ImageNode) -> fmt::Result {
        let Some(resource) = self.resources.get(&image.href) else {
            self.missing.get_or_insert_with(|| image.href.clone());
            return Ok(());
        };
        let href = resource.data_uri();
        write!(
            self.body,
            r#"<image x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="{}""#,
            num(image.x),
            num(image.y),
            num(image.width.max(0.0)),
            num(image.height.max(0.0)),
            aspect(image)
        )?;
        if image.opacity < 1.0 {
            write!(self.body, r#" opacity="{}""#, num(image.opacity.max(0.0)))?;
        }
        write!(self.body, r#" xlink:href="{href}"/>"#)
    }

    /// Fill attributes for `paint`, adding a gradient definition if needed.
    fn paint(&mut self, paint: &Paint) -> Result<String, fmt::Error> {
        match paint {
            Paint::Solid(color) => Ok(solid_fill(*color)),
            Paint::HorizontalGradient(stops) => {
                let id = self.fresh_id("grad");
                write!(
                    self.defs,
                    r#"<linearGradient id="{id}" x1="0" y1="0" x2="1" y2="0">"#
                )?;
                for stop in stops {
                    write!(
                        self.defs,
                        r#"<stop offset="{}" stop-color="{}" stop-opacity="{}"/>"#,
                        num(stop.offset.clamp(0.0, 1.0)),
                        stop.color.to_hex(),
                        num(stop.color.opacity())
                    )?;
                }
                self.defs.push_str("</linearGradient>");
                Ok(format!(r#"fill="url(#{id})""#))
            }
        }
    }

    fn shadow_filter(&mut self, shadow: &Shadow) -> Result<String, fmt::Error> {
        let id = self.fresh_id("shadow");
        write!(
            self.defs,
            r#"<filter id="{id}" x="-50%" y="-50%" width="200%" height="200%"><feDropShadow dx="{}" dy="{}" stdDeviation="{}" flood-color="{}" flood-opacity="{}"/></filter>"#,
            num(shadow.dx),
            num(shadow.dy),
            // Blur is a CSS radius; SVG wants the standard deviation.
            num(shadow.blur.max(0.0) / 2.0),
            shadow.color.to_hex(),
            num(shadow.color.opacity())
        )?;
        Ok(id)
    }
}

fn solid_fill(color: Color) -> String {
    if color.is_opaque() {
        format!(r#"fill="{}""#, color.to_hex())
    } else {
        format!(
            r#"fill="{}" fill-opacity="{}""#,
            color.to_hex(),
            num(color.opacity())
        )
    }
}

fn matrix(t: &Transform) -> String {
    format!(
        "matrix({} 0 0 {} {} {})",
        num(t.scale_x),
        num(t.scale_y),
        num(t.translate_x),
        num(t.translate_y)
    )
}

fn aspect(image: &ImageNode) -> String {
    let x = match image.align_x {
        Align::Start => "xMin",
        Align::Center => "xMid",
        Align::End => "xMax",
    };
    let y = match image.align_y {
        Align::Start => "YMin",
        Align::Center => "YMid",
        Align::End => "YMax",
    };
    let mode = match image.fit {
        ObjectFit::Cover => "slice",
        ObjectFit::Contain => "meet",
    };
    format!("{x}{y} {mode}")
}

fn num(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use asipuc_model::settings::Resolution;

    use crate::resources::LoadedResource;
    use crate::tree::{GradientStop, TextStyle};

    fn image(href: &str, fit: ObjectFit) -> Node {
        Node::Image(ImageNode {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 50.0,
            href: href.to_string(),
            fit,
            align_x: Align::Start,
            align_y: Align::End,
            opacity: 0.5,
        })
    }

    #[test]
    fn test_text_is_escaped_and_shadowed() {
        let mut tree = VisualTree::new(Resolution::HD, Color::BLACK);
        let style = TextStyle::new("Bebas Neue, \"Arial\"", 40.0, 700, Color::WHITE)
            .with_anchor(TextAnchor::Middle)
            .with_shadow(Some(Shadow {
                dx: 4.0,
                dy: 4.0,
                blur: 8.0,
                color: Color::rgba(0, 0, 0, 204),
            }));
        tree.push(Node::text(10.0, 20.0, "A & <B>", style));

        let svg = to_svg(&tree, &ResourceSet::new()).unwrap();
        assert!(svg.starts_with("<svg "));
        assert!(svg.contains(r#"width="1280" height="720""#));
        assert!(svg.contains("A &amp; &lt;B&gt;"));
        assert!(svg.contains("Bebas Neue, &quot;Arial&quot;"));
        assert!(svg.contains(r#"text-anchor="middle""#));
        assert!(svg.contains(r#"stdDeviation="4""#));
        assert!(svg.contains(r#"filter="url(#shadow1)""#));
    }

    #[test]
    fn test_images_are_inlined_with_fit() {
        let mut resources = ResourceSet::new();
        resources.insert(
            "file:///bg.png",
            Arc::new(LoadedResource::Image {
                mime: "image/png",
                bytes: vec![1, 2, 3],
            }),
        );
        let mut tree = VisualTree::new(Resolution::HD, Color::BLACK);
        tree.push(image("file:///bg.png", ObjectFit::Cover));

        let svg = to_svg(&tree, &resources).unwrap();
        assert!(svg.contains(r#"xlink:href="data:image/png;base64,AQID""#));
        assert!(svg.contains(r#"preserveAspectRatio="xMinYMax slice""#));
        assert!(svg.contains(r#"opacity="0.5""#));
        assert!(!svg.contains("file:///bg.png"));
    }

    #[test]
    fn test_unresolved_image_is_an_error() {
        let mut tree = VisualTree::new(Resolution::HD, Color::BLACK);
        tree.push(image("file:///missing.png", ObjectFit::Contain));
        let err = to_svg(&tree, &ResourceSet::new()).unwrap_err();
        assert!(matches!(err, RasterError::ResourceLoad { ref url, .. } if url == "file:///missing.png"));
    }

    #[test]
    fn test_gradient_and_rounded_rect() {
        let mut tree = VisualTree::new(Resolution::HD, Color::BLACK);
        tree.push(
            Node::rect(0.0, 0.0, 150.0, 3.0)
                .fill(Paint::HorizontalGradient(vec![
                    GradientStop {
                        offset: 0.0,
                        color: Color::TRANSPARENT,
                    },
                    GradientStop {
                        offset: 1.0,
                        color: Color::WHITE,
                    },
                ]))
                .radius(8.0),
        );
        let svg = to_svg(&tree, &ResourceSet::new()).unwrap();
        assert!(svg.contains("<defs><linearGradient id=\"grad1\""));
        assert!(svg.contains(r#"fill="url(#grad1)""#));
        assert!(svg.contains(r#"rx="8" ry="8""#));
    }
}
