//! SVG document builder.
//!
//! Drives both SVG export and the default raster drawer: the drawer renders
//! each element as a standalone document built here.

use std::fmt::Write;

use studio_core::{Element, ElementKind, Gradient, GradientKind, Paint, ShapeKind, TextAlign};

use crate::image::ImageStore;

/// Line height as a multiple of the font size.
const LINE_HEIGHT: f64 = 1.2;

/// Accumulates `<defs>` entries and body nodes for one document.
#[derive(Debug, Default)]
pub struct SvgBuilder {
    defs: String,
    body: String,
    gradient_count: usize,
}

impl SvgBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the whole canvas with `paint`.
    pub fn background(&mut self, paint: &Paint, width: f64, height: f64) {
        if matches!(paint, Paint::None) {
            return;
        }
        let fill = self.paint(paint);
        write!(
            self.body,
            "<rect x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" fill=\"{fill}\"/>",
        )
        .ok();
    }

    /// Append one element, wrapped in its rotation and opacity.
    ///
    /// Returns false if nothing was emitted (image not loaded).
    pub fn element(&mut self, element: &Element, images: &ImageStore) -> bool {
        let g = &element.geometry;
        let center = g.center();
        let mut node = String::new();

        match &element.kind {
            ElementKind::Shape {
                shape,
                corner_radius,
            } => {
                let fill = self.paint(&element.style.fill);
                let stroke = stroke_attrs(element);
                match shape {
                    ShapeKind::Rectangle => {
                        write!(
                            node,
                            "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{corner_radius}\" fill=\"{fill}\"{stroke}/>",
                            g.x, g.y, g.width, g.height,
                        )
                        .ok();
                    }
                    ShapeKind::Ellipse => {
                        write!(
                            node,
                            "<ellipse cx=\"{}\" cy=\"{}\" rx=\"{}\" ry=\"{}\" fill=\"{fill}\"{stroke}/>",
                            center.x,
                            center.y,
                            g.width / 2.0,
                            g.height / 2.0,
                        )
                        .ok();
                    }
                    ShapeKind::Triangle => {
                        write!(
                            node,
                            "<polygon points=\"{},{} {},{} {},{}\" fill=\"{fill}\"{stroke}/>",
                            center.x,
                            g.y,
                            g.right(),
                            g.bottom(),
                            g.x,
                            g.bottom(),
                        )
                        .ok();
                    }
                    ShapeKind::Line => {
                        let color = element
                            .style
                            .stroke
                            .clone()
                            .unwrap_or_else(|| fill.clone());
                        let width = element.style.stroke_width.max(1.0);
                        write!(
                            node,
                            "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" stroke-width=\"{width}\"/>",
                            g.x,
                            center.y,
                            g.right(),
                            center.y,
                            escape_xml(&color),
                        )
                        .ok();
                    }
                }
            }

            ElementKind::Text {
                content,
                font_family,
                font_size,
                font_weight,
                align,
                color,
            } => {
                let (anchor, x) = match align {
                    TextAlign::Start => ("start", g.x),
                    TextAlign::Middle => ("middle", center.x),
                    TextAlign::End => ("end", g.right()),
                };
                write!(
                    node,
                    "<text x=\"{x}\" y=\"{}\" font-family=\"{}\" font-size=\"{font_size}\" font-weight=\"{font_weight}\" text-anchor=\"{anchor}\" fill=\"{}\">",
                    g.y,
                    escape_xml(font_family),
                    escape_xml(color),
                )
                .ok();
                for (index, line) in content.split('\n').enumerate() {
                    let dy = if index == 0 {
                        *font_size
                    } else {
                        font_size * LINE_HEIGHT
                    };
                    write!(node, "<tspan x=\"{x}\" dy=\"{dy}\">{}</tspan>", escape_xml(line)).ok();
                }
                node.push_str("</text>");
            }

            ElementKind::Image { src } => {
                let Some(image) = images.ready(src) else {
                    return false;
                };
                write!(
                    node,
                    "<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"none\" href=\"{}\"/>",
                    g.x,
                    g.y,
                    g.width,
                    g.height,
                    image.data_uri(),
                )
                .ok();
            }

            // Members are drawn as elements of their own.
            ElementKind::Group { .. } => {}
        }

        write!(
            self.body,
            "<g transform=\"rotate({} {} {})\" opacity=\"{}\">{node}</g>",
            g.rotation,
            center.x,
            center.y,
            element.opacity.clamp(0.0, 1.0),
        )
        .ok();
        true
    }

    /// Finish the document at `width`×`height` canvas units, output size × `scale`.
    #[must_use]
    pub fn finish(self, width: f64, height: f64, scale: f64) -> String {
        let out_w = width * scale;
        let out_h = height * scale;
        let mut svg = String::with_capacity(self.defs.len() + self.body.len() + 256);
        write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"0 0 {width} {height}\">",
        )
        .ok();
        if !self.defs.is_empty() {
            write!(svg, "<defs>{}</defs>", self.defs).ok();
        }
        svg.push_str(&self.body);
        svg.push_str("</svg>");
        svg
    }

    /// Resolve a paint to an SVG `fill` value, emitting a gradient definition if needed.
    fn paint(&mut self, paint: &Paint) -> String {
        match paint {
            Paint::Solid(color) => escape_xml(color),
            Paint::None => "none".to_string(),
            Paint::Gradient(gradient) => {
                let id = format!("grad{}", self.gradient_count);
                self.gradient_count += 1;
                write_gradient(&mut self.defs, &id, gradient);
                format!("url(#{id})")
            }
        }
    }
}

fn write_gradient(defs: &mut String, id: &str, gradient: &Gradient) {
    let tag = match gradient.kind {
        GradientKind::Linear { angle } => {
            // Direction vector across the unit bounding box.
            let (sin, cos) = angle.to_radians().sin_cos();
            write!(
                defs,
                "<linearGradient id=\"{id}\" x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\">",
                0.5 - cos / 2.0,
                0.5 - sin / 2.0,
                0.5 + cos / 2.0,
                0.5 + sin / 2.0,
            )
            .ok();
            "linearGradient"
        }
        GradientKind::Radial => {
            write!(defs, "<radialGradient id=\"{id}\" cx=\"0.5\" cy=\"0.5\" r=\"0.5\">").ok();
            "radialGradient"
        }
    };
    for stop in &gradient.stops {
        write!(
            defs,
            "<stop offset=\"{}\" stop-color=\"{}\"/>",
            stop.offset,
            escape_xml(&stop.color),
        )
        .ok();
    }
    write!(defs, "</{tag}>").ok();
}

fn stroke_attrs(element: &Element) -> String {
    match &element.style.stroke {
        Some(color) if element.style.stroke_width > 0.0 => format!(
            " stroke=\"{}\" stroke-width=\"{}\"",
            escape_xml(color),
            element.style.stroke_width,
        ),
        _ => String::new(),
    }
}

/// Escape special XML characters.
#[must_use]
pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_core::{Geometry, Style};

    fn builder_with(element: &Element) -> String {
        let mut builder = SvgBuilder::new();
        builder.element(element, &ImageStore::default());
        builder.finish(200.0, 100.0, 1.0)
    }

    #[test]
    fn test_document_frame() {
        let svg = SvgBuilder::new().finish(800.0, 600.0, 2.0);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("width=\"1600\""));
        assert!(svg.contains("viewBox=\"0 0 800 600\""));
        assert!(!svg.contains("<defs>"));
    }

    #[test]
    fn test_rotation_wraps_element() {
        let rect = Element::shape(ShapeKind::Rectangle)
            .with_geometry(Geometry::new(0.0, 0.0, 100.0, 50.0).with_rotation(45.0));
        let svg = builder_with(&rect);
        assert!(svg.contains("rotate(45 50 25)"));
        assert!(svg.contains("<rect"));
    }

    #[test]
    fn test_gradient_defs_per_gradient() {
        let a = Element::shape(ShapeKind::Ellipse)
            .with_fill(Paint::Gradient(Gradient::linear(90.0, &[(0.0, "#fff"), (1.0, "#000")])));
        let b = Element::shape(ShapeKind::Rectangle)
            .with_fill(Paint::Gradient(Gradient::radial(&[(0.0, "red"), (1.0, "blue")])));
        let mut builder = SvgBuilder::new();
        builder.element(&a, &ImageStore::default());
        builder.element(&b, &ImageStore::default());
        let svg = builder.finish(100.0, 100.0, 1.0);

        assert!(svg.contains("<linearGradient id=\"grad0\""));
        assert!(svg.contains("<radialGradient id=\"grad1\""));
        assert!(svg.contains("fill=\"url(#grad0)\""));
        assert_eq!(svg.matches("<stop ").count(), 4);
    }

    #[test]
    fn test_triangle_and_line_markup() {
        let frame = Geometry::new(0.0, 0.0, 100.0, 50.0);
        let triangle = Element::shape(ShapeKind::Triangle).with_geometry(frame);
        assert!(builder_with(&triangle).contains("<polygon points=\"50,0 100,50 0,50\""));

        let line = Element::shape(ShapeKind::Line).with_geometry(frame);
        assert!(builder_with(&line).contains("<line x1=\"0\" y1=\"25\" x2=\"100\" y2=\"25\""));
    }

    #[test]
    fn test_text_lines_and_escaping() {
        let text = Element::text("A < B\nC & D");
        let svg = builder_with(&text);
        assert!(svg.contains("A &lt; B"));
        assert!(svg.contains("C &amp; D"));
        assert_eq!(svg.matches("<tspan").count(), 2);
    }

    #[test]
    fn test_missing_image_emits_nothing() {
        let image = Element::image("missing.png");
        let mut builder = SvgBuilder::new();
        assert!(!builder.element(&image, &ImageStore::default()));
        assert!(!builder.finish(10.0, 10.0, 1.0).contains("<image"));
    }

    #[test]
    fn test_stroke_attributes() {
        let rect = Element::shape(ShapeKind::Rectangle).with_style(Style {
            fill: Paint::None,
            stroke: Some("#333".to_string()),
            stroke_width: 2.0,
        });
        let svg = builder_with(&rect);
        assert!(svg.contains("fill=\"none\""));
        assert!(svg.contains("stroke=\"#333\" stroke-width=\"2\""));
    }
}
