//! Minimal SVG canvas and PNG rasterization

use super::DiagramError;
use once_cell::sync::Lazy;
use resvg::{tiny_skia, usvg};
use std::fmt::Write;
use std::sync::Arc;

/// Rasterization scale, roughly 200 DPI for a 96 DPI canvas
pub const RASTER_SCALE: f32 = 2.0;

const FONT_SANS: &str = "DejaVu Sans, Arial, Helvetica, sans-serif";
const FONT_SERIF: &str = "DejaVu Serif, Times New Roman, serif";

static FONTS: Lazy<Arc<usvg::fontdb::Database>> = Lazy::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    log::debug!("loaded {} font faces for diagrams", db.len());
    Arc::new(db)
});

/// Horizontal text anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub size: f32,
    pub anchor: Anchor,
    pub bold: bool,
    pub italic: bool,
    pub serif: bool,
    pub fill: &'static str,
}

impl TextStyle {
    pub fn new(size: f32) -> Self {
        Self {
            size,
            anchor: Anchor::Middle,
            bold: false,
            italic: false,
            serif: false,
            fill: "#222222",
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn serif(mut self) -> Self {
        self.serif = true;
        self
    }

    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn fill(mut self, fill: &'static str) -> Self {
        self.fill = fill;
        self
    }
}

/// An SVG document under construction
#[derive(Debug)]
pub struct Canvas {
    width: f32,
    height: f32,
    body: String,
}

impl Canvas {
    pub fn new(width: f32, height: f32) -> Self {
        let mut canvas = Self {
            width,
            height,
            body: String::new(),
        };
        canvas.rect(0.0, 0.0, width, height, "white", None, 0.0);
        canvas
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    #[allow(clippy::too_many_arguments)]
    pub fn rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: &str,
        stroke: Option<&str>,
        radius: f32,
    ) {
        let _ = write!(
            self.body,
            r#"<rect x="{x:.1}" y="{y:.1}" width="{width:.1}" height="{height:.1}" rx="{radius:.1}" fill="{fill}"{}/>"#,
            stroke_attrs(stroke, 1.5)
        );
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), stroke: &str, width: f32) {
        let _ = write!(
            self.body,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{stroke}" stroke-width="{width}" stroke-linecap="round"/>"#,
            from.0, from.1, to.0, to.1
        );
    }

    pub fn polyline(&mut self, points: &[(f32, f32)], stroke: &str, width: f32) {
        let _ = write!(
            self.body,
            r#"<polyline points="{}" fill="none" stroke="{stroke}" stroke-width="{width}" stroke-linejoin="round" stroke-linecap="round"/>"#,
            format_points(points)
        );
    }

    pub fn polygon(&mut self, points: &[(f32, f32)], fill: &str, stroke: Option<&str>) {
        let _ = write!(
            self.body,
            r#"<polygon points="{}" fill="{fill}"{}/>"#,
            format_points(points),
            stroke_attrs(stroke, 1.5)
        );
    }

    pub fn circle(&mut self, center: (f32, f32), radius: f32, fill: &str, stroke: Option<&str>) {
        let _ = write!(
            self.body,
            r#"<circle cx="{:.1}" cy="{:.1}" r="{radius:.1}" fill="{fill}"{}/>"#,
            center.0,
            center.1,
            stroke_attrs(stroke, 1.5)
        );
    }

    pub fn path(&mut self, data: &str, fill: &str, stroke: Option<&str>) {
        let _ = write!(
            self.body,
            r#"<path d="{data}" fill="{fill}"{}/>"#,
            stroke_attrs(stroke, 1.5)
        );
    }

    /// A line ending in a filled arrowhead at `to`
    pub fn arrow(&mut self, from: (f32, f32), to: (f32, f32), stroke: &str, width: f32) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let length = (dx * dx + dy * dy).sqrt();
        if length < f32::EPSILON {
            return;
        }
        let (ux, uy) = (dx / length, dy / length);
        let head = 12.0_f32.min(length / 2.0);
        let base = (to.0 - ux * head, to.1 - uy * head);
        self.line(from, base, stroke, width);
        let half = head * 0.45;
        self.polygon(
            &[
                to,
                (base.0 - uy * half, base.1 + ux * half),
                (base.0 + uy * half, base.1 - ux * half),
            ],
            stroke,
            None,
        );
    }

    /// Text centred vertically on `y`; embedded newlines start new lines
    pub fn text(&mut self, x: f32, y: f32, text: &str, style: TextStyle) {
        let lines: Vec<&str> = text.split('\n').collect();
        let line_height = style.size * 1.2;
        let first = y - line_height * (lines.len() as f32 - 1.0) / 2.0 + style.size * 0.35;
        for (index, line) in lines.iter().enumerate() {
            let _ = write!(
                self.body,
                r#"<text x="{x:.1}" y="{:.1}" font-family="{}" font-size="{:.1}" text-anchor="{}" fill="{}"{}{}>{}</text>"#,
                first + line_height * index as f32,
                if style.serif { FONT_SERIF } else { FONT_SANS },
                style.size,
                style.anchor.as_str(),
                style.fill,
                if style.bold { r#" font-weight="bold""# } else { "" },
                if style.italic { r#" font-style="italic""# } else { "" },
                escape_text(line)
            );
        }
    }

    pub fn finish(self) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">{body}</svg>"#,
            w = self.width.ceil(),
            h = self.height.ceil(),
            body = self.body
        )
    }
}

fn stroke_attrs(stroke: Option<&str>, width: f32) -> String {
    match stroke {
        Some(color) => format!(r#" stroke="{color}" stroke-width="{width}""#),
        None => String::new(),
    }
}

fn format_points(points: &[(f32, f32)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{x:.1},{y:.1}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A rasterized diagram
#[derive(Debug, Clone)]
pub struct Raster {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Render an SVG document to PNG bytes
pub fn rasterize(svg: &str, scale: f32) -> Result<Raster, DiagramError> {
    let options = usvg::Options {
        fontdb: FONTS.clone(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(svg, &options)?;

    let base = tree.size().to_int_size();
    let size = base
        .scale_by(scale)
        .ok_or(DiagramError::Canvas(base.width(), base.height()))?;
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or(DiagramError::Canvas(size.width(), size.height()))?;
    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    let png = pixmap
        .encode_png()
        .map_err(|e| DiagramError::Encode(e.to_string()))?;
    Ok(Raster {
        png,
        width: size.width(),
        height: size.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_markup() {
        let mut canvas = Canvas::new(100.0, 50.0);
        canvas.text(50.0, 25.0, "a < b", TextStyle::new(12.0).bold());
        let svg = canvas.finish();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("a &lt; b"));
        assert!(svg.contains(r#"font-weight="bold""#));
    }

    #[test]
    fn test_multiline_text() {
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.text(50.0, 50.0, "one\ntwo", TextStyle::new(10.0));
        assert_eq!(canvas.finish().matches("<text").count(), 2);
    }

    #[test]
    fn test_rasterize_scales() {
        let mut canvas = Canvas::new(40.0, 20.0);
        canvas.rect(5.0, 5.0, 10.0, 10.0, "#4285F4", Some("#333333"), 2.0);
        canvas.arrow((0.0, 0.0), (30.0, 15.0), "#555555", 2.0);
        let raster = rasterize(&canvas.finish(), 2.0).unwrap();
        assert_eq!((raster.width, raster.height), (80, 40));
        assert_eq!(&raster.png[1..4], b"PNG");
    }

    #[test]
    fn test_rasterize_rejects_bad_svg() {
        assert!(rasterize("<svg", 1.0).is_err());
    }
}
