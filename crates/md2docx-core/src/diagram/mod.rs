//! Diagram fences
//!
//! Fenced blocks tagged `matrix`, `chart`, `graph` or `workflow` are drawn as
//! SVG and rasterized to PNG instead of being shown as code. Each kind
//! accepts a JSON object or a line-oriented shorthand.

mod chart;
mod graph;
mod matrix;
pub mod svg;
mod workflow;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Colours assigned to series, nodes and bars in order
pub const PALETTE: [&str; 12] = [
    "#4285F4", "#EA4335", "#FBBC04", "#34A853", "#FF6D01", "#46BDC6", "#7B61FF", "#F538A0",
    "#185ABC", "#B31412", "#E37400", "#0D652D",
];

#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("invalid diagram data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid SVG: {0}")]
    Svg(#[from] resvg::usvg::Error),
    #[error("cannot allocate a {0}x{1} canvas")]
    Canvas(u32, u32),
    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Recognized diagram fence languages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramKind {
    Matrix,
    Chart,
    Graph,
    Workflow,
}

impl DiagramKind {
    /// Match a fence language, ignoring case and surrounding whitespace
    pub fn from_language(language: &str) -> Option<Self> {
        match language.trim().to_ascii_lowercase().as_str() {
            "matrix" => Some(DiagramKind::Matrix),
            "chart" => Some(DiagramKind::Chart),
            "graph" => Some(DiagramKind::Graph),
            "workflow" => Some(DiagramKind::Workflow),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DiagramKind::Matrix => "matrix",
            DiagramKind::Chart => "chart",
            DiagramKind::Graph => "graph",
            DiagramKind::Workflow => "workflow",
        }
    }
}

/// A rendered diagram and its optional caption
#[derive(Debug, Clone)]
pub struct Diagram {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub caption: Option<String>,
}

/// Render a diagram fence body
///
/// `Ok(None)` means the body describes nothing to draw.
pub fn render(code: &str, kind: DiagramKind) -> Result<Option<Diagram>, DiagramError> {
    let drawn = match kind {
        DiagramKind::Matrix => matrix::draw(code)?,
        DiagramKind::Chart => chart::draw(code)?,
        DiagramKind::Graph => graph::draw(code)?,
        DiagramKind::Workflow => workflow::draw(code)?,
    };
    let Some((canvas, caption)) = drawn else {
        return Ok(None);
    };

    let raster = svg::rasterize(&canvas.finish(), svg::RASTER_SCALE)?;
    Ok(Some(Diagram {
        png: raster.png,
        width: raster.width,
        height: raster.height,
        caption: caption.filter(|c| !c.is_empty()),
    }))
}

/// Parse a JSON body, or `None` when the body is not JSON at all
///
/// Malformed JSON falls through to the line format; well-formed JSON
/// with the wrong shape is an error.
fn parse_json<T: DeserializeOwned>(code: &str) -> Result<Option<T>, DiagramError> {
    let code = code.trim();
    if !code.starts_with('{') {
        return Ok(None);
    }
    match serde_json::from_str(code) {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_syntax() || e.is_eof() => {
            log::debug!("diagram body is not valid JSON, using line format: {e}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Split `key: value` when `key` is one of `keys` (case-insensitive)
fn directive<'a>(line: &'a str, keys: &[&str]) -> Option<(String, &'a str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim().to_ascii_lowercase();
    keys.contains(&key.as_str()).then(|| (key, value.trim()))
}

/// Non-empty trimmed lines of a fence body
fn content_lines(code: &str) -> impl Iterator<Item = &str> {
    code.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Format a number without a trailing `.0` for whole values
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Greedy word wrap; words longer than `max_chars` get a line of their own
pub fn wrap_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        text.to_string()
    } else {
        lines.join("\n")
    }
}

/// Rough rendered width of a string in a sans-serif font
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.6
}
