//! Node-and-edge graphs on a circular layout
//!
//! Line format: `directed:`, `title:`, `caption:` and `nodes: a, b` directives,
//! plus one edge per line (`A -> B`, `A --> B`, `A -- B` or `A — B`, with an
//! optional `: label`). Any arrow edge makes the graph directed.

use super::svg::{Canvas, TextStyle};
use super::{DiagramError, PALETTE, content_lines, directive, parse_json, text_width};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::f32::consts::PI;

const WIDTH: f32 = 800.0;
const HEIGHT: f32 = 600.0;
const NODE_RADIUS: f32 = 30.0;
const EDGE_COLOR: &str = "#555555";

static EDGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(.+?)\s*(-->|->|--|—)\s*(.+?)(?:\s*:\s*(.+?))?\s*$")
        .expect("edge pattern is valid")
});

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct Edge {
    from: String,
    to: String,
    label: String,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct GraphSpec {
    directed: bool,
    nodes: Vec<String>,
    edges: Vec<Edge>,
    title: String,
    caption: String,
}

impl GraphSpec {
    /// Listed nodes, then any node first seen in an edge
    fn all_nodes(&self) -> Vec<&str> {
        let mut nodes: Vec<&str> = Vec::new();
        let edge_ends = self
            .edges
            .iter()
            .flat_map(|e| [e.from.as_str(), e.to.as_str()]);
        for node in self.nodes.iter().map(String::as_str).chain(edge_ends) {
            if !node.is_empty() && !nodes.contains(&node) {
                nodes.push(node);
            }
        }
        nodes
    }
}

fn parse(code: &str) -> Result<GraphSpec, DiagramError> {
    if let Some(spec) = parse_json(code)? {
        return Ok(spec);
    }

    let mut spec = GraphSpec::default();
    for line in content_lines(code) {
        if let Some((key, value)) = directive(line, &["directed", "title", "caption", "nodes"]) {
            match key.as_str() {
                "directed" => {
                    spec.directed =
                        matches!(value.to_ascii_lowercase().as_str(), "true" | "yes" | "1")
                }
                "title" => spec.title = value.to_string(),
                "caption" => spec.caption = value.to_string(),
                _ => {
                    spec.nodes = value
                        .split(',')
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_string)
                        .collect()
                }
            }
            continue;
        }

        let Some(captures) = EDGE.captures(line) else {
            log::debug!("ignoring graph line: {line}");
            continue;
        };
        let arrow = &captures[2];
        if arrow == "->" || arrow == "-->" {
            spec.directed = true;
        }
        spec.edges.push(Edge {
            from: captures[1].trim().to_string(),
            to: captures[3].trim().to_string(),
            label: captures
                .get(4)
                .map_or(String::new(), |m| m.as_str().trim().to_string()),
        });
    }
    Ok(spec)
}

fn layout(count: usize, center: (f32, f32), radius: f32) -> Vec<(f32, f32)> {
    match count {
        0 => Vec::new(),
        1 => vec![center],
        _ => (0..count)
            .map(|i| {
                let angle = -PI / 2.0 + 2.0 * PI * i as f32 / count as f32;
                (
                    center.0 + radius * angle.cos(),
                    center.1 + radius * angle.sin(),
                )
            })
            .collect(),
    }
}

/// Move `from` towards `to` by `distance`
fn step_towards(from: (f32, f32), to: (f32, f32), distance: f32) -> (f32, f32) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let length = (dx * dx + dy * dy).sqrt().max(f32::EPSILON);
    (from.0 + dx / length * distance, from.1 + dy / length * distance)
}

pub(super) fn draw(code: &str) -> Result<Option<(Canvas, Option<String>)>, DiagramError> {
    let spec = parse(code)?;
    let nodes = spec.all_nodes();
    if nodes.is_empty() {
        return Ok(None);
    }

    let mut canvas = Canvas::new(WIDTH, HEIGHT);
    let top = if spec.title.is_empty() { 0.0 } else { 40.0 };
    let center = (WIDTH / 2.0, (HEIGHT + top) / 2.0);
    let radius = (HEIGHT - top) / 2.0 - NODE_RADIUS - 40.0;
    let positions = layout(nodes.len(), center, radius);
    let position = |name: &str| {
        nodes
            .iter()
            .position(|n| *n == name)
            .map(|index| positions[index])
    };

    for edge in &spec.edges {
        let (Some(from), Some(to)) = (position(&edge.from), position(&edge.to)) else {
            continue;
        };
        if edge.from == edge.to {
            // Self loop above the node
            let data = format!(
                "M {:.1} {:.1} C {:.1} {:.1} {:.1} {:.1} {:.1} {:.1}",
                from.0 - 12.0,
                from.1 - NODE_RADIUS + 4.0,
                from.0 - 40.0,
                from.1 - NODE_RADIUS - 50.0,
                from.0 + 40.0,
                from.1 - NODE_RADIUS - 50.0,
                from.0 + 12.0,
                from.1 - NODE_RADIUS + 4.0
            );
            canvas.path(&data, "none", Some(EDGE_COLOR));
            continue;
        }
        let start = step_towards(from, to, NODE_RADIUS);
        let end = step_towards(to, from, NODE_RADIUS + 2.0);
        if spec.directed {
            canvas.arrow(start, end, EDGE_COLOR, 1.5);
        } else {
            canvas.line(start, end, EDGE_COLOR, 1.5);
        }
    }

    for edge in spec.edges.iter().filter(|e| !e.label.is_empty()) {
        let (Some(from), Some(to)) = (position(&edge.from), position(&edge.to)) else {
            continue;
        };
        let middle = if edge.from == edge.to {
            (from.0, from.1 - NODE_RADIUS - 42.0)
        } else {
            ((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0)
        };
        let width = text_width(&edge.label, 14.0) + 8.0;
        canvas.rect(middle.0 - width / 2.0, middle.1 - 10.0, width, 20.0, "white", None, 4.0);
        canvas.text(middle.0, middle.1, &edge.label, TextStyle::new(14.0).fill("#CC0000"));
    }

    for (index, (name, point)) in nodes.iter().zip(&positions).enumerate() {
        canvas.circle(*point, NODE_RADIUS, PALETTE[index % PALETTE.len()], None);
        canvas.text(point.0, point.1, name, TextStyle::new(15.0).bold().fill("white"));
    }

    if !spec.title.is_empty() {
        canvas.text(WIDTH / 2.0, 28.0, &spec.title, TextStyle::new(18.0).bold());
    }
    Ok(Some((canvas, Some(spec.caption))))
}
