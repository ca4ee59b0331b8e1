//! Flowchart-style workflows
//!
//! Line format: `title:`, `direction:` and `caption:` directives, then one
//! step per line: `[t]` terminal, `(t)` process, `{t}` decision, `<t>`
//! input/output. Plain text is a process step.

use super::svg::{Canvas, TextStyle};
use super::{DiagramError, content_lines, directive, parse_json, wrap_text};
use serde::Deserialize;

const STROKE: &str = "#333333";
const ARROW: &str = "#555555";
const LINE_GROWTH: f32 = 18.0;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
struct Step {
    text: String,
    #[serde(rename = "type")]
    kind: String,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            text: String::new(),
            kind: "process".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
struct WorkflowSpec {
    title: String,
    direction: String,
    steps: Vec<Step>,
    caption: String,
}

impl Default for WorkflowSpec {
    fn default() -> Self {
        Self {
            title: String::new(),
            direction: "vertical".to_string(),
            steps: Vec::new(),
            caption: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Terminal,
    Process,
    Decision,
    Io,
}

/// Shape, fill and text colour of a step type
fn appearance(kind: &str) -> (Shape, &'static str, &'static str) {
    match kind.to_ascii_lowercase().as_str() {
        "terminal" | "start" => (Shape::Terminal, "#34A853", "white"),
        "end" => (Shape::Terminal, "#EA4335", "white"),
        "decision" => (Shape::Decision, "#FBBC04", "black"),
        "io" => (Shape::Io, "#7B61FF", "white"),
        _ => (Shape::Process, "#4285F4", "white"),
    }
}

fn parse_step(line: &str) -> Step {
    let bracketed = [('[', ']', "terminal"), ('(', ')', "process"), ('{', '}', "decision"), ('<', '>', "io")]
        .into_iter()
        .find_map(|(open, close, kind)| {
            let inner = line.strip_prefix(open)?.strip_suffix(close)?.trim();
            (!inner.is_empty()).then(|| (inner, kind))
        });
    let (text, kind) = bracketed.unwrap_or((line, "process"));
    Step {
        text: text.to_string(),
        kind: kind.to_string(),
    }
}

fn parse(code: &str) -> Result<WorkflowSpec, DiagramError> {
    if let Some(spec) = parse_json(code)? {
        return Ok(spec);
    }

    let mut spec = WorkflowSpec::default();
    for line in content_lines(code) {
        match directive(line, &["title", "direction", "caption"]) {
            Some((key, value)) => match key.as_str() {
                "title" => spec.title = value.to_string(),
                "direction" => spec.direction = value.to_ascii_lowercase(),
                _ => spec.caption = value.to_string(),
            },
            None => spec.steps.push(parse_step(line)),
        }
    }
    Ok(spec)
}

/// Box geometry shared by all steps of one diagram
#[derive(Debug, Clone, Copy)]
struct Geometry {
    box_width: f32,
    box_height: f32,
    font: f32,
    wrap: usize,
}

impl Geometry {
    fn height_of(&self, text: &str) -> f32 {
        self.box_height + (text.lines().count().max(1) as f32 - 1.0) * LINE_GROWTH
    }

    /// Half extent of a step shape from its centre, horizontally and vertically
    fn half_extent(&self, shape: Shape, text: &str) -> (f32, f32) {
        let height = self.height_of(text);
        match shape {
            Shape::Decision => (self.box_width * 0.55, height * 0.9),
            _ => (self.box_width / 2.0, height / 2.0),
        }
    }
}

fn draw_step(canvas: &mut Canvas, center: (f32, f32), step: &Step, geometry: &Geometry) {
    let (shape, fill, text_color) = appearance(&step.kind);
    let text = wrap_text(&step.text, geometry.wrap);
    let (half_w, half_h) = geometry.half_extent(shape, &text);
    let (x, y) = center;

    match shape {
        Shape::Decision => canvas.polygon(
            &[(x, y - half_h), (x + half_w, y), (x, y + half_h), (x - half_w, y)],
            fill,
            Some(STROKE),
        ),
        Shape::Io => {
            let skew = 15.0;
            canvas.polygon(
                &[
                    (x - half_w + skew, y - half_h),
                    (x + half_w + skew, y - half_h),
                    (x + half_w - skew, y + half_h),
                    (x - half_w - skew, y + half_h),
                ],
                fill,
                Some(STROKE),
            )
        }
        Shape::Terminal => canvas.rect(
            x - half_w,
            y - half_h,
            half_w * 2.0,
            half_h * 2.0,
            fill,
            Some(STROKE),
            half_h.min(20.0),
        ),
        Shape::Process => canvas.rect(
            x - half_w,
            y - half_h,
            half_w * 2.0,
            half_h * 2.0,
            fill,
            Some(STROKE),
            0.0,
        ),
    }

    let font = if shape == Shape::Decision {
        geometry.font - 2.0
    } else {
        geometry.font
    };
    canvas.text(x, y, &text, TextStyle::new(font).bold().fill(text_color));
}

pub(super) fn draw(code: &str) -> Result<Option<(Canvas, Option<String>)>, DiagramError> {
    let spec = parse(code)?;
    let steps = &spec.steps;
    if steps.is_empty() {
        return Ok(None);
    }

    let count = steps.len();
    let longest = steps
        .iter()
        .map(|s| s.text.chars().count())
        .max()
        .unwrap_or(0) as f32;
    let vertical = !spec.direction.starts_with('h');
    let title_space = if spec.title.is_empty() { 0.0 } else { 50.0 };

    let (geometry, positions, width, height) = if vertical {
        let geometry = Geometry {
            box_width: (longest * 11.0 + 60.0).clamp(180.0, 360.0),
            box_height: 66.0,
            font: 16.0,
            wrap: 30,
        };
        let spacing = 130.0;
        let width = geometry.box_width + 180.0;
        let height = title_space + count as f32 * spacing + 40.0;
        let positions: Vec<(f32, f32)> = (0..count)
            .map(|i| (width / 2.0, title_space + 20.0 + spacing / 2.0 + i as f32 * spacing))
            .collect();
        (geometry, positions, width, height)
    } else {
        let per_row = if count > 4 { count.div_ceil(2).min(4) } else { count };
        let geometry = Geometry {
            box_width: (longest * 11.0 + 90.0).clamp(190.0, 300.0),
            box_height: 90.0,
            font: 18.0,
            wrap: 16,
        };
        let spacing_x = geometry.box_width + 90.0;
        let spacing_y = 210.0;
        let rows = count.div_ceil(per_row);
        let width = per_row as f32 * spacing_x + 60.0;
        let height = title_space + rows as f32 * spacing_y + 20.0;
        let positions: Vec<(f32, f32)> = (0..count)
            .map(|i| {
                let row = i / per_row;
                let mut col = i % per_row;
                // Odd rows run right to left
                if row % 2 == 1 {
                    col = per_row - 1 - col;
                }
                (
                    30.0 + spacing_x / 2.0 + col as f32 * spacing_x,
                    title_space + 10.0 + spacing_y / 2.0 + row as f32 * spacing_y,
                )
            })
            .collect();
        (geometry, positions, width, height)
    };

    let mut canvas = Canvas::new(width, height);

    for (pair, points) in steps.windows(2).zip(positions.windows(2)) {
        let (current, next) = (&pair[0], &pair[1]);
        let (from, to) = (points[0], points[1]);
        let current_extent = geometry.half_extent(
            appearance(&current.kind).0,
            &wrap_text(&current.text, geometry.wrap),
        );
        let next_extent =
            geometry.half_extent(appearance(&next.kind).0, &wrap_text(&next.text, geometry.wrap));

        let (start, end) = if (from.1 - to.1).abs() < 0.1 {
            let direction = if to.0 > from.0 { 1.0 } else { -1.0 };
            (
                (from.0 + direction * (current_extent.0 + 4.0), from.1),
                (to.0 - direction * (next_extent.0 + 4.0), to.1),
            )
        } else {
            (
                (from.0, from.1 + current_extent.1 + 4.0),
                (to.0, to.1 - next_extent.1 - 4.0),
            )
        };
        canvas.arrow(start, end, ARROW, 2.0);
    }

    for (step, center) in steps.iter().zip(&positions) {
        draw_step(&mut canvas, *center, step, &geometry);
    }

    if !spec.title.is_empty() {
        canvas.text(width / 2.0, 28.0, &spec.title, TextStyle::new(24.0).bold());
    }
    Ok(Some((canvas, Some(spec.caption))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_notation() {
        let kinds: Vec<(String, String)> = ["[Start]", "(Load)", "{Valid?}", "<Read input>", "Save"]
            .iter()
            .map(|l| parse_step(l))
            .map(|s| (s.text, s.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("Start".to_string(), "terminal".to_string()),
                ("Load".to_string(), "process".to_string()),
                ("Valid?".to_string(), "decision".to_string()),
                ("Read input".to_string(), "io".to_string()),
                ("Save".to_string(), "process".to_string()),
            ]
        );
    }

    #[test]
    fn test_directives() {
        let spec = parse("title: Flow\ndirection: Horizontal\n[Go]\ncaption: Fig").unwrap();
        assert_eq!(spec.title, "Flow");
        assert_eq!(spec.direction, "horizontal");
        assert_eq!(spec.caption, "Fig");
        assert_eq!(spec.steps.len(), 1);
    }

    #[test]
    fn test_json_steps_default_to_process() {
        let spec = parse(r#"{"steps": [{"text": "a"}, {"text": "b", "type": "end"}]}"#).unwrap();
        assert_eq!(spec.direction, "vertical");
        assert_eq!(spec.steps[0].kind, "process");
        assert_eq!(appearance(&spec.steps[1].kind).1, "#EA4335");
    }

    #[test]
    fn test_horizontal_zigzag() {
        let code = "direction: horizontal\n[a]\n(b)\n(c)\n(d)\n(e)\n[f]";
        let (canvas, _) = draw(code).unwrap().unwrap();
        // Six steps wrap into two rows of three
        assert!(canvas.height() > 2.0 * 200.0);
        assert_eq!(canvas.finish().matches("<polygon").count(), 5);
    }

    #[test]
    fn test_decision_colours() {
        assert_eq!(appearance("decision"), (Shape::Decision, "#FBBC04", "black"));
        assert_eq!(appearance("unknown").0, Shape::Process);
    }
}
