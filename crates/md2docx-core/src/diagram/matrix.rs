//! Bracketed matrix diagrams
//!
//! Line format: `name: A`, `caption: ...`, and one row per line with cells
//! separated by commas or whitespace.

use super::svg::{Anchor, Canvas, TextStyle};
use super::{DiagramError, content_lines, directive, format_number, parse_json, text_width};
use serde::Deserialize;
use serde_json::Value;

const CELL_HEIGHT: f32 = 40.0;
const CELL_FONT: f32 = 20.0;
const NAME_FONT: f32 = 22.0;
const MARGIN: f32 = 20.0;
const BRACKET_PAD: f32 = 8.0;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MatrixSpec {
    name: String,
    data: Vec<Vec<Value>>,
    caption: String,
}

#[derive(Debug, Default, PartialEq)]
struct Matrix {
    name: String,
    rows: Vec<Vec<String>>,
    caption: String,
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Number(n) => n.as_f64().map_or_else(|| n.to_string(), format_number),
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_cell(cell: &str) -> String {
    cell.parse::<f64>()
        .map_or_else(|_| cell.to_string(), format_number)
}

fn parse(code: &str) -> Result<Matrix, DiagramError> {
    if let Some(spec) = parse_json::<MatrixSpec>(code)? {
        return Ok(Matrix {
            name: spec.name,
            rows: spec
                .data
                .iter()
                .map(|row| row.iter().map(cell_text).collect())
                .collect(),
            caption: spec.caption,
        });
    }

    let mut matrix = Matrix::default();
    for line in content_lines(code) {
        if let Some((key, value)) = directive(line, &["name", "caption"]) {
            match key.as_str() {
                "name" => matrix.name = value.to_string(),
                _ => matrix.caption = value.to_string(),
            }
            continue;
        }
        let row: Vec<String> = if line.contains(',') {
            line.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(parse_cell)
                .collect()
        } else {
            line.split_whitespace().map(parse_cell).collect()
        };
        if !row.is_empty() {
            matrix.rows.push(row);
        }
    }
    Ok(matrix)
}

pub(super) fn draw(code: &str) -> Result<Option<(Canvas, Option<String>)>, DiagramError> {
    let matrix = parse(code)?;
    let rows = matrix.rows.len();
    let cols = matrix.rows.iter().map(Vec::len).max().unwrap_or(0);
    if rows == 0 || cols == 0 {
        return Ok(None);
    }

    let widest = matrix
        .rows
        .iter()
        .flatten()
        .map(|cell| text_width(cell, CELL_FONT))
        .fold(0.0_f32, f32::max);
    let cell_width = (widest + 24.0).max(48.0);

    let label = (!matrix.name.is_empty()).then(|| format!("{} =", matrix.name));
    let label_width = label
        .as_deref()
        .map_or(0.0, |l| text_width(l, NAME_FONT) + 16.0);

    let grid_left = MARGIN + label_width + BRACKET_PAD * 2.0;
    let grid_top = MARGIN + BRACKET_PAD;
    let grid_width = cols as f32 * cell_width;
    let grid_height = rows as f32 * CELL_HEIGHT;
    let mut canvas = Canvas::new(
        grid_left + grid_width + BRACKET_PAD * 2.0 + MARGIN,
        grid_top + grid_height + BRACKET_PAD + MARGIN,
    );

    let top = grid_top - BRACKET_PAD / 2.0;
    let bottom = grid_top + grid_height + BRACKET_PAD / 2.0;
    let left = grid_left - BRACKET_PAD;
    let right = grid_left + grid_width + BRACKET_PAD;
    canvas.polyline(
        &[(left + 8.0, top), (left, top), (left, bottom), (left + 8.0, bottom)],
        "black",
        2.0,
    );
    canvas.polyline(
        &[(right - 8.0, top), (right, top), (right, bottom), (right - 8.0, bottom)],
        "black",
        2.0,
    );

    for (r, row) in matrix.rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            canvas.text(
                grid_left + (c as f32 + 0.5) * cell_width,
                grid_top + (r as f32 + 0.5) * CELL_HEIGHT,
                cell,
                TextStyle::new(CELL_FONT).serif(),
            );
        }
    }

    if let Some(label) = label {
        canvas.text(
            left - 10.0,
            grid_top + grid_height / 2.0,
            &label,
            TextStyle::new(NAME_FONT)
                .serif()
                .italic()
                .anchor(Anchor::End),
        );
    }

    Ok(Some((canvas, Some(matrix.caption))))
}
