//! Bar, line, scatter and pie charts
//!
//! Line format: `type:`, `title:`, `xlabel:`, `ylabel:`, `labels:` and
//! `caption:` directives; any other `name: v1, v2, ...` line is a dataset.

use super::svg::{Anchor, Canvas, TextStyle};
use super::{DiagramError, PALETTE, content_lines, directive, format_number, parse_json};
use serde::Deserialize;
use std::f32::consts::PI;

const WIDTH: f32 = 800.0;
const HEIGHT: f32 = 500.0;
const GRID: &str = "#DDDDDD";
const AXIS: &str = "#555555";

const DIRECTIVES: &[&str] = &["type", "title", "xlabel", "ylabel", "caption", "labels"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChartType {
    Bar,
    Line,
    Scatter,
    Pie,
}

impl ChartType {
    fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "line" => ChartType::Line,
            "scatter" => ChartType::Scatter,
            "pie" => ChartType::Pie,
            _ => ChartType::Bar,
        }
    }
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct Dataset {
    label: String,
    values: Vec<f64>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct ChartData {
    labels: Vec<String>,
    datasets: Vec<Dataset>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct ChartSpec {
    #[serde(rename = "type")]
    kind: String,
    title: String,
    xlabel: String,
    ylabel: String,
    data: ChartData,
    caption: String,
}

fn parse(code: &str) -> Result<ChartSpec, DiagramError> {
    if let Some(spec) = parse_json(code)? {
        return Ok(spec);
    }

    let mut spec = ChartSpec::default();
    for line in content_lines(code) {
        if let Some((key, value)) = directive(line, DIRECTIVES) {
            let value = value.to_string();
            match key.as_str() {
                "type" => spec.kind = value,
                "title" => spec.title = value,
                "xlabel" => spec.xlabel = value,
                "ylabel" => spec.ylabel = value,
                "caption" => spec.caption = value,
                _ => {
                    spec.data.labels = value.split(',').map(|l| l.trim().to_string()).collect()
                }
            }
        } else if let Some((label, values)) = line.split_once(':') {
            spec.data.datasets.push(Dataset {
                label: label.trim().to_string(),
                values: values
                    .split(',')
                    .map(|v| v.trim().parse().unwrap_or(0.0))
                    .collect(),
            });
        }
    }
    Ok(spec)
}

/// Plot area in canvas coordinates
#[derive(Debug, Clone, Copy)]
struct Plot {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
    min: f64,
    max: f64,
}

impl Plot {
    fn y(&self, value: f64) -> f32 {
        let span = (self.max - self.min).max(f64::EPSILON);
        self.bottom - ((value - self.min) / span) as f32 * (self.bottom - self.top)
    }

    /// Centre of category `index` out of `count`
    fn x(&self, index: usize, count: usize) -> f32 {
        let step = (self.right - self.left) / count.max(1) as f32;
        self.left + step * (index as f32 + 0.5)
    }
}

/// A round tick step covering `span` in about five intervals
fn tick_step(span: f64) -> f64 {
    let raw = (span / 5.0).max(f64::EPSILON);
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn draw_axes(canvas: &mut Canvas, spec: &ChartSpec, count: usize) -> Plot {
    let top = if spec.title.is_empty() { 30.0 } else { 60.0 };
    let bottom = HEIGHT - if spec.xlabel.is_empty() { 45.0 } else { 75.0 };
    let left = if spec.ylabel.is_empty() { 70.0 } else { 95.0 };

    let values = spec.data.datasets.iter().flat_map(|d| d.values.iter().copied());
    let (lo, hi) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let step = tick_step(hi - lo);
    let min = (lo / step).floor() * step;
    let max = ((hi / step).ceil() * step).max(min + step);

    let plot = Plot {
        left,
        top,
        right: WIDTH - 30.0,
        bottom,
        min,
        max,
    };

    let mut tick = min;
    while tick <= max + step / 2.0 {
        let y = plot.y(tick);
        canvas.line((plot.left, y), (plot.right, y), GRID, 1.0);
        canvas.text(
            plot.left - 8.0,
            y,
            &format_number((tick * 1e6).round() / 1e6),
            TextStyle::new(13.0).anchor(Anchor::End),
        );
        tick += step;
    }
    canvas.line((plot.left, plot.top), (plot.left, plot.bottom), AXIS, 1.5);
    canvas.line((plot.left, plot.y(0.0)), (plot.right, plot.y(0.0)), AXIS, 1.5);

    for index in 0..count {
        let label = spec
            .data
            .labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Item {}", index + 1));
        canvas.text(plot.x(index, count), plot.bottom + 18.0, &label, TextStyle::new(13.0));
    }

    if !spec.xlabel.is_empty() {
        canvas.text(
            (plot.left + plot.right) / 2.0,
            HEIGHT - 25.0,
            &spec.xlabel,
            TextStyle::new(15.0),
        );
    }
    if !spec.ylabel.is_empty() {
        // Drawn above the axis
        canvas.text(
            plot.left,
            plot.top - 14.0,
            &spec.ylabel,
            TextStyle::new(15.0).anchor(Anchor::Middle),
        );
    }
    plot
}

fn draw_legend(canvas: &mut Canvas, datasets: &[Dataset], plot: &Plot) {
    let mut y = plot.top + 10.0;
    for (index, dataset) in datasets.iter().enumerate() {
        let x = plot.right - 150.0;
        canvas.rect(x, y - 6.0, 12.0, 12.0, PALETTE[index % PALETTE.len()], None, 2.0);
        let label = if dataset.label.is_empty() {
            format!("Series {}", index + 1)
        } else {
            dataset.label.clone()
        };
        canvas.text(
            x + 18.0,
            y,
            &label,
            TextStyle::new(13.0).anchor(Anchor::Start),
        );
        y += 20.0;
    }
}

fn draw_bars(canvas: &mut Canvas, spec: &ChartSpec) {
    let datasets = &spec.data.datasets;
    let count = datasets.iter().map(|d| d.values.len()).max().unwrap_or(0);
    let plot = draw_axes(canvas, spec, count);
    let slot = (plot.right - plot.left) / count.max(1) as f32;
    let zero = plot.y(0.0);

    if let [dataset] = datasets.as_slice() {
        let width = slot * 0.6;
        for (index, value) in dataset.values.iter().enumerate() {
            let x = plot.x(index, count) - width / 2.0;
            let y = plot.y(*value);
            canvas.rect(x, y.min(zero), width, (zero - y).abs(), PALETTE[index % PALETTE.len()], None, 0.0);
            canvas.text(
                plot.x(index, count),
                y.min(zero) - 10.0,
                &format_number(*value),
                TextStyle::new(13.0),
            );
        }
    } else {
        let width = slot * 0.8 / datasets.len() as f32;
        for (series, dataset) in datasets.iter().enumerate() {
            let color = PALETTE[series % PALETTE.len()];
            for (index, value) in dataset.values.iter().enumerate() {
                let center = plot.x(index, count)
                    + (series as f32 - (datasets.len() as f32 - 1.0) / 2.0) * width;
                let y = plot.y(*value);
                canvas.rect(center - width / 2.0, y.min(zero), width, (zero - y).abs(), color, None, 0.0);
            }
        }
        draw_legend(canvas, datasets, &plot);
    }
}

fn draw_series(canvas: &mut Canvas, spec: &ChartSpec, connect: bool) {
    let datasets = &spec.data.datasets;
    let count = datasets.iter().map(|d| d.values.len()).max().unwrap_or(0);
    let plot = draw_axes(canvas, spec, count);

    for (series, dataset) in datasets.iter().enumerate() {
        let color = PALETTE[series % PALETTE.len()];
        let points: Vec<(f32, f32)> = dataset
            .values
            .iter()
            .enumerate()
            .map(|(index, value)| (plot.x(index, count), plot.y(*value)))
            .collect();
        if connect && points.len() > 1 {
            canvas.polyline(&points, color, 2.5);
        }
        let radius = if connect { 4.0 } else { 6.0 };
        for point in points {
            canvas.circle(point, radius, color, None);
        }
    }
    draw_legend(canvas, datasets, &plot);
}

fn draw_pie(canvas: &mut Canvas, spec: &ChartSpec) {
    let Some(dataset) = spec.data.datasets.first() else {
        return;
    };
    let total: f64 = dataset.values.iter().filter(|v| **v > 0.0).sum();
    if total <= 0.0 {
        return;
    }

    let center = (WIDTH / 2.0, HEIGHT / 2.0 + 15.0);
    let radius = 170.0;
    let mut angle = -PI / 2.0;
    for (index, value) in dataset.values.iter().enumerate() {
        if *value <= 0.0 {
            continue;
        }
        let fraction = (*value / total) as f32;
        let sweep = fraction * 2.0 * PI;
        let color = PALETTE[index % PALETTE.len()];
        if fraction >= 0.9999 {
            canvas.circle(center, radius, color, Some("white"));
        } else {
            let start = (center.0 + radius * angle.cos(), center.1 + radius * angle.sin());
            let end_angle = angle + sweep;
            let end = (center.0 + radius * end_angle.cos(), center.1 + radius * end_angle.sin());
            let large = if sweep > PI { 1 } else { 0 };
            let data = format!(
                "M {:.1} {:.1} L {:.1} {:.1} A {radius} {radius} 0 {large} 1 {:.1} {:.1} Z",
                center.0, center.1, start.0, start.1, end.0, end.1
            );
            canvas.path(&data, color, Some("white"));
        }

        let middle = angle + sweep / 2.0;
        canvas.text(
            center.0 + radius * 0.6 * middle.cos(),
            center.1 + radius * 0.6 * middle.sin(),
            &format!("{:.1}%", fraction * 100.0),
            TextStyle::new(13.0).bold().fill("white"),
        );
        let label = spec
            .data
            .labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Item {}", index + 1));
        let outside = (
            center.0 + (radius + 22.0) * middle.cos(),
            center.1 + (radius + 22.0) * middle.sin(),
        );
        let anchor = if middle.cos() >= 0.0 {
            Anchor::Start
        } else {
            Anchor::End
        };
        canvas.text(outside.0, outside.1, &label, TextStyle::new(14.0).anchor(anchor));
        angle += sweep;
    }
}

pub(super) fn draw(code: &str) -> Result<Option<(Canvas, Option<String>)>, DiagramError> {
    let spec = parse(code)?;
    if spec.data.datasets.is_empty() {
        return Ok(None);
    }

    let mut canvas = Canvas::new(WIDTH, HEIGHT);
    match ChartType::parse(&spec.kind) {
        ChartType::Bar => draw_bars(&mut canvas, &spec),
        ChartType::Line => draw_series(&mut canvas, &spec, true),
        ChartType::Scatter => draw_series(&mut canvas, &spec, false),
        ChartType::Pie => draw_pie(&mut canvas, &spec),
    }
    if !spec.title.is_empty() {
        canvas.text(WIDTH / 2.0, 28.0, &spec.title, TextStyle::new(18.0).bold());
    }
    Ok(Some((canvas, Some(spec.caption))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format_keeps_label_case() {
        let spec = parse(
            "type: Line\ntitle: Sales\nlabels: Q1, Q2\nNorth Region: 10, 20\nsouth: 5, x\ncaption: Fig 1",
        )
        .unwrap();
        assert_eq!(ChartType::parse(&spec.kind), ChartType::Line);
        assert_eq!(spec.title, "Sales");
        assert_eq!(spec.data.labels, vec!["Q1", "Q2"]);
        assert_eq!(spec.data.datasets[0].label, "North Region");
        assert_eq!(spec.data.datasets[1].values, vec![5.0, 0.0]);
        assert_eq!(spec.caption, "Fig 1");
    }

    #[test]
    fn test_json_format() {
        let spec = parse(
            r#"{"type": "pie", "data": {"labels": ["a", "b"], "datasets": [{"label": "s", "values": [1, 3]}]}}"#,
        )
        .unwrap();
        assert_eq!(ChartType::parse(&spec.kind), ChartType::Pie);
        assert_eq!(spec.data.datasets[0].values, vec![1.0, 3.0]);
    }

    #[test]
    fn test_unknown_type_is_bar() {
        assert_eq!(ChartType::parse(""), ChartType::Bar);
        assert_eq!(ChartType::parse("radar"), ChartType::Bar);
    }

    #[test]
    fn test_tick_step() {
        assert_eq!(tick_step(40.0), 10.0);
        assert_eq!(tick_step(7.0), 2.0);
        assert!((tick_step(0.3) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_every_type_draws() {
        for kind in ["bar", "line", "scatter", "pie"] {
            let code = format!("type: {kind}\nlabels: A, B\nS1: 1, 2\nS2: 3, -1");
            let (canvas, _) = draw(&code).unwrap().unwrap();
            assert!(canvas.finish().len() > 200, "{kind}");
        }
    }

    #[test]
    fn test_no_datasets() {
        assert!(draw("title: Empty").unwrap().is_none());
    }
}
