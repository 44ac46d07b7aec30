// perfmon_report - Rolling Window Performance Report (Chart Renderer)
// Copyright (C) 2025 Laurence Oberman
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

/*!
    # chart.rs

    Renders a [`Frame`] as an SVG chart.

    - `Line`: one line per column (system CPU/Memory trend).
    - `StackedBar`: one bar per time bucket, one segment per process,
      every non-zero segment labelled with its rounded percentage.

    Every chart shares the same page: 14 x 10.5 in at a fixed 100 px/in,
    `%` Y ticks, rotated small X ticks, legend in the upper-left corner,
    and colours from the "cool" map (cyan to magenta).
*/

use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::debug;

use crate::error::{ReportError, Result};
use crate::transform::Frame;

/// Page size in inches.
pub const PAGE_INCHES: (f64, f64) = (14.0, 10.5);
/// Output resolution.
pub const DPI: u32 = 100;

const MARGIN: u32 = 12;
const X_LABEL_AREA: u32 = 120;
const Y_LABEL_AREA: u32 = 70;
const MAX_X_TICKS: usize = 30;
const TICK_FONT: f64 = 11.0;
const LEGEND_FONT: f64 = 11.0;
const SEGMENT_FONT: f64 = 9.0;
const DESC_FONT: f64 = 16.0;
const BAR_HALF_WIDTH: f64 = 0.4;

type DrawResult = std::result::Result<(), DrawingAreaErrorKind<std::io::Error>>;
type SvgChart<'a, 'b> = ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// Unstacked lines, one per column.
    Line,
    /// One stacked bar per row.
    StackedBar,
}

/// What the legend shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Legend {
    /// Column names.
    Columns,
    /// Caller-supplied labels, matched to columns in order.
    Labels(Vec<String>),
    Hidden,
}

/// Per-chart labels.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub x_label: String,
    pub y_label: String,
    pub legend: Legend,
}

/// A rendered chart page.
#[derive(Debug, Clone)]
pub struct Chart {
    kind: ChartKind,
    title: String,
    svg: String,
}

impl Chart {
    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    /// The chart's X axis description, used as its page title.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn svg(&self) -> &str {
        &self.svg
    }
}

/// Canvas size in pixels.
pub fn canvas_size() -> (u32, u32) {
    (
        (PAGE_INCHES.0 * f64::from(DPI)).round() as u32,
        (PAGE_INCHES.1 * f64::from(DPI)).round() as u32,
    )
}

pub fn render(frame: &Frame, kind: ChartKind, options: &ChartOptions) -> Result<Chart> {
    let mut svg = String::new();
    draw(&mut svg, frame, kind, options).map_err(|e| ReportError::Render {
        chart: options.x_label.clone(),
        reason: e.to_string(),
    })?;
    debug!(chart = %options.x_label, ?kind, points = frame.len(), bytes = svg.len(), "rendered");
    Ok(Chart {
        kind,
        title: options.x_label.clone(),
        svg,
    })
}

fn draw(svg: &mut String, frame: &Frame, kind: ChartKind, options: &ChartOptions) -> DrawResult {
    let root = SVGBackend::with_string(svg, canvas_size()).into_drawing_area();
    root.fill(&WHITE)?;

    let slots = frame.len().max(1) as f64;
    let y_max = match kind {
        ChartKind::Line => (frame.max_value() * 1.05).max(100.0),
        ChartKind::StackedBar => (frame.max_row_sum() * 1.05).max(1.0),
    };

    let labels = frame.index();
    let x_fmt = |x: &f64| tick_label(labels, *x);
    let y_fmt = |y: &f64| format!("{y:.0}%");

    let mut chart = ChartBuilder::on(&root)
        .margin(MARGIN)
        .x_label_area_size(X_LABEL_AREA)
        .y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(-0.5..(slots - 0.5), 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_labels(frame.len().clamp(1, MAX_X_TICKS))
        .x_label_formatter(&x_fmt)
        .x_label_style(("sans-serif", TICK_FONT).into_font().transform(FontTransform::Rotate90))
        .y_label_formatter(&y_fmt)
        .axis_desc_style(("sans-serif", DESC_FONT))
        .x_desc(options.x_label.as_str())
        .y_desc(options.y_label.as_str())
        .draw()?;

    let names = series_names(frame, &options.legend);
    match kind {
        ChartKind::Line => draw_lines(&mut chart, frame, &names)?,
        ChartKind::StackedBar => draw_stacked(&mut chart, frame, &names)?,
    }

    if options.legend != Legend::Hidden && !frame.columns().is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font(("sans-serif", LEGEND_FONT))
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

fn draw_lines(chart: &mut SvgChart<'_, '_>, frame: &Frame, names: &[String]) -> DrawResult {
    let colors = cool_colors(frame.columns().len());
    for (col, (name, color)) in names.iter().zip(colors).enumerate() {
        let points: Vec<(f64, f64)> = frame
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| (i as f64, row[col]))
            .collect();
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))?
            .label(name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }
    Ok(())
}

fn draw_stacked(chart: &mut SvgChart<'_, '_>, frame: &Frame, names: &[String]) -> DrawResult {
    let colors = cool_colors(frame.columns().len());
    let mut base = vec![0.0; frame.len()];
    for (col, (name, color)) in names.iter().zip(colors).enumerate() {
        let mut bars = Vec::with_capacity(frame.len());
        for (i, row) in frame.rows().iter().enumerate() {
            let x = i as f64;
            let top = base[i] + row[col];
            bars.push(Rectangle::new(
                [(x - BAR_HALF_WIDTH, base[i]), (x + BAR_HALF_WIDTH, top)],
                color.filled(),
            ));
            base[i] = top;
        }
        chart
            .draw_series(bars)?
            .label(name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    let style = ("sans-serif", SEGMENT_FONT)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    chart.draw_series(
        segment_labels(frame)
            .into_iter()
            .map(|(x, y, text)| Text::new(text, (x, y), style.clone())),
    )?;
    Ok(())
}

/// Legend text per column.
fn series_names(frame: &Frame, legend: &Legend) -> Vec<String> {
    frame
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| match legend {
            Legend::Labels(labels) => labels.get(i).unwrap_or(col).clone(),
            _ => col.clone(),
        })
        .collect()
}

/// X tick text: the index label at whole positions, nothing in between.
fn tick_label(labels: &[String], x: f64) -> String {
    let slot = x.round();
    if slot < 0.0 || (x - slot).abs() > 1e-6 {
        return String::new();
    }
    labels.get(slot as usize).cloned().unwrap_or_default()
}

/// Centre and text of every non-zero stacked segment.
pub fn segment_labels(frame: &Frame) -> Vec<(f64, f64, String)> {
    let mut out = Vec::new();
    for (i, row) in frame.rows().iter().enumerate() {
        let mut base = 0.0;
        for &value in row {
            if value != 0.0 {
                out.push((i as f64, base + value / 2.0, format!("{value:.0}%")));
            }
            base += value;
        }
    }
    out
}

/// `n` colours spread evenly over the cool map.
pub fn cool_colors(n: usize) -> Vec<RGBColor> {
    (0..n)
        .map(|i| {
            let t = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
            RGBColor((255.0 * t).round() as u8, (255.0 * (1.0 - t)).round() as u8, 255)
        })
        .collect()
}
