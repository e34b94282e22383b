//! # Renderer
//!
//! Builds a [`Figure`] from a [`ShapeDescriptor`] and draws it as SVG with
//! `plotters`. Every call starts from a fresh figure.

use crate::error::{self, Result};
use crate::evaluator::{self, Bindings};
use crate::shape::{AxisUnits, ShapeDescriptor};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;

pub const TITLE: &str = "Graph Based on Provided Data";

/// Number of samples taken for an equation
pub const SAMPLE_COUNT: usize = 400;

/// Interval an equation is sampled over, both ends included
pub const DOMAIN: (f64, f64) = (-10.0, 10.0);

/// Default SVG size in pixels
pub const DEFAULT_SIZE: (u32, u32) = (800, 600);

/// One plotted line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub points: Vec<(f64, f64)>,
    /// Legend text
    pub label: Option<String>,
    /// Draw a circle at each point
    pub markers: bool,
}

/// A chart described as data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
    pub size: (u32, u32),
}

impl Figure {
    pub fn new(units: &AxisUnits) -> Self {
        Self {
            title: TITLE.to_string(),
            x_label: units.x_label(),
            y_label: units.y_label(),
            series: Vec::new(),
            size: DEFAULT_SIZE,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    /// A figure with nothing to show is never displayed
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }

    /// Axis ranges: data bounds padded by 5 %, at least 2 units wide
    pub fn bounds(&self) -> (Range<f64>, Range<f64>) {
        let points = self.series.iter().flat_map(|s| s.points.iter());
        let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y) in points {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
        (pad(x_min, x_max), pad(y_min, y_max))
    }

    /// Draw into an SVG document held in memory
    pub fn to_svg_string(&self) -> Result<String> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, self.size).into_drawing_area();
            self.draw_on(&root)?;
        }
        Ok(svg)
    }

    /// Draw into an SVG file
    pub fn save_svg(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let root = SVGBackend::new(path, self.size).into_drawing_area();
        self.draw_on(&root)
            .map_err(|e| e.with_context("path", path.display().to_string()))?;
        log::info!("Saved graph to {}", path.display());
        Ok(())
    }

    fn draw_on(&self, root: &DrawingArea<SVGBackend<'_>, Shift>) -> Result<()> {
        let draw_err = |e: DrawingAreaErrorKind<std::io::Error>| error::render_failed(e.to_string());

        root.fill(&WHITE).map_err(draw_err)?;

        let (x_range, y_range) = self.bounds();
        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, ("sans-serif", 22))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .draw()
            .map_err(draw_err)?;

        for series in &self.series {
            let line = chart
                .draw_series(LineSeries::new(series.points.iter().copied(), &BLUE))
                .map_err(draw_err)?;
            if let Some(label) = &series.label {
                line.label(label.as_str())
                    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
            }

            if series.markers {
                chart
                    .draw_series(
                        series
                            .points
                            .iter()
                            .map(|&(x, y)| Circle::new((x, y), 4, BLUE.filled())),
                    )
                    .map_err(draw_err)?;
            }
        }

        if self.series.iter().any(|s| s.label.is_some()) {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(draw_err)?;
        }

        root.present().map_err(draw_err)?;
        Ok(())
    }
}

fn pad(min: f64, max: f64) -> Range<f64> {
    if !min.is_finite() || !max.is_finite() {
        return -1.0..1.0;
    }
    let span = max - min;
    if span <= f64::EPSILON * max.abs().max(1.0) {
        return (min - 1.0)..(max + 1.0);
    }
    let margin = span * 0.05;
    (min - margin)..(max + margin)
}

/// Build the figure for `shape` with no extra symbol bindings
pub fn render(shape: &ShapeDescriptor, units: &AxisUnits) -> Result<Figure> {
    render_with(shape, units, &Bindings::default())
}

/// Build the figure for `shape`, resolving equation symbols from `bindings`
pub fn render_with(shape: &ShapeDescriptor, units: &AxisUnits, bindings: &Bindings) -> Result<Figure> {
    let mut figure = Figure::new(units);

    match shape {
        ShapeDescriptor::Points(points) => {
            if !points.is_empty() {
                figure.series.push(Series {
                    points: points.clone(),
                    label: None,
                    markers: true,
                });
            }
        }
        ShapeDescriptor::Equation(equation) => {
            let xs = evaluator::linspace(DOMAIN.0, DOMAIN.1, SAMPLE_COUNT);
            let ys = evaluator::evaluate_with(equation, &xs, bindings)
                .map_err(|e| e.with_operation("renderer::render"))?;
            figure.series.push(Series {
                points: xs.into_iter().zip(ys).collect(),
                label: Some(equation.clone()),
                markers: false,
            });
        }
    }

    log::debug!("rendered {} with {} series", shape, figure.series.len());
    Ok(figure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use graphgen_error::ErrorKind;

    #[test]
    fn test_points_figure() {
        let shape = ShapeDescriptor::points([(1.0, 2.0), (3.0, 4.0)]);
        let figure = render(&shape, &AxisUnits::new("s", "m")).unwrap();

        assert_eq!(figure.title, "Graph Based on Provided Data");
        assert_eq!(figure.x_label, "X (s)");
        assert_eq!(figure.y_label, "Y (m)");
        assert_eq!(figure.series.len(), 1);
        assert_eq!(figure.series[0].points, vec![(1.0, 2.0), (3.0, 4.0)]);
        assert!(figure.series[0].markers);
    }

    #[test]
    fn test_equation_figure() {
        let figure = render(&ShapeDescriptor::equation("x**2"), &AxisUnits::default()).unwrap();

        assert_eq!(figure.series.len(), 1);
        let series = &figure.series[0];
        assert_eq!(series.points.len(), 400);
        assert_eq!(series.label.as_deref(), Some("x**2"));
        assert!(!series.markers);
        assert_eq!(series.points[0].0, -10.0);
        assert_eq!(series.points[399].0, 10.0);
        for &(x, y) in &series.points {
            assert_relative_eq!(y, x * x, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_figures_do_not_share_series() {
        let units = AxisUnits::default();
        let first = render(&ShapeDescriptor::equation("x**2"), &units).unwrap();
        let second = render(&ShapeDescriptor::Points(vec![]), &units).unwrap();

        assert_eq!(first.series.len(), 1);
        assert!(second.series.is_empty());
        assert!(second.is_empty());
        assert_eq!(second.x_label, "X (units)");
    }

    #[test]
    fn test_evaluation_failure_propagates() {
        let err = render(&ShapeDescriptor::equation("log(x)"), &AxisUnits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EvaluationFailed);

        let err = render(&ShapeDescriptor::equation("sqrt(x)"), &AxisUnits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EvaluationFailed);

        let err = render(&ShapeDescriptor::equation("u + a*x"), &AxisUnits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EvaluationFailed);
    }

    #[test]
    fn test_grid_skips_zero() {
        // an even sample count straddles x = 0, so 1/x has no pole sample
        let figure = render(&ShapeDescriptor::equation("1/x"), &AxisUnits::default()).unwrap();
        let points = &figure.series[0].points;
        assert_eq!(points.len(), SAMPLE_COUNT);
        assert!(points.iter().all(|&(x, y)| x != 0.0 && y.is_finite()));
    }

    #[test]
    fn test_bindings_make_motion_equations_plottable() {
        let bindings = Bindings::new().with("u", 2.0).with("a", 0.5);
        let figure = render_with(
            &ShapeDescriptor::equation("u + a*x"),
            &AxisUnits::new("s", "m/s"),
            &bindings,
        )
        .unwrap();
        let (x, y) = figure.series[0].points[399];
        assert_relative_eq!(y, 2.0 + 0.5 * x);
    }

    #[test]
    fn test_bounds() {
        let figure = render(
            &ShapeDescriptor::points([(0.0, 5.0), (10.0, 5.0)]),
            &AxisUnits::default(),
        )
        .unwrap();
        let (x, y) = figure.bounds();
        assert_relative_eq!(x.start, -0.5);
        assert_relative_eq!(x.end, 10.5);
        assert_relative_eq!(y.start, 4.0);
        assert_relative_eq!(y.end, 6.0);

        let (x, y) = Figure::new(&AxisUnits::default()).bounds();
        assert_eq!((x, y), (-1.0..1.0, -1.0..1.0));
    }

    #[test]
    fn test_svg_output() {
        let figure = render(
            &ShapeDescriptor::points([(1.0, 2.0), (3.0, 4.0)]),
            &AxisUnits::new("s", "m"),
        )
        .unwrap();
        let svg = figure.to_svg_string().unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("X (s)"));
        assert!(svg.contains("Graph Based on Provided Data"));
        assert!(svg.contains("<circle"));
    }

    #[test]
    fn test_save_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.svg");
        let figure = render(&ShapeDescriptor::equation("sin(x)"), &AxisUnits::default()).unwrap();

        figure.save_svg(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("sin(x)"));
    }
}
