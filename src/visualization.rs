//! SVG charts for comparison results.
//!
//! Every comparison produces one artifact:
//!
//! | Mode | Layout | Content |
//! |---|---|---|
//! | Sample | single panel | area-normalized histogram, reference curve (plus the naive curve for the half-Cauchy) |
//! | PDF | two panels | density on the left, log-density on the right, observed points over the reference line |
//!
//! Rendering goes through the [`PlotSink`] trait so the harness can be run
//! with a recording sink in tests. [`SvgPlotter`] is the real implementation,
//! built on [`plotters`]' SVG backend.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::comparator::{Comparison, PdfComparison, SampleComparison};
use crate::error::{Error, Result};

/// Destination for rendered comparisons.
pub trait PlotSink {
    /// Render a sample-mode comparison to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Plot`] if the chart cannot be drawn or written.
    fn render_samples(&self, comparison: &SampleComparison, path: &Path) -> Result<()>;

    /// Render a PDF-mode comparison to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Plot`] if the chart cannot be drawn or written.
    fn render_pdf(&self, comparison: &PdfComparison, path: &Path) -> Result<()>;

    /// Dispatch on the comparison's mode.
    ///
    /// # Errors
    ///
    /// Whatever the mode-specific method returns.
    fn render(&self, comparison: &Comparison, path: &Path) -> Result<()> {
        match comparison {
            Comparison::Sample(c) => self.render_samples(c, path),
            Comparison::Pdf(c) => self.render_pdf(c, path),
        }
    }
}

/// Writes comparison charts as SVG files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SvgPlotter {
    single: (u32, u32),
    double: (u32, u32),
}

impl Default for SvgPlotter {
    fn default() -> Self {
        Self::new()
    }
}

impl SvgPlotter {
    /// 800x600 single-panel charts, 1200x500 two-panel charts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            single: (800, 600),
            double: (1200, 500),
        }
    }

    /// Override the single-panel size in pixels.
    #[must_use]
    pub fn single_panel_size(mut self, width: u32, height: u32) -> Self {
        self.single = (width, height);
        self
    }

    /// Override the two-panel size in pixels.
    #[must_use]
    pub fn two_panel_size(mut self, width: u32, height: u32) -> Self {
        self.double = (width, height);
        self
    }
}

fn plot_err<E: core::fmt::Display>(e: E) -> Error {
    Error::Plot(e.to_string())
}

fn finite_points(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect()
}

/// `(min, max)` of the finite values, padded by 5% so nothing sits on the
/// frame. A flat series gets a unit-sized band around its value.
fn padded_range(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    if span <= f64::EPSILON * lo.abs().max(1.0) {
        let pad = 0.5 * lo.abs().max(1.0);
        return (lo - pad, hi + pad);
    }
    (lo - 0.05 * span, hi + 0.05 * span)
}

impl PlotSink for SvgPlotter {
    fn render_samples(&self, comparison: &SampleComparison, path: &Path) -> Result<()> {
        let hist = &comparison.histogram;
        let curve = finite_points(&comparison.curve);
        let naive = comparison.naive_curve.as_deref().map(finite_points);

        let y_max = hist
            .densities()
            .iter()
            .copied()
            .chain(curve.iter().map(|&(_, y)| y))
            .chain(naive.iter().flatten().map(|&(_, y)| y))
            .filter(|y| y.is_finite())
            .fold(0.0_f64, f64::max)
            .max(1e-12)
            * 1.1;
        let window = comparison.window;

        let root = SVGBackend::new(path, self.single).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(comparison.spec.title(), ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(window.lower()..window.upper(), 0.0..y_max)
            .map_err(plot_err)?;

        chart
            .configure_mesh()
            .x_desc("x")
            .y_desc("density")
            .draw()
            .map_err(plot_err)?;

        let edges = hist.edges();
        chart
            .draw_series(
                edges
                    .windows(2)
                    .zip(hist.densities())
                    .map(|(e, &h)| Rectangle::new([(e[0], 0.0), (e[1], h)], BLUE.mix(0.4).filled())),
            )
            .map_err(plot_err)?
            .label("samples")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], BLUE.mix(0.4).filled()));

        chart
            .draw_series(LineSeries::new(curve, RED.stroke_width(2)))
            .map_err(plot_err)?
            .label("reference")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

        if let Some(naive) = naive {
            chart
                .draw_series(LineSeries::new(naive, GREEN.stroke_width(2)))
                .map_err(plot_err)?
                .label("naive 2 x Cauchy")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREEN));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(plot_err)?;

        root.present().map_err(plot_err)?;
        trace_debug!(path = %path.display(), "sample chart written");
        Ok(())
    }

    fn render_pdf(&self, comparison: &PdfComparison, path: &Path) -> Result<()> {
        let xs: Vec<f64> = comparison.observed.iter().map(|r| r.x).collect();
        let x_range = padded_range(xs.iter().copied());

        let observed_pdf: Vec<(f64, f64)> = comparison.observed.iter().map(|r| (r.x, r.pdf)).collect();
        let expected_pdf: Vec<(f64, f64)> = comparison.expected.iter().map(|r| (r.x, r.pdf)).collect();
        let observed_ln: Vec<(f64, f64)> = comparison.observed.iter().map(|r| (r.x, r.ln_pdf)).collect();
        let expected_ln: Vec<(f64, f64)> = comparison.expected.iter().map(|r| (r.x, r.ln_pdf)).collect();

        let pdf_range = padded_range(
            observed_pdf
                .iter()
                .chain(&expected_pdf)
                .map(|&(_, y)| y),
        );
        let ln_range = comparison.log_panel_range().unwrap_or_else(|| {
            padded_range(observed_ln.iter().chain(&expected_ln).map(|&(_, y)| y))
        });

        let root = SVGBackend::new(path, self.double).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;
        let panels = root.split_evenly((1, 2));

        let title = comparison.spec.title();
        draw_pdf_panel(
            &panels[0],
            &format!("{title}: pdf"),
            "pdf",
            &observed_pdf,
            &expected_pdf,
            x_range,
            pdf_range,
        )?;
        draw_pdf_panel(
            &panels[1],
            &format!("{title}: log pdf"),
            "log pdf",
            &observed_ln,
            &expected_ln,
            x_range,
            ln_range,
        )?;

        root.present().map_err(plot_err)?;
        trace_debug!(path = %path.display(), "pdf chart written");
        Ok(())
    }
}

fn draw_pdf_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    caption: &str,
    y_desc: &str,
    observed: &[(f64, f64)],
    expected: &[(f64, f64)],
    (x_lo, x_hi): (f64, f64),
    (y_lo, y_hi): (f64, f64),
) -> Result<()> {
    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("x")
        .y_desc(y_desc)
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(finite_points(expected), RED.stroke_width(2)))
        .map_err(plot_err)?
        .label("reference")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .draw_series(
            finite_points(observed)
                .into_iter()
                .filter(|&(_, y)| y >= y_lo && y <= y_hi)
                .map(|p| Circle::new(p, 3, BLUE.filled())),
        )
        .map_err(plot_err)?
        .label("generator")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLUE.filled()));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_range_handles_flat_and_empty() {
        let (lo, hi) = padded_range([0.625, 0.625]);
        assert!(lo < 0.625 && hi > 0.625);
        assert_eq!(padded_range(core::iter::empty()), (0.0, 1.0));
        assert_eq!(padded_range([f64::NEG_INFINITY, f64::NAN]), (0.0, 1.0));

        let (lo, hi) = padded_range([0.0, 10.0, f64::NEG_INFINITY]);
        assert!((lo + 0.5).abs() < 1e-12);
        assert!((hi - 10.5).abs() < 1e-12);
    }

    #[test]
    fn finite_points_drops_poles() {
        let pts = finite_points(&[(0.0, f64::INFINITY), (0.5, 1.0), (f64::NAN, 2.0)]);
        assert_eq!(pts, vec![(0.5, 1.0)]);
    }
}
