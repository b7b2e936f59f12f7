//! Sample-mode and PDF-mode comparison against closed-form references.
//!
//! The [`Comparator`] is a pure function of its input file and the
//! [`DistributionSpec`]: it holds only settings, never state carried between
//! calls, so comparing the same file twice yields identical results.
//!
//! # Sample mode
//!
//! 1. Load every draw.
//! 2. Resolve the spec's [`WindowPolicy`](crate::WindowPolicy) against the data.
//! 3. Clip every draw into the window.
//! 4. Bin into an area-normalized [`Histogram`].
//! 5. Evaluate the reference density on evenly spaced points over the window.
//! 6. Score the largest interior-bin deviation relative to the reference peak.
//!
//! The first and last bins are left out of the score: they absorb the mass
//! that clipping pulled in from the tails.
//!
//! # PDF mode
//!
//! Each `(x, pdf, ln_pdf)` row is checked pointwise against the reference;
//! the score is the largest relative error over both columns.

use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::density::ReferenceDensity;
use crate::distribution::{DistributionKind, DistributionSpec, Mode};
use crate::error::{Error, Result};
use crate::histogram::Histogram;
use crate::observation::{self, PdfRow};
use crate::window::ComparisonWindow;

/// Default histogram bin count.
pub const DEFAULT_BINS: usize = 25;
/// Default number of reference-curve points.
pub const DEFAULT_CURVE_POINTS: usize = 100;
/// Default sample-mode tolerance, as a fraction of the reference peak.
pub const DEFAULT_SAMPLE_TOLERANCE: f64 = 0.1;
/// Default PDF-mode tolerance on relative error.
pub const DEFAULT_PDF_TOLERANCE: f64 = 1e-4;

/// Whether a comparison's score stayed within tolerance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Verdict {
    /// Score within tolerance.
    Consistent,
    /// Score above tolerance.
    Divergent,
}

impl Verdict {
    fn from_score(score: f64, tolerance: f64) -> Self {
        if score <= tolerance {
            Verdict::Consistent
        } else {
            Verdict::Divergent
        }
    }
}

impl core::fmt::Display for Verdict {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Verdict::Consistent => f.write_str("consistent"),
            Verdict::Divergent => f.write_str("DIVERGENT"),
        }
    }
}

/// Result of a sample-mode comparison.
#[derive(Clone, Debug)]
pub struct SampleComparison {
    /// The distribution under test.
    pub spec: DistributionSpec,
    /// The resolved window.
    pub window: ComparisonWindow,
    /// Histogram of the clipped draws.
    pub histogram: Histogram,
    /// Reference density over the window.
    pub curve: Vec<(f64, f64)>,
    /// Naive reference, only for the half-Cauchy.
    pub naive_curve: Option<Vec<(f64, f64)>>,
    /// Number of draws loaded.
    pub n_samples: usize,
    /// Number of draws that fell outside the window and were clipped.
    pub n_clipped: usize,
    /// Largest interior-bin deviation over the reference peak.
    pub score: f64,
    /// Score against the sample tolerance.
    pub verdict: Verdict,
}

/// Result of a PDF-mode comparison.
#[derive(Clone, Debug)]
pub struct PdfComparison {
    /// The distribution under test.
    pub spec: DistributionSpec,
    /// Rows as written by the generator.
    pub observed: Vec<PdfRow>,
    /// Reference values at the same points.
    pub expected: Vec<PdfRow>,
    /// Largest relative error in the density column.
    pub pdf_error: f64,
    /// Largest relative error in the log-density column.
    pub ln_pdf_error: f64,
    /// `max(pdf_error, ln_pdf_error)`.
    pub score: f64,
    /// Score against the PDF tolerance.
    pub verdict: Verdict,
}

impl PdfComparison {
    /// Fixed vertical range for the log-density panel, if the family needs one.
    ///
    /// A uniform log-density is constant, and an auto-scaled axis would blow
    /// rounding noise up to full height. The range is the mean observed
    /// log-density plus or minus ten percent of its magnitude.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn log_panel_range(&self) -> Option<(f64, f64)> {
        if self.spec.kind() != DistributionKind::Uniform {
            return None;
        }
        let finite: Vec<f64> = self
            .observed
            .iter()
            .map(|r| r.ln_pdf)
            .filter(|v| v.is_finite())
            .collect();
        if finite.is_empty() {
            return None;
        }
        let mean = finite.iter().sum::<f64>() / finite.len() as f64;
        let mut half = 0.1 * mean.abs();
        if half == 0.0 {
            // ln(1) on a unit-width support
            half = 0.1;
        }
        Some((mean - half, mean + half))
    }
}

/// Either kind of comparison.
#[derive(Clone, Debug)]
pub enum Comparison {
    /// Sample-mode result.
    Sample(SampleComparison),
    /// PDF-mode result.
    Pdf(PdfComparison),
}

impl Comparison {
    /// The distribution under test.
    #[must_use]
    pub fn spec(&self) -> &DistributionSpec {
        match self {
            Comparison::Sample(c) => &c.spec,
            Comparison::Pdf(c) => &c.spec,
        }
    }

    /// The divergence score.
    #[must_use]
    pub fn score(&self) -> f64 {
        match self {
            Comparison::Sample(c) => c.score,
            Comparison::Pdf(c) => c.score,
        }
    }

    /// The verdict.
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        match self {
            Comparison::Sample(c) => c.verdict,
            Comparison::Pdf(c) => c.verdict,
        }
    }

    /// The resolved window, for sample-mode results.
    #[must_use]
    pub fn window(&self) -> Option<ComparisonWindow> {
        match self {
            Comparison::Sample(c) => Some(c.window),
            Comparison::Pdf(_) => None,
        }
    }
}

/// Compares generator output against reference densities.
///
/// # Examples
///
/// ```
/// use distcheck::{Comparator, DistributionKind, DistributionSpec, Mode, Verdict};
///
/// let spec = DistributionSpec::new(DistributionKind::Uniform, Mode::Sample)
///     .param("a", 0.0)
///     .param("b", 1.0);
/// let draws: Vec<f64> = (0..10_000).map(|i| (f64::from(i) + 0.5) / 10_000.0).collect();
///
/// let result = Comparator::new().compare_sample_data(&spec, draws).unwrap();
/// assert_eq!(result.verdict, Verdict::Consistent);
/// assert!((result.histogram.area() - 1.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Comparator {
    bins: usize,
    curve_points: usize,
    sample_tolerance: f64,
    pdf_tolerance: f64,
    extension_references: bool,
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new()
    }
}

impl Comparator {
    /// A comparator with the default settings and extension references off.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bins: DEFAULT_BINS,
            curve_points: DEFAULT_CURVE_POINTS,
            sample_tolerance: DEFAULT_SAMPLE_TOLERANCE,
            pdf_tolerance: DEFAULT_PDF_TOLERANCE,
            extension_references: false,
        }
    }

    /// Set the histogram bin count.
    #[must_use]
    pub fn bins(mut self, bins: usize) -> Self {
        self.bins = bins;
        self
    }

    /// Set the number of reference-curve points.
    #[must_use]
    pub fn curve_points(mut self, n: usize) -> Self {
        self.curve_points = n;
        self
    }

    /// Set the sample-mode tolerance.
    #[must_use]
    pub fn sample_tolerance(mut self, tolerance: f64) -> Self {
        self.sample_tolerance = tolerance;
        self
    }

    /// Set the PDF-mode tolerance.
    #[must_use]
    pub fn pdf_tolerance(mut self, tolerance: f64) -> Self {
        self.pdf_tolerance = tolerance;
        self
    }

    /// Allow PDF-mode references outside the core set.
    #[must_use]
    pub fn extension_references(mut self, enabled: bool) -> Self {
        self.extension_references = enabled;
        self
    }

    /// Compare the raw file at `path` in the spec's mode.
    ///
    /// # Errors
    ///
    /// See [`compare_samples`](Self::compare_samples) and
    /// [`compare_pdf`](Self::compare_pdf).
    pub fn compare(&self, spec: &DistributionSpec, path: impl AsRef<Path>) -> Result<Comparison> {
        match spec.mode() {
            Mode::Sample => self.compare_samples(spec, path).map(Comparison::Sample),
            Mode::PdfEval => self.compare_pdf(spec, path).map(Comparison::Pdf),
        }
    }

    /// Load draws from `path` and compare them against the reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingInput`] if the file is absent, load errors
    /// for malformed content, parameter errors from the reference, and
    /// window errors for degenerate data.
    pub fn compare_samples(
        &self,
        spec: &DistributionSpec,
        path: impl AsRef<Path>,
    ) -> Result<SampleComparison> {
        let data = observation::load_samples(path)?;
        self.compare_sample_data(spec, data)
    }

    /// Compare in-memory draws against the reference.
    ///
    /// # Errors
    ///
    /// Same as [`compare_samples`](Self::compare_samples), minus file errors.
    pub fn compare_sample_data(
        &self,
        spec: &DistributionSpec,
        mut data: Vec<f64>,
    ) -> Result<SampleComparison> {
        if spec.mode() != Mode::Sample {
            return Err(Error::InvalidConfig(format!(
                "{} is configured for {} mode, not sample mode",
                spec.file_stem(),
                spec.mode()
            )));
        }
        let reference = ReferenceDensity::from_spec(spec)?;
        let window = ComparisonWindow::resolve(spec, &data)?;
        let n_clipped = data.iter().filter(|x| !window.contains(**x)).count();
        window.clip_all(&mut data);
        trace_debug!(
            distribution = %spec.file_stem(),
            lower = window.lower(),
            upper = window.upper(),
            n_clipped,
            "window resolved"
        );

        let histogram = Histogram::new(&data, &window, self.bins)?;
        let xs = window.linspace(self.curve_points);
        let curve = reference.curve(&xs);
        let naive_curve = reference.naive_curve(&xs);
        let score = sample_divergence(&histogram, &reference, &curve);

        Ok(SampleComparison {
            spec: spec.clone(),
            window,
            histogram,
            curve,
            naive_curve,
            n_samples: data.len(),
            n_clipped,
            score,
            verdict: Verdict::from_score(score, self.sample_tolerance),
        })
    }

    /// Load density evaluations from `path` and compare them pointwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReferenceNotEnabled`] for extension kinds when
    /// extension references are off, [`Error::MissingInput`] if the file is
    /// absent, and load or parameter errors otherwise.
    pub fn compare_pdf(
        &self,
        spec: &DistributionSpec,
        path: impl AsRef<Path>,
    ) -> Result<PdfComparison> {
        self.check_pdf_reference(spec)?;
        let rows = observation::load_pdf_evaluations(path)?;
        self.compare_pdf_rows(spec, rows)
    }

    /// Compare in-memory density evaluations pointwise.
    ///
    /// # Errors
    ///
    /// Same as [`compare_pdf`](Self::compare_pdf), minus file errors.
    pub fn compare_pdf_rows(
        &self,
        spec: &DistributionSpec,
        observed: Vec<PdfRow>,
    ) -> Result<PdfComparison> {
        self.check_pdf_reference(spec)?;
        let reference = ReferenceDensity::from_spec(spec)?;

        let expected: Vec<PdfRow> = observed
            .iter()
            .map(|r| PdfRow {
                x: r.x,
                pdf: reference.pdf(r.x),
                ln_pdf: reference.ln_pdf(r.x),
            })
            .collect();

        let mut pdf_error = 0.0_f64;
        let mut ln_pdf_error = 0.0_f64;
        for (got, want) in observed.iter().zip(&expected) {
            pdf_error = pdf_error.max(relative_error(got.pdf, want.pdf));
            ln_pdf_error = ln_pdf_error.max(relative_error(got.ln_pdf, want.ln_pdf));
        }
        let score = pdf_error.max(ln_pdf_error);
        trace_debug!(
            distribution = %spec.file_stem(),
            pdf_error,
            ln_pdf_error,
            "pointwise errors computed"
        );

        Ok(PdfComparison {
            spec: spec.clone(),
            observed,
            expected,
            pdf_error,
            ln_pdf_error,
            score,
            verdict: Verdict::from_score(score, self.pdf_tolerance),
        })
    }

    fn check_pdf_reference(&self, spec: &DistributionSpec) -> Result<()> {
        if spec.mode() != Mode::PdfEval {
            return Err(Error::InvalidConfig(format!(
                "{} is configured for {} mode, not pdf mode",
                spec.file_stem(),
                spec.mode()
            )));
        }
        if !spec.kind().has_core_pdf_reference() && !self.extension_references {
            return Err(Error::ReferenceNotEnabled { kind: spec.kind() });
        }
        Ok(())
    }
}

/// `|got - want| / max(1, |want|)`, with matching infinities counted as exact
/// and any other non-finite pairing as an infinite error.
fn relative_error(got: f64, want: f64) -> f64 {
    if got.is_finite() && want.is_finite() {
        (got - want).abs() / want.abs().max(1.0)
    } else if got.is_infinite()
        && want.is_infinite()
        && got.is_sign_positive() == want.is_sign_positive()
    {
        0.0
    } else {
        f64::INFINITY
    }
}

/// Largest deviation of an interior bin's height from the reference's mean
/// density over that bin, relative to the reference peak over the window.
fn sample_divergence(
    histogram: &Histogram,
    reference: &ReferenceDensity,
    curve: &[(f64, f64)],
) -> f64 {
    let bins = histogram.bins();
    let interior = if bins > 2 { 1..bins - 1 } else { 0..bins };

    let mut worst = 0.0_f64;
    for i in interior {
        let (lo, hi) = histogram.bin_range(i);
        let expected = reference.bin_average(lo, hi);
        let diff = (histogram.densities()[i] - expected).abs();
        worst = worst.max(if diff.is_nan() { f64::INFINITY } else { diff });
    }

    let peak = curve
        .iter()
        .map(|&(_, y)| y)
        .filter(|y| y.is_finite())
        .fold(0.0_f64, f64::max);
    if peak > 0.0 { worst / peak } else { worst }
}
