//! Run configuration.
//!
//! One [`HarnessConfig`] carries every knob a run needs: where raw files and
//! artifacts live, histogram and tolerance settings, failure handling, and
//! the list of distributions under test. Nothing is read from globals.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::comparator::{
    Comparator, DEFAULT_BINS, DEFAULT_CURVE_POINTS, DEFAULT_PDF_TOLERANCE,
    DEFAULT_SAMPLE_TOLERANCE,
};
use crate::density::ReferenceDensity;
use crate::distribution::{DistributionSpec, Mode};
use crate::error::{Error, Result};

/// Directory the native sample programs write to.
pub const DEFAULT_SAMPLE_DIR: &str = "/tmp/CppRandomNumbers/RandomSamples";
/// Directory the native density programs write to.
pub const DEFAULT_PDF_DIR: &str = "/tmp/CppRandomNumbers/Pdf";

/// What the harness does when one entry fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FailurePolicy {
    /// Stop at the first failure and return its error.
    #[default]
    Abort,
    /// Record the failure in the report and carry on with the next entry.
    Isolate,
}

/// Validated settings for a harness run.
///
/// Build one with [`HarnessConfig::builder`].
///
/// # Examples
///
/// ```
/// use distcheck::{FailurePolicy, HarnessConfig};
///
/// let config = HarnessConfig::builder()
///     .sample_dir("/tmp/samples")
///     .pdf_dir("/tmp/pdf")
///     .bins(40)
///     .failure_policy(FailurePolicy::Isolate)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.bins(), 40);
/// assert_eq!(config.entries().len(), 12);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct HarnessConfig {
    sample_dir: PathBuf,
    pdf_dir: PathBuf,
    bins: usize,
    curve_points: usize,
    sample_tolerance: f64,
    pdf_tolerance: f64,
    failure_policy: FailurePolicy,
    extension_references: bool,
    entries: Vec<DistributionSpec>,
}

impl HarnessConfig {
    /// Start a builder with every default in place.
    #[must_use]
    pub fn builder() -> HarnessConfigBuilder {
        HarnessConfigBuilder::new()
    }

    /// Directory holding sample-mode raw files and artifacts.
    #[must_use]
    pub fn sample_dir(&self) -> &Path {
        &self.sample_dir
    }

    /// Directory holding PDF-mode raw files and artifacts.
    #[must_use]
    pub fn pdf_dir(&self) -> &Path {
        &self.pdf_dir
    }

    /// The directory used for `mode`.
    #[must_use]
    pub fn dir_for(&self, mode: Mode) -> &Path {
        match mode {
            Mode::Sample => &self.sample_dir,
            Mode::PdfEval => &self.pdf_dir,
        }
    }

    /// Where the generator writes the raw file for `spec`.
    #[must_use]
    pub fn raw_path(&self, spec: &DistributionSpec) -> PathBuf {
        self.dir_for(spec.mode()).join(spec.file_stem())
    }

    /// Where the chart for `spec` is written.
    #[must_use]
    pub fn artifact_path(&self, spec: &DistributionSpec) -> PathBuf {
        self.dir_for(spec.mode()).join(spec.artifact_name())
    }

    /// Histogram bin count.
    #[must_use]
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Reference-curve point count.
    #[must_use]
    pub fn curve_points(&self) -> usize {
        self.curve_points
    }

    /// Sample-mode tolerance.
    #[must_use]
    pub fn sample_tolerance(&self) -> f64 {
        self.sample_tolerance
    }

    /// PDF-mode tolerance.
    #[must_use]
    pub fn pdf_tolerance(&self) -> f64 {
        self.pdf_tolerance
    }

    /// Failure handling.
    #[must_use]
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Whether PDF-mode references outside the core set are enabled.
    #[must_use]
    pub fn extension_references(&self) -> bool {
        self.extension_references
    }

    /// The distributions under test, in run order.
    #[must_use]
    pub fn entries(&self) -> &[DistributionSpec] {
        &self.entries
    }

    /// A [`Comparator`] carrying this configuration's settings.
    #[must_use]
    pub fn comparator(&self) -> Comparator {
        Comparator::new()
            .bins(self.bins)
            .curve_points(self.curve_points)
            .sample_tolerance(self.sample_tolerance)
            .pdf_tolerance(self.pdf_tolerance)
            .extension_references(self.extension_references)
    }

    /// Load a configuration from a JSON file.
    ///
    /// Every field is optional; omitted fields take the builder defaults.
    /// Entries are given by raw file stem and mode, with an optional window
    /// override:
    ///
    /// ```json
    /// {
    ///   "sample_dir": "/tmp/samples",
    ///   "bins": 30,
    ///   "failure_policy": "isolate",
    ///   "entries": [
    ///     { "stem": "Normal_mean=1.23_std=2.34", "mode": "sample" },
    ///     { "stem": "Cauchy_mu=8.9_sigma=2.3", "mode": "sample",
    ///       "window": { "policy": "fixed", "lower": 0.0, "upper": 20.0 } }
    ///   ]
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, [`Error::Serde`] if
    /// it is not valid JSON of this shape, and validation errors from
    /// [`HarnessConfigBuilder::build`].
    #[cfg(feature = "serde")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json_str(&text)
    }

    /// Parse a configuration from JSON text; see [`from_json_file`](Self::from_json_file).
    ///
    /// # Errors
    ///
    /// Same as [`from_json_file`](Self::from_json_file), minus file errors.
    #[cfg(feature = "serde")]
    pub fn from_json_str(text: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(text)?;
        file.into_builder()?.build()
    }
}

/// Fluent builder for [`HarnessConfig`].
///
/// # Defaults
///
/// - Directories: [`DEFAULT_SAMPLE_DIR`] and [`DEFAULT_PDF_DIR`]
/// - 25 bins, 100 curve points
/// - Tolerances: 0.1 (sample), 1e-4 (PDF)
/// - [`FailurePolicy::Abort`]
/// - Extension references off
/// - Entries: the built-in catalog
#[derive(Clone, Debug)]
pub struct HarnessConfigBuilder {
    sample_dir: PathBuf,
    pdf_dir: PathBuf,
    bins: usize,
    curve_points: usize,
    sample_tolerance: f64,
    pdf_tolerance: f64,
    failure_policy: FailurePolicy,
    extension_references: bool,
    entries: Option<Vec<DistributionSpec>>,
}

impl Default for HarnessConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HarnessConfigBuilder {
    /// Create a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sample_dir: PathBuf::from(DEFAULT_SAMPLE_DIR),
            pdf_dir: PathBuf::from(DEFAULT_PDF_DIR),
            bins: DEFAULT_BINS,
            curve_points: DEFAULT_CURVE_POINTS,
            sample_tolerance: DEFAULT_SAMPLE_TOLERANCE,
            pdf_tolerance: DEFAULT_PDF_TOLERANCE,
            failure_policy: FailurePolicy::Abort,
            extension_references: false,
            entries: None,
        }
    }

    /// Set the sample-mode directory.
    #[must_use]
    pub fn sample_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sample_dir = dir.into();
        self
    }

    /// Set the PDF-mode directory.
    #[must_use]
    pub fn pdf_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pdf_dir = dir.into();
        self
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

    /// Set the failure policy.
    #[must_use]
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Enable PDF-mode references outside the core set.
    ///
    /// When entries come from the catalog this also adds the extension rows.
    #[must_use]
    pub fn extension_references(mut self, enabled: bool) -> Self {
        self.extension_references = enabled;
        self
    }

    /// Replace the entry list.
    #[must_use]
    pub fn entries(mut self, entries: impl IntoIterator<Item = DistributionSpec>) -> Self {
        self.entries = Some(entries.into_iter().collect());
        self
    }

    /// Append one entry. The first call replaces the catalog default.
    #[must_use]
    pub fn entry(mut self, spec: DistributionSpec) -> Self {
        self.entries.get_or_insert_with(Vec::new).push(spec);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `bins` is zero, fewer than two
    /// curve points are requested, a tolerance is not positive, the entry
    /// list is empty, two entries would write the same artifact, or an
    /// entry's window policy is invalid. Returns [`Error::InvalidParameter`]
    /// if an entry's parameters cannot build its reference density.
    pub fn build(self) -> Result<HarnessConfig> {
        if self.bins == 0 {
            return Err(Error::InvalidConfig("bins must be at least 1".into()));
        }
        if self.curve_points < 2 {
            return Err(Error::InvalidConfig(
                "curve_points must be at least 2".into(),
            ));
        }
        for (name, tol) in [
            ("sample_tolerance", self.sample_tolerance),
            ("pdf_tolerance", self.pdf_tolerance),
        ] {
            if !(tol.is_finite() && tol > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be positive, got {tol}"
                )));
            }
        }

        let entries = match self.entries {
            Some(entries) => entries,
            None => catalog::entries(self.extension_references)?,
        };
        if entries.is_empty() {
            return Err(Error::InvalidConfig("no entries configured".into()));
        }

        let config = HarnessConfig {
            sample_dir: self.sample_dir,
            pdf_dir: self.pdf_dir,
            bins: self.bins,
            curve_points: self.curve_points,
            sample_tolerance: self.sample_tolerance,
            pdf_tolerance: self.pdf_tolerance,
            failure_policy: self.failure_policy,
            extension_references: self.extension_references,
            entries,
        };

        let mut seen = HashSet::new();
        for spec in &config.entries {
            spec.window_policy().validate()?;
            ReferenceDensity::from_spec(spec)?;
            let artifact = config.artifact_path(spec);
            if !seen.insert(artifact.clone()) {
                return Err(Error::InvalidConfig(format!(
                    "two entries write {}",
                    artifact.display()
                )));
            }
        }
        Ok(config)
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    sample_dir: Option<PathBuf>,
    pdf_dir: Option<PathBuf>,
    bins: Option<usize>,
    curve_points: Option<usize>,
    sample_tolerance: Option<f64>,
    pdf_tolerance: Option<f64>,
    failure_policy: Option<FailurePolicy>,
    extension_references: Option<bool>,
    entries: Option<Vec<EntryFile>>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EntryFile {
    stem: String,
    mode: Mode,
    window: Option<crate::window::WindowPolicy>,
}

#[cfg(feature = "serde")]
impl ConfigFile {
    fn into_builder(self) -> Result<HarnessConfigBuilder> {
        let mut b = HarnessConfigBuilder::new();
        if let Some(dir) = self.sample_dir {
            b = b.sample_dir(dir);
        }
        if let Some(dir) = self.pdf_dir {
            b = b.pdf_dir(dir);
        }
        if let Some(v) = self.bins {
            b = b.bins(v);
        }
        if let Some(v) = self.curve_points {
            b = b.curve_points(v);
        }
        if let Some(v) = self.sample_tolerance {
            b = b.sample_tolerance(v);
        }
        if let Some(v) = self.pdf_tolerance {
            b = b.pdf_tolerance(v);
        }
        if let Some(v) = self.failure_policy {
            b = b.failure_policy(v);
        }
        if let Some(v) = self.extension_references {
            b = b.extension_references(v);
        }
        if let Some(entries) = self.entries {
            let specs = entries
                .into_iter()
                .map(|e| {
                    let spec = DistributionSpec::from_stem(&e.stem, e.mode)?;
                    Ok(match e.window {
                        Some(w) => spec.window(w),
                        None => spec,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            b = b.entries(specs);
        }
        Ok(b)
    }
}
