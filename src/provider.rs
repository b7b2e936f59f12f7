//! Producers of raw generator output.
//!
//! A [`RawDataProvider`] is asked once per run to write the raw file of
//! every configured entry. It is not trusted: the harness checks afterwards
//! that each file really exists.
//!
//! - [`CommandProvider`] runs the native generator programs from a build
//!   directory.
//! - [`ReferenceProvider`] writes seeded draws and exact density values from
//!   this crate's own reference implementations. It is what the self-tests
//!   and dry runs use.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Cauchy, Distribution, Exp, Gamma, Normal, StudentT, Uniform};

use crate::config::HarnessConfig;
use crate::density::ReferenceDensity;
use crate::distribution::{DistributionKind, DistributionSpec, Mode};
use crate::error::{Error, Result};

/// Number of rows a PDF-mode raw file holds.
pub const PDF_ROWS: usize = 100;

/// Writes the raw file of every entry in a configuration.
pub trait RawDataProvider {
    /// Produce all raw files for `config`, synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provider`] or [`Error::Io`] when production fails.
    /// Entries the provider silently skips are caught later as
    /// [`Error::MissingInput`].
    fn produce(&mut self, config: &HarnessConfig) -> Result<()>;
}

/// Runs native generator executables from a build directory.
///
/// Each program is registered against the raw file it writes. Entries with
/// no registered program are left alone.
///
/// # Examples
///
/// ```
/// use distcheck::{CommandProvider, Mode};
///
/// let provider = CommandProvider::new("Debug")
///     .program(Mode::Sample, "Normal_mean=1.23_std=2.34", "rand_normal");
/// assert_eq!(provider.programs().count(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct CommandProvider {
    build_dir: PathBuf,
    programs: BTreeMap<(Mode, String), String>,
}

impl CommandProvider {
    /// A provider running programs from `build_dir`.
    #[must_use]
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            programs: BTreeMap::new(),
        }
    }

    /// Register `executable` as the producer of `stem` in `mode`.
    #[must_use]
    pub fn program(
        mut self,
        mode: Mode,
        stem: impl Into<String>,
        executable: impl Into<String>,
    ) -> Self {
        self.programs.insert((mode, stem.into()), executable.into());
        self
    }

    /// Register the conventional target for every entry of `config`:
    /// `rand_<kind>` for sample mode and `pdf_<kind>` for PDF mode, the kind
    /// in snake case.
    #[must_use]
    pub fn with_conventional_programs(mut self, config: &HarnessConfig) -> Self {
        for spec in config.entries() {
            let prefix = match spec.mode() {
                Mode::Sample => "rand",
                Mode::PdfEval => "pdf",
            };
            let exe = format!("{prefix}_{}", snake_case(spec.kind()));
            self.programs.insert((spec.mode(), spec.file_stem()), exe);
        }
        self
    }

    /// The build directory.
    #[must_use]
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Registered `(mode, stem, executable)` triples.
    pub fn programs(&self) -> impl Iterator<Item = (Mode, &str, &str)> {
        self.programs
            .iter()
            .map(|((mode, stem), exe)| (*mode, stem.as_str(), exe.as_str()))
    }

    fn run(&self, executable: &str) -> Result<()> {
        let path = self.build_dir.join(executable);
        trace_info!(program = %path.display(), "running generator");
        let status = Command::new(&path)
            .current_dir(&self.build_dir)
            .status()
            .map_err(|e| Error::Provider(format!("cannot start {}: {e}", path.display())))?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::Provider(format!(
                "{} exited with {status}",
                path.display()
            )))
        }
    }
}

fn snake_case(kind: DistributionKind) -> String {
    let mut out = String::new();
    for (i, c) in kind.name().chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

impl RawDataProvider for CommandProvider {
    fn produce(&mut self, config: &HarnessConfig) -> Result<()> {
        for spec in config.entries() {
            match self.programs.get(&(spec.mode(), spec.file_stem())) {
                Some(exe) => self.run(exe)?,
                None => {
                    trace_debug!(entry = %spec.file_stem(), "no program registered");
                }
            }
        }
        Ok(())
    }
}

/// Writes raw files from this crate's reference implementations.
///
/// Sample mode draws `n` values per entry from a [`StdRng`] seeded once per
/// run, following the native generator's conventions:
///
/// - Beta as `X / (X + Y)` from two unit-scale gamma draws
/// - Gamma with scale `1 / beta`
/// - half-Cauchy by rejecting negative Cauchy draws
/// - Student's t as `t(df) * sigma + mu`
///
/// PDF mode writes [`PDF_ROWS`] rows `lower + i * (upper - lower) / 100` of
/// exact density values over a per-kind range.
#[derive(Clone, Debug)]
pub struct ReferenceProvider {
    seed: u64,
    n: usize,
}

impl ReferenceProvider {
    /// A provider writing 100 000 draws per sample-mode entry.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self { seed, n: 100_000 }
    }

    /// Set the number of draws per sample-mode entry.
    #[must_use]
    pub fn samples(mut self, n: usize) -> Self {
        self.n = n;
        self
    }

    /// The configured number of draws.
    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }
}

impl RawDataProvider for ReferenceProvider {
    fn produce(&mut self, config: &HarnessConfig) -> Result<()> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        for spec in config.entries() {
            let path = config.raw_path(spec);
            match spec.mode() {
                Mode::Sample => {
                    let draws = draw_samples(spec, self.n, &mut rng)?;
                    write_lines(&path, draws.iter().map(ToString::to_string))?;
                }
                Mode::PdfEval => {
                    let reference = ReferenceDensity::from_spec(spec)?;
                    let (lo, hi) = pdf_range(spec)?;
                    let rows = evaluation_points(lo, hi).map(|x| {
                        format!("{x},{},{}", reference.pdf(x), reference.ln_pdf(x))
                    });
                    write_lines(&path, rows)?;
                }
            }
            trace_debug!(path = %path.display(), "reference data written");
        }
        Ok(())
    }
}

fn write_lines(path: &Path, lines: impl Iterator<Item = String>) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut w = BufWriter::new(file);
    for line in lines {
        writeln!(w, "{line}").map_err(|e| Error::io(path, e))?;
    }
    w.flush().map_err(|e| Error::io(path, e))
}

#[allow(clippy::cast_precision_loss)]
fn evaluation_points(lo: f64, hi: f64) -> impl Iterator<Item = f64> {
    let step = (hi - lo) / PDF_ROWS as f64;
    (0..PDF_ROWS).map(move |i| lo + i as f64 * step)
}

fn checked<T, E: core::fmt::Display>(name: &str, r: core::result::Result<T, E>) -> Result<T> {
    r.map_err(|e| Error::invalid_param(name, e.to_string()))
}

/// `n` draws for a sample-mode entry.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if the spec's parameters are missing
/// or out of range.
pub fn draw_samples(spec: &DistributionSpec, n: usize, rng: &mut StdRng) -> Result<Vec<f64>> {
    spec.validate()?;
    let draws: Vec<f64> = match spec.kind() {
        DistributionKind::Normal => {
            let d = checked("std", Normal::new(spec.get("mean")?, spec.get("std")?))?;
            d.sample_iter(rng).take(n).collect()
        }
        DistributionKind::Uniform => {
            let d = checked("a", Uniform::new(spec.get("a")?, spec.get("b")?))?;
            d.sample_iter(rng).take(n).collect()
        }
        DistributionKind::Beta => {
            let x = checked("alpha", Gamma::new(spec.get("alpha")?, 1.0))?;
            let y = checked("beta", Gamma::new(spec.get("beta")?, 1.0))?;
            (0..n)
                .map(|_| {
                    let a: f64 = x.sample(rng);
                    let b: f64 = y.sample(rng);
                    a / (a + b)
                })
                .collect()
        }
        DistributionKind::Gamma => {
            let d = checked(
                "alpha",
                Gamma::new(spec.get("alpha")?, 1.0 / spec.get("beta")?),
            )?;
            d.sample_iter(rng).take(n).collect()
        }
        DistributionKind::Cauchy => {
            let d = checked("sigma", Cauchy::new(spec.get("mu")?, spec.get("sigma")?))?;
            d.sample_iter(rng).take(n).collect()
        }
        DistributionKind::Exponential => {
            let d = checked("rate", Exp::new(spec.get("rate")?))?;
            d.sample_iter(rng).take(n).collect()
        }
        DistributionKind::HalfCauchy => {
            let d = checked("sigma", Cauchy::new(spec.get("mu")?, spec.get("sigma")?))?;
            d.sample_iter(rng).filter(|x: &f64| *x >= 0.0).take(n).collect()
        }
        DistributionKind::StudentT => {
            let d = checked("df", StudentT::new(spec.get("df")?))?;
            let (mu, sigma) = (spec.get("mu")?, spec.get("sigma")?);
            d.sample_iter(rng).take(n).map(|t: f64| t * sigma + mu).collect()
        }
    };
    Ok(draws)
}

/// The interval PDF-mode evaluation points span for `spec`.
///
/// | Kind | Range |
/// |---|---|
/// | Normal, Cauchy, `StudentT` | location plus or minus 3 scale |
/// | Uniform | `[a, b]` |
/// | Beta | `[0.01, 0.99]` |
/// | Gamma | `[0.01, 10]` |
/// | Exponential | `[0, 10]` |
/// | `HalfCauchy` | `[0, 5 scale]` |
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if a needed parameter is missing.
pub fn pdf_range(spec: &DistributionSpec) -> Result<(f64, f64)> {
    let range = match spec.kind() {
        DistributionKind::Normal => {
            let (m, s) = (spec.get("mean")?, spec.get("std")?);
            (m - 3.0 * s, m + 3.0 * s)
        }
        DistributionKind::Cauchy | DistributionKind::StudentT => {
            let (m, s) = (spec.get("mu")?, spec.get("sigma")?);
            (m - 3.0 * s, m + 3.0 * s)
        }
        DistributionKind::Uniform => (spec.get("a")?, spec.get("b")?),
        DistributionKind::Beta => (0.01, 0.99),
        DistributionKind::Gamma => (0.01, 10.0),
        DistributionKind::Exponential => (0.0, 10.0),
        DistributionKind::HalfCauchy => (0.0, 5.0 * spec.get("sigma")?),
    };
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_names() {
        assert_eq!(snake_case(DistributionKind::Normal), "normal");
        assert_eq!(snake_case(DistributionKind::HalfCauchy), "half_cauchy");
        assert_eq!(snake_case(DistributionKind::StudentT), "student_t");
    }

    #[test]
    fn draws_respect_support() {
        let mut rng = StdRng::seed_from_u64(7);
        let half = DistributionSpec::new(DistributionKind::HalfCauchy, Mode::Sample)
            .param("mu", 1.2)
            .param("sigma", 2.3);
        let v = draw_samples(&half, 2_000, &mut rng).unwrap();
        assert_eq!(v.len(), 2_000);
        assert!(v.iter().all(|x| *x >= 0.0));

        let beta = DistributionSpec::new(DistributionKind::Beta, Mode::Sample)
            .param("alpha", 1.23)
            .param("beta", 2.34);
        let v = draw_samples(&beta, 2_000, &mut rng).unwrap();
        assert!(v.iter().all(|x| (0.0..=1.0).contains(x)));
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn gamma_draws_use_rate() {
        let mut rng = StdRng::seed_from_u64(11);
        let spec = DistributionSpec::new(DistributionKind::Gamma, Mode::Sample)
            .param("alpha", 4.0)
            .param("beta", 0.5);
        let v = draw_samples(&spec, 50_000, &mut rng).unwrap();
        let mean = v.iter().sum::<f64>() / v.len() as f64;
        // alpha / beta = 8
        assert!((mean - 8.0).abs() < 0.15, "mean {mean}");
    }

    #[test]
    fn draws_are_reproducible() {
        let spec = DistributionSpec::new(DistributionKind::Normal, Mode::Sample)
            .param("mean", 0.0)
            .param("std", 1.0);
        let a = draw_samples(&spec, 10, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = draw_samples(&spec, 10, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn pdf_ranges_match_generator() {
        let normal = DistributionSpec::new(DistributionKind::Normal, Mode::PdfEval)
            .param("mean", 8.9)
            .param("std", 2.3);
        let (lo, hi) = pdf_range(&normal).unwrap();
        assert!((lo - 2.0).abs() < 1e-12);
        assert!((hi - 15.8).abs() < 1e-12);

        let half = DistributionSpec::new(DistributionKind::HalfCauchy, Mode::PdfEval)
            .param("mu", 0.0)
            .param("sig", 3.5);
        assert_eq!(pdf_range(&half).unwrap(), (0.0, 17.5));

        let points: Vec<f64> = evaluation_points(0.0, 10.0).collect();
        assert_eq!(points.len(), PDF_ROWS);
        assert!((points[99] - 9.9).abs() < 1e-12);
    }

    #[test]
    fn invalid_parameters_fail_to_draw() {
        let spec = DistributionSpec::new(DistributionKind::Exponential, Mode::Sample)
            .param("rate", -1.0);
        assert!(draw_samples(&spec, 10, &mut StdRng::seed_from_u64(0)).is_err());
    }
}
