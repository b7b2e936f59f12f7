//! Run orchestration.
//!
//! A run walks through fixed stages, strictly in order and on one thread:
//!
//! 1. **Clear**: every regular file in the sample and PDF directories is
//!    removed (the directories are created if absent).
//! 2. **Produce**: the [`RawDataProvider`] writes the raw files.
//! 3. **Verify inputs**: every configured raw file must exist.
//! 4. **Compare**: each entry is compared and its chart rendered.
//! 5. **Verify outputs**: every chart must exist.
//!
//! The [`FailurePolicy`] decides whether the first failure ends the run or is
//! recorded in the [`RunReport`] while the remaining entries carry on.

use core::fmt;
use core::fmt::Write as _;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::comparator::{Comparison, Verdict};
use crate::config::{FailurePolicy, HarnessConfig};
use crate::distribution::{DistributionSpec, Mode};
use crate::error::{Error, Result};
use crate::provider::RawDataProvider;
use crate::visualization::{PlotSink, SvgPlotter};

/// What happened to one entry.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "status", rename_all = "snake_case"))]
pub enum EntryStatus {
    /// Compared and rendered.
    Compared {
        /// Resolved window, sample mode only.
        window: Option<(f64, f64)>,
        /// Divergence score.
        score: f64,
        /// Score against tolerance.
        verdict: Verdict,
    },
    /// Failed before a verdict could be reached.
    Failed {
        /// The error, rendered.
        error: String,
    },
}

/// Outcome of one configured entry.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntryOutcome {
    /// Raw file stem.
    pub name: String,
    /// Comparison mode.
    pub mode: Mode,
    /// Where the chart was (or would have been) written.
    pub artifact: PathBuf,
    /// Result.
    pub status: EntryStatus,
}

impl EntryOutcome {
    /// The verdict, if the entry got that far.
    #[must_use]
    pub fn verdict(&self) -> Option<Verdict> {
        match self.status {
            EntryStatus::Compared { verdict, .. } => Some(verdict),
            EntryStatus::Failed { .. } => None,
        }
    }

    /// Whether the entry failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.status, EntryStatus::Failed { .. })
    }

    fn failed(spec: &DistributionSpec, artifact: PathBuf, error: &Error) -> Self {
        Self {
            name: spec.file_stem(),
            mode: spec.mode(),
            artifact,
            status: EntryStatus::Failed {
                error: error.to_string(),
            },
        }
    }
}

/// Everything a run found.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunReport {
    /// Provider failure recorded under [`FailurePolicy::Isolate`].
    pub provider_error: Option<String>,
    /// One outcome per entry, in configuration order.
    pub outcomes: Vec<EntryOutcome>,
}

impl RunReport {
    /// Outcomes in configuration order.
    #[must_use]
    pub fn outcomes(&self) -> &[EntryOutcome] {
        &self.outcomes
    }

    /// Outcome for the entry whose raw file stem is `name` in `mode`.
    #[must_use]
    pub fn outcome(&self, name: &str, mode: Mode) -> Option<&EntryOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.name == name && o.mode == mode)
    }

    /// No entry failed and the provider succeeded. Divergent verdicts do not
    /// count as failures.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.provider_error.is_none() && !self.outcomes.iter().any(EntryOutcome::is_failed)
    }

    /// [`is_success`](Self::is_success) and every verdict is consistent.
    #[must_use]
    pub fn all_consistent(&self) -> bool {
        self.is_success()
            && self
                .outcomes
                .iter()
                .all(|o| o.verdict() == Some(Verdict::Consistent))
    }

    /// Number of failed entries.
    #[must_use]
    pub fn n_failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    /// Number of divergent entries.
    #[must_use]
    pub fn n_divergent(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.verdict() == Some(Verdict::Divergent))
            .count()
    }

    /// Human-readable table, one line per entry, followed by totals.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut s = String::new();
        if let Some(err) = &self.provider_error {
            let _ = writeln!(s, "provider failed: {err}");
        }
        for o in &self.outcomes {
            let mode = o.mode.to_string();
            match &o.status {
                EntryStatus::Compared { score, verdict, .. } => {
                    let verdict = verdict.to_string();
                    let _ = writeln!(s, "{verdict:<10} {score:>12.4e}  {mode:<6} {}", o.name);
                }
                EntryStatus::Failed { error } => {
                    let _ = writeln!(s, "{:<10} {:>12}  {mode:<6} {}: {error}", "FAILED", "-", o.name);
                }
            }
        }
        let _ = writeln!(
            s,
            "{} entries, {} divergent, {} failed",
            self.outcomes.len(),
            self.n_divergent(),
            self.n_failed()
        );
        s
    }

    /// Write the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serde`] if serialization fails and [`Error::Io`] if
    /// the file cannot be written.
    #[cfg(feature = "serde")]
    pub fn export_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| Error::io(path, e))
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Drives a run: clear, produce, verify, compare, render, verify.
///
/// # Examples
///
/// ```no_run
/// use distcheck::{Harness, HarnessConfig, ReferenceProvider};
///
/// let config = HarnessConfig::builder().build().unwrap();
/// let report = Harness::new(config)
///     .run(&mut ReferenceProvider::new(42))
///     .unwrap();
/// println!("{}", report.summary());
/// ```
pub struct Harness<S = SvgPlotter> {
    config: HarnessConfig,
    sink: S,
}

impl Harness<SvgPlotter> {
    /// A harness rendering SVG charts.
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        Self::with_sink(config, SvgPlotter::new())
    }
}

impl<S: PlotSink> Harness<S> {
    /// A harness rendering through `sink`.
    #[must_use]
    pub fn with_sink(config: HarnessConfig, sink: S) -> Self {
        Self { config, sink }
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// The plot sink.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn output_dirs(&self) -> BTreeSet<&Path> {
        [self.config.sample_dir(), self.config.pdf_dir()]
            .into_iter()
            .collect()
    }

    /// Remove every regular file in the output directories, creating them
    /// if absent. Returns the number of files removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if a directory cannot be created or listed or a
    /// file cannot be removed.
    pub fn clear_outputs(&self) -> Result<usize> {
        let mut removed = 0;
        for dir in self.output_dirs() {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
            for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
                let entry = entry.map_err(|e| Error::io(dir, e))?;
                let path = entry.path();
                let file_type = entry.file_type().map_err(|e| Error::io(&path, e))?;
                if file_type.is_file() {
                    fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
                    removed += 1;
                }
            }
        }
        trace_info!(removed, "cleared prior outputs");
        Ok(removed)
    }

    /// Check that the raw file of `spec` exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingInput`] if it does not.
    pub fn verify_input(&self, spec: &DistributionSpec) -> Result<()> {
        let path = self.config.raw_path(spec);
        if path.is_file() {
            Ok(())
        } else {
            Err(Error::MissingInput { path })
        }
    }

    /// Check that the artifact of `spec` exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingOutput`] if it does not.
    pub fn verify_output(&self, spec: &DistributionSpec) -> Result<()> {
        let path = self.config.artifact_path(spec);
        if path.is_file() {
            Ok(())
        } else {
            Err(Error::MissingOutput { path })
        }
    }

    /// Compare one entry against its raw file and render its chart.
    ///
    /// Does not clear, produce or verify; the raw file must already exist.
    ///
    /// # Errors
    ///
    /// Returns comparator errors and [`Error::Plot`] on rendering failure.
    pub fn compare_entry(&self, spec: &DistributionSpec) -> Result<Comparison> {
        let comparison = self
            .config
            .comparator()
            .compare(spec, self.config.raw_path(spec))?;
        self.sink
            .render(&comparison, &self.config.artifact_path(spec))?;
        trace_info!(
            entry = %spec.file_stem(),
            mode = %spec.mode(),
            score = comparison.score(),
            verdict = %comparison.verdict(),
            "compared"
        );
        Ok(comparison)
    }

    /// Execute a full run with `provider` producing the raw files.
    ///
    /// # Errors
    ///
    /// Under [`FailurePolicy::Abort`], the first error of any stage. Under
    /// [`FailurePolicy::Isolate`], only errors from clearing the output
    /// directories; everything else is recorded in the report.
    pub fn run(&self, provider: &mut dyn RawDataProvider) -> Result<RunReport> {
        let isolate = self.config.failure_policy() == FailurePolicy::Isolate;
        trace_info!(
            entries = self.config.entries().len(),
            isolate,
            "starting run"
        );

        self.clear_outputs()?;

        let mut report = RunReport::default();
        if let Err(e) = provider.produce(&self.config) {
            if !isolate {
                return Err(e);
            }
            trace_info!(error = %e, "provider failed");
            report.provider_error = Some(e.to_string());
        }

        // Inputs are checked for every entry before any comparison starts.
        let mut pending: Vec<Option<EntryOutcome>> = Vec::with_capacity(self.config.entries().len());
        for spec in self.config.entries() {
            match self.verify_input(spec) {
                Ok(()) => pending.push(None),
                Err(e) if isolate => {
                    trace_info!(error = %e, "input missing");
                    pending.push(Some(EntryOutcome::failed(
                        spec,
                        self.config.artifact_path(spec),
                        &e,
                    )));
                }
                Err(e) => return Err(e),
            }
        }

        for (spec, slot) in self.config.entries().iter().zip(pending.iter_mut()) {
            if slot.is_some() {
                continue;
            }
            let artifact = self.config.artifact_path(spec);
            let outcome = match self.compare_entry(spec) {
                Ok(c) => EntryOutcome {
                    name: spec.file_stem(),
                    mode: spec.mode(),
                    artifact,
                    status: EntryStatus::Compared {
                        window: c.window().map(|w| (w.lower(), w.upper())),
                        score: c.score(),
                        verdict: c.verdict(),
                    },
                },
                Err(e) if isolate => {
                    trace_info!(entry = %spec.file_stem(), error = %e, "comparison failed");
                    EntryOutcome::failed(spec, artifact, &e)
                }
                Err(e) => return Err(e),
            };
            *slot = Some(outcome);
        }

        for (spec, slot) in self.config.entries().iter().zip(pending.iter_mut()) {
            let Some(outcome) = slot else { continue };
            if outcome.is_failed() {
                continue;
            }
            if let Err(e) = self.verify_output(spec) {
                if !isolate {
                    return Err(e);
                }
                *outcome = EntryOutcome::failed(spec, outcome.artifact.clone(), &e);
            }
        }

        report.outcomes = pending.into_iter().flatten().collect();
        trace_info!(
            failed = report.n_failed(),
            divergent = report.n_divergent(),
            "run finished"
        );
        Ok(report)
    }
}
