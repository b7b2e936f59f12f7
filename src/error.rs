use std::path::PathBuf;

use crate::distribution::DistributionKind;

/// Errors produced while loading, comparing or rendering a distribution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when an expected raw output file is absent after the provider step.
    #[error("missing raw input file: {}", path.display())]
    MissingInput {
        /// The path that was expected to exist.
        path: PathBuf,
    },

    /// Returned when an expected artifact is absent after the comparator step.
    #[error("missing comparison artifact: {}", path.display())]
    MissingOutput {
        /// The path that was expected to exist.
        path: PathBuf,
    },

    /// Returned when reading or writing a file fails.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Returned when a raw file contains content that is not numeric data.
    #[error("malformed data in {} at line {line}: {reason}", path.display())]
    Malformed {
        /// The file being parsed.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// Returned when density evaluation points are not strictly increasing.
    #[error("evaluation points in {} are not strictly increasing at line {line}", path.display())]
    Unsorted {
        /// The file being parsed.
        path: PathBuf,
        /// One-based line number of the offending row.
        line: usize,
    },

    /// Returned when a raw file holds no observations.
    #[error("no observations in {}", path.display())]
    EmptySamples {
        /// The empty file.
        path: PathBuf,
    },

    /// Returned when a distribution name is not recognised.
    #[error("unknown distribution: {0}")]
    UnknownDistribution(String),

    /// Returned when a parameter is missing, non-finite, or out of range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// The parameter name.
        name: String,
        /// Why the parameter was rejected.
        reason: String,
    },

    /// Returned when the comparison window collapses to a single point.
    #[error("degenerate comparison window: lower ({lower}) must be less than upper ({upper})")]
    DegenerateWindow {
        /// The lower bound.
        lower: f64,
        /// The upper bound.
        upper: f64,
    },

    /// Returned when a PDF-mode reference belongs to the extension surface
    /// and extension references are disabled.
    #[error("PDF-mode reference for {kind} is an extension and is not enabled")]
    ReferenceNotEnabled {
        /// The distribution kind.
        kind: DistributionKind,
    },

    /// Returned when the configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Returned when chart rendering fails.
    #[error("plot error: {0}")]
    Plot(String),

    /// Returned when the build/run provider fails to produce its outputs.
    #[error("provider error: {0}")]
    Provider(String),

    /// Returned when a configuration or report file cannot be (de)serialized.
    #[cfg(feature = "serde")]
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Wrap an I/O error together with the path it occurred on.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for [`Error::InvalidParameter`].
    pub(crate) fn invalid_param(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
