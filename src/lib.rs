#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Statistical validation harness for a native random-number library.
//!
//! An external generator writes raw files: either random draws from a
//! distribution, or evaluations of its density and log-density at a grid of
//! points. This crate loads those files, compares them against closed-form
//! reference distributions built from the exact generator parameters, renders
//! an SVG chart per distribution, and scores how far each one diverges.
//!
//! # Getting Started
//!
//! Compare in-memory draws without touching the file system:
//!
//! ```
//! use distcheck::prelude::*;
//!
//! let spec = DistributionSpec::new(DistributionKind::Exponential, Mode::Sample)
//!     .param("rate", 1.0);
//!
//! // Draws at evenly spaced quantiles of Exp(1).
//! let n = 20_000;
//! let draws: Vec<f64> = (0..n)
//!     .map(|i| -(1.0 - (f64::from(i) + 0.5) / f64::from(n)).ln())
//!     .collect();
//!
//! let result = Comparator::new().compare_sample_data(&spec, draws).unwrap();
//! assert_eq!(result.verdict, Verdict::Consistent);
//! ```
//!
//! A full run clears the output directories, asks a [`RawDataProvider`] for
//! the raw files, compares every configured entry and returns a
//! [`RunReport`]:
//!
//! ```no_run
//! use distcheck::prelude::*;
//!
//! let config = HarnessConfig::builder()
//!     .failure_policy(FailurePolicy::Isolate)
//!     .build()
//!     .unwrap();
//! let report = Harness::new(config)
//!     .run(&mut ReferenceProvider::new(7))
//!     .unwrap();
//! print!("{report}");
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`DistributionSpec`] | Kind, parameters, mode and window of one distribution under test. Drives both the raw file name and the reference. |
//! | [`ReferenceDensity`] | Closed-form density built from a spec. |
//! | [`ComparisonWindow`] | The domain samples are clipped into before binning. |
//! | [`Comparator`] | Sample-mode histogram check and PDF-mode pointwise check. |
//! | [`PlotSink`] | Where charts go; [`SvgPlotter`] writes SVG files. |
//! | [`RawDataProvider`] | Produces the raw files; [`CommandProvider`] runs the native programs, [`ReferenceProvider`] writes reference data. |
//! | [`Harness`] | Orchestrates a run under a [`HarnessConfig`]. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at each run stage | off |
//! | `serde` | `Serialize`/`Deserialize` on public types, [`HarnessConfig::from_json_file`], [`RunReport::export_json`] | off |
//! | `cli` | The `distcheck` binary (enables `tracing` and `serde`) | on |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod catalog;
mod comparator;
mod config;
mod density;
mod distribution;
mod error;
mod harness;
mod histogram;
pub mod observation;
pub mod provider;
mod visualization;
mod window;

pub use comparator::{
    Comparator, Comparison, DEFAULT_BINS, DEFAULT_CURVE_POINTS, DEFAULT_PDF_TOLERANCE,
    DEFAULT_SAMPLE_TOLERANCE, PdfComparison, SampleComparison, Verdict,
};
pub use config::{
    DEFAULT_PDF_DIR, DEFAULT_SAMPLE_DIR, FailurePolicy, HarnessConfig, HarnessConfigBuilder,
};
pub use density::{HalfCauchy, ReferenceDensity, half_cauchy_normalization};
pub use distribution::{DistributionKind, DistributionSpec, Mode, Param};
pub use error::{Error, Result};
pub use harness::{EntryOutcome, EntryStatus, Harness, RunReport};
pub use histogram::Histogram;
pub use observation::PdfRow;
pub use provider::{CommandProvider, RawDataProvider, ReferenceProvider};
pub use visualization::{PlotSink, SvgPlotter};
pub use window::{ComparisonWindow, WindowPolicy, compute_percentile};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use distcheck::prelude::*;
/// ```
pub mod prelude {
    pub use crate::comparator::{Comparator, Comparison, Verdict};
    pub use crate::config::{FailurePolicy, HarnessConfig};
    pub use crate::density::ReferenceDensity;
    pub use crate::distribution::{DistributionKind, DistributionSpec, Mode};
    pub use crate::error::{Error, Result};
    pub use crate::harness::{Harness, RunReport};
    pub use crate::provider::{CommandProvider, RawDataProvider, ReferenceProvider};
    pub use crate::visualization::{PlotSink, SvgPlotter};
    pub use crate::window::{ComparisonWindow, WindowPolicy};
}
