//! Comparison windows: the domain restriction applied to samples before
//! histogramming.
//!
//! Heavy-tailed draws would otherwise stretch the histogram range until the
//! bulk of the distribution occupies a handful of bins. The window is a
//! visualization device, not an outlier test: values outside it are pulled
//! to the nearest bound, never discarded, so every draw still contributes
//! mass to the histogram.
//!
//! | Policy | Lower bound | Upper bound |
//! |--------|-------------|-------------|
//! | [`Quantile`](WindowPolicy::Quantile) | empirical percentile | empirical percentile |
//! | [`FloorQuantile`](WindowPolicy::FloorQuantile) | fixed floor | empirical percentile |
//! | [`Support`](WindowPolicy::Support) | support edge | support edge |
//! | [`Fixed`](WindowPolicy::Fixed) | constant | constant |

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distribution::{DistributionKind, DistributionSpec};
use crate::error::{Error, Result};

/// How a sample-mode comparison window is derived.
///
/// Percentiles are given on the `[0, 100]` scale.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "policy", rename_all = "snake_case"))]
pub enum WindowPolicy {
    /// Both bounds are empirical percentiles of the data.
    Quantile {
        /// Lower percentile.
        lower: f64,
        /// Upper percentile.
        upper: f64,
    },
    /// Fixed lower bound, empirical upper percentile.
    FloorQuantile {
        /// Lower bound in data units.
        floor: f64,
        /// Upper percentile.
        upper: f64,
    },
    /// The distribution's bounded support, read from its parameters.
    Support,
    /// Constant bounds in data units.
    Fixed {
        /// Lower bound.
        lower: f64,
        /// Upper bound.
        upper: f64,
    },
}

impl WindowPolicy {
    /// Check that percentiles lie in `[0, 100]` and are ordered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] describing the offending bound.
    pub fn validate(&self) -> Result<()> {
        let check = |p: f64| {
            if (0.0..=100.0).contains(&p) {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!(
                    "percentile {p} must be in [0, 100]"
                )))
            }
        };
        match *self {
            WindowPolicy::Quantile { lower, upper } => {
                check(lower)?;
                check(upper)?;
                if lower >= upper {
                    return Err(Error::InvalidConfig(format!(
                        "lower percentile {lower} must be below upper percentile {upper}"
                    )));
                }
            }
            WindowPolicy::FloorQuantile { floor, upper } => {
                check(upper)?;
                if !floor.is_finite() {
                    return Err(Error::InvalidConfig("window floor must be finite".into()));
                }
            }
            WindowPolicy::Fixed { lower, upper } => {
                ComparisonWindow::new(lower, upper)?;
            }
            WindowPolicy::Support => {}
        }
        Ok(())
    }
}

/// A resolved `(lower, upper)` domain.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComparisonWindow {
    lower: f64,
    upper: f64,
}

impl ComparisonWindow {
    /// Create a window from explicit bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateWindow`] unless both bounds are finite and
    /// `lower < upper`.
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if lower.is_finite() && upper.is_finite() && lower < upper {
            Ok(Self { lower, upper })
        } else {
            Err(Error::DegenerateWindow { lower, upper })
        }
    }

    /// Derive the window for `spec` from its policy and the observed data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateWindow`] when the data collapses to one
    /// value, and [`Error::InvalidConfig`] for an invalid policy, empty data
    /// under a percentile policy, or a [`Support`](WindowPolicy::Support)
    /// policy on a kind without bounded support.
    pub fn resolve(spec: &DistributionSpec, data: &[f64]) -> Result<Self> {
        let policy = spec.window_policy();
        policy.validate()?;
        match policy {
            WindowPolicy::Quantile { lower, upper } => {
                let mut sorted = data.to_vec();
                let lo = compute_percentile(&mut sorted, lower)?;
                let hi = compute_percentile(&mut sorted, upper)?;
                Self::new(lo, hi)
            }
            WindowPolicy::FloorQuantile { floor, upper } => {
                let mut sorted = data.to_vec();
                let hi = compute_percentile(&mut sorted, upper)?;
                Self::new(floor, hi)
            }
            WindowPolicy::Support => Self::support(spec),
            WindowPolicy::Fixed { lower, upper } => Self::new(lower, upper),
        }
    }

    /// The bounded support of `spec`'s distribution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for kinds with unbounded support and
    /// parameter errors when the bounds cannot be read.
    pub fn support(spec: &DistributionSpec) -> Result<Self> {
        match spec.kind() {
            DistributionKind::Uniform => Self::new(spec.get("a")?, spec.get("b")?),
            DistributionKind::Beta => Self::new(0.0, 1.0),
            other => Err(Error::InvalidConfig(format!(
                "{other} has no bounded support; use a quantile window"
            ))),
        }
    }

    /// The lower bound.
    #[must_use]
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// The upper bound.
    #[must_use]
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// `upper - lower`.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Whether `x` lies inside the closed window.
    #[must_use]
    pub fn contains(&self, x: f64) -> bool {
        (self.lower..=self.upper).contains(&x)
    }

    /// Pull `x` to the nearest bound if it lies outside the window.
    #[must_use]
    pub fn clip(&self, x: f64) -> f64 {
        x.clamp(self.lower, self.upper)
    }

    /// Clip every value in place.
    pub fn clip_all(&self, data: &mut [f64]) {
        for x in data {
            *x = self.clip(*x);
        }
    }

    /// `n` evenly spaced points from `lower` to `upper` inclusive.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn linspace(&self, n: usize) -> Vec<f64> {
        match n {
            0 => Vec::new(),
            1 => vec![self.lower],
            _ => {
                let step = self.width() / (n - 1) as f64;
                (0..n)
                    .map(|i| {
                        if i == n - 1 {
                            self.upper
                        } else {
                            self.lower + i as f64 * step
                        }
                    })
                    .collect()
            }
        }
    }
}

/// Compute the given percentile of a slice. Sorts the slice in place.
///
/// Uses linear interpolation between the two nearest ranks.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for an empty slice or a percentile
/// outside `[0, 100]`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn compute_percentile(values: &mut [f64], percentile: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::InvalidConfig(
            "cannot take a percentile of no values".into(),
        ));
    }
    if !(0.0..=100.0).contains(&percentile) {
        return Err(Error::InvalidConfig(format!(
            "percentile {percentile} must be in [0, 100]"
        )));
    }
    values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
    let len = values.len();
    if len == 1 {
        return Ok(values[0]);
    }
    // Rank in [0, len-1] range
    let rank = percentile / 100.0 * (len - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        Ok(values[lower])
    } else {
        let frac = rank - lower as f64;
        Ok(values[lower] * (1.0 - frac) + values[upper] * frac)
    }
}
