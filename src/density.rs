//! Closed-form reference densities.
//!
//! Every reference is built from the exact generator parameters carried by a
//! [`DistributionSpec`], never re-estimated from data. The standard families
//! come from [`statrs`]; the half-Cauchy is implemented here because its
//! truncation at zero needs an explicit renormalization when the location is
//! not zero.

use core::f64::consts::{FRAC_1_PI, PI};

use statrs::distribution::{Beta, Cauchy, Continuous, Exp, Gamma, Normal, StudentsT, Uniform};
use statrs::statistics::{Max, Min};

use crate::distribution::{DistributionKind, DistributionSpec};
use crate::error::{Error, Result};

/// Normalizing factor of a Cauchy(`location`, `scale`) truncated to `x >= 0`.
///
/// `1 / (0.5 + atan(location / scale) / pi)`. For `location = 0` this is the
/// familiar factor of two; for positive locations less than half the mass is
/// cut away, so the factor lies in `(1, 2)`.
///
/// # Examples
///
/// ```
/// let k = distcheck::half_cauchy_normalization(1.2, 2.3);
/// assert!(k > 1.0 && k < 2.0);
/// ```
#[must_use]
pub fn half_cauchy_normalization(location: f64, scale: f64) -> f64 {
    1.0 / (0.5 + FRAC_1_PI * (location / scale).atan())
}

/// Cauchy distribution restricted to the non-negative half-line.
#[derive(Clone, Debug, PartialEq)]
pub struct HalfCauchy {
    location: f64,
    scale: f64,
    inv_scale_sq: f64,
    prefactor: f64,
    ln_prefactor: f64,
}

impl HalfCauchy {
    /// Create a half-Cauchy with the given location and scale.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `scale` is not positive or
    /// either value is not finite.
    pub fn new(location: f64, scale: f64) -> Result<Self> {
        if !location.is_finite() {
            return Err(Error::invalid_param("mu", "location must be finite"));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(Error::invalid_param("sigma", "scale must be positive"));
        }
        let atan_term = FRAC_1_PI * (location / scale).atan();
        Ok(Self {
            location,
            scale,
            inv_scale_sq: 1.0 / (scale * scale),
            prefactor: 1.0 / (PI * scale * (0.5 + atan_term)),
            ln_prefactor: -((0.5 * PI * scale).ln() + (2.0 * atan_term).ln_1p()),
        })
    }

    /// The location parameter.
    #[must_use]
    pub fn location(&self) -> f64 {
        self.location
    }

    /// The scale parameter.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// See [`half_cauchy_normalization`].
    #[must_use]
    pub fn normalization(&self) -> f64 {
        half_cauchy_normalization(self.location, self.scale)
    }

    /// Twice the untruncated Cauchy density on `x >= 0`.
    ///
    /// Correct only for `location = 0`; kept so charts can show how far it
    /// drifts from [`pdf`](Continuous::pdf) otherwise.
    #[must_use]
    pub fn naive_pdf(&self, x: f64) -> f64 {
        if x < 0.0 {
            return 0.0;
        }
        let z = x - self.location;
        2.0 / (PI * self.scale * (1.0 + self.inv_scale_sq * z * z))
    }
}

impl Continuous<f64, f64> for HalfCauchy {
    fn pdf(&self, x: f64) -> f64 {
        if x < 0.0 {
            return 0.0;
        }
        let z = x - self.location;
        self.prefactor / (1.0 + self.inv_scale_sq * z * z)
    }

    fn ln_pdf(&self, x: f64) -> f64 {
        if x < 0.0 {
            return f64::NEG_INFINITY;
        }
        let z = x - self.location;
        self.ln_prefactor - (self.inv_scale_sq * z * z).ln_1p()
    }
}

/// The closed-form density a generator's output is checked against.
#[derive(Clone, Debug)]
pub enum ReferenceDensity {
    /// Gaussian.
    Normal(Normal),
    /// Continuous uniform.
    Uniform(Uniform),
    /// Beta.
    Beta(Beta),
    /// Gamma, rate parameterization.
    Gamma(Gamma),
    /// Cauchy.
    Cauchy(Cauchy),
    /// Exponential.
    Exponential(Exp),
    /// Half-Cauchy with truncation renormalization.
    HalfCauchy(HalfCauchy),
    /// Location-scale Student's t.
    StudentT(StudentsT),
}

fn build<T, E: core::fmt::Display>(
    name: &str,
    result: core::result::Result<T, E>,
) -> Result<T> {
    result.map_err(|e| Error::invalid_param(name, e.to_string()))
}

impl ReferenceDensity {
    /// Build the reference for `spec` from its parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if a parameter is missing,
    /// unknown, duplicated, or outside the family's valid range.
    pub fn from_spec(spec: &DistributionSpec) -> Result<Self> {
        spec.validate()?;
        let reference = match spec.kind() {
            DistributionKind::Normal => Self::Normal(build(
                "std",
                Normal::new(spec.get("mean")?, spec.get("std")?),
            )?),
            DistributionKind::Uniform => {
                Self::Uniform(build("a", Uniform::new(spec.get("a")?, spec.get("b")?))?)
            }
            DistributionKind::Beta => Self::Beta(build(
                "alpha",
                Beta::new(spec.get("alpha")?, spec.get("beta")?),
            )?),
            DistributionKind::Gamma => Self::Gamma(build(
                "alpha",
                Gamma::new(spec.get("alpha")?, spec.get("beta")?),
            )?),
            DistributionKind::Cauchy => Self::Cauchy(build(
                "sigma",
                Cauchy::new(spec.get("mu")?, spec.get("sigma")?),
            )?),
            DistributionKind::Exponential => {
                Self::Exponential(build("rate", Exp::new(spec.get("rate")?))?)
            }
            DistributionKind::HalfCauchy => {
                Self::HalfCauchy(HalfCauchy::new(spec.get("mu")?, spec.get("sigma")?)?)
            }
            DistributionKind::StudentT => Self::StudentT(build(
                "df",
                StudentsT::new(spec.get("mu")?, spec.get("sigma")?, spec.get("df")?),
            )?),
        };
        Ok(reference)
    }

    /// Whether `x` lies where the density is zero.
    ///
    /// Beta and gamma exclude their edges: at `x = 0` (and `x = 1` for beta)
    /// the closed form is a pole or a shape-dependent constant, and the
    /// generator reports zero there.
    fn outside_support(&self, x: f64) -> bool {
        match self {
            Self::Uniform(d) => x < d.min() || x > d.max(),
            Self::Beta(_) => x <= 0.0 || x >= 1.0,
            Self::Gamma(_) => x <= 0.0,
            Self::Exponential(_) | Self::HalfCauchy(_) => x < 0.0,
            Self::Normal(_) | Self::Cauchy(_) | Self::StudentT(_) => false,
        }
    }

    /// Density at `x`; zero outside the support.
    #[must_use]
    pub fn pdf(&self, x: f64) -> f64 {
        if self.outside_support(x) {
            return 0.0;
        }
        match self {
            Self::Normal(d) => d.pdf(x),
            Self::Uniform(d) => d.pdf(x),
            Self::Beta(d) => d.pdf(x),
            Self::Gamma(d) => d.pdf(x),
            Self::Cauchy(d) => d.pdf(x),
            Self::Exponential(d) => d.pdf(x),
            Self::HalfCauchy(d) => d.pdf(x),
            Self::StudentT(d) => d.pdf(x),
        }
    }

    /// Log-density at `x`; negative infinity outside the support.
    #[must_use]
    pub fn ln_pdf(&self, x: f64) -> f64 {
        if self.outside_support(x) {
            return f64::NEG_INFINITY;
        }
        match self {
            Self::Normal(d) => d.ln_pdf(x),
            Self::Uniform(d) => d.ln_pdf(x),
            Self::Beta(d) => d.ln_pdf(x),
            Self::Gamma(d) => d.ln_pdf(x),
            Self::Cauchy(d) => d.ln_pdf(x),
            Self::Exponential(d) => d.ln_pdf(x),
            Self::HalfCauchy(d) => d.ln_pdf(x),
            Self::StudentT(d) => d.ln_pdf(x),
        }
    }

    /// `(x, pdf(x))` for every point of `xs`.
    #[must_use]
    pub fn curve(&self, xs: &[f64]) -> Vec<(f64, f64)> {
        xs.iter().map(|&x| (x, self.pdf(x))).collect()
    }

    /// The naive `2 x Cauchy` curve for a half-Cauchy reference, `None`
    /// for every other family.
    #[must_use]
    pub fn naive_curve(&self, xs: &[f64]) -> Option<Vec<(f64, f64)>> {
        match self {
            Self::HalfCauchy(d) => Some(xs.iter().map(|&x| (x, d.naive_pdf(x))).collect()),
            _ => None,
        }
    }

    /// Mean density over `[lo, hi]` by Simpson's rule.
    ///
    /// Falls back to the midpoint value when an endpoint density is not
    /// finite.
    #[must_use]
    pub fn bin_average(&self, lo: f64, hi: f64) -> f64 {
        let mid = self.pdf(0.5 * (lo + hi));
        let (a, b) = (self.pdf(lo), self.pdf(hi));
        if a.is_finite() && b.is_finite() {
            (a + 4.0 * mid + b) / 6.0
        } else {
            mid
        }
    }
}
