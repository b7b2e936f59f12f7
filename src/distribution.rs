//! Distribution specifications: which distribution is under test, with which
//! parameters, and in which comparison mode.
//!
//! A [`DistributionSpec`] is the single source of truth for a tested
//! configuration. Its parameters drive both the raw file name produced by the
//! generator and the closed-form reference curve, so the two can never drift
//! apart.
//!
//! # Example
//!
//! ```
//! use distcheck::{DistributionKind, DistributionSpec, Mode};
//!
//! let spec = DistributionSpec::new(DistributionKind::Normal, Mode::Sample)
//!     .param("mean", 1.23)
//!     .param("std", 2.34);
//!
//! assert_eq!(spec.file_stem(), "Normal_mean=1.23_std=2.34");
//! assert_eq!(spec.artifact_name(), "Normal_mean=1.23_std=2.34.svg");
//! assert!((spec.get("std").unwrap() - 2.34).abs() < f64::EPSILON);
//! ```

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::window::WindowPolicy;

/// The distribution families the harness knows how to check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DistributionKind {
    /// Gaussian with `mean` and `std`.
    Normal,
    /// Continuous uniform on `[a, b]`.
    Uniform,
    /// Beta with shapes `alpha` and `beta`.
    Beta,
    /// Gamma with shape `alpha` and rate `beta`.
    Gamma,
    /// Cauchy with location `mu` and scale `sigma`.
    Cauchy,
    /// Exponential with `rate`.
    Exponential,
    /// Cauchy with location `mu` and scale `sigma`, truncated to `x >= 0`.
    HalfCauchy,
    /// Location-scale Student's t with `df` degrees of freedom.
    StudentT,
}

/// A parameter a distribution kind requires, with the names it may be spelled as.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ParamSlot {
    pub(crate) canonical: &'static str,
    pub(crate) aliases: &'static [&'static str],
}

impl ParamSlot {
    const fn new(canonical: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { canonical, aliases }
    }

    fn matches(&self, name: &str) -> bool {
        self.canonical == name || self.aliases.contains(&name)
    }
}

const NORMAL_SLOTS: &[ParamSlot] = &[
    ParamSlot::new("mean", &["mu", "location"]),
    ParamSlot::new("std", &["sigma", "std_dev", "scale"]),
];
const UNIFORM_SLOTS: &[ParamSlot] = &[
    ParamSlot::new("a", &["lower", "min"]),
    ParamSlot::new("b", &["upper", "max"]),
];
const BETA_SLOTS: &[ParamSlot] = &[
    ParamSlot::new("alpha", &["a"]),
    ParamSlot::new("beta", &["b"]),
];
const GAMMA_SLOTS: &[ParamSlot] = &[
    ParamSlot::new("alpha", &["shape", "k"]),
    ParamSlot::new("beta", &["rate"]),
];
const CAUCHY_SLOTS: &[ParamSlot] = &[
    ParamSlot::new("mu", &["location"]),
    ParamSlot::new("sigma", &["sig", "scale"]),
];
const EXPONENTIAL_SLOTS: &[ParamSlot] = &[ParamSlot::new("rate", &["lambda"])];
const STUDENT_T_SLOTS: &[ParamSlot] = &[
    ParamSlot::new("df", &["nu"]),
    ParamSlot::new("mu", &["location"]),
    ParamSlot::new("sigma", &["scale"]),
];

impl DistributionKind {
    /// Every supported kind, in catalog order.
    pub const ALL: [Self; 8] = [
        Self::Normal,
        Self::Uniform,
        Self::Beta,
        Self::Gamma,
        Self::Cauchy,
        Self::Exponential,
        Self::HalfCauchy,
        Self::StudentT,
    ];

    /// The name used as the first component of raw file names.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Uniform => "Uniform",
            Self::Beta => "Beta",
            Self::Gamma => "Gamma",
            Self::Cauchy => "Cauchy",
            Self::Exponential => "Exponential",
            Self::HalfCauchy => "HalfCauchy",
            Self::StudentT => "StudentT",
        }
    }

    /// Canonical parameter names, in the order the reference expects them.
    #[must_use]
    pub fn parameter_names(self) -> Vec<&'static str> {
        self.slots().iter().map(|s| s.canonical).collect()
    }

    pub(crate) fn slots(self) -> &'static [ParamSlot] {
        match self {
            Self::Normal => NORMAL_SLOTS,
            Self::Uniform => UNIFORM_SLOTS,
            Self::Beta => BETA_SLOTS,
            Self::Gamma => GAMMA_SLOTS,
            Self::Cauchy | Self::HalfCauchy => CAUCHY_SLOTS,
            Self::Exponential => EXPONENTIAL_SLOTS,
            Self::StudentT => STUDENT_T_SLOTS,
        }
    }

    /// The trim window used in sample mode unless a spec overrides it.
    ///
    /// | Kind | Window |
    /// |------|--------|
    /// | Normal, `StudentT` | empirical 0.5th to 99.5th percentile |
    /// | Gamma, Exponential | 0 to empirical 99th percentile |
    /// | `HalfCauchy` | 0 to empirical 90th percentile |
    /// | Cauchy | empirical 5th to 95th percentile |
    /// | Uniform, Beta | support edges |
    #[must_use]
    pub fn default_window(self) -> WindowPolicy {
        match self {
            Self::Normal | Self::StudentT => WindowPolicy::Quantile {
                lower: 0.5,
                upper: 99.5,
            },
            Self::Gamma | Self::Exponential => WindowPolicy::FloorQuantile {
                floor: 0.0,
                upper: 99.0,
            },
            Self::HalfCauchy => WindowPolicy::FloorQuantile {
                floor: 0.0,
                upper: 90.0,
            },
            Self::Cauchy => WindowPolicy::Quantile {
                lower: 5.0,
                upper: 95.0,
            },
            Self::Uniform | Self::Beta => WindowPolicy::Support,
        }
    }

    /// Whether a PDF-mode reference for this kind is part of the core surface.
    ///
    /// The remaining kinds have reference formulas, but they are an opt-in
    /// extension (see [`HarnessConfig::extension_references`](crate::HarnessConfig)).
    #[must_use]
    pub fn has_core_pdf_reference(self) -> bool {
        matches!(
            self,
            Self::Normal | Self::Uniform | Self::Beta | Self::Gamma
        )
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistributionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "normal" | "gaussian" => Ok(Self::Normal),
            "uniform" => Ok(Self::Uniform),
            "beta" => Ok(Self::Beta),
            "gamma" => Ok(Self::Gamma),
            "cauchy" => Ok(Self::Cauchy),
            "exponential" | "exp" => Ok(Self::Exponential),
            "halfcauchy" => Ok(Self::HalfCauchy),
            "studentt" | "t" => Ok(Self::StudentT),
            _ => Err(Error::UnknownDistribution(s.to_string())),
        }
    }
}

/// How the generator's output is compared against the reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Mode {
    /// Histogram of random draws against the reference density.
    Sample,
    /// Pointwise density and log-density evaluations against the reference.
    #[cfg_attr(feature = "serde", serde(alias = "pdf"))]
    PdfEval,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Sample => f.write_str("sample"),
            Mode::PdfEval => f.write_str("pdf"),
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sample" | "samples" => Ok(Mode::Sample),
            "pdf" | "pdf_eval" | "pdf-eval" | "pdfeval" => Ok(Mode::PdfEval),
            _ => Err(Error::InvalidConfig(format!("unknown mode '{s}'"))),
        }
    }
}

/// A named parameter value together with its exact spelling in file names.
///
/// The spelling matters: the native generator writes `HalfCauchy_mu=0.0_sig=3.5`,
/// so a parameter built from the float `0.0` alone would name the file
/// `mu=0`. Use [`Param::parse`] to keep a literal spelling.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Param {
    name: String,
    value: f64,
    text: String,
}

impl Param {
    /// Create a parameter, spelling its value with the shortest round-trip form.
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            text: value.to_string(),
        }
    }

    /// Create a parameter from its literal spelling, keeping the spelling verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `text` is not a finite number.
    pub fn parse(name: impl Into<String>, text: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let text = text.into();
        let value: f64 = text
            .trim()
            .parse()
            .map_err(|_| Error::invalid_param(&name, format!("'{text}' is not a number")))?;
        if !value.is_finite() {
            return Err(Error::invalid_param(&name, "value must be finite"));
        }
        Ok(Self { name, value, text })
    }

    /// The parameter name as written in the file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The numeric value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The literal spelling of the value.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.text)
    }
}

impl FromStr for Param {
    type Err = Error;

    /// Parse `name=value`.
    fn from_str(s: &str) -> Result<Self> {
        let Some((name, text)) = s.split_once('=') else {
            return Err(Error::invalid_param(s, "expected 'name=value'"));
        };
        if name.is_empty() {
            return Err(Error::invalid_param(s, "parameter name is empty"));
        }
        Param::parse(name, text)
    }
}

impl TryFrom<String> for Param {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Param> for String {
    fn from(p: Param) -> Self {
        p.to_string()
    }
}

/// One distribution under test: kind, generator parameters, comparison mode
/// and sample-mode window policy.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DistributionSpec {
    kind: DistributionKind,
    parameters: Vec<Param>,
    mode: Mode,
    window: WindowPolicy,
}

impl DistributionSpec {
    /// Create a spec with no parameters and the kind's default window.
    #[must_use]
    pub fn new(kind: DistributionKind, mode: Mode) -> Self {
        Self {
            kind,
            parameters: Vec::new(),
            mode,
            window: kind.default_window(),
        }
    }

    /// Append a parameter spelled from its float value.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.parameters.push(Param::new(name, value));
        self
    }

    /// Append a parameter keeping its literal spelling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `text` is not a finite number.
    pub fn param_text(mut self, name: impl Into<String>, text: impl Into<String>) -> Result<Self> {
        self.parameters.push(Param::parse(name, text)?);
        Ok(self)
    }

    /// Override the sample-mode window policy.
    #[must_use]
    pub fn window(mut self, window: WindowPolicy) -> Self {
        self.window = window;
        self
    }

    /// Parse a raw file stem such as `Gamma_alpha=4_beta=0.5`.
    ///
    /// # Errors
    ///
    /// Returns an error if the distribution name is unknown or a parameter
    /// component is not `name=value`.
    pub fn from_stem(stem: &str, mode: Mode) -> Result<Self> {
        let mut parts = stem.split('_');
        let head = parts.next().unwrap_or_default();
        let mut spec = Self::new(head.parse()?, mode);

        // Parameter names may themselves contain underscores (`std_dev`), so
        // a component without '=' is glued onto the next one.
        let mut pending = String::new();
        for part in parts {
            if !pending.is_empty() {
                pending.push('_');
            }
            pending.push_str(part);
            if pending.contains('=') {
                spec.parameters.push(pending.parse()?);
                pending.clear();
            }
        }
        if !pending.is_empty() {
            return Err(Error::invalid_param(pending, "expected 'name=value'"));
        }
        Ok(spec)
    }

    /// The distribution kind.
    #[must_use]
    pub fn kind(&self) -> DistributionKind {
        self.kind
    }

    /// The distribution's name tag.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Parameters in file-name order.
    #[must_use]
    pub fn parameters(&self) -> &[Param] {
        &self.parameters
    }

    /// The comparison mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The window policy applied in sample mode.
    #[must_use]
    pub fn window_policy(&self) -> WindowPolicy {
        self.window
    }

    /// `<Name>_<p1>=<v1>_<p2>=<v2>...`, the raw file name.
    #[must_use]
    pub fn file_stem(&self) -> String {
        let mut stem = self.kind.name().to_string();
        for p in &self.parameters {
            stem.push('_');
            stem.push_str(&p.to_string());
        }
        stem
    }

    /// The raw file name with `.svg` appended.
    #[must_use]
    pub fn artifact_name(&self) -> String {
        format!("{}.svg", self.file_stem())
    }

    /// Human-readable chart title: the file stem with spaces for underscores.
    #[must_use]
    pub fn title(&self) -> String {
        self.file_stem().replace('_', " ")
    }

    /// Look up a parameter by its canonical name, accepting any alias the
    /// kind declares for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the kind has no such parameter
    /// or the spec does not provide it.
    pub fn get(&self, canonical: &str) -> Result<f64> {
        let slot = self
            .kind
            .slots()
            .iter()
            .find(|s| s.canonical == canonical)
            .ok_or_else(|| {
                Error::invalid_param(canonical, format!("{} has no such parameter", self.kind))
            })?;
        self.parameters
            .iter()
            .find(|p| slot.matches(&p.name))
            .map(Param::value)
            .ok_or_else(|| Error::invalid_param(canonical, format!("missing for {}", self.kind)))
    }

    /// Check that every required parameter is present exactly once and no
    /// unrecognised parameter is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let slots = self.kind.slots();
        for p in &self.parameters {
            if !slots.iter().any(|s| s.matches(&p.name)) {
                return Err(Error::invalid_param(
                    &p.name,
                    format!("not a parameter of {}", self.kind),
                ));
            }
        }
        for slot in slots {
            let count = self
                .parameters
                .iter()
                .filter(|p| slot.matches(&p.name))
                .count();
            match count {
                0 => {
                    return Err(Error::invalid_param(
                        slot.canonical,
                        format!("missing for {}", self.kind),
                    ));
                }
                1 => {}
                _ => {
                    return Err(Error::invalid_param(slot.canonical, "given more than once"));
                }
            }
        }
        Ok(())
    }
}
