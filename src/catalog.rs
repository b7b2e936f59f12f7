//! The distributions checked by a default run.
//!
//! Each row is the raw file stem the native generator writes, spelled
//! exactly as it spells it, plus the comparison mode. Parameters are parsed
//! out of the stem, so the file name and the reference curve are driven by
//! the same values.

use crate::distribution::{DistributionSpec, Mode};
use crate::error::Result;

struct Row {
    mode: Mode,
    stem: &'static str,
    extension: bool,
}

const fn sample(stem: &'static str) -> Row {
    Row {
        mode: Mode::Sample,
        stem,
        extension: false,
    }
}

const fn pdf(stem: &'static str) -> Row {
    Row {
        mode: Mode::PdfEval,
        stem,
        extension: false,
    }
}

const fn pdf_extension(stem: &'static str) -> Row {
    Row {
        mode: Mode::PdfEval,
        stem,
        extension: true,
    }
}

const TABLE: &[Row] = &[
    sample("Normal_mean=1.23_std=2.34"),
    sample("Uniform_a=1.23_b=2.34"),
    sample("Beta_alpha=1.23_beta=2.34"),
    sample("Gamma_alpha=4_beta=0.5"),
    sample("Cauchy_mu=8.9_sigma=2.3"),
    sample("Exponential_rate=2.3"),
    sample("HalfCauchy_mu=1.2_sigma=2.3"),
    sample("StudentT_df=4_mu=9.7_sigma=3.3"),
    pdf("Normal_mean=8.9_std=2.3"),
    pdf("Uniform_a=1.2_b=2.8"),
    pdf("Beta_alpha=2.6_beta=4.9"),
    pdf("Gamma_alpha=2.6_beta=0.8"),
    pdf_extension("Cauchy_mu=7.4_sig=3.5"),
    pdf_extension("Exponential_rate=0.4"),
    pdf_extension("HalfCauchy_mu=0.0_sig=3.5"),
    pdf_extension("StudentT_location=4.2_scale=6.4_df=3.5"),
];

fn collect(filter: impl Fn(&Row) -> bool) -> Result<Vec<DistributionSpec>> {
    TABLE
        .iter()
        .filter(|r| filter(r))
        .map(|r| DistributionSpec::from_stem(r.stem, r.mode))
        .collect()
}

/// Every catalog entry; PDF-mode entries outside the core reference set
/// are included only when `include_extension` is true.
///
/// # Errors
///
/// Only if a table row fails to parse, which the tests rule out.
pub fn entries(include_extension: bool) -> Result<Vec<DistributionSpec>> {
    collect(|r| include_extension || !r.extension)
}

/// The sample-mode entries, one per distribution kind.
///
/// # Errors
///
/// See [`entries`].
pub fn sample_entries() -> Result<Vec<DistributionSpec>> {
    collect(|r| r.mode == Mode::Sample)
}

/// The PDF-mode entries.
///
/// # Errors
///
/// See [`entries`].
pub fn pdf_entries(include_extension: bool) -> Result<Vec<DistributionSpec>> {
    collect(|r| r.mode == Mode::PdfEval && (include_extension || !r.extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::DistributionKind;
    use crate::window::WindowPolicy;

    #[test]
    fn every_row_parses_and_validates() {
        for spec in entries(true).unwrap() {
            spec.validate().unwrap();
        }
    }

    #[test]
    fn sample_mode_covers_every_kind_once() {
        let kinds: Vec<DistributionKind> = sample_entries()
            .unwrap()
            .iter()
            .map(DistributionSpec::kind)
            .collect();
        assert_eq!(kinds, DistributionKind::ALL.to_vec());
    }

    #[test]
    fn extension_rows_are_opt_in() {
        let core = pdf_entries(false).unwrap();
        assert_eq!(core.len(), 4);
        assert!(core.iter().all(|s| s.kind().has_core_pdf_reference()));
        assert_eq!(pdf_entries(true).unwrap().len(), 8);
        assert_eq!(entries(false).unwrap().len(), 12);
        assert_eq!(entries(true).unwrap().len(), 16);
    }

    #[test]
    fn stems_keep_generator_spelling() {
        let stems: Vec<String> = entries(true)
            .unwrap()
            .iter()
            .map(DistributionSpec::file_stem)
            .collect();
        for row in TABLE {
            assert!(stems.iter().any(|s| s == row.stem), "{} lost", row.stem);
        }
    }

    #[test]
    fn windows_follow_kind_defaults() {
        for spec in sample_entries().unwrap() {
            assert_eq!(spec.window_policy(), spec.kind().default_window());
        }
        let normal = &sample_entries().unwrap()[0];
        assert_eq!(
            normal.window_policy(),
            WindowPolicy::Quantile {
                lower: 0.5,
                upper: 99.5
            }
        );
    }
}
