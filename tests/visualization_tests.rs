use distcheck::prelude::*;
use distcheck::{PdfRow, ReferenceDensity};
use statrs::distribution::{ContinuousCDF, Gamma};
use tempfile::TempDir;

fn stratified_gamma(shape: f64, rate: f64, n: u32) -> Vec<f64> {
    let dist = Gamma::new(shape, rate).unwrap();
    (0..n)
        .map(|i| dist.inverse_cdf((f64::from(i) + 0.5) / f64::from(n)))
        .collect()
}

#[test]
fn sample_chart_is_written_as_svg() {
    let dir = TempDir::new().unwrap();
    let spec = DistributionSpec::from_stem("Gamma_alpha=4_beta=0.5", Mode::Sample).unwrap();
    let comparison = Comparator::new()
        .compare(&spec, {
            let path = dir.path().join(spec.file_stem());
            let text: String = stratified_gamma(4.0, 0.5, 5_000)
                .iter()
                .map(|x| format!("{x}\n"))
                .collect();
            std::fs::write(&path, text).unwrap();
            path
        })
        .unwrap();

    let path = dir.path().join(spec.artifact_name());
    SvgPlotter::new().render(&comparison, &path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("<svg"));
    assert!(content.contains("reference"));
    assert!(content.contains("samples"));
    assert!(content.contains("width=\"800\""));
}

#[test]
fn half_cauchy_chart_carries_naive_curve() {
    let dir = TempDir::new().unwrap();
    let spec = DistributionSpec::from_stem("HalfCauchy_mu=1.2_sigma=2.3", Mode::Sample).unwrap();
    let draws: Vec<f64> = (0..2_000).map(|i| f64::from(i) * 0.005).collect();
    let comparison = Comparator::new().compare_sample_data(&spec, draws).unwrap();

    let path = dir.path().join("half_cauchy.svg");
    SvgPlotter::new().render_samples(&comparison, &path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("naive"));
}

#[test]
fn pdf_chart_has_two_panels() {
    let dir = TempDir::new().unwrap();
    let spec = DistributionSpec::from_stem("Beta_alpha=2.6_beta=4.9", Mode::PdfEval).unwrap();
    let reference = ReferenceDensity::from_spec(&spec).unwrap();
    let rows: Vec<PdfRow> = (1..100)
        .map(|i| {
            let x = f64::from(i) / 100.0;
            PdfRow {
                x,
                pdf: reference.pdf(x),
                ln_pdf: reference.ln_pdf(x),
            }
        })
        .collect();
    let comparison = Comparator::new().compare_pdf_rows(&spec, rows).unwrap();

    let path = dir.path().join(spec.artifact_name());
    SvgPlotter::new()
        .two_panel_size(900, 400)
        .render_pdf(&comparison, &path)
        .unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("width=\"900\""));
    assert!(content.contains("log pdf"));
    assert!(content.contains("<circle"));
}

#[test]
fn unwritable_destination_is_a_plot_error() {
    let dir = TempDir::new().unwrap();
    let spec = DistributionSpec::from_stem("Uniform_a=1.23_b=2.34", Mode::Sample).unwrap();
    let draws: Vec<f64> = (0..500).map(|i| 1.23 + f64::from(i) * 0.002).collect();
    let comparison = Comparator::new().compare_sample_data(&spec, draws).unwrap();

    let path = dir.path().join("no_such_dir").join("chart.svg");
    let err = SvgPlotter::new().render_samples(&comparison, &path).unwrap_err();
    assert!(matches!(err, Error::Plot(_)));
}
