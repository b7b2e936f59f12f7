use std::fmt::Write as _;
use std::fs;

use distcheck::prelude::*;
use distcheck::provider::draw_samples;
use distcheck::{DEFAULT_BINS, Histogram, catalog};
use rand::SeedableRng;
use rand::rngs::StdRng;
use statrs::distribution::{ContinuousCDF, Normal};
use tempfile::TempDir;

/// Draws at evenly spaced quantiles, so histogram shape is deterministic.
fn stratified_normal(mean: f64, std: f64, n: u32) -> Vec<f64> {
    let dist = Normal::new(mean, std).unwrap();
    (0..n)
        .map(|i| dist.inverse_cdf((f64::from(i) + 0.5) / f64::from(n)))
        .collect()
}

fn sample_spec(stem: &str) -> DistributionSpec {
    DistributionSpec::from_stem(stem, Mode::Sample).unwrap()
}

#[test]
fn normal_histogram_peaks_at_mean() {
    let spec = sample_spec("Normal_mean=1.23_std=2.34");
    let result = Comparator::new()
        .compare_sample_data(&spec, stratified_normal(1.23, 2.34, 10_000))
        .unwrap();

    let hist = &result.histogram;
    assert_eq!(hist.bins(), DEFAULT_BINS);
    assert!(
        (hist.peak_center() - 1.23).abs() <= hist.bin_width(),
        "peak at {} (bin width {})",
        hist.peak_center(),
        hist.bin_width()
    );
    assert_eq!(result.verdict, Verdict::Consistent);
}

#[test]
fn random_normal_draws_peak_near_mean() {
    // With 10,000 random draws the argmax bin is noisy: a neighbour of the
    // centre bin wins often, and one two bins out occasionally. Three bin
    // widths (about 0.6 std) is well clear of that.
    let spec = sample_spec("Normal_mean=1.23_std=2.34");
    let comparator = Comparator::new();
    for seed in [1, 7, 42, 1234, 9999] {
        let mut rng = StdRng::seed_from_u64(seed);
        let draws = draw_samples(&spec, 10_000, &mut rng).unwrap();
        let result = comparator.compare_sample_data(&spec, draws).unwrap();

        let hist = &result.histogram;
        assert!(
            (hist.peak_center() - 1.23).abs() <= 3.0 * hist.bin_width(),
            "seed {seed}: peak at {} (bin width {})",
            hist.peak_center(),
            hist.bin_width()
        );
        assert!((hist.area() - 1.0).abs() < 0.01, "seed {seed}");
    }
}

#[test]
fn histogram_area_is_one() {
    let spec = sample_spec("Normal_mean=1.23_std=2.34");
    let result = Comparator::new()
        .compare_sample_data(&spec, stratified_normal(1.23, 2.34, 10_000))
        .unwrap();
    assert!((result.histogram.area() - 1.0).abs() < 0.01);
    assert_eq!(result.n_samples, 10_000);
}

#[test]
fn clipped_draws_land_inside_window() {
    let spec = sample_spec("Cauchy_mu=8.9_sigma=2.3");
    let mut rng = StdRng::seed_from_u64(11);
    let draws = draw_samples(&spec, 50_000, &mut rng).unwrap();
    let result = Comparator::new().compare_sample_data(&spec, draws).unwrap();

    // 5th to 95th percentile leaves roughly a tenth outside.
    let frac = result.n_clipped as f64 / result.n_samples as f64;
    assert!((0.08..0.12).contains(&frac), "clipped fraction {frac}");

    let window = result.window;
    let edges = result.histogram.edges();
    assert!((edges[0] - window.lower()).abs() < 1e-9);
    assert!((edges[edges.len() - 1] - window.upper()).abs() < 1e-9);
    let total: usize = result.histogram.counts().iter().sum();
    assert_eq!(total, result.n_samples);
}

#[test]
fn seeded_draws_match_every_catalog_distribution() {
    let mut rng = StdRng::seed_from_u64(2024);
    let comparator = Comparator::new();
    for spec in catalog::sample_entries().unwrap() {
        let draws = draw_samples(&spec, 100_000, &mut rng).unwrap();
        let result = comparator.compare_sample_data(&spec, draws).unwrap();
        assert_eq!(
            result.verdict,
            Verdict::Consistent,
            "{} scored {}",
            spec.file_stem(),
            result.score
        );
    }
}

#[test]
fn draws_from_wrong_parameters_diverge() {
    let claimed = sample_spec("Normal_mean=1.23_std=2.34");
    let result = Comparator::new()
        .compare_sample_data(&claimed, stratified_normal(1.23, 1.5, 20_000))
        .unwrap();
    assert_eq!(result.verdict, Verdict::Divergent);
}

#[test]
fn sample_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Normal_mean=1.23_std=2.34");
    let mut text = String::new();
    for x in stratified_normal(1.23, 2.34, 5_000) {
        let _ = writeln!(text, "{x}");
    }
    fs::write(&path, text).unwrap();

    let spec = sample_spec("Normal_mean=1.23_std=2.34");
    let comparison = Comparator::new().compare(&spec, &path).unwrap();
    assert_eq!(comparison.verdict(), Verdict::Consistent);
    assert!(comparison.window().is_some());
}

#[test]
fn missing_file_is_missing_input() {
    let dir = TempDir::new().unwrap();
    let spec = sample_spec("Exponential_rate=2.3");
    let err = Comparator::new()
        .compare(&spec, dir.path().join("Exponential_rate=2.3"))
        .unwrap_err();
    assert!(matches!(err, Error::MissingInput { .. }));
}

#[test]
fn reference_pdf_file_for_normal_is_exact() {
    let dir = TempDir::new().unwrap();
    let spec = DistributionSpec::from_stem("Normal_mean=8.9_std=2.3", Mode::PdfEval).unwrap();
    let config = HarnessConfig::builder()
        .sample_dir(dir.path().join("samples"))
        .pdf_dir(dir.path().join("pdf"))
        .entry(spec.clone())
        .build()
        .unwrap();
    ReferenceProvider::new(0).produce(&config).unwrap();

    let Comparison::Pdf(result) = Comparator::new()
        .compare(&spec, config.raw_path(&spec))
        .unwrap()
    else {
        panic!("expected a pdf comparison");
    };
    assert_eq!(result.observed.len(), distcheck::provider::PDF_ROWS);
    assert!(result.score < 1e-12, "score {}", result.score);
    assert_eq!(result.verdict, Verdict::Consistent);
    assert!(result.log_panel_range().is_none());
}

#[test]
fn pdf_rows_missing_a_separator_are_malformed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Gamma_alpha=2.6_beta=0.8");
    // pdf and log-pdf run together with no comma between them
    fs::write(&path, "0.01,0.0048-5.33\n0.02,0.0091-4.69\n").unwrap();

    let spec = DistributionSpec::from_stem("Gamma_alpha=2.6_beta=0.8", Mode::PdfEval).unwrap();
    let err = Comparator::new().compare(&spec, &path).unwrap_err();
    assert!(matches!(err, Error::Malformed { line: 1, .. }), "{err}");
}

#[test]
fn uniform_log_panel_is_pinned_around_constant() {
    let spec = DistributionSpec::from_stem("Uniform_a=1.2_b=2.8", Mode::PdfEval).unwrap();
    let ln = -(1.6_f64.ln());
    let rows = (0..10)
        .map(|i| distcheck::PdfRow {
            x: 1.2 + f64::from(i) * 0.16,
            pdf: 0.625,
            ln_pdf: ln,
        })
        .collect();
    let result = Comparator::new().compare_pdf_rows(&spec, rows).unwrap();
    assert_eq!(result.verdict, Verdict::Consistent);

    let (lo, hi) = result.log_panel_range().unwrap();
    assert!(lo < ln && ln < hi);
    assert!((hi - lo - 0.2 * ln.abs()).abs() < 1e-12);
}

#[test]
fn custom_bin_count_is_respected() {
    let window = ComparisonWindow::new(-1.0, 1.0).unwrap();
    let hist = Histogram::new(&[-1.0, -0.5, 0.0, 0.5, 1.0], &window, 4).unwrap();
    assert_eq!(hist.counts(), &[1, 1, 1, 2]);

    let spec = sample_spec("Uniform_a=1.23_b=2.34");
    let draws: Vec<f64> = (0..1_000).map(|i| 1.23 + 1.11 * (f64::from(i) + 0.5) / 1_000.0).collect();
    let result = Comparator::new().bins(10).compare_sample_data(&spec, draws).unwrap();
    assert_eq!(result.histogram.bins(), 10);
    assert!(result.score < 0.05);
}
