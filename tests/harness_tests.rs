use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use distcheck::prelude::*;
use distcheck::{EntryStatus, PdfComparison, SampleComparison};
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> distcheck::HarnessConfigBuilder {
    HarnessConfig::builder()
        .sample_dir(dir.path().join("RandomSamples"))
        .pdf_dir(dir.path().join("Pdf"))
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Produces everything, then deletes the raw file of one entry.
struct DropOne {
    inner: ReferenceProvider,
    stem: String,
}

impl RawDataProvider for DropOne {
    fn produce(&mut self, config: &HarnessConfig) -> distcheck::Result<()> {
        self.inner.produce(config)?;
        for spec in config.entries() {
            if spec.file_stem() == self.stem {
                fs::remove_file(config.raw_path(spec)).unwrap();
            }
        }
        Ok(())
    }
}

struct Broken;

impl RawDataProvider for Broken {
    fn produce(&mut self, _config: &HarnessConfig) -> distcheck::Result<()> {
        Err(Error::Provider("build failed".into()))
    }
}

/// Records what it was asked to render without writing anything.
#[derive(Default)]
struct Recorder {
    rendered: RefCell<Vec<PathBuf>>,
}

impl PlotSink for Recorder {
    fn render_samples(&self, _c: &SampleComparison, path: &Path) -> distcheck::Result<()> {
        self.rendered.borrow_mut().push(path.to_path_buf());
        Ok(())
    }

    fn render_pdf(&self, _c: &PdfComparison, path: &Path) -> distcheck::Result<()> {
        self.rendered.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}

#[test]
fn reference_run_is_consistent_everywhere() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir)
        .extension_references(true)
        .build()
        .unwrap();
    let harness = Harness::new(config);

    let report = harness.run(&mut ReferenceProvider::new(42)).unwrap();

    assert!(report.is_success(), "{report}");
    assert_eq!(report.outcomes().len(), 16);
    for outcome in report.outcomes() {
        assert_eq!(
            outcome.verdict(),
            Some(Verdict::Consistent),
            "{} ({}) diverged:\n{report}",
            outcome.name,
            outcome.mode
        );
        assert!(outcome.artifact.is_file(), "{} missing", outcome.artifact.display());
    }
    assert!(report.all_consistent());

    // Every raw file has its chart next to it.
    for spec in harness.config().entries() {
        let artifact = harness.config().artifact_path(spec);
        assert!(artifact.starts_with(harness.config().dir_for(spec.mode())));
        let svg = fs::read_to_string(&artifact).unwrap();
        assert!(svg.contains("<svg"));
    }
}

#[test]
fn sample_windows_are_reported() {
    let dir = TempDir::new().unwrap();
    let spec = DistributionSpec::new(DistributionKind::Uniform, Mode::Sample)
        .param("a", 1.23)
        .param("b", 2.34);
    let config = config_in(&dir).entry(spec).build().unwrap();
    let report = Harness::new(config)
        .run(&mut ReferenceProvider::new(1).samples(20_000))
        .unwrap();

    let outcome = report.outcome("Uniform_a=1.23_b=2.34", Mode::Sample).unwrap();
    let EntryStatus::Compared { window, .. } = outcome.status else {
        panic!("entry failed: {:?}", outcome.status);
    };
    let (lo, hi) = window.unwrap();
    assert!((lo - 1.23).abs() < f64::EPSILON);
    assert!((hi - 2.34).abs() < f64::EPSILON);
}

#[test]
fn missing_raw_file_is_isolated() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir)
        .failure_policy(FailurePolicy::Isolate)
        .build()
        .unwrap();
    let harness = Harness::new(config);
    let mut provider = DropOne {
        inner: ReferenceProvider::new(3).samples(20_000),
        stem: "Gamma_alpha=4_beta=0.5".into(),
    };

    let report = harness.run(&mut provider).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.n_failed(), 1);
    let failed = report.outcome("Gamma_alpha=4_beta=0.5", Mode::Sample).unwrap();
    assert!(failed.is_failed());
    assert!(!failed.artifact.exists());
    match &failed.status {
        EntryStatus::Failed { error } => assert!(error.contains("missing raw input")),
        EntryStatus::Compared { .. } => unreachable!(),
    }
    // Everything else still ran.
    assert_eq!(
        report.outcomes().iter().filter(|o| o.verdict().is_some()).count(),
        report.outcomes().len() - 1
    );
}

#[test]
fn missing_raw_file_aborts_before_any_comparison() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir).build().unwrap();
    let harness = Harness::new(config);
    let mut provider = DropOne {
        inner: ReferenceProvider::new(3).samples(5_000),
        stem: "Exponential_rate=2.3".into(),
    };

    let err = harness.run(&mut provider).unwrap_err();

    assert!(matches!(err, Error::MissingInput { ref path } if path.ends_with("Exponential_rate=2.3")));
    for mode_dir in [harness.config().sample_dir(), harness.config().pdf_dir()] {
        assert!(
            file_names(mode_dir).iter().all(|n| !n.ends_with(".svg")),
            "no chart may be written when inputs are incomplete"
        );
    }
}

#[test]
fn provider_failure_follows_policy() {
    let dir = TempDir::new().unwrap();
    let abort = Harness::new(config_in(&dir).build().unwrap());
    assert!(matches!(abort.run(&mut Broken), Err(Error::Provider(_))));

    let isolate = Harness::new(
        config_in(&dir)
            .failure_policy(FailurePolicy::Isolate)
            .build()
            .unwrap(),
    );
    let report = isolate.run(&mut Broken).unwrap();
    assert_eq!(report.provider_error.as_deref(), Some("provider error: build failed"));
    assert_eq!(report.n_failed(), report.outcomes().len());
}

#[test]
fn rerun_is_idempotent_and_clears_stale_files() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir).build().unwrap();
    let harness = Harness::new(config);

    fs::create_dir_all(harness.config().sample_dir()).unwrap();
    fs::write(harness.config().sample_dir().join("stale.svg"), "old").unwrap();

    let first = harness
        .run(&mut ReferenceProvider::new(9).samples(20_000))
        .unwrap();
    let names_first = file_names(harness.config().sample_dir());
    assert!(!names_first.contains(&"stale.svg".to_string()));

    let second = harness
        .run(&mut ReferenceProvider::new(9).samples(20_000))
        .unwrap();
    assert_eq!(file_names(harness.config().sample_dir()), names_first);
    assert_eq!(first, second);
}

#[test]
fn unwritten_artifact_is_missing_output() {
    let dir = TempDir::new().unwrap();
    let spec = DistributionSpec::new(DistributionKind::Normal, Mode::PdfEval)
        .param("mean", 8.9)
        .param("std", 2.3);
    let config = config_in(&dir).entry(spec).build().unwrap();
    let harness = Harness::with_sink(config, Recorder::default());

    let err = harness.run(&mut ReferenceProvider::new(0)).unwrap_err();

    assert!(matches!(err, Error::MissingOutput { .. }));
    assert_eq!(harness.sink().rendered.borrow().len(), 1);
}

#[test]
fn extension_pdf_entries_need_opt_in() {
    let dir = TempDir::new().unwrap();
    let spec = DistributionSpec::new(DistributionKind::Cauchy, Mode::PdfEval)
        .param("mu", 7.4)
        .param("sig", 3.5);
    let config = config_in(&dir)
        .failure_policy(FailurePolicy::Isolate)
        .entry(spec)
        .build()
        .unwrap();
    let report = Harness::new(config)
        .run(&mut ReferenceProvider::new(0))
        .unwrap();

    let outcome = &report.outcomes()[0];
    match &outcome.status {
        EntryStatus::Failed { error } => assert!(error.contains("not enabled"), "{error}"),
        EntryStatus::Compared { .. } => panic!("extension reference used without opt-in"),
    }
}

#[cfg(unix)]
#[test]
fn command_provider_reports_failing_programs() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir).build().unwrap();
    let stem = config.entries()[0].file_stem();

    let mut ok = CommandProvider::new("/bin").program(Mode::Sample, stem.clone(), "true");
    ok.produce(&config).unwrap();

    let mut failing = CommandProvider::new("/bin").program(Mode::Sample, stem, "false");
    assert!(matches!(failing.produce(&config), Err(Error::Provider(_))));

    let mut absent = CommandProvider::new(dir.path()).with_conventional_programs(&config);
    assert!(matches!(absent.produce(&config), Err(Error::Provider(_))));
}

#[cfg(feature = "serde")]
#[test]
fn report_exports_as_json() {
    let dir = TempDir::new().unwrap();
    let spec = DistributionSpec::new(DistributionKind::Exponential, Mode::Sample).param("rate", 2.3);
    let config = config_in(&dir).entry(spec).build().unwrap();
    let report = Harness::new(config)
        .run(&mut ReferenceProvider::new(5).samples(20_000))
        .unwrap();

    let path = dir.path().join("report.json");
    report.export_json(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["outcomes"][0]["name"], "Exponential_rate=2.3");
    assert_eq!(json["outcomes"][0]["status"]["status"], "compared");
}
