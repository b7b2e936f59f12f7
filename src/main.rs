use std::error::Error as _;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use distcheck::prelude::*;
use distcheck::{HarnessConfigBuilder, catalog};

#[derive(Debug, Parser)]
#[command(
    name = "distcheck",
    about = "Compare a random-number library's output against closed-form distributions",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Clear outputs, produce raw files, compare every entry and report
    ///
    /// One of --build-dir (the library under test) or --reference-seed (a
    /// dry run against this tool's own reference data) is required.
    ///
    /// Examples:
    ///   distcheck run --build-dir Debug
    ///   distcheck run --reference-seed 42 --isolate --report report.json
    #[command(group(
        ArgGroup::new("provider")
            .required(true)
            .args(["build_dir", "reference_seed"])
    ))]
    Run {
        /// JSON configuration file; flags below override it
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Directory for sample-mode raw files and charts
        #[arg(long, value_name = "DIR")]
        sample_dir: Option<PathBuf>,

        /// Directory for PDF-mode raw files and charts
        #[arg(long, value_name = "DIR")]
        pdf_dir: Option<PathBuf>,

        /// Record failures and keep going instead of stopping at the first
        #[arg(long, action = ArgAction::SetTrue)]
        isolate: bool,

        /// Enable PDF-mode references outside the core set
        #[arg(long, action = ArgAction::SetTrue)]
        extension: bool,

        /// Run native generator programs from this build directory
        #[arg(long, value_name = "DIR")]
        build_dir: Option<PathBuf>,

        /// Write reference data in-process with this seed instead
        #[arg(long, value_name = "SEED")]
        reference_seed: Option<u64>,

        /// Draws per entry for the in-process provider
        #[arg(long, value_name = "N", default_value_t = 100_000)]
        samples: usize,

        /// Write the report as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Compare one existing raw file and render its chart
    Compare {
        /// Raw file stem, e.g. Normal_mean=1.23_std=2.34
        stem: String,

        /// Comparison mode: sample or pdf
        #[arg(long, default_value = "sample")]
        mode: Mode,

        /// Raw file to read; defaults to the mode's directory joined with the stem
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// Chart to write; defaults to the raw file with `.svg` appended
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Enable PDF-mode references outside the core set
        #[arg(long, action = ArgAction::SetTrue)]
        extension: bool,
    },

    /// List the built-in catalog
    List {
        /// Include PDF-mode extension entries
        #[arg(long, action = ArgAction::SetTrue)]
        extension: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match dispatch(cli.cmd) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cmd: Cmd) -> Result<ExitCode> {
    match cmd {
        Cmd::Run {
            config,
            sample_dir,
            pdf_dir,
            isolate,
            extension,
            build_dir,
            reference_seed,
            samples,
            report,
        } => {
            let base = match config {
                Some(path) => HarnessConfig::from_json_file(path)?,
                None => HarnessConfig::builder().extension_references(extension).build()?,
            };
            let mut builder = rebuild(&base);
            if let Some(dir) = sample_dir {
                builder = builder.sample_dir(dir);
            }
            if let Some(dir) = pdf_dir {
                builder = builder.pdf_dir(dir);
            }
            if isolate {
                builder = builder.failure_policy(FailurePolicy::Isolate);
            }
            if extension {
                builder = builder.extension_references(true);
            }
            let config = builder.build()?;

            let mut provider: Box<dyn RawDataProvider> = match (build_dir, reference_seed) {
                (Some(dir), None) => {
                    Box::new(CommandProvider::new(dir).with_conventional_programs(&config))
                }
                (None, Some(seed)) => Box::new(ReferenceProvider::new(seed).samples(samples)),
                _ => {
                    return Err(Error::InvalidConfig(
                        "give exactly one of --build-dir or --reference-seed".into(),
                    ));
                }
            };

            let run = Harness::new(config).run(provider.as_mut())?;
            print!("{run}");
            if let Some(path) = report {
                run.export_json(path)?;
            }
            Ok(exit_code(&run))
        }
        Cmd::Compare {
            stem,
            mode,
            file,
            out,
            extension,
        } => {
            let spec = DistributionSpec::from_stem(&stem, mode)?;
            let config = HarnessConfig::builder()
                .extension_references(extension)
                .entry(spec.clone())
                .build()?;
            let raw = file.unwrap_or_else(|| config.raw_path(&spec));
            let artifact = out.unwrap_or_else(|| {
                let mut s = raw.clone().into_os_string();
                s.push(".svg");
                PathBuf::from(s)
            });

            let comparison = config.comparator().compare(&spec, &raw)?;
            SvgPlotter::new().render(&comparison, &artifact)?;
            if let Some(w) = comparison.window() {
                println!("window   [{}, {}]", w.lower(), w.upper());
            }
            println!("score    {:.4e}", comparison.score());
            println!("verdict  {}", comparison.verdict());
            println!("chart    {}", artifact.display());
            Ok(match comparison.verdict() {
                Verdict::Consistent => ExitCode::SUCCESS,
                Verdict::Divergent => ExitCode::from(2),
            })
        }
        Cmd::List { extension } => {
            for spec in catalog::entries(extension)? {
                println!("{:<6} {}", spec.mode().to_string(), spec.file_stem());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// A builder seeded with every setting of `config`.
fn rebuild(config: &HarnessConfig) -> HarnessConfigBuilder {
    HarnessConfig::builder()
        .sample_dir(config.sample_dir())
        .pdf_dir(config.pdf_dir())
        .bins(config.bins())
        .curve_points(config.curve_points())
        .sample_tolerance(config.sample_tolerance())
        .pdf_tolerance(config.pdf_tolerance())
        .failure_policy(config.failure_policy())
        .extension_references(config.extension_references())
        .entries(config.entries().to_vec())
}

fn exit_code(report: &RunReport) -> ExitCode {
    if !report.is_success() {
        ExitCode::FAILURE
    } else if report.n_divergent() > 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}
