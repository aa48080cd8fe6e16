//! Headless Factor10 runner.
//!
//! Loads a project (or a bare script), runs it for a number of ticks and
//! prints the final results. Logs go to stderr; use `RUST_LOG` to filter.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use factor10_data::{ProjectFile, load_project};
use factor10_headless::{RunError, RunOptions, RunReport, render_text, run_project, script_project};
use factor10_stats::StatsConfig;
use tracing_subscriber::EnvFilter;

/// Run a Factor10 factory without the editor.
#[derive(Parser, Debug)]
#[command(name = "factor10")]
#[command(about = "Run a Factor10 factory for a number of ticks and report the results")]
struct Args {
    /// Project file (.json, .toml or .ron). Runs the sample factory when
    /// neither this nor --script is given.
    project: Option<PathBuf>,

    /// Run a bare script file instead of a project
    #[arg(long, conflicts_with = "project")]
    script: Option<PathBuf>,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 100)]
    ticks: u64,

    /// Random seed, overriding the project's
    #[arg(long)]
    seed: Option<u64>,

    /// Write the per-tick history as CSV to this path
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Ticks used for rolling throughput
    #[arg(long, default_value_t = 50)]
    window: usize,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Run twice and fail if the final states differ
    #[arg(long)]
    check_determinism: bool,

    /// Debug-level logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), RunError> {
    let project = match (&args.project, &args.script) {
        (Some(path), _) => load_project(path)?,
        (None, Some(path)) => script_project(path.clone())?,
        (None, None) => ProjectFile::default(),
    };

    let options = RunOptions {
        ticks: args.ticks,
        seed: args.seed,
        check_determinism: args.check_determinism,
        stats: StatsConfig {
            window_size: args.window,
            ..StatsConfig::default()
        },
    };
    let report = run_project(&project, &options)?;

    if let Some(path) = &args.csv {
        let mut out = BufWriter::new(File::create(path)?);
        report.history.write_csv(&mut out)?;
        out.flush()?;
        tracing::info!(path = %path.display(), rows = report.history.len(), "csv written");
    }

    print_report(&report, args.format);
    Ok(())
}

fn print_report(report: &RunReport, format: OutputFormat) {
    match format {
        OutputFormat::Text => print!("{}", render_text(report)),
        OutputFormat::Json => match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("error: cannot encode report: {err}"),
        },
    }
}
