//! Batch runner behind the `factor10` binary.
//!
//! Compiles a project, ticks it a fixed number of times while recording a
//! result history, and renders the final snapshot.

use std::fmt::Write as _;
use std::path::PathBuf;

use factor10_core::engine::CompileReport;
use factor10_core::fixed::{Fixed64, Ticks};
use factor10_core::results::SimResults;
use factor10_core::script::CompileError;
use factor10_data::{DataLoadError, ProjectFile};
use factor10_stats::{ResultHistory, StatsConfig};
use serde::Serialize;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that stop a headless run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Data(#[from] DataLoadError),

    #[error("script error: {0}")]
    Compile(#[from] CompileError),

    #[error("cannot read script {file}: {source}")]
    Script {
        file: PathBuf,
        source: std::io::Error,
    },

    /// Two runs with the same seed ended in different states.
    #[error("nondeterministic run: {first:#018x} != {second:#018x}")]
    Nondeterministic { first: u64, second: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Options and report
// ===========================================================================

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub ticks: Ticks,
    /// Overrides the project's stored seed.
    pub seed: Option<u64>,
    /// Run the project a second time and compare state hashes.
    pub check_determinism: bool,
    pub stats: StatsConfig,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ticks: 100,
            seed: None,
            check_determinism: false,
            stats: StatsConfig::default(),
        }
    }
}

/// Rolling rates for one sink over the stats window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkRate {
    pub name: String,
    pub throughput: Fixed64,
    pub profit_rate: Fixed64,
}

/// Outcome of a headless run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub project: String,
    pub seed: u64,
    pub ticks: Ticks,
    pub compile: CompileReport,
    pub state_hash: u64,
    pub results: SimResults,
    pub total_profit: Fixed64,
    pub rates: Vec<SinkRate>,
    /// One snapshot per tick, including tick 0.
    #[serde(skip)]
    pub history: ResultHistory,
}

// ===========================================================================
// Running
// ===========================================================================

/// Compile `project` and run it for `options.ticks` ticks.
pub fn run_project(project: &ProjectFile, options: &RunOptions) -> Result<RunReport, RunError> {
    let mut project = project.clone();
    if let Some(seed) = options.seed {
        project.settings.seed = Some(seed);
    }

    let (mut sim, compile) = project.open()?;
    sim.event_bus.suppress_all();

    let mut history = ResultHistory::new(options.stats.clone());
    history.record(sim.results());
    for _ in 0..options.ticks {
        sim.tick();
        history.record(sim.results());
    }

    let state_hash = sim.state_hash();
    if options.check_determinism {
        let (mut again, _) = project.open()?;
        again.event_bus.suppress_all();
        again.run_ticks(options.ticks);
        if again.state_hash() != state_hash {
            return Err(RunError::Nondeterministic {
                first: state_hash,
                second: again.state_hash(),
            });
        }
        tracing::debug!(hash = state_hash, "determinism check passed");
    }

    let results = sim.results();
    let rates = results
        .sinks
        .iter()
        .map(|sink| SinkRate {
            name: sink.name.clone(),
            throughput: history.sink_throughput(sink.id),
            profit_rate: history.profit_rate(sink.id),
        })
        .collect();

    tracing::info!(
        project = %project.meta.name,
        ticks = options.ticks,
        hash = state_hash,
        "run finished"
    );

    Ok(RunReport {
        project: project.meta.name.clone(),
        seed: sim.config().seed,
        ticks: sim.tick_count(),
        compile,
        state_hash,
        total_profit: results.total_profit(),
        results,
        rates,
        history,
    })
}

/// A project wrapping a bare script file.
pub fn script_project(path: PathBuf) -> Result<ProjectFile, RunError> {
    let code = std::fs::read_to_string(&path).map_err(|source| RunError::Script {
        file: path.clone(),
        source,
    })?;
    let name = path
        .file_stem()
        .map_or_else(|| "script".to_string(), |s| s.to_string_lossy().into_owned());
    Ok(ProjectFile::new(name, code))
}

// ===========================================================================
// Rendering
// ===========================================================================

/// Human-readable summary in the style of the results panel.
pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", report.project);
    let _ = writeln!(
        out,
        "Compiled: {} entities, {} links, {} products (seed {})",
        report.compile.entities, report.compile.links, report.compile.products, report.seed
    );
    for line in &report.compile.log {
        let _ = writeln!(out, "  log: {line}");
    }
    let _ = writeln!(
        out,
        "After {} ticks: state hash = {:#018x}",
        report.ticks, report.state_hash
    );

    for source in &report.results.sources {
        let _ = writeln!(out, "  [{:>12}] state={:?}", source.name, source.state);
    }
    for (sink, rate) in report.results.sinks.iter().zip(&report.rates) {
        let _ = writeln!(
            out,
            "  [{:>12}] elements={}, fail={}, loss={}, profit={}, throughput={}/tick",
            sink.name, sink.elements, sink.fail, sink.loss, sink.profit, rate.throughput
        );
    }
    let _ = writeln!(out, "Total profit: {}", report.total_profit);
    out
}

// ===========================================================================
// Tests
// ===========================================================================
