//! Result history for the Factor10 simulator.
//!
//! Records one [`SimResults`] snapshot per tick and derives the series the
//! results panel draws: source state over time, sink stock, fail, loss and
//! profit, and rolling rates over a configurable window. The full history can
//! be exported as CSV.
//!
//! # Usage
//!
//! ```ignore
//! let mut history = ResultHistory::new(StatsConfig::default());
//! sim.run_code(script)?;
//! history.reset();
//! for _ in 0..100 {
//!     sim.tick();
//!     history.record(sim.results());
//! }
//! history.write_csv(std::fs::File::create("results.csv")?)?;
//! ```

use std::collections::VecDeque;
use std::io::{self, Write};

use factor10_core::fixed::{Fixed64, Ticks, count_to_fixed64};
use factor10_core::id::EntityId;
use factor10_core::results::SimResults;
use factor10_core::source::SourceStatus;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the result history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsConfig {
    /// Number of most recent snapshots used for rolling rates and charts.
    pub window_size: usize,
    /// Maximum snapshots kept; the oldest are dropped first. `None` keeps
    /// everything, which CSV export needs.
    pub history_capacity: Option<usize>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_size: 50,
            history_capacity: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Series points
// ---------------------------------------------------------------------------

/// One sink's figures at one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkPoint {
    pub tick: Ticks,
    pub elements: i64,
    pub fail: u64,
    pub loss: u64,
    pub profit: Fixed64,
}

// ---------------------------------------------------------------------------
// ResultHistory
// ---------------------------------------------------------------------------

/// Snapshots of one run, oldest first.
///
/// Rows are assumed to come from the same compiled factory; call
/// [`ResultHistory::reset`] after every compile.
#[derive(Debug, Clone, Default)]
pub struct ResultHistory {
    config: StatsConfig,
    rows: VecDeque<SimResults>,
}

impl ResultHistory {
    pub fn new(config: StatsConfig) -> Self {
        Self {
            config,
            rows: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// Append a snapshot, dropping the oldest when at capacity.
    pub fn record(&mut self, results: SimResults) {
        if let Some(capacity) = self.config.history_capacity {
            while self.rows.len() >= capacity.max(1) {
                self.rows.pop_front();
            }
        }
        self.rows.push_back(results);
    }

    pub fn reset(&mut self) {
        self.rows.clear();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn latest(&self) -> Option<&SimResults> {
        self.rows.back()
    }

    /// All snapshots, oldest first.
    pub fn rows(&self) -> impl Iterator<Item = &SimResults> {
        self.rows.iter()
    }

    /// The last `window_size` snapshots, oldest first.
    pub fn window(&self) -> impl Iterator<Item = &SimResults> {
        let skip = self.rows.len().saturating_sub(self.config.window_size);
        self.rows.iter().skip(skip)
    }

    // -----------------------------------------------------------------------
    // Series
    // -----------------------------------------------------------------------

    /// Source state per recorded tick. Ticks where the source is absent are
    /// skipped.
    pub fn source_states(&self, id: EntityId) -> Vec<(Ticks, SourceStatus)> {
        self.rows
            .iter()
            .filter_map(|row| row.source(id).map(|s| (row.tick, s.state)))
            .collect()
    }

    pub fn sink_series(&self, id: EntityId) -> Vec<SinkPoint> {
        self.rows.iter().filter_map(|row| sink_point(row, id)).collect()
    }

    // -----------------------------------------------------------------------
    // Rolling rates
    // -----------------------------------------------------------------------

    /// First and last window points of a sink, if they span at least one
    /// tick.
    fn window_span(&self, id: EntityId) -> Option<(SinkPoint, SinkPoint, Ticks)> {
        let mut points = self.window().filter_map(|row| sink_point(row, id));
        let first = points.next()?;
        let last = points.last()?;
        let span = last.tick.checked_sub(first.tick).filter(|&t| t > 0)?;
        Some((first, last, span))
    }

    /// Net units gained by a sink per tick over the window.
    pub fn sink_throughput(&self, id: EntityId) -> Fixed64 {
        let Some((first, last, span)) = self.window_span(id) else {
            return Fixed64::ZERO;
        };
        count_to_fixed64(last.elements - first.elements) / count_to_fixed64(span as i64)
    }

    /// Profit gained by a sink per tick over the window.
    pub fn profit_rate(&self, id: EntityId) -> Fixed64 {
        let Some((first, last, span)) = self.window_span(id) else {
            return Fixed64::ZERO;
        };
        last.profit.saturating_sub(first.profit) / count_to_fixed64(span as i64)
    }

    /// Fraction of window ticks a source spent processing.
    pub fn processing_ratio(&self, id: EntityId) -> Fixed64 {
        let mut seen = 0i64;
        let mut processing = 0i64;
        for source in self.window().filter_map(|row| row.source(id)) {
            seen += 1;
            if source.state == SourceStatus::Processing {
                processing += 1;
            }
        }
        if seen == 0 {
            return Fixed64::ZERO;
        }
        count_to_fixed64(processing) / count_to_fixed64(seen)
    }

    // -----------------------------------------------------------------------
    // CSV export
    // -----------------------------------------------------------------------

    /// Write the full history as CSV.
    ///
    /// Columns: `Tick`, one `"<name> State"` per source, then `"<name>
    /// Success"`, `"<name> Fail"`, `"<name> Loss"`, `"<name> Profit"` per
    /// sink. The header is taken from the first snapshot. Writes nothing when
    /// the history is empty.
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        let Some(first) = self.rows.front() else {
            return Ok(());
        };

        let mut header = vec!["Tick".to_string()];
        for source in &first.sources {
            header.push(quoted(&source.name, "State"));
        }
        for sink in &first.sinks {
            for suffix in ["Success", "Fail", "Loss", "Profit"] {
                header.push(quoted(&sink.name, suffix));
            }
        }
        writeln!(out, "{}", header.join(","))?;

        for row in &self.rows {
            let mut line = vec![row.tick.to_string()];
            line.extend(row.sources.iter().map(|s| s.state.code().to_string()));
            for sink in &row.sinks {
                line.push(sink.elements.to_string());
                line.push(sink.fail.to_string());
                line.push(sink.loss.to_string());
                line.push(sink.profit.to_string());
            }
            writeln!(out, "{}", line.join(","))?;
        }
        Ok(())
    }

    pub fn to_csv(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_csv(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn sink_point(row: &SimResults, id: EntityId) -> Option<SinkPoint> {
    row.sink(id).map(|s| SinkPoint {
        tick: row.tick,
        elements: s.elements,
        fail: s.fail,
        loss: s.loss,
        profit: s.profit,
    })
}

fn quoted(name: &str, suffix: &str) -> String {
    format!("\"{} {suffix}\"", name.replace('"', "\"\""))
}
