//! Source state machine: production progress, breakdowns and repairs.
//!
//! The cross-entity half of a source tick (checking and withdrawing input
//! stock, pushing output along links) lives in [`crate::graph`]; this module
//! holds the per-source transitions it is built from.

use crate::fixed::{Fixed64, Ticks, unit_ratio};
use crate::id::ProductId;

/// Visual summary of what a source did on its latest tick.
///
/// Not authoritative: control flow reads `is_broken` / `is_processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SourceStatus {
    /// Broke down this tick.
    JustBroken = 0,
    /// Counting down a repair.
    Repairing = 1,
    /// Idle: no product, not enough input stock, or zero duration.
    Waiting = 2,
    /// Working on a batch.
    Processing = 3,
}

impl SourceStatus {
    /// Numeric code used by charts and CSV export.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Configuration and runtime state of a source.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceState {
    pub product: Option<ProductId>,
    /// Ticks needed to produce one batch. Zero disables production.
    pub duration: Ticks,
    /// Probability that a completed batch is marked failed.
    pub fail_freq: Fixed64,
    /// Probability of breaking down on an idle tick.
    pub break_freq: Fixed64,
    /// Ticks a breakdown lasts.
    pub break_duration: Ticks,

    pub current_tick: Ticks,
    pub is_processing: bool,
    pub is_broken: bool,
    pub break_timer: Ticks,
    pub status: SourceStatus,
}

impl SourceState {
    pub const DEFAULT_DURATION: Ticks = 10;

    pub fn new() -> Self {
        Self {
            product: None,
            duration: Self::DEFAULT_DURATION,
            fail_freq: Fixed64::ZERO,
            break_freq: Fixed64::ZERO,
            break_duration: 0,
            current_tick: 0,
            is_processing: false,
            is_broken: false,
            break_timer: 0,
            status: SourceStatus::Waiting,
        }
    }

    /// Nothing to do this tick.
    pub fn wait(&mut self) {
        self.status = SourceStatus::Waiting;
    }

    /// Count one tick of repair. The status stays `Repairing` on the tick
    /// the breakdown clears.
    pub fn continue_repair(&mut self) {
        self.break_timer = self.break_timer.saturating_sub(1);
        self.status = SourceStatus::Repairing;
        if self.break_timer == 0 {
            self.is_broken = false;
        }
    }

    /// Enter the broken state. Only legal while idle.
    pub fn break_down(&mut self) {
        debug_assert!(!self.is_processing);
        self.is_broken = true;
        self.break_timer = self.break_duration;
        self.status = SourceStatus::JustBroken;
    }

    /// Whether the source may try to start a batch at all.
    pub fn can_start(&self) -> bool {
        self.product.is_some() && self.duration > 0 && !self.is_broken && !self.is_processing
    }

    /// Start a batch. The starting tick counts as the first tick of work.
    pub fn begin_processing(&mut self) {
        self.is_processing = true;
        self.current_tick = 1;
        self.status = SourceStatus::Processing;
    }

    /// One more tick of work on the current batch.
    pub fn advance(&mut self) {
        self.current_tick += 1;
        self.status = SourceStatus::Processing;
    }

    /// Finish the batch if its duration has elapsed. Returns `true` when a
    /// batch completed this call; the caller then draws pass/fail and pushes
    /// the output.
    pub fn try_complete(&mut self) -> bool {
        if !self.is_processing || self.current_tick < self.duration {
            return false;
        }
        self.is_processing = false;
        self.current_tick = self.duration;
        true
    }

    /// Production progress in `[0, 1]`.
    pub fn progress_ratio(&self) -> f64 {
        unit_ratio(self.current_tick, self.duration)
    }

    /// Repair progress in `[0, 1]`; 0 when not broken.
    pub fn repair_ratio(&self) -> f64 {
        if !self.is_broken || self.break_duration == 0 {
            return 0.0;
        }
        1.0 - unit_ratio(self.break_timer, self.break_duration)
    }
}

impl Default for SourceState {
    fn default() -> Self {
        Self::new()
    }
}
