//! Simulation clock and factory state hashing.

use crate::entity::EntityKind;
use crate::fixed::Ticks;
use crate::graph::FactoryGraph;
use crate::sink::SinkState;
use crate::source::SourceState;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Mutable simulation state tracked by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimState {
    /// Ticks run since the last reset or compile.
    pub tick: Ticks,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to the next tick and return it.
    pub fn advance(&mut self) -> Ticks {
        self.tick += 1;
        self.tick
    }

    pub fn restart(&mut self) {
        self.tick = 0;
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// FNV-1a (64-bit) accumulator for determinism checks. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write(&[v as u8]);
    }

    /// Runtime fields of a source. Configuration is fixed after compile and
    /// is left out.
    pub fn write_source(&mut self, source: &SourceState) {
        self.write(&[source.status.code()]);
        self.write_u64(source.current_tick);
        self.write_bool(source.is_processing);
        self.write_bool(source.is_broken);
        self.write_u64(source.break_timer);
    }

    /// Counters of a sink.
    pub fn write_sink(&mut self, sink: &SinkState) {
        for v in [
            sink.current_stock,
            sink.in_count,
            sink.out_count,
            sink.fail,
            sink.loss,
        ] {
            self.write_u64(v);
        }
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash of everything a tick can change: the clock, the RNG position and
/// every entity's runtime state, in creation order.
pub fn factory_hash(tick: Ticks, rng_state: u64, graph: &FactoryGraph) -> u64 {
    let mut hasher = StateHash::new();
    hasher.write_u64(tick);
    hasher.write_u64(rng_state);

    for entity in graph.entities() {
        hasher.write_u32(entity.id.0);
        match &entity.kind {
            EntityKind::Source(source) => hasher.write_source(source),
            EntityKind::Sink(sink) => hasher.write_sink(sink),
            EntityKind::Visual => {}
        }
    }

    hasher.finish()
}
