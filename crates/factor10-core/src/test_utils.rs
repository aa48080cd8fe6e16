//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use std::cell::RefCell;
use std::rc::Rc;

use crate::compiler::DEFAULT_SCRIPT;
use crate::config::SimConfig;
use crate::engine::Simulator;
use crate::event::{Event, EventKind};
use crate::fixed::Fixed64;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Scripts
// ===========================================================================

/// The new-project script: one machine feeding one stock.
pub const SAMPLE_SCRIPT: &str = DEFAULT_SCRIPT;

/// A source that finishes one unit per tick into a sink of `capacity`.
pub fn feeder_script(capacity: u64) -> String {
    format!(
        "var p = createProduct(); p.setName('Widget'); p.setPrice(3);
var m = createSource(); m.setName('Press'); m.setProduct(p); m.setDuration(1);
var s = createSink(); s.setName('Bin'); s.setProduct(p); s.setCapacity({capacity});
var l = createLink(); l.setFrom(m); l.setTo(s);
"
    )
}

/// Raw stock -> machine -> finished stock, with breakdown and fail rates.
pub fn chain_script(fail: f64, break_freq: f64, break_duration: u64) -> String {
    format!(
        "var ore = createProduct(); ore.setName('Ore'); ore.setPrice(1);
var bar = createProduct(); bar.setName('Bar'); bar.setPrice(5);
var mine = createSource(); mine.setName('Mine'); mine.setProduct(ore); mine.setDuration(1);
var raw = createSink(); raw.setName('Raw'); raw.setProduct(ore); raw.setCapacity(4);
var smelter = createSource(); smelter.setName('Smelter'); smelter.setProduct(bar);
smelter.setDuration(3); smelter.setFailFrequence({fail});
smelter.setBreakFrequence({break_freq}); smelter.setBreakDuration({break_duration});
var done = createSink(); done.setName('Done'); done.setProduct(bar); done.setCapacity(0);
var a = createLink(); a.setFrom(mine); a.setTo(raw);
var b = createLink(); b.setFrom(raw); b.setTo(smelter); b.setVolume(2);
var c = createLink(); c.setFrom(smelter); c.setTo(done);
"
    )
}

// ===========================================================================
// Simulator constructors
// ===========================================================================

/// A simulator with every event kind suppressed, running `script`.
pub fn headless(script: &str, seed: u64) -> Simulator {
    let mut sim = Simulator::new(SimConfig::with_seed(seed));
    sim.event_bus.suppress_all();
    if let Err(err) = sim.run_code(script) {
        panic!("test script failed to compile: {err}");
    }
    sim
}

// ===========================================================================
// Event recording
// ===========================================================================

/// Collects delivered events of the given kinds.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<Event>>>,
}

impl EventRecorder {
    pub fn attach(sim: &mut Simulator, kinds: &[EventKind]) -> Self {
        let recorder = Self::default();
        for &kind in kinds {
            let events = Rc::clone(&recorder.events);
            sim.on_passive(kind, Box::new(move |e| events.borrow_mut().push(e.clone())));
        }
        recorder
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.borrow().iter().map(Event::kind).collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}
