//! The simulation engine: owns the committed factory graph and drives it one
//! tick at a time.
//!
//! # Lifecycle
//!
//! 1. [`Simulator::run_code`] compiles a script into a staging graph. Only a
//!    fully successful compile replaces the live graph; a failure leaves the
//!    previous factory running.
//! 2. [`Simulator::tick`] advances every entity once, in creation order,
//!    then delivers buffered presentation events.
//! 3. [`Simulator::results`] snapshots sources and sinks at any point.

use crate::compiler::{self, CompiledFactory};
use crate::config::SimConfig;
use crate::event::{Event, EventBus, EventKind, PassiveListener};
use crate::fixed::Ticks;
use crate::graph::FactoryGraph;
use crate::id::EntityId;
use crate::results::SimResults;
use crate::rng::SimRng;
use crate::script::CompileError;
use crate::sim::{self, SimState};

/// Summary of a successful compile.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CompileReport {
    pub entities: usize,
    pub links: usize,
    pub products: usize,
    /// Lines the script wrote with `log()`.
    pub log: Vec<String>,
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Owns one factory and the clock, RNG and event bus that drive it.
#[derive(Debug)]
pub struct Simulator {
    graph: FactoryGraph,

    /// Tick counter since the last reset or compile.
    pub sim_state: SimState,

    rng: SimRng,
    config: SimConfig,

    /// Presentation notifications.
    pub event_bus: EventBus,

    /// The most recently computed state hash.
    last_state_hash: u64,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Simulator {
    pub fn new(config: SimConfig) -> Self {
        let mut sim = Self {
            graph: FactoryGraph::new(),
            sim_state: SimState::new(),
            rng: SimRng::new(config.seed),
            config,
            event_bus: EventBus::new(),
            last_state_hash: 0,
        };
        sim.last_state_hash = sim.compute_state_hash();
        sim
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Drop the current factory and clear the scene.
    pub fn reset(&mut self) {
        self.graph = FactoryGraph::new();
        self.restart_clock();
        self.event_bus.emit(Event::SceneCleared);
        self.event_bus.deliver();
        tracing::debug!("simulator reset");
    }

    /// Compile `src` and, on success, replace the current factory with it.
    ///
    /// On failure the error is logged and returned, and the running factory
    /// is left exactly as it was.
    pub fn run_code(&mut self, src: &str) -> Result<CompileReport, CompileError> {
        tracing::debug!(bytes = src.len(), "compiling script");
        match compiler::compile(src, &self.config) {
            Ok(factory) => Ok(self.load(factory)),
            Err(err) => {
                tracing::error!(%err, "script failed to compile; keeping previous factory");
                Err(err)
            }
        }
    }

    /// Commit an already compiled factory.
    pub fn load(&mut self, factory: CompiledFactory) -> CompileReport {
        let CompiledFactory { graph, events, log } = factory;
        self.graph = graph;
        self.restart_clock();

        self.event_bus.emit(Event::SceneCleared);
        self.event_bus.emit_all(events);
        self.event_bus.deliver();

        let report = CompileReport {
            entities: self.graph.entities().len(),
            links: self.graph.links().len(),
            products: self.graph.products().len(),
            log,
        };
        tracing::info!(
            entities = report.entities,
            links = report.links,
            products = report.products,
            "factory compiled"
        );
        report
    }

    fn restart_clock(&mut self) {
        self.sim_state.restart();
        self.rng.reseed(self.config.seed);
        self.last_state_hash = self.compute_state_hash();
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the factory by one tick.
    ///
    /// Entities tick in creation order. A source may change a sink before or
    /// after that sink's own tick in the same pass; sink ticks only report
    /// state, so the order does not affect the outcome.
    pub fn tick(&mut self) {
        self.sim_state.advance();
        for index in 0..self.graph.entities().len() {
            self.graph
                .tick_entity(EntityId(index as u32), &mut self.rng, &mut self.event_bus);
        }
        self.event_bus.deliver();
        self.last_state_hash = self.compute_state_hash();
    }

    /// Run `ticks` ticks back to back.
    pub fn run_ticks(&mut self, ticks: Ticks) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.event_bus.on_passive(kind, listener);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn results(&self) -> SimResults {
        SimResults::capture(self.sim_state.tick, &self.graph)
    }

    pub fn graph(&self) -> &FactoryGraph {
        &self.graph
    }

    pub fn tick_count(&self) -> Ticks {
        self.sim_state.tick
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Hash of the state after the last tick, compile or reset.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    fn compute_state_hash(&self) -> u64 {
        sim::factory_hash(self.sim_state.tick, self.rng.state(), &self.graph)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::compiler::DEFAULT_SCRIPT;
    use crate::fixed::Fixed64;

    #[test]
    fn default_script_delivers_first_unit_on_tick_five() {
        let mut sim = Simulator::default();
        sim.run_code(DEFAULT_SCRIPT).unwrap();

        sim.run_ticks(4);
        assert_eq!(sim.results().sinks[0].elements, 0);

        sim.tick();
        let results = sim.results();
        assert_eq!(results.tick, 5);
        let stock = &results.sinks[0];
        assert_eq!(stock.name, "Stock");
        assert_eq!(stock.elements, 1);
        assert_eq!(stock.profit, Fixed64::from_num(10));
    }

    #[test]
    fn compile_report_counts_and_log() {
        let mut sim = Simulator::default();
        let report = sim
            .run_code("log('building');\nvar s = createSink();\ncreateLink();")
            .unwrap();
        assert_eq!(report.entities, 1);
        assert_eq!(report.links, 1);
        assert_eq!(report.products, 0);
        assert_eq!(report.log, vec!["building"]);
    }

    #[test]
    fn failed_compile_keeps_previous_factory() {
        let mut sim = Simulator::default();
        sim.run_code(DEFAULT_SCRIPT).unwrap();
        sim.run_ticks(3);
        let before = sim.results();
        let hash = sim.state_hash();

        let err = sim.run_code("var x = createSink();\nx.setCapacity(-5)");
        assert!(err.is_err());
        assert_eq!(sim.results(), before);
        assert_eq!(sim.state_hash(), hash);
        assert_eq!(sim.tick_count(), 3);
    }

    #[test]
    fn deeply_nested_script_is_a_syntax_error() {
        let mut sim = Simulator::default();
        sim.run_code(DEFAULT_SCRIPT).unwrap();
        for depth in [10_000, 100_000] {
            let src = format!("var x = {}1{};", "(".repeat(depth), ")".repeat(depth));
            let err = sim.run_code(&src).unwrap_err();
            assert!(matches!(err, CompileError::Syntax { .. }));
        }
        assert_eq!(sim.graph().entities().len(), 2);
    }

    #[test]
    fn reset_clears_everything() {
        let mut sim = Simulator::default();
        sim.run_code(DEFAULT_SCRIPT).unwrap();
        sim.run_ticks(2);
        sim.reset();
        assert!(sim.graph().is_empty());
        assert_eq!(sim.tick_count(), 0);
        assert!(sim.results().sinks.is_empty());
    }

    #[test]
    fn compile_and_tick_deliver_events_to_listeners() {
        let mut sim = Simulator::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            EventKind::SceneCleared,
            EventKind::LinkPathCreated,
            EventKind::ItemTransported,
        ] {
            let seen = Rc::clone(&seen);
            sim.on_passive(kind, Box::new(move |e| seen.borrow_mut().push(e.kind())));
        }

        sim.run_code(DEFAULT_SCRIPT).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![EventKind::SceneCleared, EventKind::LinkPathCreated]
        );

        sim.run_ticks(5);
        assert_eq!(seen.borrow().last(), Some(&EventKind::ItemTransported));
        assert!(sim.event_bus.pending().is_empty());
    }

    #[test]
    fn suppressed_kinds_are_not_delivered() {
        let mut sim = Simulator::default();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        sim.on_passive(
            EventKind::SourceUpdated,
            Box::new(move |_| *counter.borrow_mut() += 1),
        );
        sim.suppress_event(EventKind::SourceUpdated);
        sim.run_code(DEFAULT_SCRIPT).unwrap();
        sim.run_ticks(3);
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn state_hash_tracks_progress() {
        let mut sim = Simulator::default();
        sim.run_code(DEFAULT_SCRIPT).unwrap();
        let h0 = sim.state_hash();
        sim.tick();
        assert_ne!(sim.state_hash(), h0);
    }

    #[test]
    fn rerunning_restarts_clock_and_rng() {
        let script = "var p = createProduct(); p.setName('x');\n\
                      var s = createSource(); s.setProduct(p); s.setDuration(2); s.setFailFrequence(0.5);\n\
                      var k = createSink(); k.setProduct(p);\n\
                      var l = createLink(); l.setFrom(s); l.setTo(k);";
        let mut sim = Simulator::new(SimConfig::with_seed(7));
        sim.run_code(script).unwrap();
        sim.run_ticks(20);
        let first = (sim.results(), sim.state_hash());

        sim.run_code(script).unwrap();
        assert_eq!(sim.tick_count(), 0);
        sim.run_ticks(20);
        assert_eq!((sim.results(), sim.state_hash()), first);
    }
}
