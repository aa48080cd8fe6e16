//! Factor10 Core -- a discrete-tick factory-line simulator.
//!
//! A factory is described by a small script that declares products,
//! production sources, storage sinks and the links between them. The
//! compiler runs the script against a staging graph; the simulator commits
//! it and advances it one tick at a time, reporting throughput and profit.
//!
//! # Tick Rules
//!
//! Each call to [`engine::Simulator::tick`] visits every entity in creation
//! order:
//!
//! - **Source** -- waits without a product, counts down a repair while
//!   broken, may break down while idle, starts a batch once every input sink
//!   holds enough stock, and pushes finished units down its output links.
//! - **Sink** -- stores matching units up to its capacity, counting
//!   overflow as loss and defective units as fail.
//! - **Visual** -- decorative, no behavior.
//!
//! Presentation never drives the simulation: it only receives buffered
//! [`event::Event`]s.
//!
//! # Key Types
//!
//! - [`engine::Simulator`] -- owns the live factory, clock and RNG.
//! - [`compiler::compile`] -- script text to [`compiler::CompiledFactory`].
//! - [`graph::FactoryGraph`] -- entities, links and products of one run.
//! - [`results::SimResults`] -- per-tick snapshot of sources and sinks.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point for prices and probabilities.

pub mod compiler;
pub mod config;
pub mod engine;
pub mod entity;
pub mod event;
pub mod fixed;
pub mod graph;
pub mod id;
pub mod link;
pub mod product;
pub mod results;
pub mod rng;
pub mod script;
pub mod sim;
pub mod sink;
pub mod source;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
