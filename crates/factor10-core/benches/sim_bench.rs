//! Criterion benchmarks for the Factor10 simulator.
//!
//! Two benchmark groups:
//! - `compile`: script to committed graph for a generated 100-line factory
//! - `tick`: steady-state ticking of the same factory

use criterion::{Criterion, criterion_group, criterion_main};
use factor10_core::config::SimConfig;
use factor10_core::engine::Simulator;

/// `lines` independent mine -> stock -> smelter -> store lines, built with a
/// script loop.
fn line_script(lines: u32) -> String {
    format!(
        "var ore = createProduct(); ore.setName('Ore'); ore.setPrice(1);
var bar = createProduct(); bar.setName('Bar'); bar.setPrice(5);
for (var i = 0; i < {lines}; i++) {{
    var mine = createSource(); mine.setProduct(ore); mine.setDuration(2);
    var stock = createSink(); stock.setProduct(ore); stock.setCapacity(20);
    var smelter = createSource(); smelter.setProduct(bar); smelter.setDuration(5);
    smelter.setFailFrequence(0.05); smelter.setBreakFrequence(0.01); smelter.setBreakDuration(10);
    var store = createSink(); store.setProduct(bar); store.setCapacity(0);
    var a = createLink(); a.setFrom(mine); a.setTo(stock);
    var b = createLink(); b.setFrom(stock); b.setTo(smelter); b.setVolume(2);
    var c = createLink(); c.setFrom(smelter); c.setTo(store);
}}
"
    )
}

fn headless_sim() -> Simulator {
    let mut sim = Simulator::new(SimConfig::default());
    sim.event_bus.suppress_all();
    sim
}

fn bench_compile(c: &mut Criterion) {
    let src = line_script(100);
    c.bench_function("compile_100_lines", |b| {
        let mut sim = headless_sim();
        b.iter(|| {
            sim.run_code(&src).unwrap();
        });
    });
}

fn bench_tick(c: &mut Criterion) {
    let src = line_script(100);
    let mut group = c.benchmark_group("tick");

    group.bench_function("100_lines_headless", |b| {
        let mut sim = headless_sim();
        sim.run_code(&src).unwrap();
        b.iter(|| sim.tick());
    });

    group.bench_function("100_lines_with_events", |b| {
        let mut sim = Simulator::new(SimConfig::default());
        sim.run_code(&src).unwrap();
        b.iter(|| sim.tick());
    });

    group.finish();
}

criterion_group!(benches, bench_compile, bench_tick);
criterion_main!(benches);
