//! Runs the bundled projects end to end.

use std::path::{Path, PathBuf};

use factor10_data::load_project;
use factor10_headless::{RunOptions, run_project};

fn project_path(file: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("projects")
        .join(file)
}

#[test]
fn simple_cube_matches_editor_sample() {
    let project = load_project(&project_path("simple_cube.json")).unwrap();
    assert_eq!(project.meta.name, "Simple Cube");
    assert_eq!(project.settings.seed, Some(1));

    let report = run_project(
        &project,
        &RunOptions {
            ticks: 25,
            ..RunOptions::default()
        },
    )
    .unwrap();
    let stock = &report.results.sinks[0];
    assert_eq!(stock.name, "Stock");
    assert_eq!(stock.elements, 5);
    assert_eq!(report.history.len(), 26);
}

#[test]
fn smelter_line_is_deterministic() {
    let project = load_project(&project_path("smelter_line.toml")).unwrap();
    assert_eq!(project.settings.clamped_tick_delay(), 300);

    let options = RunOptions {
        ticks: 200,
        check_determinism: true,
        ..RunOptions::default()
    };
    let first = run_project(&project, &options).unwrap();
    let second = run_project(&project, &options).unwrap();
    assert_eq!(first.seed, 7);
    assert_eq!(first.compile.log, vec!["smelter line ready".to_string()]);
    assert_eq!(first.state_hash, second.state_hash);
    assert_eq!(first.results, second.results);
    assert_eq!(first.results.sinks.len(), 2);
}

#[test]
fn csv_history_has_header_and_rows() {
    let project = load_project(&project_path("simple_cube.json")).unwrap();
    let report = run_project(
        &project,
        &RunOptions {
            ticks: 5,
            ..RunOptions::default()
        },
    )
    .unwrap();

    let csv = report.history.to_csv();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(
        lines[0],
        "Tick,\"Machine State\",\"Stock Success\",\"Stock Fail\",\"Stock Loss\",\"Stock Profit\""
    );
    assert!(lines[6].starts_with("5,"));
    assert!(lines[6].ends_with(",1,0,0,10"));
}
