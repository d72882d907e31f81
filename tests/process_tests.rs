//! Runs plans against small shell-script workloads.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Mutex;

use concurrency_bench::harness::{run_plan, BenchConfig, Launcher, ProcessLauncher, TimingSource};
use concurrency_bench::plan::BenchmarkPlan;
use concurrency_bench::series;
use concurrency_bench::{RunDescriptor, RunError};
use tempfile::tempdir;

// Scripts are written and executed in the same process; serialize the tests
// so no child inherits a script that is still open for writing.
static EXEC_LOCK: Mutex<()> = Mutex::new(());

fn write_script(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn plan() -> BenchmarkPlan {
    BenchmarkPlan::parse_literal(
        r#"[["sequential", "parallel"], [64], ["g"], {"Chunk size = ": [16]}, {"Number of threads": [1, 2, 4]}, "Speedup", [2, 3]]"#,
    )
    .unwrap()
}

#[test]
fn reported_time_drives_speedup() {
    let _guard = EXEC_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempdir().unwrap();
    write_script(dir.path(), "sequential", "echo 8");
    // argv: <size> <flag> <chunk> <threads>
    write_script(dir.path(), "parallel", "echo \"sorting $1 with flag $2\"\necho $((8 / $4))");

    let cfg = BenchConfig {
        bin_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let plan = plan();
    let mut launcher = ProcessLauncher::new(&cfg);
    let points = run_plan(&plan, &cfg, &mut launcher, None).unwrap();
    assert_eq!(points.len(), 6);
    assert_eq!(points[0].samples, vec![8.0, 8.0, 8.0]);
    assert_eq!(points[0].argv, vec!["64", "g", "16", "1"]);

    let charts = series::build(&plan, &points).unwrap();
    let speedups: Vec<f64> = charts[1].curves[0].points.iter().map(|p| p.speedup).collect();
    assert_eq!(speedups, vec![1.0, 2.0, 4.0]);
}

#[test]
fn wall_clock_timing_ignores_output() {
    let _guard = EXEC_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempdir().unwrap();
    write_script(dir.path(), "quiet", "exit 0");

    let cfg = BenchConfig {
        bin_dir: dir.path().to_path_buf(),
        timing: TimingSource::WallClock,
        ..Default::default()
    };
    let desc = RunDescriptor {
        executable: "quiet".into(),
        size: 1,
        flags: vec![],
        chunk_size: 1,
        x_value: 1,
    };
    let seconds = ProcessLauncher::new(&cfg).launch(&desc).unwrap();
    assert!(seconds > 0.0);
}

#[test]
fn failures_are_reported() {
    let _guard = EXEC_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempdir().unwrap();
    write_script(dir.path(), "crashes", "echo boom >&2\nexit 3");
    write_script(dir.path(), "chatty", "echo no number here");

    let cfg = BenchConfig {
        bin_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let mut launcher = ProcessLauncher::new(&cfg);
    let desc = |name: &str| RunDescriptor {
        executable: name.into(),
        size: 1,
        flags: vec!['g'],
        chunk_size: 1,
        x_value: 1,
    };

    match launcher.launch(&desc("crashes")) {
        Err(RunError::Exit { stderr, .. }) => assert_eq!(stderr, "boom"),
        other => panic!("expected exit error, got {other:?}"),
    }
    match launcher.launch(&desc("chatty")) {
        Err(RunError::Timing { line, .. }) => assert_eq!(line, "no number here"),
        other => panic!("expected timing error, got {other:?}"),
    }
    assert!(matches!(
        launcher.launch(&desc("missing")),
        Err(RunError::Spawn { .. })
    ));
}
