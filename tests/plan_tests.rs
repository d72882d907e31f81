//! Integration tests against the shipped bubble sort plan.

use std::collections::HashSet;
use std::path::PathBuf;

use concurrency_bench::expand::{self, PointKey};
use concurrency_bench::plan::{BenchmarkPlan, Domain, PlanFile};
use concurrency_bench::MalformedPlanError;

fn plans_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("plans")
}

fn shipped() -> BenchmarkPlan {
    BenchmarkPlan::load(plans_dir().join("bubble_sort.tester")).unwrap()
}

#[test]
fn shipped_plan_fields() {
    let plan = shipped();
    assert_eq!(plan.executables.len(), 6);
    assert_eq!(plan.executables[0], "sequential");
    assert_eq!(plan.executables[5], "pthreads_mutex");
    assert_eq!(plan.sizes, vec![8192, 65536]);
    assert_eq!(plan.flags, vec!['g']);
    assert_eq!(plan.curves.values, vec![128, 512, 2048]);
    assert_eq!(
        plan.x_axis.domain(),
        &Domain::Range {
            start: 2,
            stop: 49,
            step: 2
        }
    );
    assert_eq!(plan.x_axis.values().len(), 24);
    assert_eq!(plan.x_axis.values().first(), Some(&2));
    assert_eq!(plan.x_axis.values().last(), Some(&48));
    assert_eq!(plan.y_label, "Speedup");
    assert!(plan.repetitions.keep_best <= plan.repetitions.runs);
}

#[test]
fn shipped_plan_expands_to_864_unique_points() {
    let plan = shipped();
    let all = expand::descriptors(&plan);
    assert_eq!(all.len(), 864);
    assert_eq!(expand::count(&plan), 864);

    let keys: HashSet<PointKey> = all.iter().map(|d| d.key()).collect();
    assert_eq!(keys.len(), 864);
}

#[test]
fn literal_and_json_forms_agree() {
    let json = BenchmarkPlan::load(plans_dir().join("bubble_sort.json")).unwrap();
    assert_eq!(json, shipped());
}

#[test]
fn round_trips_are_structurally_identical() {
    let plan = shipped();
    let literal = BenchmarkPlan::parse_literal(&plan.to_literal_string()).unwrap();
    assert_eq!(literal, plan);
    let json = BenchmarkPlan::from_json(&plan.to_json().unwrap()).unwrap();
    assert_eq!(json, plan);
}

#[test]
fn malformed_variants_of_shipped_plan() {
    let src = std::fs::read_to_string(plans_dir().join("bubble_sort.tester")).unwrap();

    let two_keys = src.replace(
        "{ \"Chunk size = \" : [128, 512, 2048] }",
        "{ \"Chunk size = \" : [128], \"Block = \" : [512] }",
    );
    assert!(matches!(
        BenchmarkPlan::parse_literal(&two_keys),
        Err(MalformedPlanError::MappingArity { keys: 2, .. })
    ));

    let inverted = src.replace("[3, 8]", "[8, 3]");
    assert!(matches!(
        BenchmarkPlan::parse_literal(&inverted),
        Err(MalformedPlanError::KeepExceedsRuns { .. })
    ));
}

#[test]
fn plan_file_digest_is_stable() {
    let a = PlanFile::open(plans_dir().join("bubble_sort.tester")).unwrap();
    let b = PlanFile::open(plans_dir().join("bubble_sort.tester")).unwrap();
    assert_eq!(a.sha256(), b.sha256());
    assert_eq!(a.sha256().len(), 64);
}
