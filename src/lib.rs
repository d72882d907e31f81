//! Loader and runner for tester benchmark plans.
//!
//! A plan names the workload executables, their problem sizes and the
//! chunk-size / thread-count matrix to sweep. This crate parses and validates
//! plans, expands them into run descriptors, runs them with best-of-k
//! trimming and turns the results into speedup series.

pub mod checkpoint;
pub mod error;
pub mod expand;
pub mod harness;
pub mod literal;
pub mod logging;
pub mod plan;
pub mod schema;
pub mod series;
pub mod stats;

pub use error::{MalformedPlanError, RunError};
pub use expand::RunDescriptor;
pub use plan::{Axis, BenchmarkPlan, Domain, PlanFile, Repetitions, XAxis};
