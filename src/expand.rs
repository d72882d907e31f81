//! Expansion of a plan into fully resolved run descriptors.
//!
//! The run matrix is the Cartesian product
//! `executables × sizes × chunk sizes × x values`, in that nesting order
//! (the x value varies fastest). Outer flags are attached to every
//! descriptor rather than combined.

use serde::{Deserialize, Serialize};

use crate::plan::BenchmarkPlan;

/// One point of the run matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunDescriptor {
    pub executable: String,
    pub size: u64,
    pub flags: Vec<char>,
    pub chunk_size: u64,
    pub x_value: i64,
}

/// Identity of a descriptor within one plan (flags are shared by all of them).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointKey {
    pub executable: String,
    pub size: u64,
    pub chunk_size: u64,
    pub x_value: i64,
}

impl RunDescriptor {
    pub fn key(&self) -> PointKey {
        PointKey {
            executable: self.executable.clone(),
            size: self.size,
            chunk_size: self.chunk_size,
            x_value: self.x_value,
        }
    }

    /// Process arguments: `<size> <flag>... <chunk_size> <x_value>`.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.flags.len() + 3);
        argv.push(self.size.to_string());
        argv.extend(self.flags.iter().map(|c| c.to_string()));
        argv.push(self.chunk_size.to_string());
        argv.push(self.x_value.to_string());
        argv
    }
}

/// Number of descriptors the plan expands to.
pub fn count(plan: &BenchmarkPlan) -> usize {
    plan.executables.len() * plan.sizes.len() * plan.curves.values.len() * plan.x_axis.values().len()
}

/// Lazily walk the run matrix in plan order.
pub fn iter(plan: &BenchmarkPlan) -> impl Iterator<Item = RunDescriptor> + '_ {
    plan.executables.iter().flat_map(move |exe| {
        plan.sizes.iter().flat_map(move |&size| {
            plan.curves.values.iter().flat_map(move |&chunk_size| {
                plan.x_axis.values().iter().map(move |&x_value| RunDescriptor {
                    executable: exe.clone(),
                    size,
                    flags: plan.flags.clone(),
                    chunk_size,
                    x_value,
                })
            })
        })
    })
}

/// All descriptors of the plan, in plan order.
pub fn descriptors(plan: &BenchmarkPlan) -> Vec<RunDescriptor> {
    let mut out = Vec::with_capacity(count(plan));
    out.extend(iter(plan));
    out
}
