//! Plot-ready series built from run results.
//!
//! There is one [`Chart`] per `(executable, size)`, holding one [`Curve`] per
//! chunk size. Each point carries the best-of-k time and the speedup over the
//! plan's baseline executable at the same size, chunk size and x value.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RunError;
use crate::expand::PointKey;
use crate::plan::BenchmarkPlan;
use crate::schema::PointResult;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub seconds: f64,
    pub speedup: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub label: String,
    pub chunk_size: u64,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub executable: String,
    pub size: u64,
    pub x_label: String,
    pub y_label: String,
    pub curves: Vec<Curve>,
}

/// Speedup of `seconds` over `baseline`; zero when the point took no measurable time.
pub fn speedup(baseline: f64, seconds: f64) -> f64 {
    if seconds > 0.0 {
        baseline / seconds
    } else {
        0.0
    }
}

/// Build every chart of the plan, in plan order.
pub fn build(plan: &BenchmarkPlan, points: &[PointResult]) -> Result<Vec<Chart>, RunError> {
    let by_key: HashMap<PointKey, f64> = points
        .iter()
        .map(|p| {
            let key = PointKey {
                executable: p.executable.clone(),
                size: p.size,
                chunk_size: p.chunk_size,
                x_value: p.x_value,
            };
            (key, p.best.mean)
        })
        .collect();

    let lookup = |executable: &str, size: u64, chunk_size: u64, x_value: i64| {
        let key = PointKey {
            executable: executable.to_string(),
            size,
            chunk_size,
            x_value,
        };
        by_key
            .get(&key)
            .copied()
            .ok_or_else(|| RunError::MissingPoint {
                executable: executable.to_string(),
                size,
                chunk_size,
                x_value,
            })
    };

    let Some(baseline_exe) = plan.baseline() else {
        return Ok(Vec::new());
    };

    let mut charts = Vec::with_capacity(plan.executables.len() * plan.sizes.len());
    for executable in &plan.executables {
        for &size in &plan.sizes {
            let mut curves = Vec::with_capacity(plan.curves.values.len());
            for &chunk_size in &plan.curves.values {
                let mut curve_points = Vec::with_capacity(plan.x_axis.values().len());
                for &x in plan.x_axis.values() {
                    let seconds = lookup(executable, size, chunk_size, x)?;
                    let baseline = lookup(baseline_exe, size, chunk_size, x)?;
                    curve_points.push(Point {
                        x,
                        seconds,
                        speedup: speedup(baseline, seconds),
                    });
                }
                curves.push(Curve {
                    label: plan.curve_label(chunk_size),
                    chunk_size,
                    points: curve_points,
                });
            }
            charts.push(Chart {
                executable: executable.clone(),
                size,
                x_label: plan.x_axis.label().to_string(),
                y_label: plan.y_label.clone(),
                curves,
            });
        }
    }
    Ok(charts)
}
