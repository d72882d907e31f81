use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::expand::RunDescriptor;
use crate::plan::BenchmarkPlan;
use crate::series::Chart;
use crate::stats::{self, Summary};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub bench_version: String,
    pub plan_path: String,
    pub plan_sha256: String,
    pub timing: String,
    pub order: String,
    pub timestamp_utc: String,
    pub git_sha: Option<String>,
}

/// Current time as RFC 3339 in UTC, e.g. `2026-10-18T09:30:00Z`.
pub fn now_utc_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Timing result of one run point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointResult {
    pub executable: String,
    pub size: u64,
    pub chunk_size: u64,
    pub x_value: i64,
    pub argv: Vec<String>,

    /// Every sample in execution order, in seconds.
    pub samples: Vec<f64>,
    /// The k best samples, ascending.
    pub kept: Vec<f64>,
    pub median_s: f64,
    pub best: Summary,
}

impl PointResult {
    pub fn from_samples(desc: &RunDescriptor, samples: Vec<f64>, keep_best: usize) -> Self {
        let (kept, best) = Summary::k_best(&samples, keep_best);
        let mut sorted = samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        PointResult {
            executable: desc.executable.clone(),
            size: desc.size,
            chunk_size: desc.chunk_size,
            x_value: desc.x_value,
            argv: desc.argv(),
            median_s: stats::quantile(&sorted, 0.5),
            samples,
            kept,
            best,
        }
    }

    pub fn to_csv_header() -> String {
        "executable,size,chunk_size,x_value,runs,kept,best_mean_s,best_min_s,best_max_s,spread,median_s".to_string()
    }

    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{:.9},{:.9},{:.9},{:.4},{:.9}",
            self.executable,
            self.size,
            self.chunk_size,
            self.x_value,
            self.samples.len(),
            self.kept.len(),
            self.best.mean,
            self.best.min,
            self.best.max,
            self.best.spread,
            self.median_s,
        )
    }

    pub fn to_csv(points: &[PointResult]) -> String {
        let mut csv = Self::to_csv_header();
        for p in points {
            csv.push('\n');
            csv.push_str(&p.to_csv_row());
        }
        csv.push('\n');
        csv
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub run: RunMeta,
    pub plan: BenchmarkPlan,
    pub points: Vec<PointResult>,
    pub charts: Vec<Chart>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_from_samples() {
        let desc = RunDescriptor {
            executable: "omp_busy_wait".into(),
            size: 8192,
            flags: vec!['g'],
            chunk_size: 512,
            x_value: 8,
        };
        let p = PointResult::from_samples(&desc, vec![0.9, 0.2, 0.5, 0.3, 0.4], 3);
        assert_eq!(p.kept, vec![0.2, 0.3, 0.4]);
        assert_eq!(p.samples.len(), 5);
        assert_eq!(p.median_s, 0.4);
        assert!((p.best.mean - 0.3).abs() < 1e-12);
        assert_eq!(p.argv, vec!["8192", "g", "512", "8"]);
    }

    #[test]
    fn test_timestamp_is_rfc3339_utc() {
        let stamp = now_utc_rfc3339();
        let parsed = chrono::DateTime::parse_from_rfc3339(&stamp).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 0);
        assert!(stamp.ends_with('Z'));
    }

    #[test]
    fn test_csv_layout() {
        let desc = RunDescriptor {
            executable: "sequential".into(),
            size: 64,
            flags: vec![],
            chunk_size: 4,
            x_value: 2,
        };
        let p = PointResult::from_samples(&desc, vec![1.0, 2.0], 1);
        let csv = PointResult::to_csv(&[p]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(PointResult::to_csv_header().as_str()));
        let row = lines.next().unwrap();
        assert!(row.starts_with("sequential,64,4,2,2,1,1.000000000,"));
        assert_eq!(lines.next(), None);
    }
}
