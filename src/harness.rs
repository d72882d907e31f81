use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use rand::seq::SliceRandom;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::checkpoint::Checkpoint;
use crate::error::RunError;
use crate::expand::{self, RunDescriptor};
use crate::plan::BenchmarkPlan;
use crate::schema::PointResult;

/// Where the elapsed time of one run comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimingSource {
    /// Last non-empty stdout line, in seconds.
    #[default]
    Reported,
    /// Wall time of the whole process.
    WallClock,
}

impl TimingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimingSource::Reported => "reported",
            TimingSource::WallClock => "wall",
        }
    }
}

/// Order in which run points are visited. Repetitions of a point always run back to back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunOrder {
    #[default]
    Listed,
    Shuffled { seed: u64 },
}

impl RunOrder {
    pub fn describe(&self) -> String {
        match self {
            RunOrder::Listed => "listed".to_string(),
            RunOrder::Shuffled { seed } => format!("shuffled:{seed}"),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BenchConfig {
    pub bin_dir: PathBuf,
    pub timing: TimingSource,
    pub order: RunOrder,
}

impl BenchConfig {
    /// Indices into the descriptor list in visiting order.
    pub fn visit_order(&self, len: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        if let RunOrder::Shuffled { seed } = self.order {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            order.shuffle(&mut rng);
        }
        order
    }
}

/// Runs one sample of a run point and returns its elapsed seconds.
pub trait Launcher {
    fn launch(&mut self, desc: &RunDescriptor) -> Result<f64, RunError>;
}

/// Launches `<bin_dir>/<executable> <argv>` as a child process.
#[derive(Clone, Debug)]
pub struct ProcessLauncher {
    bin_dir: PathBuf,
    timing: TimingSource,
}

impl ProcessLauncher {
    pub fn new(cfg: &BenchConfig) -> Self {
        Self {
            bin_dir: cfg.bin_dir.clone(),
            timing: cfg.timing,
        }
    }

    fn program(&self, executable: &str) -> PathBuf {
        let path = Path::new(executable);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.bin_dir.join(path)
        }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&mut self, desc: &RunDescriptor) -> Result<f64, RunError> {
        let program = self.program(&desc.executable);
        let argv = desc.argv();

        let start = Instant::now();
        let output = Command::new(&program)
            .args(&argv)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| RunError::Spawn {
                program: program.clone(),
                source,
            })?;
        let wall = start.elapsed().as_secs_f64();

        if !output.status.success() {
            return Err(RunError::Exit {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let seconds = match self.timing {
            TimingSource::WallClock => wall,
            TimingSource::Reported => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                parse_elapsed(&stdout).ok_or_else(|| RunError::Timing {
                    program: program.clone(),
                    line: last_line(&stdout).unwrap_or_default().to_string(),
                })?
            }
        };
        debug!(program = %program.display(), ?argv, seconds, "sample");
        Ok(seconds)
    }
}

fn last_line(stdout: &str) -> Option<&str> {
    stdout.lines().map(str::trim).rev().find(|l| !l.is_empty())
}

/// Elapsed seconds printed as the last non-empty line of a workload's output.
pub fn parse_elapsed(stdout: &str) -> Option<f64> {
    last_line(stdout)?
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
}

/// Run every point of the plan `runs` times and keep the `k` best samples.
///
/// Results come back in plan order whatever the visiting order was. Points
/// already present in the checkpoint are not launched again.
pub fn run_plan(
    plan: &BenchmarkPlan,
    cfg: &BenchConfig,
    launcher: &mut dyn Launcher,
    mut checkpoint: Option<&mut Checkpoint>,
) -> Result<Vec<PointResult>, RunError> {
    let descriptors = expand::descriptors(plan);
    let runs = plan.repetitions.runs as usize;
    let keep_best = plan.repetitions.keep_best as usize;

    info!(
        points = descriptors.len(),
        runs,
        keep_best,
        order = %cfg.order.describe(),
        "running plan"
    );

    let mut results: Vec<Option<PointResult>> = vec![None; descriptors.len()];
    let mut launched = 0usize;
    for idx in cfg.visit_order(descriptors.len()) {
        let desc = &descriptors[idx];
        let key = desc.key();

        let cached: Option<Vec<f64>> = checkpoint
            .as_deref()
            .and_then(|c| c.samples(&key))
            .filter(|s| s.len() >= runs)
            .map(<[f64]>::to_vec);

        let samples = match cached {
            Some(samples) => {
                debug!(executable = %desc.executable, ?key, "reusing checkpointed samples");
                samples
            }
            None => {
                let mut samples = Vec::with_capacity(runs);
                for _ in 0..runs {
                    samples.push(launcher.launch(desc)?);
                }
                launched += 1;
                if let Some(ckpt) = checkpoint.as_deref_mut() {
                    ckpt.record(key, samples.clone())?;
                }
                samples
            }
        };

        let point = PointResult::from_samples(desc, samples, keep_best);
        info!(
            executable = %point.executable,
            size = point.size,
            chunk_size = point.chunk_size,
            x_value = point.x_value,
            best_mean_s = point.best.mean,
            "point done"
        );
        results[idx] = Some(point);
    }

    info!(launched, "plan finished");
    Ok(results.into_iter().flatten().collect())
}
