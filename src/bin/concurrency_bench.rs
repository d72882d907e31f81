use clap::{Parser, Subcommand, ValueEnum};
use concurrency_bench::checkpoint::Checkpoint;
use concurrency_bench::expand;
use concurrency_bench::harness::{self, BenchConfig, ProcessLauncher, RunOrder, TimingSource};
use concurrency_bench::logging;
use concurrency_bench::plan::{self, PlanFile};
use concurrency_bench::schema::{self, PointResult, Report, RunMeta};
use concurrency_bench::series;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TimingArg {
    /// Elapsed seconds printed by the workload.
    Reported,
    /// Wall time of the workload process.
    Wall,
}

impl From<TimingArg> for TimingSource {
    fn from(v: TimingArg) -> Self {
        match v {
            TimingArg::Reported => TimingSource::Reported,
            TimingArg::Wall => TimingSource::WallClock,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ExpandFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PlanFormat {
    Literal,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate plan files.
    ///
    /// Directories are scanned recursively for `.tester`, `.plan` and `.json` files.
    Validate {
        #[arg(value_name = "PATH", required = true, num_args = 1..)]
        paths: Vec<PathBuf>,
    },

    /// Print every run descriptor of a plan.
    Expand {
        #[arg(value_name = "PLAN")]
        plan: PathBuf,

        #[arg(long, value_enum, default_value = "text")]
        format: ExpandFormat,
    },

    /// Re-serialize a plan in literal or JSON form.
    Convert {
        #[arg(value_name = "PLAN")]
        plan: PathBuf,

        #[arg(long, value_enum)]
        to: PlanFormat,
    },

    /// Run a plan and write a JSON report with speedup series.
    Run {
        #[arg(value_name = "PLAN")]
        plan: PathBuf,

        /// Directory holding the workload executables.
        #[arg(long, value_name = "DIR", default_value = ".")]
        bin_dir: PathBuf,

        #[arg(long, value_enum, default_value = "reported")]
        timing: TimingArg,

        /// Visit run points in a seeded random order instead of plan order.
        #[arg(long, value_name = "SEED")]
        shuffle_seed: Option<u64>,

        /// Sample store; completed points found here are not run again.
        #[arg(long, value_name = "FILE")]
        checkpoint: Option<PathBuf>,

        /// Also write per-point results as CSV.
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "concurrency-bench")]
#[command(about = "Benchmark plan loader and speedup runner")]
struct Args {
    /// Tracing filter, e.g. `info` or `debug`.
    #[arg(long, default_value = logging::DEFAULT_FILTER, global = true)]
    log_level: String,

    /// Where to write command output. If omitted, prints to stdout.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

fn git_sha_short() -> Option<String> {
    std::env::var("GIT_SHA")
        .ok()
        .or_else(|| std::env::var("GITHUB_SHA").ok())
        .map(|s| s.chars().take(12).collect())
}

fn emit(out: Option<&Path>, text: &str) -> io::Result<()> {
    match out {
        Some(path) => fs::write(path, text),
        None => {
            print!("{text}");
            if !text.ends_with('\n') {
                println!();
            }
            Ok(())
        }
    }
}

fn open_plan(path: &Path) -> io::Result<PlanFile> {
    let file = PlanFile::open(path).map_err(io::Error::other)?;
    info!(
        path = %path.display(),
        runs = expand::count(&file.plan),
        "plan loaded"
    );
    Ok(file)
}

fn validate(paths: &[PathBuf], out: Option<&Path>) -> io::Result<()> {
    let mut files = Vec::new();
    for path in paths {
        files.extend(plan::collect_plan_files(path)?);
    }
    if files.is_empty() {
        return Err(io::Error::new(io::ErrorKind::NotFound, "no plan files found"));
    }

    let outcomes: Vec<(PathBuf, Result<usize, String>)> = files
        .par_iter()
        .map(|path| {
            let outcome = PlanFile::open(path)
                .map(|file| expand::count(&file.plan))
                .map_err(|e| e.to_string());
            (path.clone(), outcome)
        })
        .collect();

    let mut text = String::new();
    let mut failed = 0usize;
    for (path, outcome) in &outcomes {
        match outcome {
            Ok(runs) => text.push_str(&format!("ok     {} ({} run points)\n", path.display(), runs)),
            Err(msg) => {
                failed += 1;
                error!(path = %path.display(), "{msg}");
                text.push_str(&format!("error  {}: {}\n", path.display(), msg));
            }
        }
    }
    emit(out, &text)?;

    if failed > 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{failed} of {} plans are malformed", outcomes.len()),
        ));
    }
    Ok(())
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    logging::init_logging(&args.log_level)?;
    let out = args.out.as_deref();

    match &args.cmd {
        Command::Validate { paths } => validate(paths, out)?,
        Command::Expand { plan, format } => {
            let file = open_plan(plan)?;
            let descriptors = expand::descriptors(&file.plan);
            let text = match format {
                ExpandFormat::Json => serde_json::to_string_pretty(&descriptors).map_err(io::Error::other)?,
                ExpandFormat::Text => {
                    let mut text = String::new();
                    for d in &descriptors {
                        text.push_str(&d.executable);
                        for arg in d.argv() {
                            text.push(' ');
                            text.push_str(&arg);
                        }
                        text.push('\n');
                    }
                    text
                }
            };
            emit(out, &text)?;
        }
        Command::Convert { plan, to } => {
            let file = open_plan(plan)?;
            let text = match to {
                PlanFormat::Literal => file.plan.to_literal_string(),
                PlanFormat::Json => file.plan.to_json().map_err(io::Error::other)?,
            };
            emit(out, &text)?;
        }
        Command::Run {
            plan,
            bin_dir,
            timing,
            shuffle_seed,
            checkpoint,
            csv,
        } => {
            let file = open_plan(plan)?;
            let plan_sha256 = file.sha256();
            let cfg = BenchConfig {
                bin_dir: bin_dir.clone(),
                timing: (*timing).into(),
                order: match shuffle_seed {
                    Some(seed) => RunOrder::Shuffled { seed: *seed },
                    None => RunOrder::Listed,
                },
            };

            let mut ckpt = match checkpoint {
                Some(path) => Some(Checkpoint::open(path, &plan_sha256).map_err(io::Error::other)?),
                None => None,
            };

            let mut launcher = ProcessLauncher::new(&cfg);
            let points = harness::run_plan(&file.plan, &cfg, &mut launcher, ckpt.as_mut())
                .map_err(io::Error::other)?;
            let charts = series::build(&file.plan, &points).map_err(io::Error::other)?;

            if let Some(csv_path) = csv {
                fs::write(csv_path, PointResult::to_csv(&points))?;
                info!(path = %csv_path.display(), "csv written");
            }

            let report = Report {
                run: RunMeta {
                    schema_version: 1,
                    bench_version: env!("CARGO_PKG_VERSION").to_string(),
                    plan_path: file.path.display().to_string(),
                    plan_sha256,
                    timing: cfg.timing.as_str().to_string(),
                    order: cfg.order.describe(),
                    timestamp_utc: schema::now_utc_rfc3339(),
                    git_sha: git_sha_short(),
                },
                plan: file.plan,
                points,
                charts,
            };

            let json = serde_json::to_string_pretty(&report).map_err(io::Error::other)?;
            emit(out, &json)?;
        }
    }

    Ok(())
}
