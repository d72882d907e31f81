//! The benchmark plan: what to run, how often, and how to label the results.
//!
//! A plan is authored either in the positional literal notation (see
//! [`crate::literal`]) or as a JSON record. Both forms load into the same
//! [`BenchmarkPlan`] and pass through the same validation.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{MalformedPlanError, Result};
use crate::literal::{self, Literal};

const POS_EXECUTABLES: usize = 0;
const POS_SIZES: usize = 1;
const POS_FLAGS: usize = 2;
const POS_CURVES: usize = 3;
const POS_X_AXIS: usize = 4;
const POS_Y_LABEL: usize = 5;
const POS_REPETITIONS: usize = 6;

/// Number of positional elements in the literal notation.
pub const PLAN_ARITY: usize = 7;

/// Largest number of values a range domain may expand to.
pub const MAX_AXIS_POINTS: usize = 1 << 16;

/// A labelled, ordered list of values (one legend entry per value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis<T> {
    pub label: String,
    pub values: Vec<T>,
}

/// Authored form of an integer domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Domain {
    /// Explicit values in order.
    Values(Vec<i64>),
    /// Arithmetic sequence from `start` up to (excluding) `stop`.
    Range {
        start: i64,
        stop: i64,
        #[serde(default = "default_step")]
        step: i64,
    },
}

fn default_step() -> i64 {
    1
}

/// Number of values in `range(start, stop, step)`; `step` is non-zero.
fn range_len(start: i64, stop: i64, step: i64) -> u128 {
    let (span, step) = if step > 0 {
        (i128::from(stop) - i128::from(start), i128::from(step))
    } else {
        (i128::from(start) - i128::from(stop), -i128::from(step))
    };
    if span <= 0 {
        0
    } else {
        ((span + step - 1) / step) as u128
    }
}

impl Domain {
    /// Materialize the domain into concrete values.
    pub fn expand(&self) -> Result<Vec<i64>> {
        match *self {
            Domain::Values(ref values) => Ok(values.clone()),
            Domain::Range { start, stop, step } => {
                if step == 0 {
                    return Err(MalformedPlanError::ZeroStep);
                }
                let len = range_len(start, stop, step);
                if len > MAX_AXIS_POINTS as u128 {
                    return Err(MalformedPlanError::AxisTooLong {
                        count: len,
                        max: MAX_AXIS_POINTS,
                    });
                }
                let out = (0..len as i128)
                    .map(|i| (i128::from(start) + i * i128::from(step)) as i64)
                    .collect();
                Ok(out)
            }
        }
    }

    fn to_literal(&self) -> Literal {
        match self {
            Domain::Values(values) => Literal::List(values.iter().copied().map(Literal::Int).collect()),
            Domain::Range { start, stop, step } => Literal::Range {
                start: *start,
                stop: *stop,
                step: *step,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct XAxisRecord {
    label: String,
    values: Domain,
}

/// The x axis keeps its authored domain next to the expanded values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "XAxisRecord", into = "XAxisRecord")]
pub struct XAxis {
    label: String,
    domain: Domain,
    values: Vec<i64>,
}

impl XAxis {
    pub fn new(label: impl Into<String>, domain: Domain) -> Result<Self> {
        let values = domain.expand()?;
        Ok(Self {
            label: label.into(),
            domain,
            values,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Expanded values, in order.
    pub fn values(&self) -> &[i64] {
        &self.values
    }
}

impl TryFrom<XAxisRecord> for XAxis {
    type Error = MalformedPlanError;

    fn try_from(record: XAxisRecord) -> Result<Self> {
        XAxis::new(record.label, record.values)
    }
}

impl From<XAxis> for XAxisRecord {
    fn from(axis: XAxis) -> Self {
        XAxisRecord {
            label: axis.label,
            values: axis.domain,
        }
    }
}

/// `[k, repetitions]`: keep the `keep_best` fastest of `runs` samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repetitions {
    pub keep_best: u32,
    pub runs: u32,
}

/// A fully loaded and validated benchmark plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkPlan {
    /// Programs to benchmark, run in this order. The first one is the speedup baseline.
    pub executables: Vec<String>,
    /// Problem sizes applied to every executable.
    pub sizes: Vec<u64>,
    /// Flags forwarded verbatim to every run.
    pub flags: Vec<char>,
    /// Curve family: one curve per chunk size.
    pub curves: Axis<u64>,
    pub x_axis: XAxis,
    pub y_label: String,
    pub repetitions: Repetitions,
}

impl BenchmarkPlan {
    /// Parse and validate the literal notation.
    pub fn parse_literal(src: &str) -> Result<Self> {
        Self::from_literal(&literal::parse(src)?)
    }

    /// Decode and validate the JSON record form.
    pub fn from_json(src: &str) -> Result<Self> {
        let plan: BenchmarkPlan = serde_json::from_str(src)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Load a plan file; `.json` files use the record form, anything else the literal notation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        PlanFile::open(path).map(|file| file.plan)
    }

    /// Map the seven positional elements of a parsed literal.
    pub fn from_literal(lit: &Literal) -> Result<Self> {
        let items = match lit {
            Literal::List(items) => items,
            _ => return Err(MalformedPlanError::wrong_type("plan", 0, "a list")),
        };
        if items.len() != PLAN_ARITY {
            return Err(MalformedPlanError::Arity { found: items.len() });
        }

        let executables = strings(&items[POS_EXECUTABLES], "executables", POS_EXECUTABLES)?;
        let sizes = positive_ints(&items[POS_SIZES], "sizes", POS_SIZES)?;

        let flags = strings(&items[POS_FLAGS], "flags", POS_FLAGS)?
            .into_iter()
            .map(|flag| {
                let mut chars = flag.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(MalformedPlanError::Flag(flag)),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let (curve_label, curve_values) = single_entry(&items[POS_CURVES], "curve groups", POS_CURVES)?;
        let curves = Axis {
            label: curve_label,
            values: positive_ints(curve_values, "curve groups", POS_CURVES)?,
        };

        let (x_label, x_values) = single_entry(&items[POS_X_AXIS], "x axis", POS_X_AXIS)?;
        let domain = match x_values {
            Literal::Range { start, stop, step } => Domain::Range {
                start: *start,
                stop: *stop,
                step: *step,
            },
            Literal::List(values) => Domain::Values(
                values
                    .iter()
                    .map(|v| {
                        v.as_int().ok_or_else(|| {
                            MalformedPlanError::wrong_type("x axis", POS_X_AXIS, "a list of integers or a range")
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            _ => {
                return Err(MalformedPlanError::wrong_type(
                    "x axis",
                    POS_X_AXIS,
                    "a list of integers or a range",
                ))
            }
        };
        let x_axis = XAxis::new(x_label, domain)?;

        let y_label = items[POS_Y_LABEL]
            .as_str()
            .ok_or_else(|| MalformedPlanError::wrong_type("y label", POS_Y_LABEL, "a string"))?
            .to_string();

        let repetitions = match &items[POS_REPETITIONS] {
            Literal::List(pair) => match pair.as_slice() {
                [Literal::Int(k), Literal::Int(runs)] => Repetitions {
                    keep_best: u32::try_from(*k).map_err(|_| MalformedPlanError::Repetitions)?,
                    runs: u32::try_from(*runs).map_err(|_| MalformedPlanError::Repetitions)?,
                },
                _ => return Err(MalformedPlanError::Repetitions),
            },
            _ => return Err(MalformedPlanError::Repetitions),
        };

        let plan = BenchmarkPlan {
            executables,
            sizes,
            flags,
            curves,
            x_axis,
            y_label,
            repetitions,
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Check every structural invariant of the plan.
    pub fn validate(&self) -> Result<()> {
        if self.executables.is_empty() {
            return Err(MalformedPlanError::Empty {
                field: "executables",
            });
        }
        let mut seen = HashSet::new();
        for exe in &self.executables {
            if exe.is_empty() {
                return Err(MalformedPlanError::wrong_type(
                    "executables",
                    POS_EXECUTABLES,
                    "a list of non-empty strings",
                ));
            }
            if !seen.insert(exe.as_str()) {
                return Err(MalformedPlanError::DuplicateExecutable(exe.clone()));
            }
        }

        if self.sizes.is_empty() {
            return Err(MalformedPlanError::Empty { field: "sizes" });
        }
        check_positive(&self.sizes, "sizes", POS_SIZES)?;

        if self.curves.values.is_empty() {
            return Err(MalformedPlanError::Empty {
                field: "curve groups",
            });
        }
        check_positive(&self.curves.values, "curve groups", POS_CURVES)?;

        if self.x_axis.values.is_empty() {
            return Err(MalformedPlanError::Empty { field: "x axis" });
        }

        let Repetitions { keep_best, runs } = self.repetitions;
        if keep_best > runs {
            return Err(MalformedPlanError::KeepExceedsRuns { keep_best, runs });
        }
        if keep_best == 0 {
            return Err(MalformedPlanError::ZeroKeep);
        }
        Ok(())
    }

    /// Positional literal form of this plan. Lazy ranges stay lazy.
    pub fn to_literal(&self) -> Literal {
        let ints = |values: &[u64]| Literal::List(values.iter().map(|&v| Literal::Int(v as i64)).collect());
        Literal::List(vec![
            Literal::List(self.executables.iter().cloned().map(Literal::Str).collect()),
            ints(&self.sizes),
            Literal::List(self.flags.iter().map(|c| Literal::Str(c.to_string())).collect()),
            Literal::Map(vec![(Literal::Str(self.curves.label.clone()), ints(&self.curves.values))]),
            Literal::Map(vec![(
                Literal::Str(self.x_axis.label.clone()),
                self.x_axis.domain.to_literal(),
            )]),
            Literal::Str(self.y_label.clone()),
            Literal::List(vec![
                Literal::Int(i64::from(self.repetitions.keep_best)),
                Literal::Int(i64::from(self.repetitions.runs)),
            ]),
        ])
    }

    /// Literal notation with one positional element per line.
    pub fn to_literal_string(&self) -> String {
        self.to_literal().to_pretty_string()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Label for the curve of one chunk size, e.g. `Chunk size = 128`.
    pub fn curve_label(&self, chunk_size: u64) -> String {
        format!("{}{}", self.curves.label, chunk_size)
    }

    /// The executable every other one is compared against. `None` only for a
    /// plan that was assembled by hand and never validated.
    pub fn baseline(&self) -> Option<&str> {
        self.executables.first().map(String::as_str)
    }
}

/// A plan together with the file it was read from.
#[derive(Debug, Clone)]
pub struct PlanFile {
    pub path: PathBuf,
    pub source: String,
    pub plan: BenchmarkPlan,
}

impl PlanFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| MalformedPlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let plan = if is_json(path) {
            BenchmarkPlan::from_json(&source)?
        } else {
            BenchmarkPlan::parse_literal(&source)?
        };
        Ok(Self {
            path: path.to_path_buf(),
            source,
            plan,
        })
    }

    /// Hex SHA-256 of the plan file contents.
    pub fn sha256(&self) -> String {
        sha256_hex(self.source.as_bytes())
    }
}

/// Extensions picked up when a directory of plans is scanned.
pub const PLAN_EXTENSIONS: &[&str] = &["tester", "plan", "json"];

/// Plan files under `root`, sorted. A file path is returned as is.
pub fn collect_plan_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    if root.is_file() {
        out.push(root.to_path_buf());
        return Ok(out);
    }

    for entry in walkdir::WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        let is_plan = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| PLAN_EXTENSIONS.contains(&ext));
        if entry.file_type().is_file() && is_plan {
            out.push(entry.path().to_path_buf());
        }
    }
    out.sort();
    Ok(out)
}

/// Whether `path` holds the JSON record form.
pub fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest: [u8; 32] = Sha256::digest(bytes).into();
    let mut s = String::with_capacity(64);
    for b in digest {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

fn strings(lit: &Literal, field: &'static str, position: usize) -> Result<Vec<String>> {
    let expected = "a list of strings";
    match lit {
        Literal::List(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| MalformedPlanError::wrong_type(field, position, expected))
            })
            .collect(),
        _ => Err(MalformedPlanError::wrong_type(field, position, expected)),
    }
}

fn positive_ints(lit: &Literal, field: &'static str, position: usize) -> Result<Vec<u64>> {
    let expected = "a list of positive integers";
    match lit {
        Literal::List(items) => items
            .iter()
            .map(|item| match item {
                Literal::Int(v) if *v > 0 => Ok(*v as u64),
                _ => Err(MalformedPlanError::wrong_type(field, position, expected)),
            })
            .collect(),
        _ => Err(MalformedPlanError::wrong_type(field, position, expected)),
    }
}

fn check_positive(values: &[u64], field: &'static str, position: usize) -> Result<()> {
    if values.iter().any(|&v| v == 0 || v > i64::MAX as u64) {
        return Err(MalformedPlanError::wrong_type(
            field,
            position,
            "a list of positive integers",
        ));
    }
    Ok(())
}

/// The single `label : values` entry of a label mapping.
fn single_entry<'a>(lit: &'a Literal, field: &'static str, position: usize) -> Result<(String, &'a Literal)> {
    let entries = match lit {
        Literal::Map(entries) => entries,
        _ => return Err(MalformedPlanError::wrong_type(field, position, "a mapping")),
    };
    match entries.as_slice() {
        [(Literal::Str(label), values)] => Ok((label.clone(), values)),
        [_] => Err(MalformedPlanError::wrong_type(field, position, "a mapping with a string label")),
        _ => Err(MalformedPlanError::MappingArity {
            field,
            position,
            keys: entries.len(),
        }),
    }
}
