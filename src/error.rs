//! Error types for plan loading and plan execution.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for plan loading.
pub type Result<T> = std::result::Result<T, MalformedPlanError>;

/// A plan that can not be loaded because it violates the plan's structure.
#[derive(Debug, Error)]
pub enum MalformedPlanError {
    /// Failed to read the plan file.
    #[error("failed to read plan file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The literal notation could not be tokenized or parsed.
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// The record (JSON) form could not be decoded.
    #[error("failed to decode plan record: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level value is not a sequence of exactly seven elements.
    #[error("plan must have exactly 7 positional elements, found {found}")]
    Arity { found: usize },

    /// A positional element has the wrong kind of value.
    #[error("{field} (position {position}) must be {expected}")]
    WrongType {
        field: &'static str,
        position: usize,
        expected: &'static str,
    },

    /// A label mapping does not contain exactly one key.
    #[error("{field} (position {position}) must map exactly one label, found {keys} keys")]
    MappingArity {
        field: &'static str,
        position: usize,
        keys: usize,
    },

    /// A sequence that drives the run matrix is empty.
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    /// The repetition pair is not `[k, repetitions]`.
    #[error("repetitions must be a pair of non-negative integers [k, repetitions]")]
    Repetitions,

    /// More best samples requested than runs performed.
    #[error("cannot keep {keep_best} best samples out of {runs} runs")]
    KeepExceedsRuns { keep_best: u32, runs: u32 },

    /// Keeping zero samples leaves nothing to report.
    #[error("k must be at least 1")]
    ZeroKeep,

    /// An executable is named more than once.
    #[error("executable '{0}' is listed more than once")]
    DuplicateExecutable(String),

    /// A lazy range with step zero never terminates.
    #[error("range step must not be zero")]
    ZeroStep,

    /// A range expands to more values than an axis may hold.
    #[error("range expands to {count} values, at most {max} are allowed")]
    AxisTooLong { count: u128, max: usize },

    /// A flag is not a single character.
    #[error("flag '{0}' must be a single character")]
    Flag(String),
}

impl MalformedPlanError {
    pub(crate) fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    pub(crate) fn wrong_type(field: &'static str, position: usize, expected: &'static str) -> Self {
        Self::WrongType {
            field,
            position,
            expected,
        }
    }
}

/// Failures while executing a plan.
#[derive(Debug, Error)]
pub enum RunError {
    /// The executable could not be started.
    #[error("failed to launch '{}': {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The executable ran but reported failure.
    #[error("'{}' exited with {status}: {stderr}", program.display())]
    Exit {
        program: PathBuf,
        status: String,
        stderr: String,
    },

    /// The executable's output did not end in an elapsed-seconds line.
    #[error("'{}' printed no elapsed time (last line: {line:?})", program.display())]
    Timing { program: PathBuf, line: String },

    /// Reading or writing the checkpoint failed.
    #[error("checkpoint '{}': {source}", path.display())]
    CheckpointIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The checkpoint file is not a valid sample store.
    #[error("checkpoint '{}' is corrupt: {source}", path.display())]
    CheckpointDecode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    /// The sample store could not be encoded.
    #[error("failed to encode checkpoint '{}': {source}", path.display())]
    CheckpointEncode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    /// The checkpoint was recorded for a different plan.
    #[error("checkpoint '{}' belongs to plan {found}, current plan is {expected}", path.display())]
    CheckpointMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// A series needs a point the run did not produce.
    #[error("no result for '{executable}' at size {size}, chunk {chunk_size}, x {x_value}")]
    MissingPoint {
        executable: String,
        size: u64,
        chunk_size: u64,
        x_value: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_exceeds_runs_message() {
        let err = MalformedPlanError::KeepExceedsRuns {
            keep_best: 8,
            runs: 3,
        };
        assert!(err.to_string().contains("8 best"));
        assert!(err.to_string().contains("3 runs"));
    }

    #[test]
    fn test_mapping_arity_message() {
        let err = MalformedPlanError::MappingArity {
            field: "curve groups",
            position: 3,
            keys: 2,
        };
        assert!(err.to_string().contains("curve groups"));
        assert!(err.to_string().contains("found 2 keys"));
    }

    #[test]
    fn test_axis_too_long_message() {
        let err = MalformedPlanError::AxisTooLong {
            count: 2_000_000_000_000,
            max: 65536,
        };
        assert_eq!(
            err.to_string(),
            "range expands to 2000000000000 values, at most 65536 are allowed"
        );
    }

    #[test]
    fn test_checkpoint_encode_is_not_reported_as_corrupt() {
        let err = RunError::CheckpointEncode {
            path: PathBuf::from("run.ckpt"),
            source: Box::new(bincode::ErrorKind::Custom("sequence too long".into())),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("failed to encode checkpoint 'run.ckpt'"));
        assert!(!msg.contains("corrupt"));
    }

    #[test]
    fn test_syntax_message_has_location() {
        let err = MalformedPlanError::syntax(4, 17, "unexpected ']'");
        assert_eq!(
            err.to_string(),
            "syntax error at line 4, column 17: unexpected ']'"
        );
    }
}
