//! Sample store for resuming interrupted runs.
//!
//! The raw samples of every completed run point are kept in a bincode file
//! together with the SHA-256 of the plan they belong to. The file is
//! rewritten atomically after each point, so a crash loses at most the point
//! that was in flight.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::RunError;
use crate::expand::PointKey;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct State {
    plan_sha256: String,
    points: BTreeMap<PointKey, Vec<f64>>,
}

/// Completed samples keyed by run point.
#[derive(Debug)]
pub struct Checkpoint {
    path: PathBuf,
    state: State,
}

impl Checkpoint {
    /// Open the checkpoint at `path`, or start an empty one if it does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P, plan_sha256: &str) -> Result<Self, RunError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Ok(Self {
                path,
                state: State {
                    plan_sha256: plan_sha256.to_string(),
                    points: BTreeMap::new(),
                },
            });
        }

        let bytes = fs::read(&path).map_err(|source| RunError::CheckpointIo {
            path: path.clone(),
            source,
        })?;
        let state: State = bincode::deserialize(&bytes).map_err(|source| RunError::CheckpointDecode {
            path: path.clone(),
            source,
        })?;
        if state.plan_sha256 != plan_sha256 {
            return Err(RunError::CheckpointMismatch {
                path,
                expected: plan_sha256.to_string(),
                found: state.plan_sha256,
            });
        }
        if !state.points.is_empty() {
            warn!(
                path = %path.display(),
                points = state.points.len(),
                "resuming from checkpoint"
            );
        }
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.state.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.points.is_empty()
    }

    pub fn samples(&self, key: &PointKey) -> Option<&[f64]> {
        self.state.points.get(key).map(Vec::as_slice)
    }

    /// Store the samples of one point and persist the checkpoint.
    pub fn record(&mut self, key: PointKey, samples: Vec<f64>) -> Result<(), RunError> {
        self.state.points.insert(key, samples);
        self.save()
    }

    fn save(&self) -> Result<(), RunError> {
        let io_err = |source| RunError::CheckpointIo {
            path: self.path.clone(),
            source,
        };
        let bytes = bincode::serialize(&self.state).map_err(|source| RunError::CheckpointEncode {
            path: self.path.clone(),
            source,
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key(x: i64) -> PointKey {
        PointKey {
            executable: "omp_mutex".into(),
            size: 8192,
            chunk_size: 128,
            x_value: x,
        }
    }

    #[test]
    fn test_record_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("samples.ckpt");

        let mut ckpt = Checkpoint::open(&path, "abc").unwrap();
        assert!(ckpt.is_empty());
        ckpt.record(key(2), vec![0.5, 0.4]).unwrap();
        ckpt.record(key(4), vec![0.3]).unwrap();

        let reopened = Checkpoint::open(&path, "abc").unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.samples(&key(2)), Some(&[0.5, 0.4][..]));
        assert_eq!(reopened.samples(&key(6)), None);
    }

    #[test]
    fn test_plan_mismatch_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("samples.ckpt");
        let mut ckpt = Checkpoint::open(&path, "abc").unwrap();
        ckpt.record(key(2), vec![1.0]).unwrap();

        assert!(matches!(
            Checkpoint::open(&path, "def"),
            Err(RunError::CheckpointMismatch { .. })
        ));
    }

    #[test]
    fn test_corrupt_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("samples.ckpt");
        fs::write(&path, b"\x01\x02").unwrap();
        assert!(matches!(
            Checkpoint::open(&path, "abc"),
            Err(RunError::CheckpointDecode { .. })
        ));
    }
}
