//! Per-artifact stage records that drive resume decisions.
//!
//! Every artifact `X` produced by the pipeline has a record at `X.status` saying whether the
//! stage that produces it is pending, done, or failed, together with a digest of the inputs it
//! was computed from. Resume is decided from the record rather than from the mere presence of
//! the artifact:
//!
//! ```text
//! (no record) --run--> Pending --ok--> Done
//!                         |
//!                         +--err--> Failed --rerun--> Pending
//! ```
//!
//! A `Done` record whose digest still matches the current inputs is skipped, and its artifact is
//! left byte-for-byte untouched. An artifact with no record at all was produced by an older run;
//! it is adopted as `Done` rather than regenerated.

use crate::artifact;
use crate::error::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Lifecycle of one stage for one artifact.
pub enum StageState {
    /// Started but not finished; a crash leaves the record here.
    Pending,
    /// Finished; the artifact reflects the recorded inputs.
    Done,
    /// Finished with an error; the next run retries.
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// Persisted status of a stage for one artifact.
pub struct StageRecord {
    /// Stage name, e.g. `recompose`.
    pub stage: String,
    /// Current state.
    pub state: StageState,
    /// SHA-256 of the inputs the artifact was (or is being) computed from.
    pub input_digest: String,
    /// RFC 3339 timestamp of the last state change.
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Failure description for `Failed` records.
    pub error: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// What happened when a stage was asked to run.
pub enum StageOutcome {
    /// The artifact was up to date and left untouched.
    Skipped,
    /// The stage ran and its artifact was written.
    Completed,
}

#[must_use]
/// Path of the status record belonging to `artifact`.
pub fn record_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_os_string();
    name.push(".status");
    PathBuf::from(name)
}

/// Read the status record of `artifact`, if there is a readable one.
#[must_use]
pub fn read_record(artifact: &Path) -> Option<StageRecord> {
    let path = record_path(artifact);
    if !path.exists() {
        return None;
    }
    match artifact::read_json(&path) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable stage record, treating as pending");
            None
        }
    }
}

fn write_record(
    artifact: &Path,
    stage: &str,
    state: StageState,
    digest: &str,
    error: Option<String>,
) -> Result<()> {
    let record = StageRecord {
        stage: stage.to_string(),
        state,
        input_digest: digest.to_string(),
        updated_at: Utc::now().to_rfc3339(),
        error,
    };
    artifact::write_json(&record_path(artifact), &record)
}

/// Run `produce` unless `artifact` is already up to date for `digest`.
///
/// `produce` must write `artifact` itself. Its error is recorded and returned as
/// [`Error::StageFailed`].
///
/// # Errors
///
/// Returns an error if `produce` fails or the status record cannot be written.
pub fn run_stage<F>(stage: &str, artifact: &Path, digest: &str, produce: F) -> Result<StageOutcome>
where
    F: FnOnce() -> Result<()>,
{
    let exists = artifact.exists();
    match read_record(artifact) {
        Some(record) if exists && record.state == StageState::Done && record.input_digest == digest => {
            debug!(stage, artifact = %artifact.display(), "up to date, skipping");
            return Ok(StageOutcome::Skipped);
        }
        Some(record) if record.state == StageState::Done => {
            info!(stage, artifact = %artifact.display(), "artifact missing or inputs changed, regenerating");
        }
        Some(_) => {}
        None if exists => {
            info!(stage, artifact = %artifact.display(), "adopting artifact from an earlier run");
            write_record(artifact, stage, StageState::Done, digest, None)?;
            return Ok(StageOutcome::Skipped);
        }
        None => {}
    }

    write_record(artifact, stage, StageState::Pending, digest, None)?;
    match produce() {
        Ok(()) => {
            write_record(artifact, stage, StageState::Done, digest, None)?;
            Ok(StageOutcome::Completed)
        }
        Err(e) => {
            let reason = e.to_string();
            write_record(artifact, stage, StageState::Failed, digest, Some(reason.clone()))?;
            Err(Error::StageFailed {
                stage: stage.to_string(),
                reason,
            })
        }
    }
}

/// Incremental SHA-256 over the inputs of a stage.
#[derive(Clone, Default)]
pub struct InputDigest {
    hasher: Sha256,
}

impl InputDigest {
    #[must_use]
    /// Empty digest.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    /// Mix in a labelled string (settings, prompt versions, title lists).
    pub fn text(mut self, label: &str, value: &str) -> Self {
        self.hasher.update(label.as_bytes());
        self.hasher.update([0u8]);
        self.hasher.update(value.as_bytes());
        self.hasher.update([0u8]);
        self
    }

    /// Mix in a file's name and contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn file(mut self, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.hasher.update(name.as_bytes());
        self.hasher.update([0u8]);
        self.hasher.update(&bytes);
        self.hasher.update([0u8]);
        Ok(self)
    }

    /// Mix in several files in the given order.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be read.
    pub fn files<'p>(self, paths: impl IntoIterator<Item = &'p PathBuf>) -> Result<Self> {
        paths.into_iter().try_fold(self, |digest, path| digest.file(path))
    }

    #[must_use]
    /// Lowercase hex of the digest.
    pub fn finish(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

#[cfg(test)]
#[path = "tests/stage.rs"]
mod tests;
