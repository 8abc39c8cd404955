//! Progress events emitted while the pipeline runs.
//!
//! The pipeline announces each stage before it starts, reports its elapsed time when it
//! finishes, and reports failures explicitly. A host decides how to show them: the binary draws
//! a progress bar, [`LogProgress`] writes log events.

use std::time::Duration;
use tracing::{error, info};

#[derive(Clone, Debug, PartialEq)]
/// Elapsed time of one completed stage.
pub struct StepTiming {
    /// Stage name.
    pub name: String,
    /// Wall-clock time the stage took.
    pub elapsed: Duration,
}

/// Receives stage lifecycle events. All methods default to doing nothing.
pub trait ProgressReporter {
    /// `stage` is about to run; `percent` is the share of stages completed before it.
    fn stage_started(&self, _stage: &str, _percent: f64, _history: &[StepTiming]) {}

    /// `stage` finished; `history` includes it as its last element.
    fn stage_finished(&self, _stage: &str, _percent: f64, _history: &[StepTiming]) {}

    /// `stage` failed with `reason`; later stages will not run.
    fn stage_failed(&self, _stage: &str, _reason: &str) {}
}

/// Reporter that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// Reporter that writes each event to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn stage_started(&self, stage: &str, percent: f64, _history: &[StepTiming]) {
        info!(stage, percent = format!("{percent:.1}"), "stage started");
    }

    fn stage_finished(&self, stage: &str, percent: f64, history: &[StepTiming]) {
        let elapsed = history.last().map_or(0.0, |t| t.elapsed.as_secs_f64());
        info!(
            stage,
            percent = format!("{percent:.1}"),
            elapsed = format!("{elapsed:.2}s"),
            "stage finished"
        );
    }

    fn stage_failed(&self, stage: &str, reason: &str) {
        error!(stage, reason, "stage failed");
    }
}
