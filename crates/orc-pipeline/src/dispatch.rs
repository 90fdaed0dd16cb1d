// dispatch.rs — Structured outcome of a dispatched implementation task.
//
// Auto-advance out of Dispatching needs to know whether the sub-task
// succeeded. Hosts that know the answer report it explicitly. Hosts that only
// hand back the task's text get a conservative classification: a failure is
// recognized only when a line *starts* with one of a few explicit markers, so
// prose that merely mentions an error does not hold the pipeline back.

use serde::{Deserialize, Serialize};

/// Line prefixes that mark a dispatched task as failed.
const FAILURE_MARKERS: &[&str] = &[
    "ERROR:",
    "FATAL:",
    "TASK FAILED",
    "Task failed",
    "Implementation failed",
];

/// What a completed dispatch reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Succeeded,
    Failed {
        /// The line or message that identified the failure.
        diagnostic: String,
    },
}

impl DispatchOutcome {
    /// Classify a dispatch from its textual output alone.
    pub fn from_output(output: &str) -> Self {
        output
            .lines()
            .map(str::trim_start)
            .find(|line| FAILURE_MARKERS.iter().any(|m| line.starts_with(m)))
            .map(|line| DispatchOutcome::Failed {
                diagnostic: line.to_string(),
            })
            .unwrap_or(DispatchOutcome::Succeeded)
    }

    /// Prefer an explicit discriminant; fall back to scanning `output`.
    pub fn resolve(explicit: Option<DispatchOutcome>, output: Option<&str>) -> Self {
        match (explicit, output) {
            (Some(outcome), _) => outcome,
            (None, Some(text)) => DispatchOutcome::from_output(text),
            (None, None) => DispatchOutcome::Succeeded,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Succeeded)
    }
}
