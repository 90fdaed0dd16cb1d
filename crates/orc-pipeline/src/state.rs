// state.rs — PipelineState: per-session progress through the phase cycle.
//
// All mutation goes through `advance`, `observe_shell_command`,
// `observe_dispatch` and `reset`. A refused request returns an
// `AdvanceError` and leaves every field exactly as it was.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dispatch::DispatchOutcome;
use crate::error::AdvanceError;
use crate::phase::{Alias, Phase, RepoStatus};

/// Review-retry cycles allowed per pipeline run.
pub const MAX_ITERATIONS: u32 = 3;

/// Shell commands with this prefix count as inspecting the dispatched changes.
const GIT_DIFF_PREFIX: &str = "git diff";

/// Progress of one orchestrator session through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Identifies one run; regenerated on reset.
    pub run_id: Uuid,

    pub phase: Phase,

    /// Completed `iterate` requests in this run, never above `MAX_ITERATIONS`.
    pub iterations: u32,

    /// Dispatch attempts in this run (the initial dispatch plus retries).
    pub dispatches: u32,

    /// Whether `git diff` was observed during the current review cycle.
    pub git_diff_called: bool,

    /// Memoized repository probe result. Survives `reset`.
    pub repo: RepoStatus,

    pub started_at: DateTime<Utc>,
}

/// A phase change that was applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transition {
    pub run_id: Uuid,
    /// The alias that caused the change, or `None` for auto-advance.
    pub alias: Option<Alias>,
    pub from: Phase,
    pub to: Phase,
}

/// Totals reported to the user when a run reaches Complete.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionSummary {
    pub dispatches: u32,
    pub iterations: u32,
    pub elapsed_secs: i64,
}

/// Result of feeding a dispatch completion into the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchObservation {
    /// The dispatch succeeded and the pipeline moved to Reviewing.
    Advanced(Transition),
    /// The dispatch looked failed; the phase is unchanged and the agent decides.
    Held { diagnostic: String },
    /// Not in Dispatching, nothing to do.
    Ignored,
}

impl PipelineState {
    /// Create a fresh run in Brainstorming.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            phase: Phase::Brainstorming,
            iterations: 0,
            dispatches: 0,
            git_diff_called: false,
            repo: RepoStatus::Unknown,
            started_at: Utc::now(),
        }
    }

    /// Start a new run, keeping only the repository probe result.
    pub fn reset(&mut self) {
        let repo = self.repo;
        *self = Self::new();
        self.repo = repo;
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    /// Aliases that would currently pass the reachability check and the
    /// iteration budget. The git-diff prerequisite is not considered here.
    pub fn valid_aliases(&self) -> Vec<Alias> {
        self.phase
            .aliases()
            .iter()
            .copied()
            .filter(|alias| *alias != Alias::Iterate || self.iterations < MAX_ITERATIONS)
            .collect()
    }

    /// Apply a requested transition.
    pub fn advance(&mut self, alias: Alias) -> Result<Transition, AdvanceError> {
        if !self.phase.aliases().contains(&alias) {
            return Err(AdvanceError::Unreachable {
                alias,
                from: self.phase,
                valid: self.valid_aliases(),
            });
        }

        let from = self.phase;
        match alias {
            Alias::Iterate => {
                if self.iterations >= MAX_ITERATIONS {
                    return Err(AdvanceError::IterationLimit {
                        max: MAX_ITERATIONS,
                    });
                }
                self.git_diff_called = false;
                self.iterations += 1;
                self.dispatches += 1;
                self.phase = Phase::Dispatching;
            }
            Alias::Report => {
                if !self.git_diff_called && self.repo != RepoStatus::No {
                    return Err(AdvanceError::GitDiffRequired);
                }
                self.phase = Phase::Reporting;
            }
            Alias::Dispatch => {
                self.dispatches += 1;
                self.phase = Phase::Dispatching;
            }
            Alias::Refine | Alias::Complete => {
                self.phase = alias.target();
            }
        }

        Ok(Transition {
            run_id: self.run_id,
            alias: Some(alias),
            from,
            to: self.phase,
        })
    }

    /// Record a shell command. Returns true when it satisfied the git-diff
    /// prerequisite for the current review cycle.
    pub fn observe_shell_command(&mut self, command: &str) -> bool {
        if self.phase != Phase::Reviewing {
            return false;
        }
        if !command.trim_start().starts_with(GIT_DIFF_PREFIX) {
            return false;
        }
        self.git_diff_called = true;
        true
    }

    /// Feed a completed dispatch into auto-advance.
    pub fn observe_dispatch(&mut self, outcome: &DispatchOutcome) -> DispatchObservation {
        if self.phase != Phase::Dispatching {
            return DispatchObservation::Ignored;
        }
        match outcome {
            DispatchOutcome::Succeeded => {
                self.phase = Phase::Reviewing;
                DispatchObservation::Advanced(Transition {
                    run_id: self.run_id,
                    alias: None,
                    from: Phase::Dispatching,
                    to: Phase::Reviewing,
                })
            }
            DispatchOutcome::Failed { diagnostic } => DispatchObservation::Held {
                diagnostic: diagnostic.clone(),
            },
        }
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds().max(0)
    }

    pub fn completion_summary(&self, now: DateTime<Utc>) -> CompletionSummary {
        CompletionSummary {
            dispatches: self.dispatches,
            iterations: self.iterations,
            elapsed_secs: self.elapsed_secs(now),
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
