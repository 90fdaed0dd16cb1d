// guidance.rs — Agent-facing text rendered from PipelineState.
//
// The prompt layer injects `banner()` on every turn; `advance` and `status`
// replies end with `phase_guidance()` for the current phase.

use crate::phase::{join_aliases, Phase, RepoStatus};
use crate::state::{CompletionSummary, PipelineState, MAX_ITERATIONS};

/// Instructions for what the orchestrator should do in `phase`.
pub fn phase_guidance(phase: Phase, repo: RepoStatus) -> &'static str {
    match phase {
        Phase::Brainstorming => {
            "Explore the problem with the user. Ask clarifying questions and agree on \
             the goal before writing anything down. Advance with 'refine' once the idea \
             is settled."
        }
        Phase::Refining => {
            "Turn the agreed idea into a concrete spec: files to touch, acceptance \
             criteria, edge cases. Advance with 'dispatch' when the spec is ready to hand \
             off."
        }
        Phase::Dispatching => {
            "Hand the spec to the implementation task now. Do not edit files yourself. \
             The pipeline moves to REVIEWING on its own when the task completes \
             successfully."
        }
        Phase::Reviewing if repo == RepoStatus::No => {
            "This directory is not under version control, so `git diff` is unavailable. \
             Verify the work by reading the changed files directly. Then advance with \
             'report', or with 'iterate' to dispatch a fix."
        }
        Phase::Reviewing => {
            "Run `git diff` and check the changes against the spec. Advance with \
             'report' if they are correct, or with 'iterate' to dispatch a fix."
        }
        Phase::Reporting => {
            "Summarize for the user what changed, what was verified and anything left \
             open. Advance with 'complete' when the report is delivered."
        }
        Phase::Complete => {
            "The pipeline is complete. The next user message starts a new run."
        }
    }
}

fn git_diff_label(state: &PipelineState) -> &'static str {
    match (state.repo, state.git_diff_called) {
        (RepoStatus::No, _) => "n/a",
        (_, true) => "done",
        (_, false) => "pending",
    }
}

/// One `|`-joined line describing the current state.
pub fn status_line(state: &PipelineState) -> String {
    format!(
        "Phase: {} | Iteration: {}/{} | git diff: {} | Dispatches: {} | Valid transitions: {}",
        state.phase.label(),
        state.iterations,
        MAX_ITERATIONS,
        git_diff_label(state),
        state.dispatches,
        join_aliases(&state.valid_aliases()),
    )
}

/// Status line followed by the current guidance.
pub fn status_report(state: &PipelineState) -> String {
    format!(
        "{}\n\n{}",
        status_line(state),
        phase_guidance(state.phase, state.repo)
    )
}

/// Reply to a successful `advance`.
pub fn advanced_message(state: &PipelineState) -> String {
    format!(
        "Advanced to {}. {}",
        state.phase.label(),
        phase_guidance(state.phase, state.repo)
    )
}

/// Per-turn banner for the system prompt. Carries the session id, which the
/// agent must pass back to the pipeline tools.
pub fn banner(session_id: &str, state: &PipelineState) -> String {
    format!(
        "[PIPELINE session={id}] {}\n\n\
         Use session_id \"{id}\" when calling pipeline_advance and pipeline_status.",
        status_report(state),
        id = session_id,
    )
}

/// User-visible notification text when a run completes.
pub fn completion_message(summary: &CompletionSummary) -> String {
    format!(
        "Pipeline complete: {} dispatch(es), {} iteration(s), {}s elapsed",
        summary.dispatches, summary.iterations, summary.elapsed_secs
    )
}
