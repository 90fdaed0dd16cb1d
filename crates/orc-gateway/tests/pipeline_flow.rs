//! End-to-end pipeline runs driven through the host, the way the hook API
//! and MCP tools drive it in production.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orc_gateway::{GatewayConfig, Outbox, PipelineHost, ToolCompletion, ToolEffect};
use orc_pipeline::{DispatchOutcome, Phase, RepoStatus, TurnOutcome};
use orc_vcs::{CommandOutput, CommandRunner, GitProbe, VcsError};

/// Answers `git rev-parse` as if the workspace were a repository.
struct InsideRepo;

#[async_trait]
impl CommandRunner for InsideRepo {
    async fn run(
        &self,
        _program: &str,
        _args: &[&str],
        _dir: &Path,
        _timeout: Duration,
    ) -> Result<CommandOutput, VcsError> {
        Ok(CommandOutput {
            success: true,
            code: Some(0),
            stdout: "true".to_string(),
            stderr: String::new(),
        })
    }
}

fn setup() -> (PipelineHost, Arc<Outbox>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let outbox = Arc::new(Outbox::new());
    let host = PipelineHost::new(GatewayConfig::for_project(dir.path()))
        .unwrap()
        .with_notifier(outbox.clone())
        .with_probe(GitProbe::new(Arc::new(InsideRepo), Duration::from_secs(1)));
    (host, outbox, dir)
}

fn completion(
    tool: &str,
    command: Option<&str>,
    outcome: Option<DispatchOutcome>,
) -> ToolCompletion {
    ToolCompletion {
        session_id: "main".to_string(),
        tool: tool.to_string(),
        command: command.map(str::to_string),
        output: None,
        outcome,
    }
}

async fn dispatch_and_review(host: &PipelineHost) {
    assert!(host.before_tool("main", "task").is_allowed());
    // The dispatched sub-task runs in its own session and edits files.
    assert!(host.before_tool("worker", "edit").is_allowed());
    let effect = host.after_tool(&completion("task", None, Some(DispatchOutcome::Succeeded)));
    assert!(matches!(effect, ToolEffect::Advanced(_)));
    assert_eq!(
        host.after_tool(&completion("bash", Some("git diff"), None)),
        ToolEffect::GitDiffRecorded
    );
}

#[tokio::test]
async fn full_run_with_retries() {
    let (host, outbox, dir) = setup();

    assert_eq!(
        host.on_user_turn("main", "orchestrator"),
        TurnOutcome::Registered { orchestrated: true }
    );
    assert!(host.advance("main", "refine").await.starts_with("Advanced to REFINING."));

    // Not yet dispatching: the dispatch tool is refused, orchestrator edits always are.
    assert!(!host.before_tool("main", "task").is_allowed());
    assert!(!host.before_tool("main", "write").is_allowed());

    assert!(host.advance("main", "dispatch").await.starts_with("Advanced to DISPATCHING."));
    dispatch_and_review(&host).await;

    for round in 1..=3 {
        let reply = host.advance("main", "iterate").await;
        assert!(reply.starts_with("Advanced to DISPATCHING."), "round {}: {}", round, reply);
        let state = host.pipeline("main").unwrap();
        assert_eq!(state.iterations, round);
        assert_eq!(state.dispatches, round + 1);
        assert!(!state.git_diff_called);
        dispatch_and_review(&host).await;
    }

    let capped = host.advance("main", "iterate").await;
    assert!(capped.starts_with("ERROR: iteration limit reached (3/3)"), "{}", capped);
    let status = host.status("main").await;
    assert!(
        status.starts_with(
            "Phase: REVIEWING | Iteration: 3/3 | git diff: done | Dispatches: 4 | Valid transitions: report"
        ),
        "{}",
        status
    );

    assert!(host.advance("main", "report").await.starts_with("Advanced to REPORTING."));
    assert!(host.advance("main", "complete").await.starts_with("Advanced to COMPLETE."));

    let notes = outbox.drain();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].message.starts_with("Pipeline complete: 4 dispatch(es), 3 iteration(s),"));

    // Next user turn starts over; the probe result is kept.
    assert!(matches!(
        host.on_user_turn("main", "orchestrator"),
        TurnOutcome::Reset { .. }
    ));
    let state = host.pipeline("main").unwrap();
    assert_eq!(state.phase, Phase::Brainstorming);
    assert_eq!(state.iterations, 0);
    assert_eq!(state.repo, RepoStatus::Yes);

    let log = std::fs::read_to_string(dir.path().join(".orc/events.jsonl")).unwrap();
    assert!(log.lines().count() > 10);
    assert!(log.lines().all(|l| l.contains("\"service\":\"orchestra\"")));
    assert!(log.contains("\"event_type\":\"pipeline_completed\""));
}

#[tokio::test]
async fn failed_transitions_leave_state_untouched() {
    let (host, _outbox, _dir) = setup();
    host.on_user_turn("main", "orchestrator");
    let before = host.pipeline("main").unwrap();

    for target in ["report", "complete", "iterate", "dispatch", "bogus"] {
        let reply = host.advance("main", target).await;
        assert!(reply.starts_with("ERROR:"), "{}: {}", target, reply);
    }

    let after = host.pipeline("main").unwrap();
    assert_eq!(after.phase, before.phase);
    assert_eq!(after.dispatches, before.dispatches);
    assert_eq!(after.iterations, before.iterations);
    assert_eq!(after.run_id, before.run_id);
}

#[tokio::test]
async fn patch_tool_works_in_any_phase() {
    let (host, _outbox, dir) = setup();
    host.on_user_turn("main", "orchestrator");
    std::fs::write(dir.path().join("lib.rs"), "fn a() {}\nfn b() {}\n").unwrap();

    let reply = host.apply_patch(
        Some("main"),
        "--- a/lib.rs\n+++ b/lib.rs\n@@ -1,2 +1,2 @@\n fn a() {}\n-fn b() {}\n+fn c() {}\n",
    );
    assert_eq!(reply, "Patch applied successfully:\nModified: lib.rs");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("lib.rs")).unwrap(),
        "fn a() {}\nfn c() {}\n"
    );
    assert_eq!(host.pipeline("main").unwrap().phase, Phase::Brainstorming);
}
