// host.rs — PipelineHost: the event-handling facade behind both transports.
//
// Every host event (user turn, tool before/after, pipeline tool call) lands
// here. All session state sits behind one std Mutex, so events for a session
// are applied one at a time whatever order the transports deliver them in.
// The lock is never held across an `.await`: the repository probe releases
// it, runs, re-acquires it and only writes its answer if the session still
// has none.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Deserialize;

use orc_pipeline::guidance;
use orc_pipeline::{
    Alias, DispatchObservation, DispatchOutcome, EventDispatcher, JsonlSink, Notification,
    Notifier, Phase, PipelineEvent, PipelineState, SessionClass, SessionRegistry, Severity,
    TracingNotifier, TracingSink, Transition, TurnOutcome,
};
use orc_policy::{CallerClass, GateDecision, ToolGate, ToolRequest};
use orc_vcs::{GitProbe, TokioRunner};

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// Reply for pipeline tools called from a session that has no pipeline.
pub const NO_PIPELINE: &str = "No active pipeline for this session. Pipeline tools only \
                               track orchestrator sessions; nothing was changed.";

/// Appended to every failed patch reply.
pub const PATCH_FALLBACK: &str = "The patch was not applied. Make the change with the \
                                  write or edit tools directly instead.";

/// A finished tool call, as reported by the host.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCompletion {
    pub session_id: String,
    pub tool: String,
    /// Command line, for the shell tool.
    #[serde(default)]
    pub command: Option<String>,
    /// Text the tool produced.
    #[serde(default)]
    pub output: Option<String>,
    /// Explicit result of a dispatch, when the host knows it.
    #[serde(default)]
    pub outcome: Option<DispatchOutcome>,
}

/// What a tool completion did to the session's pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolEffect {
    None,
    GitDiffRecorded,
    Advanced(Transition),
    Held { diagnostic: String },
}

pub struct PipelineHost {
    config: GatewayConfig,
    sessions: Mutex<SessionRegistry>,
    gate: ToolGate,
    events: EventDispatcher,
    notifier: Arc<dyn Notifier>,
    probe: GitProbe,
}

impl PipelineHost {
    /// Build a host that logs events to the configured JSONL file and to
    /// tracing, and delivers notifications through tracing.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let mut events = EventDispatcher::new();
        events.add_sink(Box::new(JsonlSink::new(&config.events_log)));
        events.add_sink(Box::new(TracingSink));
        Self::with_events(config, events)
    }

    /// Build a host with a caller-supplied event dispatcher.
    pub fn with_events(
        config: GatewayConfig,
        events: EventDispatcher,
    ) -> Result<Self, GatewayError> {
        let gate = ToolGate::new(config.gate.clone())?;
        let sessions =
            SessionRegistry::new(config.orchestrator_agent.clone(), config.session_ttl());
        let probe = GitProbe::new(Arc::new(TokioRunner), config.probe_timeout());
        Ok(Self {
            config,
            sessions: Mutex::new(sessions),
            gate,
            events,
            notifier: Arc::new(TracingNotifier),
            probe,
        })
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_probe(mut self, probe: GitProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn sessions(&self) -> MutexGuard<'_, SessionRegistry> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of a session's pipeline state, if it has one.
    pub fn pipeline(&self, session_id: &str) -> Option<PipelineState> {
        self.sessions().pipeline(session_id).cloned()
    }

    // ── Host events ──────────────────────────────────────────────

    /// A user-originated turn: registers the session, starts a pipeline for
    /// the orchestrator, or resets a completed one.
    pub fn on_user_turn(&self, session_id: &str, agent: &str) -> TurnOutcome {
        let now = Utc::now();
        let mut sessions = self.sessions();

        let evicted = sessions.evict_idle(now);
        if !evicted.is_empty() {
            tracing::info!(count = evicted.len(), "evicted idle sessions");
            self.events.dispatch(&PipelineEvent::SessionsEvicted {
                session_ids: evicted,
                timestamp: now,
            });
        }

        let outcome = sessions.observe_user_turn(session_id, agent, now);
        match &outcome {
            TurnOutcome::Registered { orchestrated } => {
                self.events.dispatch(&PipelineEvent::SessionRegistered {
                    session_id: session_id.to_string(),
                    agent: agent.to_string(),
                    orchestrated: *orchestrated,
                    timestamp: now,
                });
            }
            TurnOutcome::Started => {
                self.events.dispatch(&PipelineEvent::SessionRegistered {
                    session_id: session_id.to_string(),
                    agent: agent.to_string(),
                    orchestrated: true,
                    timestamp: now,
                });
            }
            TurnOutcome::Reset { previous_run } => {
                if let Some(state) = sessions.pipeline(session_id) {
                    tracing::info!(
                        %session_id,
                        %previous_run,
                        run_id = %state.run_id,
                        "pipeline reset"
                    );
                    self.events.dispatch(&PipelineEvent::PipelineReset {
                        session_id: session_id.to_string(),
                        run_id: state.run_id,
                        timestamp: now,
                    });
                }
            }
            TurnOutcome::Continued => {}
        }
        outcome
    }

    /// Per-turn banner for orchestrator sessions.
    pub fn banner(&self, session_id: &str) -> Option<String> {
        self.sessions()
            .pipeline(session_id)
            .map(|state| guidance::banner(session_id, state))
    }

    /// Gate a tool call before it runs.
    pub fn before_tool(&self, session_id: &str, tool: &str) -> GateDecision {
        let mut sessions = self.sessions();
        sessions.touch(session_id, Utc::now());

        let caller = match sessions.classify(session_id) {
            SessionClass::Subagent => CallerClass::Subagent,
            SessionClass::Primary { orchestrated, .. } => CallerClass::Primary {
                // An evicted orchestrator is gated as if a fresh run had started.
                phase: sessions
                    .pipeline(session_id)
                    .map(|p| p.phase)
                    .or(orchestrated.then_some(Phase::Brainstorming)),
            },
        };
        let trace = self.gate.evaluate_with_trace(&ToolRequest::new(tool, caller));

        if let GateDecision::Deny { reason } = &trace.decision {
            let checks: Vec<String> = trace
                .steps
                .iter()
                .map(|s| format!("{}={}", s.check, s.outcome))
                .collect();
            tracing::warn!(%session_id, %tool, steps = ?checks, "tool call rejected");
            self.events.dispatch(&PipelineEvent::ToolRejected {
                session_id: session_id.to_string(),
                tool: tool.to_string(),
                reason: reason.clone(),
                timestamp: Utc::now(),
            });
        }
        trace.decision
    }

    /// Feed a finished tool call back into the session's pipeline.
    pub fn after_tool(&self, completion: &ToolCompletion) -> ToolEffect {
        let session_id = completion.session_id.as_str();
        let mut sessions = self.sessions();
        sessions.touch(session_id, Utc::now());
        let Some(state) = sessions.pipeline_mut(session_id) else {
            return ToolEffect::None;
        };

        if self.gate.is_shell_tool(&completion.tool) {
            let observed = completion
                .command
                .as_deref()
                .is_some_and(|cmd| state.observe_shell_command(cmd));
            if !observed {
                return ToolEffect::None;
            }
            self.events.dispatch(&PipelineEvent::GitDiffObserved {
                session_id: session_id.to_string(),
                run_id: state.run_id,
                timestamp: Utc::now(),
            });
            return ToolEffect::GitDiffRecorded;
        }

        if !self.gate.is_dispatch_tool(&completion.tool) {
            return ToolEffect::None;
        }
        let outcome =
            DispatchOutcome::resolve(completion.outcome.clone(), completion.output.as_deref());
        match state.observe_dispatch(&outcome) {
            DispatchObservation::Advanced(transition) => {
                tracing::info!(%session_id, "dispatch succeeded, advancing to reviewing");
                self.events.dispatch(&PipelineEvent::phase_changed(
                    session_id,
                    &transition,
                    state.iterations,
                    state.dispatches,
                ));
                ToolEffect::Advanced(transition)
            }
            DispatchObservation::Held { diagnostic } => {
                tracing::warn!(%session_id, %diagnostic, "dispatch reported failure, phase held");
                self.events.dispatch(&PipelineEvent::DispatchHeld {
                    session_id: session_id.to_string(),
                    run_id: state.run_id,
                    diagnostic: diagnostic.clone(),
                    timestamp: Utc::now(),
                });
                ToolEffect::Held { diagnostic }
            }
            DispatchObservation::Ignored => ToolEffect::None,
        }
    }

    // ── Pipeline tools ───────────────────────────────────────────

    /// Run the repository probe once for a session whose answer is unknown.
    async fn ensure_repo_probed(&self, session_id: &str) {
        let needs_probe = self
            .sessions()
            .pipeline(session_id)
            .is_some_and(|p| !p.repo.is_known());
        if !needs_probe {
            return;
        }

        let repo = self.probe.is_repo(&self.config.workspace_root).await;

        let mut sessions = self.sessions();
        if let Some(state) = sessions.pipeline_mut(session_id) {
            if !state.repo.is_known() {
                state.repo = repo;
                self.events.dispatch(&PipelineEvent::RepoProbed {
                    session_id: session_id.to_string(),
                    repo,
                    timestamp: Utc::now(),
                });
            }
        }
    }

    /// `pipeline_advance`: request a transition by alias.
    pub async fn advance(&self, session_id: &str, target: &str) -> String {
        self.ensure_repo_probed(session_id).await;

        let mut sessions = self.sessions();
        let now = Utc::now();
        sessions.touch(session_id, now);
        let Some(state) = sessions.pipeline_mut(session_id) else {
            return NO_PIPELINE.to_string();
        };

        let transition = match target.parse::<Alias>().and_then(|alias| state.advance(alias)) {
            Ok(transition) => transition,
            Err(e) => {
                tracing::info!(
                    %session_id,
                    %target,
                    phase = %state.phase,
                    error = %e,
                    "advance refused"
                );
                return format!("ERROR: {}", e);
            }
        };

        tracing::info!(%session_id, from = %transition.from, to = %transition.to, "phase advanced");
        self.events.dispatch(&PipelineEvent::phase_changed(
            session_id,
            &transition,
            state.iterations,
            state.dispatches,
        ));

        if transition.to == Phase::Complete {
            let summary = state.completion_summary(now);
            self.events.dispatch(&PipelineEvent::pipeline_completed(
                session_id,
                state.run_id,
                &summary,
            ));
            self.notifier.notify(Notification {
                message: guidance::completion_message(&summary),
                severity: Severity::Info,
            });
        }

        guidance::advanced_message(state)
    }

    /// `pipeline_status`: current state plus guidance. Never mutates the pipeline.
    pub async fn status(&self, session_id: &str) -> String {
        self.ensure_repo_probed(session_id).await;
        match self.sessions().pipeline(session_id) {
            Some(state) => guidance::status_report(state),
            None => NO_PIPELINE.to_string(),
        }
    }

    /// `apply_patch`: apply a unified diff relative to the workspace root.
    pub fn apply_patch(&self, session_id: Option<&str>, patch: &str) -> String {
        match orc_patch::apply_patch(patch, &self.config.workspace_root) {
            Ok(report) => {
                self.events.dispatch(&PipelineEvent::PatchApplied {
                    session_id: session_id.map(str::to_string),
                    files: report.changed_paths(),
                    timestamp: Utc::now(),
                });
                report.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "patch failed");
                format!("ERROR applying patch: {}\n\n{}", e, PATCH_FALLBACK)
            }
        }
    }
}
