// gate.rs — Phase-aware tool gate.
//
// Every tool call from a session passes through `evaluate()`:
//
// 1. Subagent session? → allowed only if the tool matches the allow-list
// 2. Primary session without a pipeline? → not gated
// 3. Direct file-mutation tool? → Deny (the orchestrator delegates edits)
// 4. Dispatch tool outside DISPATCHING? → Deny
// 5. Otherwise → Allow
//
// Tool names are compared case-insensitively. Allow-list entries are glob
// patterns so a family of tools (`todo*`) needs one entry.

use glob::Pattern;
use orc_pipeline::Phase;
use serde::{Deserialize, Serialize};

use crate::config::GateConfig;
use crate::error::PolicyError;

/// Who is calling, as far as the gate cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerClass {
    /// Session never seen originating a user turn.
    Subagent,
    /// Session that originated a user turn. `phase` is set only when the
    /// session is driven by the orchestrator agent.
    Primary { phase: Option<Phase> },
}

#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub tool: String,
    pub caller: CallerClass,
}

impl ToolRequest {
    pub fn new(tool: impl Into<String>, caller: CallerClass) -> Self {
        Self {
            tool: tool.into(),
            caller,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    Allow,
    Deny { reason: String },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }
}

/// One check the gate performed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateStep {
    /// Which check ran (e.g. "subagent_allow_list", "dispatch_phase").
    pub check: String,
    /// What it found ("passed", "failed: ...", "matched 'todo*'").
    pub outcome: String,
    /// Whether this step decided the request.
    pub terminal: bool,
}

/// Decision plus the ordered checks that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateTrace {
    pub decision: GateDecision,
    pub steps: Vec<GateStep>,
}

impl GateTrace {
    fn passed(&mut self, check: &str, outcome: impl Into<String>) {
        self.steps.push(GateStep {
            check: check.to_string(),
            outcome: outcome.into(),
            terminal: false,
        });
    }

    fn decide(mut self, check: &str, outcome: impl Into<String>, decision: GateDecision) -> Self {
        self.steps.push(GateStep {
            check: check.to_string(),
            outcome: outcome.into(),
            terminal: true,
        });
        self.decision = decision;
        self
    }
}

pub struct ToolGate {
    config: GateConfig,
    allow: Vec<Pattern>,
}

impl ToolGate {
    /// Build a gate, compiling the allow-list patterns.
    pub fn new(config: GateConfig) -> Result<Self, PolicyError> {
        let allow = config
            .subagent_allow
            .iter()
            .map(|p| {
                Pattern::new(&p.to_lowercase()).map_err(|e| PolicyError::InvalidPattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { config, allow })
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn is_dispatch_tool(&self, tool: &str) -> bool {
        tool.eq_ignore_ascii_case(&self.config.dispatch_tool)
    }

    pub fn is_shell_tool(&self, tool: &str) -> bool {
        tool.eq_ignore_ascii_case(&self.config.shell_tool)
    }

    pub fn is_mutation_tool(&self, tool: &str) -> bool {
        self.config
            .mutation_tools
            .iter()
            .any(|t| t.eq_ignore_ascii_case(tool))
    }

    /// Decide whether a tool call may proceed.
    pub fn evaluate(&self, request: &ToolRequest) -> GateDecision {
        self.evaluate_with_trace(request).decision
    }

    /// Same as `evaluate()` but records every check along the way.
    pub fn evaluate_with_trace(&self, request: &ToolRequest) -> GateTrace {
        let tool = request.tool.to_lowercase();
        let trace = GateTrace {
            decision: GateDecision::Allow,
            steps: Vec::new(),
        };

        let phase = match request.caller {
            CallerClass::Subagent => return self.check_subagent(trace, &request.tool, &tool),
            CallerClass::Primary { phase: None } => {
                return trace.decide(
                    "pipeline_lookup",
                    "no pipeline: session not gated",
                    GateDecision::Allow,
                );
            }
            CallerClass::Primary { phase: Some(phase) } => phase,
        };
        let mut trace = trace;
        trace.passed("pipeline_lookup", format!("phase {}", phase));

        if self.is_mutation_tool(&tool) {
            let reason = format!(
                "'{}' is not available to the orchestrator. File changes must be made by a \
                 dispatched task ('{}') or with apply_patch.",
                request.tool, self.config.dispatch_tool
            );
            tracing::debug!(tool = %request.tool, %phase, "mutation tool refused");
            return trace.decide(
                "file_mutation",
                "failed: direct mutation",
                GateDecision::Deny { reason },
            );
        }
        trace.passed("file_mutation", "passed");

        if self.is_dispatch_tool(&tool) {
            if phase != Phase::Dispatching {
                let reason = format!(
                    "'{}' is only allowed in the DISPATCHING phase (current phase: {}). \
                     Use pipeline_advance to reach it first.",
                    request.tool,
                    phase.label()
                );
                tracing::debug!(
                    tool = %request.tool,
                    %phase,
                    "dispatch refused outside dispatching"
                );
                return trace.decide(
                    "dispatch_phase",
                    format!("failed: phase is {}", phase),
                    GateDecision::Deny { reason },
                );
            }
            return trace.decide("dispatch_phase", "passed", GateDecision::Allow);
        }

        trace.decide("default", "allowed", GateDecision::Allow)
    }

    fn check_subagent(&self, trace: GateTrace, original: &str, lowered: &str) -> GateTrace {
        if let Some(pattern) = self.allow.iter().find(|p| p.matches(lowered)) {
            return trace.decide(
                "subagent_allow_list",
                format!("matched '{}'", pattern.as_str()),
                GateDecision::Allow,
            );
        }
        let reason = format!(
            "'{}' is not available to subagents. Allowed tools: {}",
            original,
            self.config.subagent_allow.join(", ")
        );
        tracing::debug!(tool = %original, "subagent tool refused");
        trace.decide(
            "subagent_allow_list",
            "failed: no pattern matched",
            GateDecision::Deny { reason },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> ToolGate {
        ToolGate::new(GateConfig::default()).unwrap()
    }

    fn orchestrator(phase: Phase) -> CallerClass {
        CallerClass::Primary { phase: Some(phase) }
    }

    #[test]
    fn dispatch_rejected_outside_dispatching() {
        let decision = gate().evaluate(&ToolRequest::new("task", orchestrator(Phase::Refining)));
        match decision {
            GateDecision::Deny { reason } => {
                assert!(reason.contains("DISPATCHING"));
                assert!(reason.contains("REFINING"));
            }
            other => panic!("expected deny, got {:?}", other),
        }
    }

    #[test]
    fn dispatch_allowed_in_dispatching() {
        let decision = gate().evaluate(&ToolRequest::new("Task", orchestrator(Phase::Dispatching)));
        assert_eq!(decision, GateDecision::Allow);
    }

    #[test]
    fn orchestrator_never_writes_files() {
        for phase in [Phase::Brainstorming, Phase::Dispatching, Phase::Reviewing] {
            let decision = gate().evaluate(&ToolRequest::new("Edit", orchestrator(phase)));
            assert!(!decision.is_allowed(), "edit allowed in {}", phase);
        }
        let decision =
            gate().evaluate(&ToolRequest::new("apply_patch", orchestrator(Phase::Reviewing)));
        assert!(decision.is_allowed());
    }

    #[test]
    fn non_orchestrator_primary_is_not_gated() {
        let caller = CallerClass::Primary { phase: None };
        assert!(gate().evaluate(&ToolRequest::new("write", caller)).is_allowed());
        assert!(gate().evaluate(&ToolRequest::new("task", caller)).is_allowed());
    }

    #[test]
    fn subagent_allow_list_is_case_insensitive_glob() {
        let g = gate();
        for tool in ["Read", "BASH", "todowrite", "TodoRead", "pipeline_status"] {
            assert!(
                g.evaluate(&ToolRequest::new(tool, CallerClass::Subagent)).is_allowed(),
                "{} should be allowed",
                tool
            );
        }
    }

    #[test]
    fn subagent_cannot_dispatch() {
        let decision = gate().evaluate(&ToolRequest::new("task", CallerClass::Subagent));
        match decision {
            GateDecision::Deny { reason } => assert!(reason.contains("not available to subagents")),
            other => panic!("expected deny, got {:?}", other),
        }
    }

    #[test]
    fn trace_marks_terminal_step() {
        let request = ToolRequest::new("task", orchestrator(Phase::Brainstorming));
        let trace = gate().evaluate_with_trace(&request);
        let checks: Vec<&str> = trace.steps.iter().map(|s| s.check.as_str()).collect();
        assert_eq!(checks, vec!["pipeline_lookup", "file_mutation", "dispatch_phase"]);
        assert!(trace.steps.last().unwrap().terminal);
        assert!(trace.steps[..2].iter().all(|s| !s.terminal));
        assert!(!trace.decision.is_allowed());
    }

    #[test]
    fn trace_records_matching_pattern() {
        let trace =
            gate().evaluate_with_trace(&ToolRequest::new("todoread", CallerClass::Subagent));
        assert_eq!(trace.steps.len(), 1);
        assert_eq!(trace.steps[0].outcome, "matched 'todo*'");
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let cfg = GateConfig {
            subagent_allow: vec!["[unclosed".into()],
            ..GateConfig::default()
        };
        assert!(matches!(
            ToolGate::new(cfg),
            Err(PolicyError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn decision_serializes_with_tag() {
        let json = serde_json::to_string(&GateDecision::Deny {
            reason: "no".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"decision":"deny","reason":"no"}"#);
    }
}
