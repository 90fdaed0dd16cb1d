// registry.rs — SessionRegistry: session id → PipelineState, with eviction.
//
// A session is *primary* once it has originated a user turn; the agent name
// from that turn is recorded. Only primary sessions driven by the
// orchestrator agent own a PipelineState. Any session seen only through tool
// calls is a *subagent* and is never stored.
//
// State lives in process memory only. Entries idle for longer than the TTL
// are dropped on the next registration sweep. An evicted session leaves a
// tombstone for one more TTL so its tool calls are still classified as
// primary; tombstones go on the sweep after that, or on the session's next
// user turn.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::state::PipelineState;

/// A registered primary session.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    /// Agent name attached to the most recent user turn.
    pub agent: String,
    /// Present only for orchestrator sessions.
    pub pipeline: Option<PipelineState>,
    pub registered_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// How a session is treated by the tool gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionClass {
    Primary { agent: String, orchestrated: bool },
    Subagent,
}

/// What a user turn did to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// First user turn for this session.
    Registered { orchestrated: bool },
    /// A known primary session switched to the orchestrator agent.
    Started,
    /// A completed pipeline was reset for a new run.
    Reset { previous_run: Uuid },
    /// Nothing changed; an in-progress pipeline is never reset.
    Continued,
}

/// What is remembered about an evicted session.
#[derive(Debug, Clone)]
struct Tombstone {
    agent: String,
    orchestrated: bool,
    evicted_at: DateTime<Utc>,
}

pub struct SessionRegistry {
    sessions: HashMap<String, SessionEntry>,
    retired: HashMap<String, Tombstone>,
    orchestrator_agent: String,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(orchestrator_agent: impl Into<String>, ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            retired: HashMap::new(),
            orchestrator_agent: orchestrator_agent.into(),
            ttl,
        }
    }

    fn is_orchestrator(&self, agent: &str) -> bool {
        agent.eq_ignore_ascii_case(&self.orchestrator_agent)
    }

    /// Record a user-originated turn.
    pub fn observe_user_turn(
        &mut self,
        session_id: &str,
        agent: &str,
        now: DateTime<Utc>,
    ) -> TurnOutcome {
        let orchestrated = self.is_orchestrator(agent);

        let Some(entry) = self.sessions.get_mut(session_id) else {
            self.retired.remove(session_id);
            self.sessions.insert(
                session_id.to_string(),
                SessionEntry {
                    agent: agent.to_string(),
                    pipeline: orchestrated.then(PipelineState::new),
                    registered_at: now,
                    last_seen: now,
                },
            );
            return TurnOutcome::Registered { orchestrated };
        };

        entry.agent = agent.to_string();
        entry.last_seen = now;
        match entry.pipeline {
            None if orchestrated => {
                entry.pipeline = Some(PipelineState::new());
                TurnOutcome::Started
            }
            Some(ref mut pipeline) if pipeline.is_complete() => {
                let previous_run = pipeline.run_id;
                pipeline.reset();
                TurnOutcome::Reset { previous_run }
            }
            _ => TurnOutcome::Continued,
        }
    }

    /// Evicted sessions keep their class until their tombstone expires. An
    /// evicted orchestrator reports `orchestrated: true` with no pipeline.
    pub fn classify(&self, session_id: &str) -> SessionClass {
        if let Some(entry) = self.sessions.get(session_id) {
            return SessionClass::Primary {
                agent: entry.agent.clone(),
                orchestrated: entry.pipeline.is_some(),
            };
        }
        match self.retired.get(session_id) {
            Some(tomb) => SessionClass::Primary {
                agent: tomb.agent.clone(),
                orchestrated: tomb.orchestrated,
            },
            None => SessionClass::Subagent,
        }
    }

    pub fn pipeline(&self, session_id: &str) -> Option<&PipelineState> {
        self.sessions.get(session_id)?.pipeline.as_ref()
    }

    pub fn pipeline_mut(&mut self, session_id: &str) -> Option<&mut PipelineState> {
        self.sessions.get_mut(session_id)?.pipeline.as_mut()
    }

    /// Mark a session as active. Unknown sessions are left unregistered.
    pub fn touch(&mut self, session_id: &str, now: DateTime<Utc>) {
        if let Some(entry) = self.sessions.get_mut(session_id) {
            entry.last_seen = now;
        }
    }

    /// Drop sessions idle for longer than the TTL, leaving tombstones, and
    /// expire tombstones older than the TTL. Returns the evicted ids.
    pub fn evict_idle(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let ttl = self.ttl;
        self.retired.retain(|_, tomb| now - tomb.evicted_at <= ttl);

        let mut evicted: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, entry)| now - entry.last_seen > ttl)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &evicted {
            if let Some(entry) = self.sessions.remove(id) {
                self.retired.insert(
                    id.clone(),
                    Tombstone {
                        agent: entry.agent,
                        orchestrated: entry.pipeline.is_some(),
                        evicted_at: now,
                    },
                );
            }
        }
        evicted.sort();
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
