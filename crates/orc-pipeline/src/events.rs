// events.rs — Pipeline log records and the sinks that receive them.
//
// Two collaborator seams live here:
// - `EventSink`: append-only structured log (service, severity, message,
//   free-form fields). `JsonlSink` writes one JSON object per line,
//   `TracingSink` forwards to `tracing`.
// - `Notifier`: fire-and-forget user-visible notifications (toasts). It has
//   no error channel; a notifier that cannot deliver drops the message.
//
// Sink errors are logged by the dispatcher and never reach the caller.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::phase::{Alias, Phase, RepoStatus};
use crate::state::{CompletionSummary, Transition};

/// Service name stamped on every log record.
pub const SERVICE: &str = "orchestra";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// Events emitted at pipeline lifecycle points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A session originated its first user turn.
    SessionRegistered {
        session_id: String,
        agent: String,
        orchestrated: bool,
        timestamp: DateTime<Utc>,
    },

    /// A completed run was reset by a new user turn.
    PipelineReset {
        session_id: String,
        run_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// The phase changed, by request or by auto-advance.
    PhaseChanged {
        session_id: String,
        run_id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<Alias>,
        from: Phase,
        to: Phase,
        iterations: u32,
        dispatches: u32,
        timestamp: DateTime<Utc>,
    },

    /// A run reached Complete.
    PipelineCompleted {
        session_id: String,
        run_id: Uuid,
        dispatches: u32,
        iterations: u32,
        elapsed_secs: i64,
        timestamp: DateTime<Utc>,
    },

    /// A dispatch completed with a failure marker; the phase was held.
    DispatchHeld {
        session_id: String,
        run_id: Uuid,
        diagnostic: String,
        timestamp: DateTime<Utc>,
    },

    /// `git diff` was observed during review.
    GitDiffObserved {
        session_id: String,
        run_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// The repository probe ran for a session.
    RepoProbed {
        session_id: String,
        repo: RepoStatus,
        timestamp: DateTime<Utc>,
    },

    /// The tool gate aborted a tool call.
    ToolRejected {
        session_id: String,
        tool: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A patch was applied through the patch tool.
    PatchApplied {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        files: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// Idle sessions were dropped from the registry.
    SessionsEvicted {
        session_ids: Vec<String>,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    pub fn event_type(&self) -> &str {
        match self {
            PipelineEvent::SessionRegistered { .. } => "session_registered",
            PipelineEvent::PipelineReset { .. } => "pipeline_reset",
            PipelineEvent::PhaseChanged { .. } => "phase_changed",
            PipelineEvent::PipelineCompleted { .. } => "pipeline_completed",
            PipelineEvent::DispatchHeld { .. } => "dispatch_held",
            PipelineEvent::GitDiffObserved { .. } => "git_diff_observed",
            PipelineEvent::RepoProbed { .. } => "repo_probed",
            PipelineEvent::ToolRejected { .. } => "tool_rejected",
            PipelineEvent::PatchApplied { .. } => "patch_applied",
            PipelineEvent::SessionsEvicted { .. } => "sessions_evicted",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            PipelineEvent::DispatchHeld { .. } | PipelineEvent::ToolRejected { .. } => {
                Severity::Warn
            }
            _ => Severity::Info,
        }
    }

    /// Short human-readable message for the record.
    pub fn message(&self) -> String {
        match self {
            PipelineEvent::SessionRegistered { agent, .. } => {
                format!("session registered for agent '{}'", agent)
            }
            PipelineEvent::PipelineReset { .. } => "pipeline reset".to_string(),
            PipelineEvent::PhaseChanged { alias, from, to, .. } => match alias {
                Some(alias) => format!("{} → {} via '{}'", from, to, alias),
                None => format!("{} → {} (auto)", from, to),
            },
            PipelineEvent::PipelineCompleted { .. } => "pipeline completed".to_string(),
            PipelineEvent::DispatchHeld { diagnostic, .. } => {
                format!("dispatch reported failure, phase held: {}", diagnostic)
            }
            PipelineEvent::GitDiffObserved { .. } => "git diff observed".to_string(),
            PipelineEvent::RepoProbed { repo, .. } => format!("repository probe: {:?}", repo),
            PipelineEvent::ToolRejected { tool, reason, .. } => {
                format!("tool '{}' rejected: {}", tool, reason)
            }
            PipelineEvent::PatchApplied { files, .. } => {
                format!("patch applied to {} file(s)", files.len())
            }
            PipelineEvent::SessionsEvicted { session_ids, .. } => {
                format!("evicted {} idle session(s)", session_ids.len())
            }
        }
    }

    pub fn phase_changed(
        session_id: &str,
        transition: &Transition,
        iterations: u32,
        dispatches: u32,
    ) -> Self {
        PipelineEvent::PhaseChanged {
            session_id: session_id.to_string(),
            run_id: transition.run_id,
            alias: transition.alias,
            from: transition.from,
            to: transition.to,
            iterations,
            dispatches,
            timestamp: Utc::now(),
        }
    }

    pub fn pipeline_completed(
        session_id: &str,
        run_id: Uuid,
        summary: &CompletionSummary,
    ) -> Self {
        PipelineEvent::PipelineCompleted {
            session_id: session_id.to_string(),
            run_id,
            dispatches: summary.dispatches,
            iterations: summary.iterations,
            elapsed_secs: summary.elapsed_secs,
            timestamp: Utc::now(),
        }
    }
}

/// One line of the structured log.
#[derive(Debug, Serialize)]
struct LogRecord<'a> {
    service: &'static str,
    severity: Severity,
    message: String,
    #[serde(flatten)]
    event: &'a PipelineEvent,
}

/// Receives pipeline events.
pub trait EventSink: Send + Sync {
    fn send(&self, event: &PipelineEvent) -> Result<(), PipelineError>;
}

/// Appends events as JSONL to a file.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl EventSink for JsonlSink {
    fn send(&self, event: &PipelineEvent) -> Result<(), PipelineError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| PipelineError::IoError {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| PipelineError::IoError {
                path: self.path.display().to_string(),
                source,
            })?;

        let record = LogRecord {
            service: SERVICE,
            severity: event.severity(),
            message: event.message(),
            event,
        };
        let json = serde_json::to_string(&record)?;
        writeln!(file, "{}", json).map_err(|source| PipelineError::IoError {
            path: self.path.display().to_string(),
            source,
        })?;

        Ok(())
    }
}

/// Forwards events to `tracing` at their severity.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn send(&self, event: &PipelineEvent) -> Result<(), PipelineError> {
        let message = event.message();
        match event.severity() {
            Severity::Info => tracing::info!(event = event.event_type(), "{}", message),
            Severity::Warn => tracing::warn!(event = event.event_type(), "{}", message),
            Severity::Error => tracing::error!(event = event.event_type(), "{}", message),
        }
        Ok(())
    }
}

/// Dispatches events to every registered sink.
pub struct EventDispatcher {
    sinks: Vec<Box<dyn EventSink>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn dispatch(&self, event: &PipelineEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.send(event) {
                tracing::warn!("event sink error: {}", e);
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// A user-visible notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

/// Fire-and-forget notification delivery.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Logs notifications instead of showing them.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        tracing::info!(severity = ?notification.severity, "notification: {}", notification.message);
    }
}
