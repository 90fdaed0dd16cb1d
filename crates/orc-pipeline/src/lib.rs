//! # orc-pipeline
//!
//! Phase state machine for the orchestra change pipeline.
//!
//! An orchestrator agent must brainstorm, refine a spec, dispatch the
//! implementation, review the result and report, in that order, with at most
//! three review-retry cycles per run.
//!
//! ## Key components
//!
//! - [`Phase`] / [`Alias`] — the phases and the static transition table
//! - [`PipelineState`] — per-session progress, `advance` and auto-advance
//! - [`SessionRegistry`] — primary/subagent classification with idle eviction
//! - [`DispatchOutcome`] — structured result of a dispatched task
//! - [`guidance`] — status line, banner and phase instructions
//! - [`EventDispatcher`] / [`Notifier`] — structured log and notification seams

pub mod dispatch;
pub mod error;
pub mod events;
pub mod guidance;
pub mod phase;
pub mod registry;
pub mod state;

pub use dispatch::DispatchOutcome;
pub use error::{AdvanceError, PipelineError};
pub use events::{
    EventDispatcher, EventSink, JsonlSink, Notification, Notifier, PipelineEvent, Severity,
    TracingNotifier, TracingSink,
};
pub use phase::{Alias, Phase, RepoStatus};
pub use registry::{SessionClass, SessionEntry, SessionRegistry, TurnOutcome};
pub use state::{CompletionSummary, DispatchObservation, PipelineState, Transition, MAX_ITERATIONS};
