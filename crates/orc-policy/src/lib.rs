//! # orc-policy
//!
//! Tool gate for the orchestra change pipeline.
//!
//! The [`ToolGate`] decides, per tool call, whether a session may use a tool
//! given how the session is classified and which phase its pipeline is in.
//!
//! ## Key invariants
//!
//! - **Subagents are allow-listed**: anything outside [`GateConfig::subagent_allow`]
//!   is refused.
//! - **The orchestrator delegates edits**: direct file-mutation tools are
//!   always refused while a pipeline is attached.
//! - **Dispatch is phase-bound**: the dispatch tool only runs in DISPATCHING.

pub mod config;
pub mod error;
pub mod gate;

pub use config::GateConfig;
pub use error::PolicyError;
pub use gate::{CallerClass, GateDecision, GateStep, GateTrace, ToolGate, ToolRequest};
