//! # orc-gateway
//!
//! Host integration for the orchestra change pipeline.
//!
//! [`PipelineHost`] owns every session's pipeline state and reacts to host
//! events. Two transports sit in front of it:
//!
//! - [`OrcGatewayServer`] — MCP tools `pipeline_advance`, `pipeline_status`
//!   and `apply_patch` over stdio
//! - [`hook_router`] — loopback HTTP endpoints for user turns, tool
//!   before/after hooks, banners and notifications

pub mod config;
pub mod error;
pub mod hooks;
pub mod host;
pub mod outbox;
pub mod server;

pub use config::{GatewayConfig, DEFAULT_HOOK_ADDR};
pub use error::GatewayError;
pub use hooks::{hook_router, HookState};
pub use host::{PipelineHost, ToolCompletion, ToolEffect, NO_PIPELINE, PATCH_FALLBACK};
pub use outbox::Outbox;
pub use server::OrcGatewayServer;
