// server.rs — MCP server exposing the pipeline tools.
//
// OrcGatewayServer implements the rmcp ServerHandler trait on top of a
// shared PipelineHost. Every tool answers with plain text meant for the
// calling agent; refusals are ordinary replies, never protocol errors.
//
// Tools:
//   pipeline_advance — request a phase transition by alias
//   pipeline_status  — current phase, counters and guidance
//   apply_patch      — apply a unified diff to the workspace

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::host::PipelineHost;

// ── Tool parameter types ─────────────────────────────────────────

/// Parameters for `pipeline_advance`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AdvanceParams {
    /// Session whose pipeline should move: the id shown in the
    /// `[PIPELINE session=<id>]` banner.
    pub session_id: String,
    /// Transition alias: refine, dispatch, iterate, report or complete.
    pub target: String,
}

/// Parameters for `pipeline_status`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct StatusParams {
    /// Session to report on: the id shown in the `[PIPELINE session=<id>]` banner.
    pub session_id: String,
}

/// Parameters for `apply_patch`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ApplyPatchParams {
    /// Unified diff text. Use `--- /dev/null` to create a file and
    /// `+++ /dev/null` to delete one.
    pub patch: String,
    /// Calling session, recorded in the event log when given.
    #[serde(default)]
    pub session_id: Option<String>,
}

// ── MCP Server ───────────────────────────────────────────────────

pub struct OrcGatewayServer {
    host: Arc<PipelineHost>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl OrcGatewayServer {
    /// Create a server with its own host built from config.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        Ok(Self::with_host(Arc::new(PipelineHost::new(config)?)))
    }

    /// Create a server sharing an existing host (the hook API uses the same one).
    pub fn with_host(host: Arc<PipelineHost>) -> Self {
        Self {
            host,
            tool_router: Self::tool_router(),
        }
    }

    pub fn host(&self) -> &Arc<PipelineHost> {
        &self.host
    }

    #[tool(
        description = "Advance the change pipeline. Targets: refine (brainstorming → refining), dispatch (refining → dispatching), iterate (reviewing → dispatching, at most 3 times), report (reviewing → reporting, needs `git diff` first in a git repository), complete (reporting → complete). Pass the session_id from your [PIPELINE session=<id>] banner. Returns guidance for the new phase or an ERROR explaining why the transition was refused."
    )]
    async fn pipeline_advance(
        &self,
        Parameters(params): Parameters<AdvanceParams>,
    ) -> Result<CallToolResult, McpError> {
        let reply = self.host.advance(&params.session_id, &params.target).await;
        Ok(CallToolResult::success(vec![Content::text(reply)]))
    }

    #[tool(
        description = "Show the pipeline status: phase, iteration count, whether `git diff` has been run, dispatch count, valid transitions and what to do next. Pass the session_id from your [PIPELINE session=<id>] banner."
    )]
    async fn pipeline_status(
        &self,
        Parameters(params): Parameters<StatusParams>,
    ) -> Result<CallToolResult, McpError> {
        let reply = self.host.status(&params.session_id).await;
        Ok(CallToolResult::success(vec![Content::text(reply)]))
    }

    #[tool(
        description = "Apply a unified diff to files in the workspace. Supports multiple files, creating files (--- /dev/null) and deleting files (+++ /dev/null). Every target is checked before anything is written."
    )]
    fn apply_patch(
        &self,
        Parameters(params): Parameters<ApplyPatchParams>,
    ) -> Result<CallToolResult, McpError> {
        let reply = self
            .host
            .apply_patch(params.session_id.as_deref(), &params.patch);
        Ok(CallToolResult::success(vec![Content::text(reply)]))
    }
}

// ── ServerHandler implementation ─────────────────────────────────

#[tool_handler]
impl ServerHandler for OrcGatewayServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "orchestra".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: Some("Orchestra change pipeline".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Orchestra pipeline server. Orchestrator sessions move through \
                 brainstorming, refining, dispatching, reviewing and reporting. \
                 Each turn's [PIPELINE session=<id>] banner carries your session id. \
                 Call pipeline_status to see where you are and pipeline_advance \
                 to move on. apply_patch applies unified diffs."
                    .into(),
            ),
        }
    }
}
