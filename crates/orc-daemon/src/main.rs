//! # orc-daemon
//!
//! Orchestra pipeline daemon.
//!
//! Serves the pipeline MCP tools on stdio and the hook HTTP API on a
//! loopback address, both backed by one shared `PipelineHost`.
//!
//! ## Usage
//!
//! Typically started by the MCP client via `.mcp.json`:
//! ```json
//! {
//!   "mcpServers": {
//!     "orchestra": {
//!       "type": "stdio",
//!       "command": "cargo",
//!       "args": ["run", "-p", "orc-daemon", "--", "--project-root", "."]
//!     }
//!   }
//! }
//! ```
//! The host's plugin hooks then talk to `http://127.0.0.1:7411`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use rmcp::ServiceExt;
use tracing_subscriber::EnvFilter;

use orc_gateway::{hook_router, GatewayConfig, HookState, OrcGatewayServer, Outbox, PipelineHost};

/// Orchestra pipeline server.
#[derive(Parser, Debug)]
#[command(name = "orc-daemon", about = "Orchestra change pipeline MCP server")]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Config file (defaults to <project-root>/.orc/config.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address for the hook API; overrides the config file.
    #[arg(long)]
    hook_addr: Option<SocketAddr>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) -> Result<()> {
    // Logs go to stderr so they don't interfere with MCP on stdout.
    let filter = EnvFilter::from_default_env()
        .add_directive("orc_gateway=info".parse()?)
        .add_directive("orc_daemon=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<GatewayConfig> {
    let project_root = cli.project_root.canonicalize()?;
    let mut config = GatewayConfig::load(&project_root, cli.config.as_deref())?;
    if let Some(addr) = cli.hook_addr {
        config.hook_addr = addr;
    }
    if !config.hook_addr.ip().is_loopback() {
        bail!(
            "hook API must listen on a loopback address, got {}",
            config.hook_addr
        );
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let config = resolve_config(&cli)?;
    tracing::info!("Starting orchestra pipeline server");
    tracing::info!("Project root: {}", config.workspace_root.display());
    tracing::info!("Event log: {}", config.events_log.display());

    let outbox = Arc::new(Outbox::new());
    let hook_addr = config.hook_addr;
    let host = Arc::new(PipelineHost::new(config)?.with_notifier(outbox.clone()));

    let listener = tokio::net::TcpListener::bind(hook_addr).await?;
    tracing::info!("Hook API listening on http://{}", hook_addr);
    let app = hook_router(HookState {
        host: host.clone(),
        outbox,
    });
    let hooks = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("hook API stopped: {}", e);
        }
    });

    let server = OrcGatewayServer::with_host(host);
    tracing::info!("MCP server ready, waiting for client connection");

    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .inspect_err(|e| tracing::error!("serving error: {:?}", e))?;

    service.waiting().await?;

    hooks.abort();
    tracing::info!("MCP server shutting down");
    Ok(())
}
