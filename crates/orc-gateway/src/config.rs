// config.rs — Gateway configuration.
//
// GatewayConfig says where the gateway keeps its files and how it names the
// host's agents and tools. `for_project()` produces the defaults under a
// `.orc/` directory in the project root; `load()` overlays an optional
// `.orc/config.toml` on top of them.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use orc_policy::GateConfig;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

pub const DEFAULT_HOOK_ADDR: &str = "127.0.0.1:7411";

/// Configuration for the pipeline gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Root directory of the project. Patches resolve relative paths here and
    /// the repository probe runs here.
    pub workspace_root: PathBuf,

    /// Append-only JSONL log of pipeline events.
    pub events_log: PathBuf,

    /// Agent name whose sessions get a pipeline (case-insensitive).
    pub orchestrator_agent: String,

    /// Sessions idle longer than this are forgotten.
    pub session_ttl_secs: u64,

    /// Upper bound on the `git rev-parse` probe.
    pub probe_timeout_ms: u64,

    /// Loopback address for the hook HTTP API.
    pub hook_addr: SocketAddr,

    #[serde(default)]
    pub gate: GateConfig,
}

/// On-disk shape of `.orc/config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    events_log: Option<PathBuf>,
    orchestrator_agent: Option<String>,
    session_ttl_secs: Option<u64>,
    probe_timeout_ms: Option<u64>,
    hook_addr: Option<SocketAddr>,
    gate: Option<GateConfig>,
}

impl GatewayConfig {
    /// Create a config with the standard `.orc/` layout for a project.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        let orc_dir = root.join(".orc");
        Self {
            workspace_root: root,
            events_log: orc_dir.join("events.jsonl"),
            orchestrator_agent: "orchestrator".to_string(),
            session_ttl_secs: 86_400,
            probe_timeout_ms: 3_000,
            hook_addr: SocketAddr::from(([127, 0, 0, 1], 7411)),
            gate: GateConfig::default(),
        }
    }

    /// Default location of the config file for a project.
    pub fn default_path(project_root: impl AsRef<Path>) -> PathBuf {
        project_root.as_ref().join(".orc").join("config.toml")
    }

    /// Defaults for `project_root`, overlaid with `config_path` (or the
    /// default location) when that file exists.
    pub fn load(
        project_root: impl AsRef<Path>,
        config_path: Option<&Path>,
    ) -> Result<Self, GatewayError> {
        let root = project_root.as_ref();
        let mut config = Self::for_project(root);

        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| Self::default_path(root));
        if !path.exists() {
            if config_path.is_some() {
                return Err(GatewayError::ConfigNotFound {
                    path: path.display().to_string(),
                });
            }
            return Ok(config);
        }

        let text = std::fs::read_to_string(&path).map_err(|source| GatewayError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&text).map_err(|e| GatewayError::InvalidConfig {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.overlay(file);
        tracing::debug!(path = %path.display(), "loaded gateway config");
        Ok(config)
    }

    fn overlay(&mut self, file: ConfigFile) {
        if let Some(events_log) = file.events_log {
            self.events_log = if events_log.is_absolute() {
                events_log
            } else {
                self.workspace_root.join(events_log)
            };
        }
        if let Some(agent) = file.orchestrator_agent {
            self.orchestrator_agent = agent;
        }
        if let Some(ttl) = file.session_ttl_secs {
            self.session_ttl_secs = ttl;
        }
        if let Some(ms) = file.probe_timeout_ms {
            self.probe_timeout_ms = ms;
        }
        if let Some(addr) = file.hook_addr {
            self.hook_addr = addr;
        }
        if let Some(gate) = file.gate {
            self.gate = gate;
        }
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.session_ttl_secs).unwrap_or(i64::MAX))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_live_under_dot_orc() {
        let cfg = GatewayConfig::for_project("/work/project");
        assert_eq!(cfg.events_log, PathBuf::from("/work/project/.orc/events.jsonl"));
        assert_eq!(cfg.orchestrator_agent, "orchestrator");
        assert_eq!(cfg.hook_addr.to_string(), DEFAULT_HOOK_ADDR);
        assert_eq!(cfg.probe_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.session_ttl(), chrono::Duration::hours(24));
    }

    #[test]
    fn missing_default_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let cfg = GatewayConfig::load(dir.path(), None).unwrap();
        assert_eq!(cfg.session_ttl_secs, 86_400);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = GatewayConfig::load(dir.path(), Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, GatewayError::ConfigNotFound { .. }));
    }

    #[test]
    fn file_overlays_defaults() {
        let dir = tempdir().unwrap();
        let path = GatewayConfig::default_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"
orchestrator_agent = "conductor"
probe_timeout_ms = 500
events_log = "logs/pipeline.jsonl"

[gate]
dispatch_tool = "agent"
"#,
        )
        .unwrap();

        let cfg = GatewayConfig::load(dir.path(), None).unwrap();
        assert_eq!(cfg.orchestrator_agent, "conductor");
        assert_eq!(cfg.probe_timeout(), Duration::from_millis(500));
        assert_eq!(cfg.events_log, dir.path().join("logs/pipeline.jsonl"));
        assert_eq!(cfg.gate.dispatch_tool, "agent");
        assert_eq!(cfg.gate.shell_tool, "bash");
        assert_eq!(cfg.session_ttl_secs, 86_400);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "orchestrater_agent = \"typo\"\n").unwrap();
        let err = GatewayConfig::load(dir.path(), Some(&path)).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidConfig { .. }));
    }
}
