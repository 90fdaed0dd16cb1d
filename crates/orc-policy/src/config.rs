// config.rs — Tool names the gate reasons about.
//
// Hosts name their tools differently, so everything the gate matches on is
// configurable. The defaults fit a host whose dispatch tool is `task` and
// whose shell tool is `bash`. Loaded as the `[gate]` table of the gateway
// config file; missing keys keep their defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Tool that hands work to a sub-task.
    pub dispatch_tool: String,

    /// Tool that runs shell commands (watched for `git diff`).
    pub shell_tool: String,

    /// Tools that write files directly. Always refused for the orchestrator.
    pub mutation_tools: Vec<String>,

    /// Glob patterns of tools a subagent session may call.
    pub subagent_allow: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            dispatch_tool: "task".to_string(),
            shell_tool: "bash".to_string(),
            mutation_tools: vec!["write".into(), "edit".into(), "multiedit".into()],
            subagent_allow: [
                "read",
                "write",
                "edit",
                "multiedit",
                "bash",
                "glob",
                "grep",
                "list",
                "todo*",
                "apply_patch",
                "pipeline_advance",
                "pipeline_status",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}
