// probe.rs — Is this directory inside a git work tree?
//
// Runs `git rev-parse --is-inside-work-tree` once and folds every failure
// (timeout, git missing, non-zero exit, unexpected output) into
// `RepoStatus::No`. The caller memoizes the answer per session.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use orc_pipeline::RepoStatus;

use crate::runner::{CommandRunner, TokioRunner};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Clone)]
pub struct GitProbe {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl GitProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn is_repo(&self, dir: &Path) -> RepoStatus {
        let args = ["rev-parse", "--is-inside-work-tree"];
        match self.runner.run("git", &args, dir, self.timeout).await {
            Ok(out) if out.success && out.stdout == "true" => RepoStatus::Yes,
            Ok(out) => {
                tracing::debug!(dir = %dir.display(), code = ?out.code, "not a git work tree");
                RepoStatus::No
            }
            Err(e) => {
                tracing::warn!(
                    dir = %dir.display(),
                    error = %e,
                    "git probe failed, assuming no repository"
                );
                RepoStatus::No
            }
        }
    }
}

impl Default for GitProbe {
    fn default() -> Self {
        Self::new(Arc::new(TokioRunner), DEFAULT_PROBE_TIMEOUT)
    }
}
