// fs.rs — Apply parsed patch files to the filesystem.
//
// Two stages. Planning reads every target and computes final content in
// memory, so a missing modify target or a hunk that does not fit aborts the
// whole batch before any file is touched. Committing then writes and deletes
// in patch order; an I/O failure there reports which files were already
// written.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::apply::apply_hunks;
use crate::error::PatchError;
use crate::parse::{parse, PatchFile};

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    Created,
    Modified,
    Deleted,
    /// Delete requested for a file that was already absent.
    Skipped,
}

impl FileAction {
    pub fn label(self) -> &'static str {
        match self {
            FileAction::Created => "Created:",
            FileAction::Modified => "Modified:",
            FileAction::Deleted => "Deleted:",
            FileAction::Skipped => "Skipped (already gone):",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub action: FileAction,
    /// Path as written in the patch, without the `a/`/`b/` prefix.
    pub path: String,
}

/// Per-file results of a successful patch, in patch order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchReport {
    pub files: Vec<FileOutcome>,
}

impl PatchReport {
    /// Paths that were written or removed.
    pub fn changed_paths(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| f.action != FileAction::Skipped)
            .map(|f| f.path.clone())
            .collect()
    }
}

impl fmt::Display for PatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Patch applied successfully:")?;
        for file in &self.files {
            write!(f, "\n{} {}", file.action.label(), file.path)?;
        }
        Ok(())
    }
}

/// Strip a single `a/` or `b/` prefix.
pub fn display_path(raw: &str) -> &str {
    raw.strip_prefix("a/")
        .or_else(|| raw.strip_prefix("b/"))
        .unwrap_or(raw)
}

/// Resolve a header path against the caller's working directory.
/// Absolute paths are used as-is.
pub fn resolve_path(raw: &str, cwd: &Path) -> PathBuf {
    let stripped = Path::new(display_path(raw));
    if stripped.is_absolute() {
        stripped.to_path_buf()
    } else {
        cwd.join(stripped)
    }
}

enum Step {
    Write {
        path: PathBuf,
        content: String,
        outcome: FileOutcome,
    },
    Remove {
        path: PathBuf,
        outcome: FileOutcome,
    },
}

fn read_target(path: &Path, shown: &str) -> Result<String, PatchError> {
    if !path.is_file() {
        return Err(PatchError::MissingTarget {
            path: shown.to_string(),
        });
    }
    std::fs::read_to_string(path).map_err(io_err(path))
}

/// Compute every write and delete without touching the filesystem.
///
/// `staged` tracks content produced earlier in the same patch so a file
/// created and then edited (or edited twice) sees its own prior changes.
fn plan(files: &[PatchFile], cwd: &Path) -> Result<Vec<Step>, PatchError> {
    let mut staged: HashMap<PathBuf, Option<String>> = HashMap::new();
    let mut steps = Vec::with_capacity(files.len());

    for file in files {
        if file.is_create() {
            let shown = display_path(&file.new_path).to_string();
            let path = resolve_path(&file.new_path, cwd);
            let content = file
                .hunks
                .iter()
                .flat_map(|h| h.added_lines())
                .collect::<Vec<_>>()
                .join("\n");
            staged.insert(path.clone(), Some(content.clone()));
            steps.push(Step::Write {
                path,
                content,
                outcome: FileOutcome {
                    action: FileAction::Created,
                    path: shown,
                },
            });
        } else if file.is_delete() {
            let shown = display_path(&file.old_path).to_string();
            let path = resolve_path(&file.old_path, cwd);
            let present = match staged.get(&path) {
                Some(content) => content.is_some(),
                None => path.exists(),
            };
            staged.insert(path.clone(), None);
            let action = if present {
                FileAction::Deleted
            } else {
                FileAction::Skipped
            };
            steps.push(Step::Remove {
                path,
                outcome: FileOutcome {
                    action,
                    path: shown,
                },
            });
        } else {
            let shown = display_path(&file.old_path).to_string();
            let path = resolve_path(&file.old_path, cwd);
            let current = match staged.get(&path) {
                Some(Some(content)) => content.clone(),
                Some(None) => {
                    return Err(PatchError::MissingTarget { path: shown });
                }
                None => read_target(&path, &shown)?,
            };
            let content =
                apply_hunks(&current, &file.hunks).map_err(|source| PatchError::Hunk {
                    path: shown.clone(),
                    source,
                })?;
            staged.insert(path.clone(), Some(content.clone()));
            steps.push(Step::Write {
                path,
                content,
                outcome: FileOutcome {
                    action: FileAction::Modified,
                    path: shown,
                },
            });
        }
    }

    Ok(steps)
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PatchError {
    let path = path.display().to_string();
    move |source| PatchError::IoError { path, source }
}

fn commit_step(step: &Step) -> Result<(), PatchError> {
    match step {
        Step::Write { path, content, .. } => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(io_err(parent))?;
            }
            std::fs::write(path, content).map_err(io_err(path))
        }
        Step::Remove { path, outcome } => {
            if outcome.action == FileAction::Skipped {
                return Ok(());
            }
            match std::fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(io_err(path)(e)),
            }
        }
    }
}

/// Apply already-parsed files relative to `cwd`.
pub fn apply_files(files: &[PatchFile], cwd: &Path) -> Result<PatchReport, PatchError> {
    let steps = plan(files, cwd)?;

    let mut report = PatchReport::default();
    let mut written: Vec<String> = Vec::new();
    for step in steps {
        let outcome = match &step {
            Step::Write { outcome, .. } | Step::Remove { outcome, .. } => outcome.clone(),
        };
        if let Err(source) = commit_step(&step) {
            tracing::warn!(path = %outcome.path, error = %source, "patch write failed");
            if written.is_empty() {
                return Err(source);
            }
            return Err(PatchError::Partial {
                written,
                source: Box::new(source),
            });
        }
        tracing::debug!(path = %outcome.path, action = ?outcome.action, "patch step applied");
        if outcome.action != FileAction::Skipped {
            written.push(outcome.path.clone());
        }
        report.files.push(outcome);
    }

    tracing::info!(files = report.files.len(), "patch applied");
    Ok(report)
}

/// Parse `text` and apply it relative to `cwd`.
pub fn apply_patch(text: &str, cwd: &Path) -> Result<PatchReport, PatchError> {
    let files = parse(text)?;
    apply_files(&files, cwd)
}
