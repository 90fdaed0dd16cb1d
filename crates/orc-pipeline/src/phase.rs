// phase.rs — Pipeline phases and the alias transition table.
//
// The pipeline walks a fixed cycle:
//   Brainstorming → Refining → Dispatching → Reviewing → Reporting → Complete
//     (Reviewing → Dispatching on `iterate`, Complete → Brainstorming on reset)
//
// Callers never name phases directly. They request a transition through a
// short alias ("refine", "report", ...). Both directions of the table are
// static: `Alias::target` is the forward map, `Phase::aliases` the reverse.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AdvanceError;

/// One discrete stage of the pipeline lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Exploring the problem with the user.
    Brainstorming,

    /// Turning the agreed idea into a concrete spec.
    Refining,

    /// Implementation work has been handed to a sub-task.
    Dispatching,

    /// Checking what the sub-task produced.
    Reviewing,

    /// Summarizing the outcome for the user.
    Reporting,

    /// Terminal. The next user turn starts a fresh pipeline.
    Complete,
}

impl Phase {
    /// Aliases an agent may request from this phase, ignoring prerequisites.
    ///
    /// Dispatching and Complete have none: they only move through
    /// auto-advance and auto-reset respectively.
    pub fn aliases(self) -> &'static [Alias] {
        match self {
            Phase::Brainstorming => &[Alias::Refine],
            Phase::Refining => &[Alias::Dispatch],
            Phase::Dispatching => &[],
            Phase::Reviewing => &[Alias::Iterate, Alias::Report],
            Phase::Reporting => &[Alias::Complete],
            Phase::Complete => &[],
        }
    }

    /// Whether `next` is reachable from this phase by any path, including
    /// the automatic ones.
    pub fn can_transition_to(self, next: Phase) -> bool {
        if matches!(
            (self, next),
            (Phase::Dispatching, Phase::Reviewing) | (Phase::Complete, Phase::Brainstorming)
        ) {
            return true;
        }
        self.aliases().iter().any(|alias| alias.target() == next)
    }

    /// Upper-case label used in agent-facing text ("Advanced to REVIEWING").
    pub fn label(self) -> &'static str {
        match self {
            Phase::Brainstorming => "BRAINSTORMING",
            Phase::Refining => "REFINING",
            Phase::Dispatching => "DISPATCHING",
            Phase::Reviewing => "REVIEWING",
            Phase::Reporting => "REPORTING",
            Phase::Complete => "COMPLETE",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Brainstorming => write!(f, "brainstorming"),
            Phase::Refining => write!(f, "refining"),
            Phase::Dispatching => write!(f, "dispatching"),
            Phase::Reviewing => write!(f, "reviewing"),
            Phase::Reporting => write!(f, "reporting"),
            Phase::Complete => write!(f, "complete"),
        }
    }
}

/// A human-facing transition name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Alias {
    Refine,
    Dispatch,
    Iterate,
    Report,
    Complete,
}

impl Alias {
    /// Every alias, in pipeline order.
    pub const ALL: [Alias; 5] = [
        Alias::Refine,
        Alias::Dispatch,
        Alias::Iterate,
        Alias::Report,
        Alias::Complete,
    ];

    /// The phase this alias moves to.
    pub fn target(self) -> Phase {
        match self {
            Alias::Refine => Phase::Refining,
            Alias::Dispatch => Phase::Dispatching,
            Alias::Iterate => Phase::Dispatching,
            Alias::Report => Phase::Reporting,
            Alias::Complete => Phase::Complete,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Alias::Refine => "refine",
            Alias::Dispatch => "dispatch",
            Alias::Iterate => "iterate",
            Alias::Report => "report",
            Alias::Complete => "complete",
        }
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Alias {
    type Err = AdvanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Alias::ALL
            .into_iter()
            .find(|alias| alias.as_str() == wanted)
            .ok_or_else(|| AdvanceError::UnknownAlias {
                given: s.trim().to_string(),
            })
    }
}

/// Render a list of aliases as "a, b" (or "none").
pub fn join_aliases(aliases: &[Alias]) -> String {
    if aliases.is_empty() {
        return "none".to_string();
    }
    aliases
        .iter()
        .map(|a| a.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether the working directory is under version control.
///
/// `Unknown` means the probe has not run yet for this session. It is a
/// distinct case, not a stand-in for either answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RepoStatus {
    #[default]
    Unknown,
    Yes,
    No,
}

impl RepoStatus {
    pub fn is_known(self) -> bool {
        !matches!(self, RepoStatus::Unknown)
    }
}
