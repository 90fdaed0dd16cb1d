//! # orc-patch
//!
//! Unified-diff patch engine: an alternative file-mutation path for agents
//! that produce diffs instead of whole-file writes.
//!
//! [`parse`] turns diff text into [`PatchFile`] records, [`apply_hunks`]
//! splices hunks into content in any order, and [`apply_patch`] plans and
//! commits a multi-file patch against a working directory.

pub mod apply;
pub mod error;
pub mod fs;
pub mod parse;

pub use apply::apply_hunks;
pub use error::{HunkError, PatchError};
pub use fs::{apply_files, apply_patch, resolve_path, FileAction, FileOutcome, PatchReport};
pub use parse::{parse, Hunk, HunkLine, PatchFile, DEV_NULL};
