// error.rs — Error types for the patch engine.

use thiserror::Error;

/// A hunk that could not be spliced into file content.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HunkError {
    /// The hunk's old range runs past the end of the content.
    #[error("hunk at line {old_start} spans {span} line(s) but the file has {len}")]
    OutOfRange {
        old_start: usize,
        span: usize,
        len: usize,
    },

    /// A context or removed line does not match the file.
    #[error("line {line} does not match: expected {expected:?}, found {found:?}")]
    Mismatch {
        line: usize,
        expected: String,
        found: String,
    },

    /// Two hunks touch the same lines.
    #[error("hunks starting at lines {first} and {second} overlap")]
    Overlap { first: usize, second: usize },
}

/// Errors from parsing or applying a patch.
#[derive(Debug, Error)]
pub enum PatchError {
    /// Nothing in the text looked like a `---`/`+++` file header pair.
    #[error("no file headers found; expected `--- <old path>` followed by `+++ <new path>`")]
    NoFileHeaders,

    /// A `@@` line did not match `@@ -start[,count] +start[,count] @@`.
    #[error("malformed hunk header at line {line}: {text:?}")]
    MalformedHunkHeader { line: usize, text: String },

    /// A hunk appeared before any complete file header.
    #[error("hunk at line {line} does not belong to any file")]
    HunkWithoutFile { line: usize },

    /// A modify target does not exist.
    #[error("file not found: {path}. To create a new file use `--- /dev/null` as the old path")]
    MissingTarget { path: String },

    /// A hunk failed to apply to its file.
    #[error("cannot apply hunk to {path}: {source}")]
    Hunk {
        path: String,
        #[source]
        source: HunkError,
    },

    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// Writing stopped partway through a multi-file patch.
    #[error("{source} (already written: {})", .written.join(", "))]
    Partial {
        written: Vec<String>,
        #[source]
        source: Box<PatchError>,
    },
}
