// parse.rs — Unified diff text → PatchFile / Hunk records.
//
// Recognized structure, line by line:
//   --- <old path>                    starts a file
//   +++ <new path>                    completes it
//   @@ -a[,b] +c[,d] [@@ ...]         starts a hunk (counts default to 1)
//   " x" / "+x" / "-x"                 context / add / remove
//   \ No newline at end of file        ignored
//
// Anything else (`diff --git`, `index ...`, prose) is skipped. While a hunk
// still owes lines according to its header, a `--- ` line is read as a
// removal unless the next line is a `+++ ` header. Hunk counts from model
// output are often wrong, so a header pair always wins over the counts.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PatchError;

/// Path used in headers for "no file" (create / delete).
pub const DEV_NULL: &str = "/dev/null";

/// One line of a hunk body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum HunkLine {
    Context(String),
    Add(String),
    Remove(String),
}

/// A contiguous block of line edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    /// 1-based first line of the old range (0 for an empty old range at the top).
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    pub fn new(old_start: usize, old_count: usize, new_start: usize, new_count: usize) -> Self {
        Self {
            old_start,
            old_count,
            new_start,
            new_count,
            lines: Vec::new(),
        }
    }

    /// Context and removed lines, in order: what the hunk expects to find.
    pub fn old_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| match l {
            HunkLine::Context(s) | HunkLine::Remove(s) => Some(s.as_str()),
            HunkLine::Add(_) => None,
        })
    }

    /// Context and added lines, in order: what replaces the old lines.
    pub fn new_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| match l {
            HunkLine::Context(s) | HunkLine::Add(s) => Some(s.as_str()),
            HunkLine::Remove(_) => None,
        })
    }

    /// Added lines only.
    pub fn added_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| match l {
            HunkLine::Add(s) => Some(s.as_str()),
            _ => None,
        })
    }
}

/// One file's worth of hunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchFile {
    pub old_path: String,
    pub new_path: String,
    pub hunks: Vec<Hunk>,
}

impl PatchFile {
    pub fn is_create(&self) -> bool {
        self.old_path == DEV_NULL
    }

    pub fn is_delete(&self) -> bool {
        self.new_path == DEV_NULL
    }
}

fn hunk_header() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))?(?: @@|\s*$)").ok())
        .as_ref()
}

/// Header path: surrounding whitespace and any tab-separated timestamp removed.
fn header_path(rest: &str) -> String {
    rest.split('\t').next().unwrap_or(rest).trim().to_string()
}

fn parse_hunk_header(line: &str, line_no: usize) -> Result<Hunk, PatchError> {
    let malformed = || PatchError::MalformedHunkHeader {
        line: line_no,
        text: line.to_string(),
    };
    let caps = hunk_header()
        .and_then(|re| re.captures(line))
        .ok_or_else(malformed)?;
    let num = |i: usize, default: usize| -> Result<usize, PatchError> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().map_err(|_| malformed()),
            None => Ok(default),
        }
    };
    Ok(Hunk::new(num(1, 0)?, num(2, 1)?, num(3, 0)?, num(4, 1)?))
}

/// Parse unified diff text into file records, in the order they appear.
pub fn parse(text: &str) -> Result<Vec<PatchFile>, PatchError> {
    let mut files: Vec<PatchFile> = Vec::new();
    let mut pending_old: Option<String> = None;
    let mut in_hunk = false;
    // Old and new lines the current hunk's header still promises.
    let mut owed = (0usize, 0usize);

    let mut lines = text.lines().enumerate().peekable();
    while let Some((idx, line)) = lines.next() {
        let line_no = idx + 1;
        let next_is_new_header = lines
            .peek()
            .is_some_and(|(_, next)| next.starts_with("+++ "));

        let hunk_owes_lines = in_hunk && (owed.0 > 0 || owed.1 > 0);

        if let Some(rest) = line.strip_prefix("--- ") {
            if !hunk_owes_lines || next_is_new_header {
                pending_old = Some(header_path(rest));
                in_hunk = false;
                continue;
            }
        }

        if let Some(rest) = line.strip_prefix("+++ ") {
            if let Some(old_path) = pending_old.take() {
                files.push(PatchFile {
                    old_path,
                    new_path: header_path(rest),
                    hunks: Vec::new(),
                });
                in_hunk = false;
                continue;
            }
        }

        if line.starts_with("@@") {
            let hunk = parse_hunk_header(line, line_no)?;
            owed = (hunk.old_count, hunk.new_count);
            let file = files
                .last_mut()
                .filter(|_| pending_old.is_none())
                .ok_or(PatchError::HunkWithoutFile { line: line_no })?;
            file.hunks.push(hunk);
            in_hunk = true;
            continue;
        }

        if line.starts_with('\\') {
            continue;
        }

        if !in_hunk {
            continue;
        }
        let Some(hunk) = files.last_mut().and_then(|f| f.hunks.last_mut()) else {
            continue;
        };

        let edit = if let Some(s) = line.strip_prefix(' ') {
            HunkLine::Context(s.to_string())
        } else if let Some(s) = line.strip_prefix('+') {
            HunkLine::Add(s.to_string())
        } else if let Some(s) = line.strip_prefix('-') {
            HunkLine::Remove(s.to_string())
        } else if line.is_empty() && hunk_owes_lines {
            // Editors strip the lone space of an empty context line.
            HunkLine::Context(String::new())
        } else {
            in_hunk = false;
            continue;
        };
        match &edit {
            HunkLine::Context(_) => owed = (owed.0.saturating_sub(1), owed.1.saturating_sub(1)),
            HunkLine::Add(_) => owed.1 = owed.1.saturating_sub(1),
            HunkLine::Remove(_) => owed.0 = owed.0.saturating_sub(1),
        }
        hunk.lines.push(edit);
    }

    if files.is_empty() {
        return Err(PatchError::NoFileHeaders);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_file_single_hunk() {
        let text = "--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -1,3 +1,3 @@\n fn a() {}\n-fn b() {}\n+fn c() {}\n fn d() {}\n";
        let files = parse(text).unwrap();
        assert_eq!(files.len(), 1);
        let f = &files[0];
        assert_eq!(f.old_path, "a/src/lib.rs");
        assert_eq!(f.new_path, "b/src/lib.rs");
        assert_eq!(f.hunks.len(), 1);
        let h = &f.hunks[0];
        assert_eq!((h.old_start, h.old_count, h.new_start, h.new_count), (1, 3, 1, 3));
        assert_eq!(
            h.lines,
            vec![
                HunkLine::Context("fn a() {}".into()),
                HunkLine::Remove("fn b() {}".into()),
                HunkLine::Add("fn c() {}".into()),
                HunkLine::Context("fn d() {}".into()),
            ]
        );
    }

    #[test]
    fn counts_default_to_one() {
        let files = parse("--- a/x\n+++ b/x\n@@ -4 +4 @@\n-old\n+new\n").unwrap();
        let h = &files[0].hunks[0];
        assert_eq!((h.old_start, h.old_count, h.new_start, h.new_count), (4, 1, 4, 1));
    }

    #[test]
    fn header_paths_are_trimmed_and_timestamps_dropped() {
        let text = "---  a/x.txt \t2024-01-01 00:00:00\n+++ b/x.txt\t2024-01-02\n@@ -1 +1 @@\n-a\n+b\n";
        let files = parse(text).unwrap();
        assert_eq!(files[0].old_path, "a/x.txt");
        assert_eq!(files[0].new_path, "b/x.txt");
    }

    #[test]
    fn no_newline_marker_is_discarded() {
        let text = "--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n\\ No newline at end of file\n+b\n\\ No newline at end of file\n";
        let h = &parse(text).unwrap()[0].hunks[0];
        assert_eq!(
            h.lines,
            vec![HunkLine::Remove("a".into()), HunkLine::Add("b".into())]
        );
    }

    #[test]
    fn multiple_files_and_git_noise() {
        let text = "\
diff --git a/one.txt b/one.txt
index 1111111..2222222 100644
--- a/one.txt
+++ b/one.txt
@@ -1 +1 @@
-1
+one
diff --git a/two.txt b/two.txt
new file mode 100644
--- /dev/null
+++ b/two.txt
@@ -0,0 +1,2 @@
+first
+second
";
        let files = parse(text).unwrap();
        assert_eq!(files.len(), 2);
        assert!(!files[0].is_create());
        assert!(files[1].is_create());
        assert_eq!(
            files[1].hunks[0].added_lines().collect::<Vec<_>>(),
            vec!["first", "second"]
        );
    }

    #[test]
    fn removed_line_that_looks_like_header_stays_in_hunk() {
        // Removing the markdown rule "-- x" renders as "--- x".
        let text = "--- a/doc.md\n+++ b/doc.md\n@@ -1,2 +1,1 @@\n--- x\n keep\n";
        let files = parse(text).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(
            files[0].hunks[0].lines,
            vec![
                HunkLine::Remove("-- x".into()),
                HunkLine::Context("keep".into())
            ]
        );
    }

    #[test]
    fn blank_line_inside_hunk_is_empty_context() {
        let text = "--- a/x\n+++ b/x\n@@ -1,3 +1,3 @@\n a\n\n-b\n+c\n";
        let h = &parse(text).unwrap()[0].hunks[0];
        assert_eq!(h.lines[1], HunkLine::Context(String::new()));
        assert_eq!(h.lines.len(), 4);
    }

    #[test]
    fn delete_sentinel_detected() {
        let files = parse("--- a/gone.txt\n+++ /dev/null\n@@ -1 +0,0 @@\n-bye\n").unwrap();
        assert!(files[0].is_delete());
        assert_eq!(files[0].hunks[0].new_count, 0);
    }

    #[test]
    fn text_without_headers_is_rejected() {
        assert!(matches!(
            parse("just some prose\nnothing here"),
            Err(PatchError::NoFileHeaders)
        ));
    }

    #[test]
    fn malformed_hunk_header_is_rejected() {
        let err = parse("--- a/x\n+++ b/x\n@@ one two @@\n+a\n").unwrap_err();
        assert!(matches!(err, PatchError::MalformedHunkHeader { line: 3, .. }));
    }

    #[test]
    fn closing_hunk_marker_is_optional() {
        let files = parse("--- a/x\n+++ b/x\n@@ -1,2 +1,2\n a\n-b\n+c\n").unwrap();
        let h = &files[0].hunks[0];
        assert_eq!((h.old_start, h.old_count, h.new_start, h.new_count), (1, 2, 1, 2));
        assert_eq!(h.lines.len(), 3);

        let err = parse("--- a/x\n+++ b/x\n@@ -1,2 +1,2x\n a\n").unwrap_err();
        assert!(matches!(err, PatchError::MalformedHunkHeader { line: 3, .. }));
    }

    #[test]
    fn large_create_hunk_is_read_in_full() {
        let n = 50_000;
        let mut text = format!("--- /dev/null\n+++ b/big.txt\n@@ -0,0 +1,{} @@\n", n);
        for i in 0..n {
            text.push_str(&format!("+line {}\n", i));
        }
        // A blank line after the last promised line ends the hunk.
        text.push_str("\n+stray\n");
        let files = parse(&text).unwrap();
        let h = &files[0].hunks[0];
        assert_eq!(h.added_lines().count(), n);
        assert_eq!(h.added_lines().last(), Some("line 49999"));
    }

    #[test]
    fn hunk_before_file_header_is_rejected() {
        let err = parse("@@ -1 +1 @@\n-a\n+b\n").unwrap_err();
        assert!(matches!(err, PatchError::HunkWithoutFile { line: 1 }));
    }

    #[test]
    fn serializes_hunk_lines_with_kind_tag() {
        let json = serde_json::to_string(&HunkLine::Add("x".into())).unwrap();
        assert_eq!(json, r#"{"kind":"add","text":"x"}"#);
    }
}
