// apply.rs — Splice hunks into in-memory file content.
//
// Hunks are applied bottom-up (descending old start) so earlier splices never
// shift the line numbers of hunks still waiting. Every context and removed
// line is checked against the content before anything is replaced; trailing
// whitespace is ignored in that comparison.

use crate::error::HunkError;
use crate::parse::Hunk;

/// Where a hunk lands in the split content, as a 0-based index and length.
#[derive(Debug, Clone, Copy)]
struct Span {
    index: usize,
    len: usize,
}

fn span_of(hunk: &Hunk) -> Span {
    let len = hunk.old_lines().count();
    // An empty old range names the line *after which* new lines go.
    let index = if len == 0 {
        hunk.old_start
    } else {
        hunk.old_start.saturating_sub(1)
    };
    Span { index, len }
}

/// Apply `hunks` to `content`, in any order, returning the new content.
pub fn apply_hunks(content: &str, hunks: &[Hunk]) -> Result<String, HunkError> {
    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();

    let mut ordered: Vec<(&Hunk, Span)> = hunks.iter().map(|h| (h, span_of(h))).collect();
    // An insertion and a replacement can share an index (`-U0` output); the
    // insertion sorts first so it is spliced after the replacement.
    ordered.sort_by_key(|(_, span)| (span.index, span.len));

    for pair in ordered.windows(2) {
        let (first, a) = pair[0];
        let (second, b) = pair[1];
        if b.index < a.index + a.len {
            return Err(HunkError::Overlap {
                first: first.old_start,
                second: second.old_start,
            });
        }
    }

    for (hunk, span) in ordered.into_iter().rev() {
        if span.index + span.len > lines.len() {
            return Err(HunkError::OutOfRange {
                old_start: hunk.old_start,
                span: span.len,
                len: lines.len(),
            });
        }

        for (offset, expected) in hunk.old_lines().enumerate() {
            let found = &lines[span.index + offset];
            if found.trim_end() != expected.trim_end() {
                return Err(HunkError::Mismatch {
                    line: span.index + offset + 1,
                    expected: expected.to_string(),
                    found: found.clone(),
                });
            }
        }

        let replacement: Vec<String> = hunk.new_lines().map(str::to_string).collect();
        lines.splice(span.index..span.index + span.len, replacement);
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse, HunkLine};

    fn hunks_of(patch: &str) -> Vec<Hunk> {
        parse(patch).unwrap().remove(0).hunks
    }

    const BEFORE: &str = "one\ntwo\nthree\nfour\nfive\nsix\nseven\n";
    const AFTER: &str = "one\nTWO\nthree\nfour\nfive\nsix\nseven\neight\n";

    const TWO_HUNKS: &str = "\
--- a/n.txt
+++ b/n.txt
@@ -1,3 +1,3 @@
 one
-two
+TWO
 three
@@ -6,3 +6,4 @@
 six
 seven
+eight

";

    #[test]
    fn applies_hunks_in_file_order() {
        let hunks = hunks_of(TWO_HUNKS);
        assert_eq!(apply_hunks(BEFORE, &hunks).unwrap(), AFTER);
    }

    #[test]
    fn hunk_order_does_not_matter() {
        let mut hunks = hunks_of(TWO_HUNKS);
        hunks.reverse();
        assert_eq!(apply_hunks(BEFORE, &hunks).unwrap(), AFTER);
    }

    /// Every ordering of `items`.
    fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head.clone());
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn zero_context_insertion_next_to_replacement_in_either_order() {
        let text = "--- a/x\n+++ b/x\n@@ -2,0 +3 @@\n+ins\n@@ -3 +4 @@\n-c\n+C\n";
        let mut hunks = hunks_of(text);
        assert_eq!(apply_hunks("a\nb\nc\nd", &hunks).unwrap(), "a\nb\nins\nC\nd");
        hunks.reverse();
        assert_eq!(apply_hunks("a\nb\nc\nd", &hunks).unwrap(), "a\nb\nins\nC\nd");
    }

    #[test]
    fn every_hunk_order_gives_the_same_result() {
        let text = "\
--- a/x
+++ b/x
@@ -0,0 +1 @@
+top
@@ -2,0 +4 @@
+ins
@@ -3 +5 @@
-c
+C
@@ -5 +7 @@
-e
+E
";
        let hunks = hunks_of(text);
        assert_eq!(hunks.len(), 4);
        let orders = permutations(&hunks);
        assert_eq!(orders.len(), 24);
        for order in orders {
            let starts: Vec<usize> = order.iter().map(|h| h.old_start).collect();
            assert_eq!(
                apply_hunks("a\nb\nc\nd\ne", &order).unwrap(),
                "top\na\nb\nins\nC\nd\nE",
                "order {:?}",
                starts
            );
        }
    }

    #[test]
    fn pure_insertion_goes_after_named_line() {
        let mut hunk = Hunk::new(2, 0, 3, 1);
        hunk.lines.push(HunkLine::Add("inserted".into()));
        assert_eq!(apply_hunks("a\nb\nc", &[hunk]).unwrap(), "a\nb\ninserted\nc");
    }

    #[test]
    fn insertion_at_top_of_file() {
        let mut hunk = Hunk::new(0, 0, 1, 1);
        hunk.lines.push(HunkLine::Add("header".into()));
        assert_eq!(apply_hunks("body", &[hunk]).unwrap(), "header\nbody");
    }

    #[test]
    fn mismatched_context_is_rejected() {
        let hunks = hunks_of("--- a/x\n+++ b/x\n@@ -2,1 +2,1 @@\n-beta\n+BETA\n");
        let err = apply_hunks("alpha\ngamma\n", &hunks).unwrap_err();
        assert_eq!(
            err,
            HunkError::Mismatch {
                line: 2,
                expected: "beta".into(),
                found: "gamma".into()
            }
        );
    }

    #[test]
    fn trailing_whitespace_is_tolerated() {
        let hunks = hunks_of("--- a/x\n+++ b/x\n@@ -1 +1 @@\n-value = 1\n+value = 2\n");
        assert_eq!(apply_hunks("value = 1   \n", &hunks).unwrap(), "value = 2\n");
    }

    #[test]
    fn out_of_range_hunk_is_rejected() {
        let hunks = hunks_of("--- a/x\n+++ b/x\n@@ -10,2 +10,2 @@\n-a\n-b\n+c\n+d\n");
        assert!(matches!(
            apply_hunks("a\nb", &hunks),
            Err(HunkError::OutOfRange { old_start: 10, span: 2, len: 2 })
        ));
    }

    #[test]
    fn overlapping_hunks_are_rejected() {
        let text = "--- a/x\n+++ b/x\n@@ -1,2 +1,2 @@\n a\n-b\n+B\n@@ -2,1 +2,1 @@\n-b\n+bb\n";
        assert!(matches!(
            apply_hunks("a\nb\nc", &hunks_of(text)),
            Err(HunkError::Overlap { first: 1, second: 2 })
        ));
    }

    #[test]
    fn failed_apply_returns_error_not_partial_content() {
        // Second hunk (applied first) is fine, first hunk is wrong: still an error.
        let text = "--- a/x\n+++ b/x\n@@ -1 +1 @@\n-nope\n+x\n@@ -3 +3 @@\n-c\n+C\n";
        assert!(apply_hunks("a\nb\nc", &hunks_of(text)).is_err());
    }
}
