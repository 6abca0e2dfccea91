//! Unified diff generation for changelog entries.
//!
//! Diffs are line based with three lines of context. The "from" header is
//! labeled `(previous)` and carries the detection timestamp, the "to" header
//! is labeled `(current)`.

use similar::{ChangeTag, TextDiff};

/// Lines of unchanged context around each hunk.
pub const CONTEXT_LINES: usize = 3;

/// Wall-clock format used for diff headers and changelog entries.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in [`TIMESTAMP_FORMAT`].
#[must_use]
pub fn now_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Diff `old` against `new`, stamping the header with the current time.
///
/// An empty `old` (first observation) yields the whole of `new` as additions.
/// Identical inputs yield an empty string.
#[must_use]
pub fn unified_diff(filename: &str, old: &str, new: &str) -> String {
    unified_diff_at(filename, old, new, &now_timestamp())
}

/// Like [`unified_diff`], with an explicit header timestamp.
#[must_use]
pub fn unified_diff_at(filename: &str, old: &str, new: &str, timestamp: &str) -> String {
    if old == new {
        return String::new();
    }

    let from = format!("{filename} (previous)\t{timestamp}");
    let to = format!("{filename} (current)");

    let text_diff = TextDiff::from_lines(old, new);
    let mut unified = text_diff.unified_diff();
    unified.context_radius(CONTEXT_LINES).header(&from, &to);
    unified.to_string()
}

/// Added/removed line counts for a change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
}

/// Count inserted and deleted lines between `old` and `new`.
#[must_use]
pub fn diff_stats(old: &str, new: &str) -> DiffStats {
    TextDiff::from_lines(old, new)
        .iter_all_changes()
        .fold(DiffStats::default(), |mut stats, change| {
            match change.tag() {
                ChangeTag::Insert => stats.added += 1,
                ChangeTag::Delete => stats.removed += 1,
                ChangeTag::Equal => {}
            }
            stats
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2025-01-20 10:00:00";

    #[test]
    fn test_first_observation_is_pure_addition() {
        let diff = unified_diff_at("a.py", "", "hello\n", TS);

        assert!(diff.contains("+hello\n"));
        let body: Vec<_> = diff.lines().skip(2).collect();
        assert!(body.iter().all(|l| !l.starts_with('-') && !l.starts_with(' ')));
    }

    #[test]
    fn test_identical_content_yields_empty_diff() {
        assert_eq!(unified_diff_at("a.py", "x = 1\n", "x = 1\n", TS), "");
        assert_eq!(unified_diff("a.py", "", ""), "");
    }

    #[test]
    fn test_headers_are_labeled() {
        let diff = unified_diff_at("a.py", "x=1\n", "x=2\n", TS);

        assert!(diff.starts_with("--- a.py (previous)\t2025-01-20 10:00:00\n+++ a.py (current)\n"));
        assert!(diff.contains("@@"));
    }

    #[test]
    fn test_line_change() {
        let diff = unified_diff_at("a.py", "x=1", "x=2", TS);

        assert!(diff.contains("-x=1"));
        assert!(diff.contains("+x=2"));
    }

    #[test]
    fn test_context_is_limited() {
        let old: String = (0..20).map(|i| format!("line {i}\n")).collect();
        let new = old.replace("line 10\n", "line ten\n");
        let diff = unified_diff_at("big.py", &old, &new, TS);

        assert!(diff.contains("-line 10\n"));
        assert!(diff.contains("+line ten\n"));
        assert!(diff.contains(" line 7\n"));
        assert!(!diff.contains(" line 6\n"));
        assert!(!diff.contains(" line 14\n"));
    }

    #[test]
    fn test_diff_stats() {
        let stats = diff_stats("a\nb\nc\n", "a\nB\nc\nd\n");
        assert_eq!(stats, DiffStats { added: 2, removed: 1 });

        assert_eq!(diff_stats("same\n", "same\n"), DiffStats::default());
    }
}
