//! Per-line diagnostic suppression.
//!
//! A line whose trailing comment text equals `noqa` (case-insensitive)
//! suppresses every diagnostic that starts on it. Suppression is applied in
//! exactly one place: the diagnostics publisher.

use rustc_hash::FxHashSet;

/// One-indexed line numbers carrying a `noqa` comment.
pub fn suppressed_lines(text: &str) -> FxHashSet<u32> {
    let mut lines = FxHashSet::default();
    for (index, line) in text.lines().enumerate() {
        if has_noqa_comment(line) {
            lines.insert(index as u32 + 1);
        }
    }
    lines
}

fn has_noqa_comment(line: &str) -> bool {
    let Some(hash) = line.rfind('#') else {
        return false;
    };
    line[hash + 1..].trim().eq_ignore_ascii_case("noqa")
}

#[cfg(test)]
mod tests {
    use super::{has_noqa_comment, suppressed_lines};

    #[test]
    fn trailing_noqa_comment() {
        assert!(has_noqa_comment("import missing  # noqa"));
        assert!(has_noqa_comment("import missing  #noqa"));
        assert!(has_noqa_comment("import missing  # NOQA"));
        assert!(!has_noqa_comment("import missing"));
        assert!(!has_noqa_comment("import missing  # noqa: F401"));
        assert!(!has_noqa_comment("# comment mentioning noqa rules"));
    }

    #[test]
    fn one_indexed_lines() {
        let lines = suppressed_lines("clean = 1\nbad = 2  # noqa\n");
        assert!(!lines.contains(&1));
        assert!(lines.contains(&2));
    }
}
