//! Destructive-impact measurement for file rewrites.
//!
//! Lines are compared as sets of trimmed, non-blank text. Moving a line is
//! free, editing a line counts as one removal plus one addition, and duplicate
//! lines collapse. This undercounts changes to files with many repeated lines.

use std::collections::HashSet;

use crate::core::types::ImpactReport;

/// Compare `old` (absent for a new file) with `new`.
pub fn analyze_impact(old: Option<&str>, new: &str) -> ImpactReport {
    let old_lines = line_set(old.unwrap_or_default());
    let new_lines = line_set(new);

    let lines_removed = old_lines.difference(&new_lines).count();
    let lines_added = new_lines.difference(&old_lines).count();
    let total_old_lines = old_lines.len();

    ImpactReport {
        lines_removed,
        lines_added,
        total_old_lines,
        total_new_lines: new_lines.len(),
        percentage_removed: percentage(lines_removed, total_old_lines),
        is_new_file: old.is_none(),
    }
}

fn line_set(content: &str) -> HashSet<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (part as f64 / total as f64 * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(range: std::ops::Range<usize>) -> String {
        range
            .map(|n| format!("line {n}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn removing_forty_of_hundred_and_adding_five() {
        let old = numbered(0..100);
        let mut new = numbered(40..100);
        new.push('\n');
        new.push_str(&numbered(200..205));

        let report = analyze_impact(Some(&old), &new);
        assert_eq!(report.lines_removed, 40);
        assert_eq!(report.lines_added, 5);
        assert_eq!(report.total_old_lines, 100);
        assert_eq!(report.total_new_lines, 65);
        assert_eq!(report.percentage_removed, 40);
        assert!(!report.is_new_file);
    }

    #[test]
    fn new_file_has_no_removals() {
        let report = analyze_impact(None, &numbered(0..500));
        assert_eq!(report.lines_removed, 0);
        assert_eq!(report.lines_added, 500);
        assert_eq!(report.percentage_removed, 0);
        assert!(report.is_new_file);
    }

    #[test]
    fn empty_existing_file_reports_zero_percent() {
        let report = analyze_impact(Some(""), "fn main() {}\n");
        assert_eq!(report.percentage_removed, 0);
        assert_eq!(report.lines_added, 1);
        assert!(!report.is_new_file);
    }

    #[test]
    fn moved_lines_are_neither_added_nor_removed() {
        let report = analyze_impact(Some("a\nb\nc\n"), "c\na\nb\n");
        assert_eq!(report.lines_removed, 0);
        assert_eq!(report.lines_added, 0);
    }

    #[test]
    fn edited_line_counts_as_removal_and_addition() {
        let report = analyze_impact(Some("let x = 1;\nlet y = 2;\n"), "let x = 1;\nlet y = 3;\n");
        assert_eq!(report.lines_removed, 1);
        assert_eq!(report.lines_added, 1);
        assert_eq!(report.percentage_removed, 50);
    }

    #[test]
    fn whitespace_and_blank_lines_are_ignored() {
        let report = analyze_impact(Some("  a\n\n\tb  \n\n"), "a\nb\n   \n");
        assert_eq!(report.lines_removed, 0);
        assert_eq!(report.total_old_lines, 2);
        assert_eq!(report.total_new_lines, 2);
    }

    #[test]
    fn duplicate_lines_collapse() {
        let report = analyze_impact(Some("}\n}\n}\nx\n"), "}\n");
        assert_eq!(report.total_old_lines, 2);
        assert_eq!(report.lines_removed, 1);
        assert_eq!(report.percentage_removed, 50);
    }

    #[test]
    fn percentage_rounds_to_nearest() {
        let report = analyze_impact(Some("a\nb\nc\n"), "a\n");
        assert_eq!(report.percentage_removed, 67);
    }
}
