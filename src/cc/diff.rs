#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fmt, hash::Hash, path::Path};

use colored::Colorize;
use similar::{Algorithm, DiffOp, DiffTag, capture_diff_slices, group_diff_ops};

use super::strip::{CommentStripper, SourceText};

/// Lines of unchanged context shown around each hunk.
pub const DEFAULT_CONTEXT: usize = 3;

/// Label of the reference side when comparing stripped sources.
pub const BASE_LABEL: &str = "Base";

/// Label of the student side when comparing stripped sources.
pub const SUBMISSION_LABEL: &str = "Submission";

/// A contextual diff, one line per entry, without line terminators.
///
/// An empty report means there is nothing to show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffReport {
    /// Rendered diff lines.
    lines: Vec<String>,
}

impl DiffReport {
    /// The diff lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Consumes the report, returning its lines.
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Whether the two sides matched.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Renders the report with terminal colors.
    pub fn colored(&self) -> String {
        self.lines
            .iter()
            .map(|line| {
                if line.starts_with("*** ") || line.starts_with("--- ") || line == HUNK_SEPARATOR
                {
                    line.bold().to_string()
                } else if line.starts_with("! ") {
                    line.yellow().to_string()
                } else if line.starts_with("+ ") {
                    line.green().to_string()
                } else if line.starts_with("- ") {
                    line.red().to_string()
                } else {
                    line.clone()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}

/// Comparison could not take place.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DiffError {
    /// One or both sides failed normalization.
    #[error("cannot perform contextual diff: {0} could not be normalized")]
    Incomparable(&'static str),
}

/// Separator printed before every hunk.
const HUNK_SEPARATOR: &str = "***************";

/// Marker that prefixes a body line of the given kind.
fn marker(tag: DiffTag) -> &'static str {
    match tag {
        DiffTag::Equal => "  ",
        DiffTag::Delete => "- ",
        DiffTag::Insert => "+ ",
        DiffTag::Replace => "! ",
    }
}

/// Formats a half-open, zero-based range in ed style.
fn ed_range(start: usize, stop: usize) -> String {
    let length = stop - start;
    let beginning = if length == 0 { start } else { start + 1 };
    if length <= 1 {
        beginning.to_string()
    } else {
        format!("{},{}", beginning, beginning + length - 1)
    }
}

/// Appends the lines of one side of a hunk.
fn push_side<S: AsRef<str>>(
    lines: &mut Vec<String>,
    group: &[DiffOp],
    side: &[S],
    skip: DiffTag,
    old_side: bool,
) {
    let shows_side = group
        .iter()
        .any(|op| op.tag() != DiffTag::Equal && op.tag() != skip);
    if !shows_side {
        return;
    }
    for op in group.iter().filter(|op| op.tag() != skip) {
        let range = if old_side { op.old_range() } else { op.new_range() };
        for line in &side[range] {
            lines.push(format!("{}{}", marker(op.tag()), line.as_ref()));
        }
    }
}

/// Produces a contextual diff of `base` against `submission`.
///
/// Each hunk carries `context` unchanged lines on both sides. The header
/// names the sides with the given labels only; no timestamps are emitted, so
/// the output is stable for fixed inputs.
pub fn context_diff<S>(
    base: &[S],
    submission: &[S],
    base_label: &str,
    submission_label: &str,
    context: usize,
) -> DiffReport
where
    S: AsRef<str> + Hash + Eq + Ord,
{
    let ops = capture_diff_slices(Algorithm::Myers, base, submission);
    let groups = group_diff_ops(ops, context);
    if groups.is_empty() {
        return DiffReport::default();
    }

    let mut lines = vec![format!("*** {base_label}"), format!("--- {submission_label}")];
    for group in groups {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };

        lines.push(HUNK_SEPARATOR.to_string());
        lines.push(format!(
            "*** {} ****",
            ed_range(first.old_range().start, last.old_range().end)
        ));
        push_side(&mut lines, &group, base, DiffTag::Insert, true);

        lines.push(format!(
            "--- {} ----",
            ed_range(first.new_range().start, last.new_range().end)
        ));
        push_side(&mut lines, &group, submission, DiffTag::Delete, false);
    }

    DiffReport { lines }
}

/// Diffs two normalization results.
///
/// Fails when either side is absent: a missing side means the files could
/// not be compared, which is not the same as the files matching.
pub fn compare_normalized(
    base: Option<&SourceText>,
    submission: Option<&SourceText>,
    base_label: &str,
    submission_label: &str,
    context: usize,
) -> Result<DiffReport, DiffError> {
    match (base, submission) {
        (Some(base), Some(submission)) => Ok(context_diff(
            base.lines(),
            submission.lines(),
            base_label,
            submission_label,
            context,
        )),
        (None, None) => Err(DiffError::Incomparable("neither file")),
        (None, Some(_)) => Err(DiffError::Incomparable("the base file")),
        (Some(_), None) => Err(DiffError::Incomparable("the submission")),
    }
}

/// Strips comments from both files and diffs what is left.
pub fn strip_and_compare(
    stripper: &CommentStripper<'_>,
    base: &Path,
    submission: &Path,
    context: usize,
) -> Result<DiffReport, DiffError> {
    let base_text = stripper.strip(base);
    let submission_text = stripper.strip(submission);
    compare_normalized(
        base_text.as_ref(),
        submission_text.as_ref(),
        BASE_LABEL,
        SUBMISSION_LABEL,
        context,
    )
    .inspect_err(|e| tracing::error!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(a: &[&str], b: &[&str]) -> Vec<String> {
        context_diff(a, b, "Base", "Submission", DEFAULT_CONTEXT).into_lines()
    }

    #[test]
    fn identical_inputs_produce_nothing() {
        assert!(diff(&["int x;", "int y;"], &["int x;", "int y;"]).is_empty());
        assert!(diff(&[], &[]).is_empty());
    }

    #[test]
    fn changed_line_is_marked_on_both_sides() {
        assert_eq!(
            diff(&["int a=1;"], &["int a=2;"]),
            [
                "*** Base",
                "--- Submission",
                "***************",
                "*** 1 ****",
                "! int a=1;",
                "--- 1 ----",
                "! int a=2;",
            ]
        );
    }

    #[test]
    fn pure_insertion_omits_base_body() {
        assert_eq!(
            diff(&["a", "b"], &["a", "x", "b"]),
            [
                "*** Base",
                "--- Submission",
                "***************",
                "*** 1,2 ****",
                "--- 1,3 ----",
                "  a",
                "+ x",
                "  b",
            ]
        );
    }

    #[test]
    fn pure_deletion_omits_submission_body() {
        assert_eq!(
            diff(&["a", "x", "b"], &["a", "b"]),
            [
                "*** Base",
                "--- Submission",
                "***************",
                "*** 1,3 ****",
                "  a",
                "- x",
                "  b",
                "--- 1,2 ----",
            ]
        );
    }

    #[test]
    fn empty_side_reports_every_line() {
        assert_eq!(
            diff(&[], &["x", "y"]),
            [
                "*** Base",
                "--- Submission",
                "***************",
                "*** 0 ****",
                "--- 1,2 ----",
                "+ x",
                "+ y",
            ]
        );
    }

    #[test]
    fn distant_changes_split_into_hunks_with_context() {
        let base: Vec<String> = (1..=20).map(|i| format!("l{i}")).collect();
        let mut submission = base.clone();
        submission[1] = "changed2".into();
        submission[17] = "changed18".into();

        let lines = context_diff(&base, &submission, "Base", "Submission", 3).into_lines();
        assert_eq!(lines.iter().filter(|l| *l == HUNK_SEPARATOR).count(), 2);
        assert!(lines.contains(&"*** 1,5 ****".to_string()));
        assert!(lines.contains(&"*** 15,20 ****".to_string()));
        assert!(lines.contains(&"! changed18".to_string()));
    }

    #[test]
    fn owned_lines_diff_like_borrowed_ones() {
        let base: Vec<String> = vec!["int a=1;".into(), "int b;".into()];
        let submission: Vec<String> = vec!["int a=2;".into(), "int b;".into()];
        let owned = context_diff(&base, &submission, "Base", "Submission", 3).into_lines();
        assert_eq!(owned, diff(&["int a=1;", "int b;"], &["int a=2;", "int b;"]));
    }

    #[test]
    fn swapping_sides_swaps_attribution() {
        let forward = diff(&["a"], &["a", "b"]);
        let backward = diff(&["a", "b"], &["a"]);
        assert!(forward.contains(&"+ b".to_string()));
        assert!(backward.contains(&"- b".to_string()));
    }

    #[test]
    fn absent_side_is_an_error() {
        let text = SourceText::from_lines(["int x;"]);
        assert_eq!(
            compare_normalized(None, Some(&text), "Base", "Submission", 3),
            Err(DiffError::Incomparable("the base file"))
        );
        assert!(compare_normalized(Some(&text), None, "Base", "Submission", 3).is_err());
    }

    #[test]
    fn empty_source_text_is_comparable() {
        let empty = SourceText::default();
        let text = SourceText::from_lines(["int x;"]);
        let report =
            compare_normalized(Some(&empty), Some(&text), "Base", "Submission", 3).expect("diff");
        assert!(report.lines().contains(&"+ int x;".to_string()));
    }
}
