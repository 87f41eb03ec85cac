#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Contextual diffs of line sequences.
pub mod diff;
/// `clang-format` conformance checks.
pub mod format;
/// `clang-tidy` lint checks.
pub mod lint;
/// Comment stripping through the preprocessor.
pub mod strip;
/// The course clang-tidy rule set.
pub mod tidy;
/// Source discovery.
pub mod util;

pub use diff::{DiffError, DiffReport, compare_normalized, context_diff, strip_and_compare};
pub use format::{FormatChecker, FormatError, format_check};
pub use lint::{LintChecker, LintError, lint_check};
pub use strip::{CommentStripper, PlaceholderTable, SourceText, StripError, strip_comments};
pub use tidy::TidyOptions;
