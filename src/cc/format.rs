use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use super::diff::{DEFAULT_CONTEXT, DiffReport, context_diff};
use crate::{
    config::ToolConfig,
    process::{ToolError, ToolInvocation, ToolRunner},
};

/// Style profile every submission is held to.
pub const FORMAT_STYLE: &str = "Google";

/// Label of the student's side of a format diff.
pub const STUDENT_LABEL: &str = "Student Submission (Yours)";

/// Label of the formatter's side of a format diff.
pub const FORMATTED_LABEL: &str = "Correct Format";

/// Why a format check could not produce a verdict.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    /// `clang-format` could not be run.
    #[error(transparent)]
    Tool(#[from] ToolError),
    /// `clang-format` ran but rejected the file.
    #[error("clang-format failed on {} (exit code {code:?}): {stderr}", .file.display())]
    Failed {
        /// The file being checked.
        file:   PathBuf,
        /// Exit code, if any.
        code:   Option<i32>,
        /// Formatter diagnostics.
        stderr: String,
    },
    /// The original file could not be read back.
    #[error("cannot read {}", .path.display())]
    Read {
        /// File that was read.
        path:   PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Checks files against the course style by diffing them with what
/// `clang-format` would produce.
pub struct FormatChecker<'a> {
    /// How the formatter is run.
    runner:  &'a dyn ToolRunner,
    /// Formatter program.
    program: String,
    /// Deadline per file.
    limit:   Duration,
}

impl<'a> FormatChecker<'a> {
    /// A checker using the configured formatter.
    pub fn new(runner: &'a dyn ToolRunner, tools: &ToolConfig) -> Self {
        Self {
            runner,
            program: tools.clang_format().to_string(),
            limit: tools.format_timeout(),
        }
    }

    /// The formatter invocation for `file`.
    pub fn invocation(&self, file: &Path) -> ToolInvocation {
        ToolInvocation::new(&self.program)
            .arg(format!("-style={FORMAT_STYLE}"))
            .arg("--Werror")
            .arg(file)
            .timeout(self.limit)
    }

    /// Diffs `file` against its formatted version. An empty report means the
    /// file is already formatted.
    pub fn check(&self, file: &Path) -> Result<DiffReport, FormatError> {
        let invocation = self.invocation(file);
        tracing::debug!("clang format command: {}", invocation.display());

        let output = self.runner.run(&invocation)?;
        if !output.success() {
            return Err(FormatError::Failed {
                file:   file.to_path_buf(),
                code:   output.exit_code,
                stderr: output.stderr.trim_end().to_string(),
            });
        }

        let original = std::fs::read_to_string(file).map_err(|source| FormatError::Read {
            path: file.to_path_buf(),
            source,
        })?;
        let original: Vec<&str> = original.lines().collect();
        let formatted: Vec<&str> = output.stdout.lines().collect();

        Ok(context_diff(
            &original,
            &formatted,
            STUDENT_LABEL,
            FORMATTED_LABEL,
            DEFAULT_CONTEXT,
        ))
    }
}

/// Convenience wrapper around [`FormatChecker::check`].
pub fn format_check(
    runner: &dyn ToolRunner,
    tools: &ToolConfig,
    file: &Path,
) -> Result<DiffReport, FormatError> {
    FormatChecker::new(runner, tools).check(file)
}
