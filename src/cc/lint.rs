use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use super::tidy::TidyOptions;
use crate::{
    config::ToolConfig,
    lab::{LabConfig, LabConfigError, PartId, Platform},
    process::{ToolError, ToolInvocation, ToolRunner},
};

/// Why a lint check could not produce a verdict.
#[derive(thiserror::Error, Debug)]
pub enum LintError {
    /// `clang-tidy` could not be run.
    #[error(transparent)]
    Tool(#[from] ToolError),
    /// `clang-tidy` exited unsuccessfully, usually because the file does not
    /// compile with the given flags.
    #[error("error linting {} (exit code {code:?}): {stderr}", .file.display())]
    Failed {
        /// The file being linted.
        file:    PathBuf,
        /// Exit code, if any.
        code:    Option<i32>,
        /// The full command, for reproducing the failure by hand.
        command: String,
        /// Linter diagnostics on stderr.
        stderr:  String,
    },
    /// The part to lint against is not configured.
    #[error(transparent)]
    Config(#[from] LabConfigError),
}

/// Runs `clang-tidy` with the course rule set.
pub struct LintChecker<'a> {
    /// How the linter is run.
    runner:  &'a dyn ToolRunner,
    /// Linter program.
    program: String,
    /// Deadline per file.
    limit:   Duration,
    /// Rule set.
    options: TidyOptions,
}

impl<'a> LintChecker<'a> {
    /// A checker using the configured linter and the environment's rule set.
    pub fn new(runner: &'a dyn ToolRunner, tools: &ToolConfig) -> Self {
        Self {
            runner,
            program: tools.clang_tidy().to_string(),
            limit: tools.lint_timeout(),
            options: TidyOptions::from_env(),
        }
    }

    /// Swaps the rule set.
    pub fn with_options(mut self, options: TidyOptions) -> Self {
        self.options = options;
        self
    }

    /// The active rule set.
    pub fn options(&self) -> &TidyOptions {
        &self.options
    }

    /// `clang-tidy <rules> <file> -- <compile command>`
    pub fn invocation(&self, file: &Path, compile_command: &str) -> ToolInvocation {
        ToolInvocation::new(&self.program)
            .args(self.options.args())
            .arg(file)
            .arg("--")
            .args(compile_command.split_whitespace())
            .timeout(self.limit)
    }

    /// Lints `file`, returning every non-empty line the linter printed.
    pub fn check(&self, file: &Path, compile_command: &str) -> Result<Vec<String>, LintError> {
        let invocation = self.invocation(file, compile_command);
        tracing::debug!("Tidy command {}", invocation.display());

        let output = self.runner.run(&invocation)?;
        if !output.success() {
            return Err(LintError::Failed {
                file:    file.to_path_buf(),
                code:    output.exit_code,
                command: invocation.display(),
                stderr:  output.stderr.trim_end().to_string(),
            });
        }

        Ok(output
            .stdout
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Lints `file` with the compile command of `part`.
    ///
    /// A part's own `tidy_checks` replace the default check list.
    pub fn check_part(
        &self,
        file: &Path,
        lab: &LabConfig,
        part: PartId,
        platform: Platform,
    ) -> Result<Vec<String>, LintError> {
        let part_cfg = lab.part(part)?;
        let compile_command = part_cfg.lint_compile_command(platform);
        tracing::debug!("Lab configuration reported compile command as {compile_command}");

        match &part_cfg.tidy_checks {
            Some(checks) => LintChecker {
                runner:  self.runner,
                program: self.program.clone(),
                limit:   self.limit,
                options: self.options.clone().with_checks(checks.iter().cloned()),
            }
            .check(file, &compile_command),
            None => self.check(file, &compile_command),
        }
    }
}

/// Lints `file` as part `part` of `lab` on `platform`.
pub fn lint_check(
    runner: &dyn ToolRunner,
    tools: &ToolConfig,
    file: &Path,
    lab: &LabConfig,
    part: PartId,
    platform: Platform,
) -> Result<Vec<String>, LintError> {
    LintChecker::new(runner, tools).check_part(file, lab, part, platform)
}
