#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::ScaffoldError;
use crate::cc::util::find_files;

/// File name clang tooling looks for.
pub const COMPILE_DB_NAME: &str = "compile_commands.json";

/// Compiler invocation used when none is given.
pub const DEFAULT_COMPILE_COMMAND: &str = "clang++ -g -O3 -Wall -pipe -std=c++17";

/// One entry of a compile database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct CompileCommand {
    /// Working directory of the compilation.
    #[builder(setter(into))]
    pub directory: String,
    /// Full compiler command line, file included.
    #[builder(setter(into))]
    pub command:   String,
    /// The source file compiled.
    #[builder(setter(into))]
    pub file:      String,
}

/// What [`CompileDb::write`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileDbOutcome {
    /// A new database was written.
    Written(PathBuf),
    /// A database already existed and was kept as it was.
    KeptExisting(PathBuf),
}

/// Request to emit `compile_commands.json` into a directory.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
pub struct CompileDb {
    /// Directory the database is written to; also recorded as each entry's
    /// working directory.
    #[builder(setter(into))]
    dir:             PathBuf,
    /// Files to list; every `*.cc` directly in `dir` when empty.
    #[builder(default, setter(into))]
    files:           Vec<String>,
    /// Compiler invocation prefixed to each file.
    #[builder(default = DEFAULT_COMPILE_COMMAND.to_string(), setter(into))]
    compile_command: String,
    /// Replace an existing database instead of keeping it.
    #[builder(default)]
    remove_existing: bool,
}

impl CompileDb {
    /// Path of the database file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(COMPILE_DB_NAME)
    }

    /// The files to list, discovering `*.cc` files when none were given.
    fn resolve_files(&self) -> Result<Vec<String>, ScaffoldError> {
        if !self.files.is_empty() {
            return Ok(self.files.clone());
        }
        let found = find_files("cc", false, &self.dir).map_err(|e| ScaffoldError::Discover(e.into()))?;
        Ok(found
            .iter()
            .filter_map(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    /// Builds the entries without touching the filesystem beyond discovery.
    pub fn entries(&self) -> Result<Vec<CompileCommand>, ScaffoldError> {
        let directory = std::path::absolute(&self.dir)
            .unwrap_or_else(|_| self.dir.clone())
            .display()
            .to_string();

        Ok(self
            .resolve_files()?
            .into_iter()
            .map(|file| {
                CompileCommand::builder()
                    .directory(directory.clone())
                    .command(format!("{} {}", self.compile_command, file))
                    .file(file)
                    .build()
            })
            .collect())
    }

    /// Writes the database unless one exists and should be kept.
    pub fn write(&self) -> Result<CompileDbOutcome, ScaffoldError> {
        let out = self.path();
        if out.exists() {
            if !self.remove_existing {
                tracing::warn!("The file {} already exists and will not be removed.", out.display());
                tracing::warn!("Compile commands DB not created. Using existing.");
                return Ok(CompileDbOutcome::KeptExisting(out));
            }
            tracing::debug!("Removing {}", out.display());
            std::fs::remove_file(&out).map_err(|source| ScaffoldError::Remove {
                path: out.clone(),
                source,
            })?;
        }

        let entries = self.entries()?;
        let json = serde_json::to_string_pretty(&entries).map_err(|source| {
            ScaffoldError::Serialize {
                what: COMPILE_DB_NAME,
                source,
            }
        })?;

        tracing::debug!("Writing {}", out.display());
        std::fs::write(&out, json).map_err(|source| ScaffoldError::Write {
            path: out.clone(),
            source,
        })?;
        Ok(CompileDbOutcome::Written(out))
    }
}

/// Writes `compile_commands.json` into `dir` for `files` (every `*.cc` in
/// `dir` when empty), keeping an existing database unless `remove_existing`.
pub fn write_compile_db(
    dir: impl Into<PathBuf>,
    files: Vec<String>,
    compile_command: impl Into<String>,
    remove_existing: bool,
) -> Result<CompileDbOutcome, ScaffoldError> {
    CompileDb::builder()
        .dir(dir)
        .files(files)
        .compile_command(compile_command)
        .remove_existing(remove_existing)
        .build()
        .write()
}
