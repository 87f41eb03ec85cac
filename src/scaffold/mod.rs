#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::PathBuf;

/// Timestamped backups of files about to be overwritten.
pub mod backup;
/// `compile_commands.json` for the linter.
pub mod compile_db;
/// Minimal Doxygen configuration.
pub mod doxyfile;
/// Per-part and top-level Makefiles.
pub mod makefile;

pub use backup::{backup_file, backup_path, write_with_backup};
pub use compile_db::{CompileCommand, CompileDb, CompileDbOutcome, write_compile_db};
pub use doxyfile::generate_doxyfile;
pub use makefile::generate_makefiles;

/// Filesystem failures while generating files.
#[derive(thiserror::Error, Debug)]
pub enum ScaffoldError {
    /// The modification time of an existing file could not be read.
    #[error("cannot read the modification time of {}", .path.display())]
    Metadata {
        /// File being backed up.
        path:   PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Renaming a file to its backup name failed.
    #[error("cannot backup {} to {}", .from.display(), .to.display())]
    Backup {
        /// File being backed up.
        from:   PathBuf,
        /// Intended backup name.
        to:     PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Writing a generated file failed.
    #[error("cannot write {}", .path.display())]
    Write {
        /// File being written.
        path:   PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Creating a part directory failed.
    #[error("cannot create directory {}", .path.display())]
    CreateDir {
        /// Directory being created.
        path:   PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Removing a stale file failed.
    #[error("cannot remove {}", .path.display())]
    Remove {
        /// File being removed.
        path:   PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Source discovery failed.
    #[error("cannot list sources")]
    Discover(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Serializing generated JSON failed.
    #[error("cannot serialize {what}")]
    Serialize {
        /// What was being serialized.
        what:   &'static str,
        /// Underlying serde failure.
        #[source]
        source: serde_json::Error,
    },
}
