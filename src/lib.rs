//! # cclab
//!
//! Makefile scaffolding and grading checks for C++ lab assignments: format
//! and lint checks through clang tooling, and comment-insensitive diffs of a
//! submission against its starter code.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// For stripping, diffing, formatting and linting C++ sources
pub mod cc;
/// Tool names, deadlines, and the shared runtime
pub mod config;
/// The lab assignment configuration
pub mod lab;
/// Running external tools with captured output and deadlines
pub mod process;
/// Generating Makefiles, Doxyfiles and compile databases
pub mod scaffold;

pub use lab::{LabConfig, PartConfig, PartId, Platform};
pub use process::{SystemRunner, ToolError, ToolInvocation, ToolOutput, ToolRunner};

/// Default location of the lab configuration, relative to the repository
/// root.
pub const DEFAULT_LAB_CONFIG: &str = ".config/lab.json";
