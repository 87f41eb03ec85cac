#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    sync::{Arc, Mutex, OnceLock},
    time::Duration,
};

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

/// Default deadline for the comment-stripping preprocessor.
pub const STRIP_TIMEOUT_SECS: u64 = 10;
/// Default deadline for `clang-format`.
pub const FORMAT_TIMEOUT_SECS: u64 = 10;
/// Default deadline for `clang-tidy`.
pub const LINT_TIMEOUT_SECS: u64 = 60;

/// Names and deadlines of the external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// C++ compiler driver used as the comment-stripping preprocessor.
    cxx:            String,
    /// Arguments that put the compiler driver into strip-and-pass-through
    /// mode, reading from stdin.
    strip_args:     Vec<String>,
    /// `clang-format` executable.
    clang_format:   String,
    /// `clang-tidy` executable.
    clang_tidy:     String,
    /// Deadline for comment stripping.
    strip_timeout:  Duration,
    /// Deadline for format checks.
    format_timeout: Duration,
    /// Deadline for lint checks.
    lint_timeout:   Duration,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            cxx:            "clang++".to_string(),
            strip_args:     vec!["-E".into(), "-P".into(), "-".into()],
            clang_format:   "clang-format".to_string(),
            clang_tidy:     "clang-tidy".to_string(),
            strip_timeout:  Duration::from_secs(STRIP_TIMEOUT_SECS),
            format_timeout: Duration::from_secs(FORMAT_TIMEOUT_SECS),
            lint_timeout:   Duration::from_secs(LINT_TIMEOUT_SECS),
        }
    }
}

impl ToolConfig {
    /// Reads overrides from `CCLAB_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cxx: read_string("CCLAB_CXX").unwrap_or(defaults.cxx),
            strip_args: defaults.strip_args,
            clang_format: read_string("CCLAB_CLANG_FORMAT").unwrap_or(defaults.clang_format),
            clang_tidy: read_string("CCLAB_CLANG_TIDY").unwrap_or(defaults.clang_tidy),
            strip_timeout: read_timeout_secs("CCLAB_STRIP_TIMEOUT_SECS", STRIP_TIMEOUT_SECS),
            format_timeout: read_timeout_secs("CCLAB_FORMAT_TIMEOUT_SECS", FORMAT_TIMEOUT_SECS),
            lint_timeout: read_timeout_secs("CCLAB_LINT_TIMEOUT_SECS", LINT_TIMEOUT_SECS),
        }
    }

    /// Replaces the preprocessor program and its arguments.
    pub fn with_preprocessor<I, S>(mut self, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cxx = program.into();
        self.strip_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the `clang-format` program.
    pub fn with_clang_format(mut self, program: impl Into<String>) -> Self {
        self.clang_format = program.into();
        self
    }

    /// Replaces the `clang-tidy` program.
    pub fn with_clang_tidy(mut self, program: impl Into<String>) -> Self {
        self.clang_tidy = program.into();
        self
    }

    /// Preprocessor program.
    pub fn cxx(&self) -> &str {
        &self.cxx
    }

    /// Preprocessor arguments.
    pub fn strip_args(&self) -> &[String] {
        &self.strip_args
    }

    /// Formatter program.
    pub fn clang_format(&self) -> &str {
        &self.clang_format
    }

    /// Linter program.
    pub fn clang_tidy(&self) -> &str {
        &self.clang_tidy
    }

    /// Comment stripping deadline.
    pub fn strip_timeout(&self) -> Duration {
        self.strip_timeout
    }

    /// Format check deadline.
    pub fn format_timeout(&self) -> Duration {
        self.format_timeout
    }

    /// Lint check deadline.
    pub fn lint_timeout(&self) -> Duration {
        self.lint_timeout
    }
}

/// Process-wide state: tool settings and the runtime subprocesses are
/// driven on.
pub struct ConfigState {
    /// Tool names and deadlines.
    tools:   ToolConfig,
    /// Runtime used to drive subprocess I/O and deadlines.
    runtime: Runtime,
}

impl ConfigState {
    /// Construct a new configuration instance from the environment.
    fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .context("Failed to build the subprocess runtime")?;

        Ok(Self {
            tools: ToolConfig::from_env(),
            runtime,
        })
    }

    /// Returns the tool settings.
    pub fn tools(&self) -> &ToolConfig {
        &self.tools
    }

    /// Returns the shared runtime.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }
}

/// Shared configuration handle used throughout the crate.
#[derive(Clone)]
pub struct ConfigHandle(Arc<ConfigState>);

impl std::ops::Deref for ConfigHandle {
    type Target = ConfigState;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Global storage for the lazily constructed configuration state.
static CONFIG_SLOT: OnceLock<Mutex<Option<Arc<ConfigState>>>> = OnceLock::new();

/// Returns the mutex guarding the global configuration slot.
fn slot() -> &'static Mutex<Option<Arc<ConfigState>>> {
    CONFIG_SLOT.get_or_init(|| Mutex::new(None))
}

/// Ensure the global configuration has been initialized and return a handle.
pub fn ensure_initialized() -> Result<ConfigHandle> {
    let mut guard = slot().lock().expect("config slot poisoned");
    if let Some(cfg) = guard.as_ref() {
        return Ok(ConfigHandle(Arc::clone(cfg)));
    }

    let cfg = Arc::new(ConfigState::new()?);
    *guard = Some(Arc::clone(&cfg));
    Ok(ConfigHandle(cfg))
}

/// Returns the active configuration, initializing it on demand.
pub fn get() -> ConfigHandle {
    ensure_initialized().expect("configuration initialization failed")
}

/// Returns a copy of the configured tool settings.
pub fn tools() -> ToolConfig {
    get().tools().clone()
}

/// Reads a non-empty, trimmed environment variable.
fn read_string(env: &str) -> Option<String> {
    std::env::var(env)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Parses an environment variable into a `Duration`, falling back to
/// `default_secs` when parsing fails or the variable is missing.
fn read_timeout_secs(env: &str, default_secs: u64) -> Duration {
    std::env::var(env)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_course_tooling() {
        let tools = ToolConfig::default();
        assert_eq!(tools.cxx(), "clang++");
        assert_eq!(tools.strip_args(), ["-E", "-P", "-"]);
        assert_eq!(tools.strip_timeout(), Duration::from_secs(10));
        assert_eq!(tools.format_timeout(), Duration::from_secs(10));
        assert_eq!(tools.lint_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn unparsable_timeout_falls_back() {
        assert_eq!(
            read_timeout_secs("CCLAB_TIMEOUT_THAT_IS_NEVER_SET", 7),
            Duration::from_secs(7)
        );
    }
}
