#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, BufReader},
    process::{Child, Command},
    time::timeout,
};
use which::which;

use crate::config;

/// Errors raised while launching or waiting on an external tool.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    /// The program could not be located on `PATH`.
    #[error("`{program}` was not found on PATH")]
    NotFound {
        /// Name of the program that was looked up.
        program: String,
    },
    /// Spawning the process or talking to its pipes failed.
    #[error("could not run `{program}`")]
    Io {
        /// Name of the program being run.
        program: String,
        /// Underlying I/O failure.
        #[source]
        source:  std::io::Error,
    },
    /// The process did not exit before its deadline and was killed.
    #[error("`{program}` did not finish within {}s", .limit.as_secs())]
    TimedOut {
        /// Name of the program being run.
        program: String,
        /// The deadline that elapsed.
        limit:   Duration,
    },
}

/// Drop guard that terminates a spawned child process if callers forget to
/// await it, or if the wait is abandoned because a deadline elapsed.
struct ChildDropGuard(Option<Child>);

impl ChildDropGuard {
    /// Wraps the provided child process with the drop guard.
    fn new(child: Child) -> Self {
        Self(Some(child))
    }

    /// Returns a mutable reference to the underlying child process.
    fn child_mut(&mut self) -> std::io::Result<&mut Child> {
        self.0
            .as_mut()
            .ok_or_else(|| std::io::Error::other("child process already taken from guard"))
    }

    /// Prevents the guard from killing the process on drop.
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for ChildDropGuard {
    fn drop(&mut self) {
        if let Some(child) = self.0.as_mut() {
            let _ = child.start_kill();
        }
    }
}

/// Describes how stdin should be wired for the spawned process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdinSource {
    /// Attach nothing to stdin.
    Null,
    /// Write the provided bytes, then close stdin.
    Bytes(Vec<u8>),
}

/// A single external tool invocation: program, arguments, stdin and deadline.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Program name, resolved through `PATH` when run.
    program: String,
    /// Arguments passed verbatim (no shell involved).
    args:    Vec<OsString>,
    /// What to feed on stdin.
    stdin:   StdinSource,
    /// Optional working directory.
    cwd:     Option<PathBuf>,
    /// Wall-clock limit for the whole run.
    limit:   Option<Duration>,
}

impl ToolInvocation {
    /// Starts describing an invocation of `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args:    Vec::new(),
            stdin:   StdinSource::Null,
            cwd:     None,
            limit:   None,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Feeds `text` on stdin.
    pub fn stdin_text(mut self, text: impl Into<String>) -> Self {
        self.stdin = StdinSource::Bytes(text.into().into_bytes());
        self
    }

    /// Runs the tool from `dir`.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Bounds the run by `limit`.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments.
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Bytes written to stdin, if any.
    pub fn stdin(&self) -> Option<&[u8]> {
        match &self.stdin {
            StdinSource::Bytes(bytes) => Some(bytes),
            StdinSource::Null => None,
        }
    }

    /// Working directory, if set.
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Deadline, if set.
    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    /// Renders the invocation as a single line for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Contents written to stdout, decoded lossily as UTF-8.
    pub stdout:    String,
    /// Contents written to stderr, decoded lossily as UTF-8.
    pub stderr:    String,
}

impl ToolOutput {
    /// Whether the tool exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// The one capability every tool integration goes through.
pub trait ToolRunner {
    /// Runs `invocation` to completion, blocking the caller.
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError>;
}

/// Runs tools as real subprocesses on the shared runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        tracing::debug!("running {}", invocation.display());
        config::get().runtime().block_on(run_collect(invocation))
    }
}

/// Spawns the invocation, feeds stdin, and collects stdout/stderr, killing the
/// child when the deadline elapses.
pub async fn run_collect(invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
    let program = invocation.program().to_string();
    let resolved = which(&program).map_err(|_| ToolError::NotFound {
        program: program.clone(),
    })?;
    let io_error = |source: std::io::Error| ToolError::Io {
        program: program.clone(),
        source,
    };

    let mut cmd = Command::new(resolved);
    cmd.args(invocation.arguments())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    match invocation.stdin() {
        Some(_) => cmd.stdin(Stdio::piped()),
        None => cmd.stdin(Stdio::null()),
    };

    if let Some(dir) = invocation.cwd() {
        cmd.current_dir(dir);
    }

    let mut guard = ChildDropGuard::new(cmd.spawn().map_err(io_error)?);

    if let Some(bytes) = invocation.stdin().map(<[u8]>::to_vec)
        && let Some(mut handle) = guard.child_mut().map_err(io_error)?.stdin.take()
    {
        tokio::spawn(async move {
            if !bytes.is_empty() {
                let _ = handle.write_all(&bytes).await;
            }
            let _ = handle.shutdown().await;
        });
    }

    let stdout = guard
        .child_mut()
        .map_err(io_error)?
        .stdout
        .take()
        .ok_or_else(|| io_error(std::io::Error::other("missing stdout pipe")))?;
    let stderr = guard
        .child_mut()
        .map_err(io_error)?
        .stderr
        .take()
        .ok_or_else(|| io_error(std::io::Error::other("missing stderr pipe")))?;

    let out_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        BufReader::new(stdout).read_to_end(&mut buf).await?;
        Ok::<Vec<u8>, std::io::Error>(buf)
    });

    let err_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        BufReader::new(stderr).read_to_end(&mut buf).await?;
        Ok::<Vec<u8>, std::io::Error>(buf)
    });

    let wait_future = async move {
        let mut guard = guard;
        let status = guard.child_mut()?.wait().await?;
        let stdout = out_task.await.map_err(std::io::Error::other)??;
        let stderr = err_task.await.map_err(std::io::Error::other)??;
        guard.disarm();
        Ok::<ToolOutput, std::io::Error>(ToolOutput {
            exit_code: status.code(),
            stdout:    String::from_utf8_lossy(&stdout).into_owned(),
            stderr:    String::from_utf8_lossy(&stderr).into_owned(),
        })
    };

    match invocation.limit() {
        Some(limit) => timeout(limit, wait_future)
            .await
            .map_err(|_| ToolError::TimedOut {
                program: program.clone(),
                limit,
            })?
            .map_err(io_error),
        None => wait_future.await.map_err(io_error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let inv = ToolInvocation::new("clang-format")
            .arg("-style=Google")
            .args(["--Werror", "main.cc"]);
        assert_eq!(inv.display(), "clang-format -style=Google --Werror main.cc");
        assert!(inv.stdin().is_none());
    }

    #[test]
    fn stdin_text_is_recorded_as_bytes() {
        let inv = ToolInvocation::new("cat").stdin_text("int x;");
        assert_eq!(inv.stdin(), Some("int x;".as_bytes()));
    }

    #[test]
    fn missing_program_is_not_found() {
        let inv = ToolInvocation::new("cclab-definitely-not-a-real-tool");
        let err = SystemRunner.run(&inv).expect_err("tool should be missing");
        assert!(matches!(err, ToolError::NotFound { .. }));
    }

    #[test]
    fn collects_stdout_from_stdin() {
        if which("cat").is_err() {
            return;
        }
        let inv = ToolInvocation::new("cat")
            .stdin_text("hello\n")
            .timeout(Duration::from_secs(10));
        let out = SystemRunner.run(&inv).expect("cat runs");
        assert!(out.success());
        assert_eq!(out.stdout, "hello\n");
    }

    #[test]
    fn deadline_kills_slow_process() {
        if which("sleep").is_err() {
            return;
        }
        let inv = ToolInvocation::new("sleep")
            .arg("5")
            .timeout(Duration::from_millis(200));
        let err = SystemRunner.run(&inv).expect_err("sleep should time out");
        assert!(matches!(err, ToolError::TimedOut { .. }));
    }
}
