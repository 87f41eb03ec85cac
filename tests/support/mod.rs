#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};

use cclab::{ToolError, ToolInvocation, ToolOutput, ToolRunner};
use uuid::Uuid;

/// A fresh, empty directory under the system temp dir.
pub fn temp_root(tag: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("cclab-{tag}-{}", Uuid::new_v4()));
    fs::create_dir_all(&root).expect("create temp root");
    root
}

/// Writes `contents` to `root/name` and returns the path.
pub fn write(root: &Path, name: &str, contents: &str) -> PathBuf {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(&path, contents).expect("write fixture");
    path
}

/// Whether `program` is on the `PATH`.
pub fn have(program: &str) -> bool {
    which::which(program).is_ok()
}

/// A successful run printing `stdout`.
pub fn ok(stdout: &str) -> Result<ToolOutput, ToolError> {
    Ok(ToolOutput {
        exit_code: Some(0),
        stdout:    stdout.to_string(),
        stderr:    String::new(),
    })
}

/// A run exiting with `code` and printing `stderr`.
pub fn failed(code: i32, stderr: &str) -> Result<ToolOutput, ToolError> {
    Ok(ToolOutput {
        exit_code: Some(code),
        stdout:    String::new(),
        stderr:    stderr.to_string(),
    })
}

/// Replays canned results in order and records every invocation it sees.
#[derive(Default)]
pub struct ScriptedRunner {
    replies: RefCell<VecDeque<Result<ToolOutput, ToolError>>>,
    seen:    RefCell<Vec<ToolInvocation>>,
}

impl ScriptedRunner {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<ToolOutput, ToolError>>,
    {
        Self {
            replies: RefCell::new(replies.into_iter().collect()),
            seen:    RefCell::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.seen.borrow().clone()
    }

    /// Arguments of the `n`th invocation as plain strings.
    pub fn argv(&self, n: usize) -> Vec<String> {
        self.seen.borrow()[n]
            .arguments()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl ToolRunner for ScriptedRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        self.seen.borrow_mut().push(invocation.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .expect("runner called more often than scripted")
    }
}

/// Echoes stdin back, the way a preprocessor with nothing to strip would.
pub struct EchoRunner;

impl ToolRunner for EchoRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        ok(&String::from_utf8_lossy(invocation.stdin().unwrap_or_default()))
    }
}
