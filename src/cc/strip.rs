#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    config::ToolConfig,
    process::{ToolError, ToolInvocation, ToolRunner},
};

/// Ordered `(original, placeholder)` replacements that hide text from the
/// preprocessor.
///
/// `escape` applies the pairs front to back; `restore` undoes them back to
/// front. Restoring is the exact inverse of escaping as long as the input
/// contains none of the placeholders to begin with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderTable {
    /// Replacement pairs in escape order.
    pairs: Vec<(String, String)>,
}

impl PlaceholderTable {
    /// Builds a table from pairs in escape order.
    pub fn new<I, O, P>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (O, P)>,
        O: Into<String>,
        P: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(o, p)| (o.into(), p.into()))
                .collect(),
        }
    }

    /// Table that keeps user macros, reserved `__` identifiers and `#`
    /// directives away from the preprocessor. Every `a` is escaped first, so
    /// the `a`-prefixed placeholders that follow cannot collide with text
    /// that was already there.
    pub fn preprocessor() -> Self {
        Self::new([("a", "aA"), ("__", "aB"), ("#", "aC")])
    }

    /// The pairs in escape order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Replaces each original with its placeholder.
    pub fn escape(&self, text: &str) -> String {
        self.pairs
            .iter()
            .fold(text.to_string(), |acc, (original, placeholder)| {
                acc.replace(original.as_str(), placeholder)
            })
    }

    /// Replaces each placeholder with its original, in reverse order.
    pub fn restore(&self, text: &str) -> String {
        self.pairs
            .iter()
            .rev()
            .fold(text.to_string(), |acc, (original, placeholder)| {
                acc.replace(placeholder.as_str(), original)
            })
    }
}

impl Default for PlaceholderTable {
    fn default() -> Self {
        Self::preprocessor()
    }
}

/// Comment-free, whitespace-normalized lines of one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SourceText {
    /// Normalized lines, without terminators.
    lines: Vec<String>,
}

impl SourceText {
    /// Wraps already-split lines as they are.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Normalizes preprocessor output: runs of whitespace between tokens are
    /// collapsed, kept only where two tokens would otherwise merge, literals
    /// are left alone, and blank lines are dropped.
    pub fn normalize(text: &str) -> Self {
        Self {
            lines: text
                .lines()
                .map(normalize_line)
                .filter(|line| !line.is_empty())
                .collect(),
        }
    }

    /// The lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether there are no lines at all.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether every line is whitespace.
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }
}

/// Punctuator pairs that lex differently once the space between them is
/// removed.
const MERGING_PAIRS: &[&str] = &[
    "++", "--", "<<", ">>", "&&", "||", "->", "::", "==", "!=", "<=", ">=", "+=", "-=", "*=",
    "/=", "%=", "&=", "|=", "^=", "/*", "//", "*/", ".*", "..", "##", "<:", ":>", "<%", "%>",
    "%:",
];

/// Collapses inter-token whitespace on one line.
///
/// A single space survives where dropping it would merge two tokens: between
/// word characters, and between punctuators listed in [`MERGING_PAIRS`].
/// String and character literals are copied untouched.
fn normalize_line(line: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut out = String::with_capacity(line.len());
    let mut pending_space = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space && let Some(prev) = out.chars().next_back() {
            let pair: String = [prev, c].iter().collect();
            if (is_word(prev) && is_word(c)) || MERGING_PAIRS.contains(&pair.as_str()) {
                out.push(' ');
            }
        }
        pending_space = false;

        let opens_literal = c == '"' || (c == '\'' && !ends_in_number(&out));
        out.push(c);
        if opens_literal {
            copy_literal(&mut chars, c, &mut out);
        }
    }
    out
}

/// Whether `text` ends in a numeric literal, making a following `'` a digit
/// separator rather than the start of a character literal.
fn ends_in_number(text: &str) -> bool {
    let word: String = text
        .chars()
        .rev()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    word.chars().last().is_some_and(|c| c.is_ascii_digit())
}

/// Copies the rest of a literal opened by `quote`, escapes included.
fn copy_literal(chars: &mut std::str::Chars<'_>, quote: char, out: &mut String) {
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else if c == quote {
            break;
        }
    }
}

/// Why a file could not be stripped of comments.
#[derive(thiserror::Error, Debug)]
pub enum StripError {
    /// The source file does not exist.
    #[error("no such file: {}", .0.display())]
    NoSuchFile(PathBuf),
    /// The source file exists but could not be read as UTF-8 text.
    #[error("cannot read {}", .path.display())]
    Read {
        /// File that was read.
        path:   PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The preprocessor could not be run, or ran out of time.
    #[error(transparent)]
    Tool(#[from] ToolError),
    /// The preprocessor exited unsuccessfully.
    #[error("comment removal error: {stderr}")]
    Preprocessor {
        /// Exit code, if any.
        code:   Option<i32>,
        /// What the preprocessor printed on stderr.
        stderr: String,
    },
}

/// Removes comments from C++ sources by piping them through the compiler's
/// preprocessor.
pub struct CommentStripper<'a> {
    /// How the preprocessor is run.
    runner:  &'a dyn ToolRunner,
    /// Preprocessor program.
    program: String,
    /// Preprocessor arguments.
    args:    Vec<String>,
    /// Deadline per file.
    limit:   Duration,
    /// Escaping applied around the preprocessor.
    table:   PlaceholderTable,
}

impl<'a> CommentStripper<'a> {
    /// A stripper using the configured preprocessor and the default
    /// placeholder table.
    pub fn new(runner: &'a dyn ToolRunner, tools: &ToolConfig) -> Self {
        Self {
            runner,
            program: tools.cxx().to_string(),
            args: tools.strip_args().to_vec(),
            limit: tools.strip_timeout(),
            table: PlaceholderTable::default(),
        }
    }

    /// Swaps the placeholder table.
    pub fn with_table(mut self, table: PlaceholderTable) -> Self {
        self.table = table;
        self
    }

    /// Strips `text`, returning the normalized result.
    pub fn try_strip_text(&self, text: &str) -> Result<SourceText, StripError> {
        let invocation = ToolInvocation::new(&self.program)
            .args(&self.args)
            .stdin_text(self.table.escape(text))
            .timeout(self.limit);

        let output = self.runner.run(&invocation)?;
        if !output.success() {
            return Err(StripError::Preprocessor {
                code:   output.exit_code,
                stderr: output.stderr.trim_end().to_string(),
            });
        }

        Ok(SourceText::normalize(&self.table.restore(&output.stdout)))
    }

    /// Reads and strips the file at `path`.
    pub fn try_strip(&self, path: &Path) -> Result<SourceText, StripError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StripError::NoSuchFile(path.to_path_buf())
            } else {
                StripError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        self.try_strip_text(&text)
    }

    /// Reads and strips the file at `path`; failures are logged once and
    /// reported as `None`.
    pub fn strip(&self, path: &Path) -> Option<SourceText> {
        match self.try_strip(path) {
            Ok(text) => Some(text),
            Err(e @ StripError::NoSuchFile(_)) => {
                tracing::error!("Cannot remove comments. {e}");
                None
            }
            Err(e) => {
                tracing::error!("Errors encountered removing comments from {}: {e:#}", path.display());
                None
            }
        }
    }
}

/// Convenience wrapper around [`CommentStripper::strip`].
pub fn strip_comments(
    runner: &dyn ToolRunner,
    tools: &ToolConfig,
    path: &Path,
) -> Option<SourceText> {
    CommentStripper::new(runner, tools).strip(path)
}
