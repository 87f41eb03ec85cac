#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors raised while loading or querying a lab configuration.
#[derive(thiserror::Error, Debug)]
pub enum LabConfigError {
    /// The configuration file could not be read.
    #[error("could not read lab configuration {}", .path.display())]
    Read {
        /// Path that was read.
        path:   PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration is not valid JSON for this schema.
    #[error("malformed lab configuration")]
    Parse(#[from] serde_json::Error),
    /// The configuration parsed but is inconsistent.
    #[error("invalid lab configuration: {0}")]
    Invalid(String),
    /// A part index outside of the configured parts.
    #[error("part {index} does not exist; the lab has {count} part(s)")]
    NoSuchPart {
        /// Requested zero-based index.
        index: usize,
        /// Number of configured parts.
        count: usize,
    },
    /// A lookup key that the configuration does not have.
    #[error("no configuration value for `{0}`")]
    MissingKey(String),
}

/// Host platform, used to pick platform-specific compiler flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Linux flags (also used for any non-macOS host).
    Linux,
    /// macOS flags, assuming MacPorts.
    Darwin,
}

impl Platform {
    /// The platform this binary runs on.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::Darwin
        } else {
            Platform::Linux
        }
    }
}

/// Zero-based index of a part within a lab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PartId(pub usize);

impl PartId {
    /// One-based part number, as used in `part-<n>` directory names.
    pub fn number(self) -> usize {
        self.0 + 1
    }

    /// Directory name of this part in a multi-part repository.
    pub fn dir_name(self) -> String {
        format!("part-{}", self.number())
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Settings for one gradable part of a lab.
///
/// Field names follow the Makefile variables they feed, so the serialized
/// form doubles as the template substitution table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartConfig {
    /// Name of the executable target.
    pub target:              String,
    /// Graded source file(s), space separated.
    pub src:                 String,
    /// Graded header file(s), space separated.
    #[serde(default)]
    pub header:              String,
    /// Sources needed to build but not graded.
    #[serde(default)]
    pub other_src:           String,
    /// Headers needed to build but not graded.
    #[serde(default)]
    pub other_header:        String,
    /// Name of the test entry point.
    #[serde(default)]
    pub test_main:           String,
    /// Compiler.
    #[serde(rename = "CXX", default = "default_cxx")]
    pub cxx:                 String,
    /// Compiler flags shared by every platform.
    #[serde(rename = "CXXFLAGS", default = "default_cxxflags")]
    pub cxxflags:            String,
    /// Linker flags shared by every platform.
    #[serde(rename = "LDFLAGS", default = "default_ldflags")]
    pub ldflags:             String,
    /// Extra compiler flags on Linux.
    #[serde(rename = "linux_CXXFLAGS", default = "default_linux_cxxflags")]
    pub linux_cxxflags:      String,
    /// Extra linker flags on Linux.
    #[serde(rename = "linux_LDFLAGS", default)]
    pub linux_ldflags:       String,
    /// Google Test include flags on Linux.
    #[serde(rename = "linux_GTESTINCLUDE", default = "default_linux_cxxflags")]
    pub linux_gtestinclude:  String,
    /// Google Test link flags on Linux.
    #[serde(rename = "linux_GTESTLIBS", default = "default_linux_gtestlibs")]
    pub linux_gtestlibs:     String,
    /// Extra compiler flags on macOS.
    #[serde(rename = "darwin_CXXFLAGS", default = "default_darwin_cxxflags")]
    pub darwin_cxxflags:     String,
    /// Extra linker flags on macOS.
    #[serde(rename = "darwin_LDFLAGS", default)]
    pub darwin_ldflags:      String,
    /// Google Test include flags on macOS.
    #[serde(rename = "darwin_GTESTINCLUDE", default = "default_darwin_gtestinclude")]
    pub darwin_gtestinclude: String,
    /// Google Test link flags on macOS.
    #[serde(rename = "darwin_GTESTLIBS", default = "default_darwin_gtestlibs")]
    pub darwin_gtestlibs:    String,
    /// Build and run Google Test unit tests.
    #[serde(default)]
    pub do_unit_tests:       bool,
    /// Run the format check.
    #[serde(default = "yes")]
    pub do_format_check:     bool,
    /// Run the lint check.
    #[serde(default = "yes")]
    pub do_lint_check:       bool,
    /// Lint with a bare language standard instead of the part's compile
    /// command.
    #[serde(default)]
    pub skip_compile_cmd:    bool,
    /// Google Test report format.
    #[serde(rename = "GTEST_OUTPUT_FORMAT", default = "default_gtest_format")]
    pub gtest_output_format: String,
    /// Google Test report file.
    #[serde(rename = "GTEST_OUTPUT_FILE", default = "default_gtest_file")]
    pub gtest_output_file:   String,
    /// Documentation generator.
    #[serde(rename = "DOXYGEN", default = "default_doxygen")]
    pub doxygen:             String,
    /// Documentation output directory.
    #[serde(rename = "DOCDIR", default = "default_docdir")]
    pub docdir:              String,
    /// Replaces the default clang-tidy check list for this part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tidy_checks:         Option<Vec<String>>,
}

/// serde default helper
fn yes() -> bool {
    true
}
/// serde default helper
fn default_cxx() -> String {
    "clang++".into()
}
/// serde default helper
fn default_cxxflags() -> String {
    "-g -O3 -Wall -pedantic -pipe -std=c++20".into()
}
/// serde default helper
fn default_ldflags() -> String {
    "-g -O3 -Wall -pedantic -pipe -std=c++20".into()
}
/// serde default helper
fn default_linux_cxxflags() -> String {
    "-D LINUX".into()
}
/// serde default helper
fn default_linux_gtestlibs() -> String {
    "-lgtest -lgtest_main -lpthread".into()
}
/// serde default helper
fn default_darwin_cxxflags() -> String {
    "-D OSX -I/opt/local/include".into()
}
/// serde default helper
fn default_darwin_gtestinclude() -> String {
    "-I /opt/local/include -I /opt/local/src/googletest".into()
}
/// serde default helper
fn default_darwin_gtestlibs() -> String {
    "-L /opt/local/lib -lgtest -lgtest_main".into()
}
/// serde default helper
fn default_gtest_format() -> String {
    "json".into()
}
/// serde default helper
fn default_gtest_file() -> String {
    "test_detail.json".into()
}
/// serde default helper
fn default_doxygen() -> String {
    "doxygen".into()
}
/// serde default helper
fn default_docdir() -> String {
    "doc".into()
}
/// serde default helper
fn default_makefile_name() -> String {
    "Makefile".into()
}
/// serde default helper
fn default_author_file() -> String {
    "AUTHORS.txt".into()
}

impl PartConfig {
    /// Flags that only apply on `platform`.
    pub fn platform_cxxflags(&self, platform: Platform) -> &str {
        match platform {
            Platform::Linux => &self.linux_cxxflags,
            Platform::Darwin => &self.darwin_cxxflags,
        }
    }

    /// `CXX CXXFLAGS <platform CXXFLAGS>`, the compiler invocation used to
    /// resolve flags when linting.
    pub fn compile_command(&self, platform: Platform) -> String {
        [self.cxx.as_str(), self.cxxflags.as_str(), self.platform_cxxflags(platform)]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The compiler invocation handed to the linter for this part.
    pub fn lint_compile_command(&self, platform: Platform) -> String {
        if self.skip_compile_cmd {
            "-std=c++17".to_string()
        } else {
            self.compile_command(platform)
        }
    }

    /// Graded files (`src` then `header`), split on whitespace.
    pub fn graded_files(&self) -> Vec<String> {
        self.src
            .split_whitespace()
            .chain(self.header.split_whitespace())
            .map(str::to_string)
            .collect()
    }

    /// Every field rendered as a string, keyed by its serialized name.
    pub fn substitutions(&self) -> BTreeMap<String, String> {
        let mut dict = BTreeMap::new();
        if let Ok(Value::Object(map)) = serde_json::to_value(self) {
            for (key, value) in map {
                dict.insert(key, render_value(&value));
            }
        }
        dict
    }
}

/// Description of a lab assignment and its parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabConfig {
    /// Flat layout with exactly one part and no `part-<n>` directories.
    #[serde(default)]
    pub single_project:   bool,
    /// Base name of generated Makefiles.
    #[serde(default = "default_makefile_name")]
    pub makefile_name:    String,
    /// Prefix generated Makefiles with a period.
    #[serde(default)]
    pub hidden_makefiles: bool,
    /// Where student authorship information lives, relative to the
    /// repository root.
    #[serde(default = "default_author_file")]
    pub author_file:      String,
    /// Parts in order.
    pub parts:            Vec<PartConfig>,
}

impl LabConfig {
    /// Reads and validates a JSON lab configuration.
    pub fn load(path: &Path) -> Result<Self, LabConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| LabConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parses and validates a JSON lab configuration.
    pub fn from_json(text: &str) -> Result<Self, LabConfigError> {
        let lab: LabConfig = serde_json::from_str(text)?;
        lab.validate()?;
        Ok(lab)
    }

    /// Checks invariants serde cannot express.
    pub fn validate(&self) -> Result<(), LabConfigError> {
        if self.parts.is_empty() {
            return Err(LabConfigError::Invalid("at least one part is required".into()));
        }
        if self.single_project && self.parts.len() != 1 {
            return Err(LabConfigError::Invalid(format!(
                "a single project lab has exactly one part, found {}",
                self.parts.len()
            )));
        }
        Ok(())
    }

    /// Number of parts.
    pub fn num_parts(&self) -> usize {
        self.parts.len()
    }

    /// Iterates over parts with their ids.
    pub fn parts(&self) -> impl Iterator<Item = (PartId, &PartConfig)> {
        self.parts.iter().enumerate().map(|(i, p)| (PartId(i), p))
    }

    /// Looks up one part.
    pub fn part(&self, id: PartId) -> Result<&PartConfig, LabConfigError> {
        self.parts.get(id.0).ok_or(LabConfigError::NoSuchPart {
            index: id.0,
            count: self.parts.len(),
        })
    }

    /// Makefile name, with a leading period when Makefiles are hidden.
    pub fn effective_makefile_name(&self) -> String {
        if self.hidden_makefiles && !self.makefile_name.starts_with('.') {
            format!(".{}", self.makefile_name)
        } else {
            self.makefile_name.clone()
        }
    }

    /// `src header` of every part, space separated.
    pub fn graded_sources(&self) -> String {
        self.parts
            .iter()
            .flat_map(PartConfig::graded_files)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Resolves a configuration value from a key path, for use by shell
    /// scripts and workflows.
    ///
    /// * `gradedsrc`: graded sources of every part
    /// * `makefile_name`: the effective Makefile name
    /// * `num_parts`: how many parts the lab has
    /// * `parts <n> <key>`: a field of part `n` (zero-based)
    /// * `<key>`: any other top-level field
    pub fn lookup<S: AsRef<str>>(&self, keys: &[S]) -> Result<String, LabConfigError> {
        let keys: Vec<&str> = keys.iter().map(AsRef::as_ref).collect();
        match keys.as_slice() {
            [] => Err(LabConfigError::MissingKey(String::new())),
            ["gradedsrc", ..] => Ok(self.graded_sources()),
            ["makefile_name", ..] => Ok(self.effective_makefile_name()),
            ["num_parts", ..] => Ok(self.num_parts().to_string()),
            ["parts", index, key, ..] => {
                let index: usize = index
                    .parse()
                    .map_err(|_| LabConfigError::MissingKey(format!("parts {index}")))?;
                let part = self.part(PartId(index))?;
                part.substitutions()
                    .remove(*key)
                    .ok_or_else(|| LabConfigError::MissingKey(format!("parts {index} {key}")))
            }
            [key, ..] => {
                let value = serde_json::to_value(self)?;
                value
                    .get(*key)
                    .map(render_value)
                    .ok_or_else(|| LabConfigError::MissingKey((*key).to_string()))
            }
        }
    }
}

/// Renders a JSON value the way shell consumers expect: strings bare,
/// everything else as JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
