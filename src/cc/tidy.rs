use std::ffi::{OsStr, OsString};

use itertools::Itertools;

/// Check globs enabled (or, with a leading `-`, disabled) for every lab.
///
/// See <https://clang.llvm.org/extra/clang-tidy/checks/list.html>.
pub const GLOBAL_CHECKS: &[&str] = &[
    "-*",
    "boost-*",
    "bugprone-*",
    "-bugprone-easily-swappable-parameters",
    "-bugprone-narrowing-conversions",
    "clang-analyzer-*",
    "cppcoreguidelines-*",
    "-cppcoreguidelines-avoid-do-while",
    "-cppcoreguidelines-avoid-magic-numbers",
    "-cppcoreguidelines-narrowing-conversions",
    "-cppcoreguidelines-pro-type-union-access",
    "-cppcoreguidelines-owning-memory",
    "google-*",
    "-google-build-using-namespace",
    "llvm-*",
    "-llvm-else-after-return",
    "-llvm-header-guard",
    "misc-*",
    "-misc-no-recursion",
    "-misc-unused-parameters",
    "-misc-include-cleaner",
    "hicpp-*",
    "-hicpp-special-member-functions",
    "modernize-*",
    "-modernize-use-trailing-return-type",
    "-modernize-use-nodiscard",
    "-modernize-pass-by-value",
    "performance-*",
    "-performance-unnecessary-value-param",
    "portability-*",
    "readability-*",
    "-readability-magic-numbers",
    "-readability-else-after-return",
    "-readability-simplify-boolean-expr",
    "-readability-identifier-length",
];

/// `CheckOptions` entries; values are YAML scalars and keep their quotes.
pub const GLOBAL_CHECK_OPTIONS: &[(&str, &str)] = &[
    ("readability-identifier-naming.ClassCase", "CamelCase"),
    ("readability-identifier-naming.MemberCase", "lower_case"),
    ("readability-identifier-naming.ClassMemberCase", "lower_case"),
    ("readability-identifier-naming.PrivateMemberCase", "lower_case"),
    ("readability-identifier-naming.PublicMemberCase", "lower_case"),
    ("readability-identifier-naming.ProtectedMemberCase", "lower_case"),
    ("readability-identifier-naming.MethodCase", "CamelCase"),
    ("readability-identifier-naming.PrivateMemberSuffix", "_"),
    ("readability-identifier-naming.PublicMemberSuffix", "''"),
    ("readability-identifier-naming.ConstexprVariableCase", "CamelCase"),
    ("readability-identifier-naming.ConstexprVariablePrefix", "k"),
    ("readability-identifier-naming.EnumCase", "CamelCase"),
    ("readability-identifier-naming.EnumConstantCase", "CamelCase"),
    ("readability-identifier-naming.EnumConstantPrefix", "k"),
    ("readability-identifier-naming.FunctionCase", "CamelCase"),
    ("readability-identifier-naming.GlobalConstantCase", "CamelCase"),
    ("readability-identifier-naming.GlobalConstantPrefix", "k"),
    ("readability-identifier-naming.StaticConstantCase", "CamelCase"),
    ("readability-identifier-naming.StaticConstantPrefix", "k"),
    ("readability-identifier-naming.StaticVariableCase", "lower_case"),
    ("readability-identifier-naming.MacroDefinitionCase", "UPPER_CASE"),
    ("readability-identifier-naming.MacroDefinitionIgnoredRegexp", "'^[A-Z]+(_[A-Z]+)*_$'"),
    ("readability-identifier-naming.NamespaceCase", "lower_case"),
    ("readability-identifier-naming.ParameterCase", "lower_case"),
    ("readability-identifier-naming.TypeAliasCase", "CamelCase"),
    ("readability-identifier-naming.TypedefCase", "CamelCase"),
    ("readability-identifier-naming.VariableCase", "lower_case"),
    ("readability-identifier-naming.IgnoreMainLikeFunctions", "1"),
    (
        "cppcoreguidelines-special-member-functions.AllowMissingMoveFunctionsWhenCopyIsDeleted",
        "true",
    ),
];

/// Extra check disabled when grading the instructor's solution.
pub const SOLUTION_EXTRA_CHECK: &str = "-google-readability-todo";

/// Environment variable that marks a run over the instructor's solution.
pub const SOLUTION_ENV: &str = "LABSOLUTION";

/// The clang-tidy rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TidyOptions {
    /// Check globs in order.
    checks:        Vec<String>,
    /// `CheckOptions` key/value pairs.
    check_options: Vec<(String, String)>,
}

impl Default for TidyOptions {
    fn default() -> Self {
        Self {
            checks:        GLOBAL_CHECKS.iter().map(|c| c.to_string()).collect(),
            check_options: GLOBAL_CHECK_OPTIONS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl TidyOptions {
    /// The global rule set, relaxed for solution runs when `LABSOLUTION` is
    /// set.
    pub fn from_env() -> Self {
        Self::for_solution_flag(std::env::var_os(SOLUTION_ENV).as_deref())
    }

    /// The global rule set, relaxed when `flag` is present and non-empty.
    pub fn for_solution_flag(flag: Option<&OsStr>) -> Self {
        let options = Self::default();
        if flag.is_some_and(|value| !value.is_empty()) {
            options.with_extra_check(SOLUTION_EXTRA_CHECK)
        } else {
            options
        }
    }

    /// Replaces the check list, keeping the check options.
    pub fn with_checks<I, S>(mut self, checks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.checks = checks.into_iter().map(Into::into).collect();
        self
    }

    /// Appends one check glob.
    pub fn with_extra_check(mut self, check: impl Into<String>) -> Self {
        self.checks.push(check.into());
        self
    }

    /// Check globs.
    pub fn checks(&self) -> &[String] {
        &self.checks
    }

    /// `--checks=<globs>`
    pub fn checks_arg(&self) -> String {
        format!("--checks={}", self.checks.iter().join(","))
    }

    /// `--config={CheckOptions: [...]}`
    pub fn config_arg(&self) -> String {
        let entries = self
            .check_options
            .iter()
            .map(|(key, value)| format!("{{key: {key}, value: {value}}}"))
            .join(", ");
        format!("--config={{CheckOptions: [{entries}]}}")
    }

    /// Both arguments, ready to pass to `clang-tidy`.
    pub fn args(&self) -> Vec<OsString> {
        vec![self.checks_arg().into(), self.config_arg().into()]
    }
}
