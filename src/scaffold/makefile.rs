#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::Local;

use super::{ScaffoldError, backup::write_with_backup};
use crate::lab::{LabConfig, PartConfig, PartId};

/// Template for the Makefile of one part.
pub const PART_TEMPLATE: &str = include_str!("templates/part.mk");

/// Template for the top-level Makefile of a multi-part lab.
pub const ROOT_TEMPLATE: &str = include_str!("templates/root.mk");

/// Replaces every `${name}` whose name is in `values`; any other text,
/// including Make's own `$(...)` and `$@`, is left as it is.
pub fn substitute(template: &str, values: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match values.get(key) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Rules for the checks a part enables, plus their target names.
fn check_rules(part: &PartConfig) -> (String, Vec<&'static str>) {
    let mut rules = String::new();
    let mut targets = Vec::new();

    if part.do_format_check {
        rules.push_str("\nformat: $(GRADED)\n\t$(CCLAB) format-check $(GRADED)\n");
        targets.push("format");
    }
    if part.do_lint_check {
        rules.push_str(
            "\nlint: $(GRADED)\n\t$(CCLAB) lint --lab $(LAB_CONFIG) --part $(PART) $(GRADED)\n",
        );
        targets.push("lint");
    }
    if part.do_unit_tests {
        rules.push_str(
            "\nunittest: $(TARGET)_functions.o $(TARGET)_unittest.cc\n\t@$(CXX) $(CXXFLAGS) \
             $(GTESTINCLUDE) $(LDFLAGS) -o unittest $(TARGET)_unittest.cc \
             $(TARGET)_functions.cc $(GTESTLIBS)\n\t@./unittest \
             --gtest_output=$(GTEST_OUTPUT_FORMAT):$(GTEST_OUTPUT_FILE)\n",
        );
        targets.push("unittest");
    }
    (rules, targets)
}

/// Renders the Makefile for one part.
pub fn render_part_makefile(
    part: &PartConfig,
    id: PartId,
    makefile_name: &str,
    script_prefix: &str,
    now: &str,
) -> String {
    let (rules, targets) = check_rules(part);
    let extras: String = targets.iter().map(|t| format!(" {t}")).collect();

    let mut values = part.substitutions();
    values.insert("generator".into(), env!("CARGO_PKG_NAME").into());
    values.insert("now".into(), now.into());
    values.insert("makefile_name".into(), makefile_name.into());
    values.insert("script_prefix".into(), script_prefix.into());
    values.insert("part".into(), id.number().to_string());
    values.insert("check_rules".into(), rules);
    values.insert("all_extras".into(), extras.clone());
    values.insert("phony_extras".into(), extras);

    substitute(PART_TEMPLATE, &values)
}

/// Renders the top-level Makefile that recurses into every part; `format`
/// and `lint` only visit parts that enable those checks.
pub fn render_root_makefile(lab: &LabConfig, makefile_name: &str, now: &str) -> String {
    let dirs = |enabled: fn(&PartConfig) -> bool| {
        lab.parts()
            .filter(|(_, part)| enabled(part))
            .map(|(id, _)| id.dir_name())
            .collect::<Vec<_>>()
            .join(" ")
    };

    let values = BTreeMap::from([
        ("generator".to_string(), env!("CARGO_PKG_NAME").to_string()),
        ("now".to_string(), now.to_string()),
        ("makefile_name".to_string(), makefile_name.to_string()),
        ("part_dirs".to_string(), dirs(|_| true)),
        ("format_dirs".to_string(), dirs(|part| part.do_format_check)),
        ("lint_dirs".to_string(), dirs(|part| part.do_lint_check)),
    ]);
    substitute(ROOT_TEMPLATE, &values)
}

/// Writes every Makefile of `lab` under `repo_root`, backing up existing
/// ones, and returns the paths written.
///
/// Single-project labs get one Makefile in `repo_root`. Otherwise each part
/// gets one in `repo_root/part-<n>` (created when missing) and `repo_root`
/// gets a Makefile that drives them all.
pub fn generate_makefiles(repo_root: &Path, lab: &LabConfig) -> Result<Vec<PathBuf>, ScaffoldError> {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let makefile_name = lab.effective_makefile_name();
    let mut written = Vec::new();

    if lab.single_project {
        tracing::info!("Flat, single project layout. No parts.");
    }

    for (id, part) in lab.parts() {
        let (part_dir, script_prefix) = if lab.single_project {
            (repo_root.to_path_buf(), "")
        } else {
            (repo_root.join(id.dir_name()), "../")
        };

        if !part_dir.exists() {
            tracing::warn!("Directory \"{}\" does not exist. Creating...", part_dir.display());
            std::fs::create_dir_all(&part_dir).map_err(|source| ScaffoldError::CreateDir {
                path: part_dir.clone(),
                source,
            })?;
        }

        let target = part_dir.join(&makefile_name);
        let contents = render_part_makefile(part, id, &makefile_name, script_prefix, &now);
        write_with_backup(&target, &contents)?;
        written.push(target);
    }

    if !lab.single_project {
        let target = repo_root.join(&makefile_name);
        write_with_backup(&target, &render_root_makefile(lab, &makefile_name, &now))?;
        written.push(target);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitute_leaves_make_syntax_alone() {
        let out = substitute(
            "T = ${target}\n$(T): $(OBJ)\n\t$(CXX) -o $@ $^ ${unknown}",
            &values(&[("target", "hello")]),
        );
        assert_eq!(out, "T = hello\n$(T): $(OBJ)\n\t$(CXX) -o $@ $^ ${unknown}");
    }

    #[test]
    fn substitute_handles_unterminated_placeholder() {
        assert_eq!(substitute("a ${b", &values(&[("b", "x")])), "a ${b");
        assert_eq!(substitute("${a}${a}", &values(&[("a", "x")])), "xx");
    }

    #[test]
    fn part_makefile_carries_part_settings() {
        let lab = LabConfig::from_json(
            r#"{"parts": [{"target": "hello", "src": "hello.cc", "header": "hello.h",
                "do_unit_tests": true, "do_lint_check": false}]}"#,
        )
        .expect("parse");
        let part = lab.part(PartId(0)).expect("part");
        let text = render_part_makefile(part, PartId(0), "Makefile", "../", "2024-01-01 00:00:00");

        assert!(text.contains("TARGET = hello\n"));
        assert!(text.contains("%.o: %.cc $(HEADERS)\n\t$(CXX) $(CXXFLAGS) -c $< -o $@\n"));
        assert!(text.contains("PART = 1\n"));
        assert!(text.contains("GRADED = hello.cc hello.h\n"));
        assert!(text.contains("CXXFLAGS += -D LINUX\n"));
        assert!(text.contains("LAB_CONFIG ?= ../.config/lab.json\n"));
        assert!(text.contains("\nformat: $(GRADED)\n"));
        assert!(!text.contains("\nlint:"));
        assert!(text.contains("\nunittest: $(TARGET)_functions.o $(TARGET)_unittest.cc\n"));
        assert!(text.contains("all: $(TARGET) format unittest\n"));
        assert!(text.contains(".PHONY: default all compilecmd doc clean format unittest"));
        assert!(!text.contains("${"));
    }

    #[test]
    fn root_makefile_lists_part_directories() {
        let lab = LabConfig::from_json(
            r#"{"parts": [{"target": "a", "src": "a.cc"}, {"target": "b", "src": "b.cc"}]}"#,
        )
        .expect("parse");
        let text = render_root_makefile(&lab, ".Makefile", "now");
        assert!(text.contains("PARTS = part-1 part-2\n"));
        assert!(text.contains("MAKEFILE_NAME = .Makefile\n"));
        assert!(text.contains("$(MAKE) -C $$part -f $(MAKEFILE_NAME) $@"));
    }

    #[test]
    fn root_makefile_skips_parts_without_a_check() {
        let lab = LabConfig::from_json(
            r#"{"parts": [{"target": "a", "src": "a.cc"},
                {"target": "b", "src": "b.cc", "do_format_check": false},
                {"target": "c", "src": "c.cc", "do_lint_check": false}]}"#,
        )
        .expect("parse");
        let text = render_root_makefile(&lab, "Makefile", "now");
        assert!(text.contains("PARTS = part-1 part-2 part-3\n"));
        assert!(text.contains("FORMAT_PARTS = part-1 part-3\n"));
        assert!(text.contains("LINT_PARTS = part-1 part-2\n"));
        assert!(text.contains("\nformat:\n\t@for part in $(FORMAT_PARTS);"));
        assert!(text.contains("\nlint:\n\t@for part in $(LINT_PARTS);"));
    }
}
