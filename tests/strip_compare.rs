mod support;

use std::{fs, time::Duration};

use cclab::{
    SystemRunner, ToolError,
    cc::{CommentStripper, DiffError, StripError, strip_and_compare, strip_comments},
    config::ToolConfig,
};
use support::{EchoRunner, ScriptedRunner, failed, have, ok, temp_root, write};

#[test]
fn stripper_escapes_before_and_restores_after_the_preprocessor() {
    let root = temp_root("strip-escape");
    let file = write(&root, "main.cc", "#include <iostream>\nint __max = 1; // max\n");

    let runner = ScriptedRunner::new([ok("aCinclude <iostream>\nint aBmaAx = 1;\n")]);
    let text = CommentStripper::new(&runner, &ToolConfig::default())
        .try_strip(&file)
        .expect("strip");

    assert_eq!(text.lines(), ["#include<iostream>", "int __max=1;"]);

    let seen = runner.invocations();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].program(), "clang++");
    assert_eq!(runner.argv(0), ["-E", "-P", "-"]);
    assert_eq!(seen[0].limit(), Some(Duration::from_secs(10)));

    let fed = String::from_utf8_lossy(seen[0].stdin().expect("stdin")).into_owned();
    assert!(!fed.contains('#'));
    assert!(!fed.contains("__"));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn passthrough_preprocessor_only_normalizes() {
    let root = temp_root("strip-echo");
    let file = write(&root, "a.cc", "int  a = 1;\n\n   return   a;  \n");

    let text = strip_comments(&EchoRunner, &ToolConfig::default(), &file).expect("strip");
    assert_eq!(text.lines(), ["int a=1;", "return a;"]);

    let _ = fs::remove_dir_all(root);
}

#[test]
fn cat_round_trips_through_a_real_process() {
    if !have("cat") {
        return;
    }
    let root = temp_root("strip-cat");
    let file = write(&root, "b.cc", "#define X __LINE__\nauto banana = X;\n");

    let tools = ToolConfig::default().with_preprocessor("cat", Vec::<String>::new());
    let text = strip_comments(&SystemRunner, &tools, &file).expect("strip");
    assert_eq!(text.lines(), ["#define X __LINE__", "auto banana=X;"]);

    let _ = fs::remove_dir_all(root);
}

#[test]
fn missing_file_is_reported_without_running_anything() {
    let root = temp_root("strip-missing");
    let runner = ScriptedRunner::default();
    let stripper = CommentStripper::new(&runner, &ToolConfig::default());

    let err = stripper.try_strip(&root.join("nope.cc")).unwrap_err();
    assert!(matches!(err, StripError::NoSuchFile(_)));
    assert!(stripper.strip(&root.join("nope.cc")).is_none());
    assert!(runner.invocations().is_empty());

    let _ = fs::remove_dir_all(root);
}

#[test]
fn preprocessor_failure_becomes_absent_text() {
    let root = temp_root("strip-fail");
    let file = write(&root, "bad.cc", "int main(");

    let runner = ScriptedRunner::new([failed(1, "error: expected ')'")]);
    let stripper = CommentStripper::new(&runner, &ToolConfig::default());
    match stripper.try_strip(&file) {
        Err(StripError::Preprocessor { code, stderr }) => {
            assert_eq!(code, Some(1));
            assert_eq!(stderr, "error: expected ')'");
        }
        other => panic!("unexpected {other:?}"),
    }

    let runner = ScriptedRunner::new([Err(ToolError::NotFound {
        program: "clang++".into(),
    })]);
    assert!(
        CommentStripper::new(&runner, &ToolConfig::default())
            .strip(&file)
            .is_none()
    );

    let _ = fs::remove_dir_all(root);
}

#[test]
fn compare_refuses_when_a_side_cannot_be_stripped() {
    let root = temp_root("compare-absent");
    let base = write(&root, "base.cc", "int a=1;\n");

    let stripper = CommentStripper::new(&EchoRunner, &ToolConfig::default());
    let err = strip_and_compare(&stripper, &base, &root.join("missing.cc"), 3).unwrap_err();
    assert_eq!(err, DiffError::Incomparable("the submission"));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn compare_reports_changed_lines_with_labels() {
    let root = temp_root("compare-echo");
    let base = write(&root, "base.cc", "int a=1;\n");
    let submission = write(&root, "sub.cc", "int a=2;\n");

    let stripper = CommentStripper::new(&EchoRunner, &ToolConfig::default());
    let report = strip_and_compare(&stripper, &base, &submission, 3).expect("compare");
    assert_eq!(
        report.lines(),
        [
            "*** Base",
            "--- Submission",
            "***************",
            "*** 1 ****",
            "! int a=1;",
            "--- 1 ----",
            "! int a=2;",
        ]
    );

    let _ = fs::remove_dir_all(root);
}

#[test]
fn replayed_preprocessor_output_hides_comment_only_edits() {
    let root = temp_root("compare-replay-same");
    let base = write(&root, "base.cc", "int main(){return 0;}\n");
    let submission = write(&root, "sub.cc", "int main(){ /* x */ return 0;}\n");

    let runner = ScriptedRunner::new([
        ok("int maAin(){return 0;}\n"),
        ok("int maAin(){ return 0;}\n"),
    ]);
    let stripper = CommentStripper::new(&runner, &ToolConfig::default());
    let report = strip_and_compare(&stripper, &base, &submission, 3).expect("compare");
    assert!(report.is_empty(), "{report}");

    let seen = runner.invocations();
    let fed = String::from_utf8_lossy(seen[1].stdin().expect("stdin")).into_owned();
    assert_eq!(fed, "int maAin(){ /* x */ return 0;}\n");

    let _ = fs::remove_dir_all(root);
}

#[test]
fn replayed_preprocessor_output_shows_code_edits() {
    let root = temp_root("compare-replay-diff");
    let base = write(&root, "base.cc", "// starter\nint a=1;\n");
    let submission = write(&root, "sub.cc", "int a=2; // done\n");

    let runner = ScriptedRunner::new([ok("int aA=1;\n"), ok("int aA=2;\n")]);
    let stripper = CommentStripper::new(&runner, &ToolConfig::default());
    let report = strip_and_compare(&stripper, &base, &submission, 3).expect("compare");
    assert!(report.lines().iter().any(|l| l == "! int a=1;"), "{report}");
    assert!(report.lines().iter().any(|l| l == "! int a=2;"), "{report}");

    let _ = fs::remove_dir_all(root);
}

#[test]
fn replayed_comments_only_file_is_blank() {
    let root = temp_root("strip-replay-blank");
    let file = write(&root, "notes.h", "// just notes\n/* and\n   more */\n");

    let runner = ScriptedRunner::new([ok("\n\n")]);
    let text = CommentStripper::new(&runner, &ToolConfig::default())
        .strip(&file)
        .expect("strip");
    assert!(text.is_blank());
    assert!(text.is_empty());

    let _ = fs::remove_dir_all(root);
}

#[test]
fn operator_spacing_and_literals_are_real_edits() {
    let root = temp_root("compare-operators");
    let base = write(&root, "base.cc", "return a - -b;\nputs(\"x  y\");\n");
    let submission = write(&root, "sub.cc", "return a--b;\nputs(\"x y\");\n");

    let stripper = CommentStripper::new(&EchoRunner, &ToolConfig::default());
    let report = strip_and_compare(&stripper, &base, &submission, 3).expect("compare");
    assert!(report.lines().iter().any(|l| l == "! return a- -b;"), "{report}");
    assert!(report.lines().iter().any(|l| l == "! puts(\"x y\");"), "{report}");

    let _ = fs::remove_dir_all(root);
}

/// A stripper backed by `clang++`, or `g++` when clang is not installed.
fn real_stripper(runner: &SystemRunner) -> Option<CommentStripper<'_>> {
    if have("clang++") {
        Some(CommentStripper::new(runner, &ToolConfig::default()))
    } else if have("g++") {
        let tools =
            ToolConfig::default().with_preprocessor("g++", ["-E", "-P", "-x", "c++", "-"]);
        Some(CommentStripper::new(runner, &tools))
    } else {
        None
    }
}

#[test]
fn comment_only_edits_leave_no_diff() {
    let runner = SystemRunner;
    let Some(stripper) = real_stripper(&runner) else {
        return;
    };
    let root = temp_root("compare-clang-same");
    let base = write(&root, "base.cc", "int main(){return 0;}\n");
    let submission = write(&root, "sub.cc", "int main(){ /* x */ return 0;}\n");

    let report = strip_and_compare(&stripper, &base, &submission, 3).expect("compare");
    assert!(report.is_empty(), "{report}");

    let _ = fs::remove_dir_all(root);
}

#[test]
fn code_edits_show_up_after_stripping() {
    let runner = SystemRunner;
    let Some(stripper) = real_stripper(&runner) else {
        return;
    };
    let root = temp_root("compare-clang-diff");
    let base = write(&root, "base.cc", "// starter\nint a=1;\n");
    let submission = write(&root, "sub.cc", "int a=2; // done\n");

    let report = strip_and_compare(&stripper, &base, &submission, 3).expect("compare");
    assert!(report.lines().iter().any(|l| l == "! int a=1;"), "{report}");
    assert!(report.lines().iter().any(|l| l == "! int a=2;"), "{report}");

    let _ = fs::remove_dir_all(root);
}

#[test]
fn comments_only_file_strips_to_blank() {
    let runner = SystemRunner;
    let Some(stripper) = real_stripper(&runner) else {
        return;
    };
    let root = temp_root("strip-clang-blank");
    let file = write(&root, "notes.h", "// just notes\n/* and\n   more */\n");

    let text = stripper.strip(&file).expect("strip");
    assert!(text.is_blank());

    let _ = fs::remove_dir_all(root);
}

#[test]
fn directives_and_reserved_names_survive_real_preprocessing() {
    let runner = SystemRunner;
    let Some(stripper) = real_stripper(&runner) else {
        return;
    };
    let root = temp_root("strip-clang-directives");
    let file = write(
        &root,
        "a.cc",
        "#include <nonexistent_header.h>\n#define __TWICE(x) ((x) * 2)\nint a = __TWICE(1); // c\n",
    );

    let text = stripper.strip(&file).expect("strip");
    let lines = text.lines();
    assert_eq!(lines.len(), 3, "{lines:?}");
    assert!(lines[0].starts_with("#include"), "{lines:?}");
    assert!(lines[1].starts_with("#define __TWICE"), "{lines:?}");
    assert_eq!(lines[2], "int a=__TWICE(1);");

    let _ = fs::remove_dir_all(root);
}
