// Regression tests for the guardex binary: output streams, exit codes and
// miette diagnostics.
// Requires: assert_cmd, predicates crates in [dev-dependencies]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};
use tempfile::TempDir;

const GUARDED: &str = "package main\n\nfunc main() {\n\tguard(run(), \"starting\")\n}\n";

fn guardex() -> Command {
    Command::cargo_bin("guardex").unwrap()
}

fn write_file(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, text).unwrap();
    path
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn expand_prints_the_expanded_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "main.go", GUARDED);
    guardex()
        .current_dir(dir.path())
        .arg("expand")
        .arg(&file)
        .assert()
        .success()
        .stdout(
            contains("import \"log\"")
                .and(contains("\terr = run()\n"))
                .and(contains("log.Fatal(\"starting\", err)"))
                .and(contains("guard(").not()),
        );
}

#[test]
fn expand_writes_to_the_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "main.go", GUARDED);
    let target = dir.path().join("main_expanded.go");
    guardex()
        .current_dir(dir.path())
        .arg("expand")
        .arg(&file)
        .arg("-o")
        .arg(&target)
        .assert()
        .success()
        .stdout(contains("package").not())
        .stderr(contains("Expanded"));
    assert!(read(&target).contains("if err != nil {"));
    assert_eq!(read(&file), GUARDED);
}

#[test]
fn expand_diff_marks_added_lines() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "main.go", GUARDED);
    guardex()
        .current_dir(dir.path())
        .args(["expand", "--diff"])
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("+\tvar err error").and(contains("-\tguard(run(), \"starting\")")));
}

#[test]
fn check_fails_on_residue() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        &dir,
        "main.go",
        "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(guard(run()))\n}\n",
    );
    guardex()
        .current_dir(dir.path())
        .arg("check")
        .arg(&file)
        .assert()
        .code(1)
        .stderr(contains("guardex::warning::residue_detected").and(contains("Residue")));
}

#[test]
fn check_passes_on_clean_expansion() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "main.go", GUARDED);
    guardex()
        .current_dir(dir.path())
        .arg("check")
        .arg(&file)
        .assert()
        .success()
        .stderr(contains("1 guard(s) expand cleanly"));
}

#[test]
fn syntax_errors_are_rendered_with_miette() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "bad.go", "package main\n\nfunc main() {\n\tguard(run()\n}\n");
    guardex()
        .current_dir(dir.path())
        .arg("expand")
        .arg(&file)
        .assert()
        .failure()
        .stderr(contains("guardex::parse::syntax"));
}

#[test]
fn malformed_guard_is_an_expansion_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "bad.go", "package main\n\nfunc main() {\n\tguard(42)\n}\n");
    guardex()
        .current_dir(dir.path())
        .arg("expand")
        .arg(&file)
        .assert()
        .failure()
        .stderr(contains("guardex::expand::malformed_guard_call").and(contains("help")));
}

#[test]
fn ast_json_describes_the_tree() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "main.go", GUARDED);
    guardex()
        .current_dir(dir.path())
        .args(["ast", "--json"])
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("\"package\"").and(contains("\"guard\"")));
}

#[test]
fn gen_mirrors_the_source_tree() {
    let src = tempfile::tempdir().unwrap();
    write_file(&src, "main.go", GUARDED);
    write_file(&src, "lib/util.go", "package lib\n\n// Util does nothing.\nfunc Util() {\n}\n");
    write_file(&src, "testdata/skip.go", GUARDED);
    let out = tempfile::tempdir().unwrap();

    guardex()
        .current_dir(src.path())
        .arg("gen")
        .arg(out.path())
        .arg("--src")
        .arg(src.path())
        .assert()
        .success()
        .stderr(contains("2 file(s), 1 guard(s) expanded"));

    assert!(read(&out.path().join("main.go")).contains("log.Fatal(\"starting\", err)"));
    assert_eq!(
        read(&out.path().join("lib/util.go")),
        "package lib\n\n// Util does nothing.\nfunc Util() {\n}\n"
    );
    assert!(!out.path().join("testdata").exists());
}

#[test]
fn config_file_renames_the_macro() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(&dir, "custom.yaml", "expand:\n  guard_ident: try\n  capture_var: e\n");
    let file = write_file(&dir, "main.go", "package main\n\nfunc main() {\n\ttry(run())\n}\n");
    guardex()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("expand")
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("\te = run()\n").and(contains("log.Fatal(e)")));
}

#[test]
fn default_config_is_picked_up_from_the_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir, "guardex.yaml", "expand:\n  fatal_func: log.Panic\n");
    let file = write_file(&dir, "main.go", GUARDED);
    guardex()
        .current_dir(dir.path())
        .arg("expand")
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("log.Panic(\"starting\", err)"));
}

#[test]
fn unknown_config_fields_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(&dir, "bad.yaml", "expand:\n  guard: try\n");
    let file = write_file(&dir, "main.go", GUARDED);
    guardex()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("expand")
        .arg(&file)
        .assert()
        .failure()
        .stderr(contains("unknown field"));
}
