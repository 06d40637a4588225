// Expansion behavior end to end: source text in, source text and warnings out.

mod common;

use common::{count_kind, count_lines, expand, expand_ok, expand_with, function_body};
use guardex::config::ExpandConfig;
use guardex::errors::{ErrorCategory, SourceContext};
use guardex::macros::{self, MacroContext};
use guardex::syntax::parse_str;
use guardex::WarningKind;
use miette::Diagnostic;

const BINDING: &str = "package main

import \"fmt\"

func next(n int) (int, error) {
\treturn n, nil
}

func call(n int) (int, error) {
\toutput := guard(next(n), FATAL)
\tfmt.Println(output)
\treturn output, nil
}
";

const BINDING_EXPANDED: &str = "package main

import (
\t\"fmt\"
\t\"log\"
)

func next(n int) (int, error) {
\treturn n, nil
}

func call(n int) (int, error) {
\tvar err error
\toutput, err := next(n)
\tif err != nil {
\t\tlog.Fatal(err)
\t}
\tfmt.Println(output)
\treturn output, nil
}
";

#[test]
fn file_without_guards_is_returned_unchanged() {
    let text = "package main\n\n// comments survive\nfunc main() {\n\tx := 1 // trailing\n\t_ = x\n}\n";
    let output = expand_ok(text);
    assert_eq!(output.text, text);
    assert_eq!(output.expanded, 0);
    assert!(output.warnings.is_empty());

    let original = parse_str(text).unwrap();
    let mut tree = original.clone();
    let config = ExpandConfig::default();
    let source = SourceContext::from_file("test.go", text);
    let report = macros::expand(&mut tree, &MacroContext::new(&config, &source)).unwrap();
    assert_eq!(report.expanded, 0);
    assert_eq!(tree, original);
}

#[test]
fn binding_is_preserved_and_log_is_imported() {
    let output = expand_ok(BINDING);
    assert_eq!(output.text, BINDING_EXPANDED);
    assert_eq!(output.expanded, 1);
}

#[test]
fn expanding_expanded_output_is_a_no_op() {
    let once = expand_ok(BINDING).text;
    let twice = expand_ok(&once);
    assert_eq!(twice.expanded, 0);
    assert_eq!(twice.text, once);
}

#[test]
fn default_policy_follows_the_enclosing_function() {
    let text = "package main

func fallible() error {
\tguard(step())
\treturn nil
}

func infallible() int {
\tguard(step())
\treturn 0
}
";
    let output = expand_ok(text);
    let fallible = function_body(&output.text, "fallible");
    assert!(fallible.contains(&"return err".to_string()), "{fallible:?}");
    let infallible = function_body(&output.text, "infallible");
    assert!(infallible.contains(&"log.Fatal(err)".to_string()), "{infallible:?}");
}

#[test]
fn explicit_tokens_override_the_shape() {
    let text = "package main

func fallible() error {
\tguard(step(), FATAL)
\treturn nil
}

func infallible() {
\tguard(step(), RETURN)
}
";
    let output = expand_ok(text);
    assert!(function_body(&output.text, "fallible").contains(&"log.Fatal(err)".to_string()));
    let infallible = function_body(&output.text, "infallible");
    assert!(infallible.contains(&"return".to_string()), "{infallible:?}");
    assert!(!infallible.iter().any(|l| l.starts_with("log.")));
    assert_eq!(count_kind(&output.warnings, WarningKind::AmbiguousPolicy), 1);
}

#[test]
fn zero_values_are_synthesized_for_every_other_slot() {
    let text = "package main

func load() (int, string, error) {
\tguard(step())
\treturn 1, \"\", nil
}
";
    let body = function_body(&expand_ok(text).text, "load");
    assert_eq!(
        body,
        [
            "var err error",
            "err = step()",
            "if err != nil {",
            "var ret0 int",
            "var ret1 string",
            "return ret0, ret1, err",
            "}",
            "return 1, \"\", nil",
        ]
    );
}

#[test]
fn one_capture_declaration_per_block() {
    let text = "package main

func run() error {
\tguard(a())
\tguard(b(), \"second\")
\tif ready {
\t\tguard(c())
\t}
\treturn nil
}
";
    let output = expand_ok(text);
    // one for the function body, one for the nested block
    assert_eq!(count_lines(&output.text, "var err error"), 2);
    assert_eq!(count_lines(&output.text, "err = a()"), 1);
    assert_eq!(count_lines(&output.text, "err = b()"), 1);
    assert_eq!(count_lines(&output.text, "log.Print(\"second\", err)"), 1);
}

#[test]
fn handler_body_replaces_the_action() {
    let text = "package main

func run() {
\tguard(step(), func() {
\t\treturn
\t})
}
";
    let body = function_body(&expand_ok(text).text, "run");
    assert_eq!(body, ["var err error", "err = step()", "if err != nil {", "return", "}"]);
}

#[test]
fn nested_guard_is_left_as_residue() {
    let text = "package main

import \"fmt\"

func run() {
\tfmt.Println(guard(step()))
}
";
    let output = expand_ok(text);
    assert_eq!(output.text, text);
    assert_eq!(count_kind(&output.warnings, WarningKind::ResidueDetected), 1);
    assert!(output.has_residue());
}

#[test]
fn malformed_guard_fails_the_whole_file() {
    let text = "package main\n\nfunc run() {\n\tguard(step())\n\tguard(\"not a call\")\n}\n";
    let err = expand(text).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Expansion);
    assert_eq!(
        err.code().map(|c| c.to_string()).as_deref(),
        Some("guardex::expand::malformed_guard_call")
    );
    assert!(err.help().is_some());
}

#[test]
fn configuration_renames_every_synthesized_name() {
    let config = ExpandConfig {
        guard_ident: "try".into(),
        capture_var: "e".into(),
        fatal_func: "glog.Fatal".into(),
        log_import: "github.com/golang/glog".into(),
        ..ExpandConfig::default()
    };
    let text = "package main\n\nfunc run() {\n\ttry(step())\n}\n";
    let output = expand_with(config, text).unwrap();
    let body = function_body(&output.text, "run");
    assert_eq!(body, ["var e error", "e = step()", "if e != nil {", "glog.Fatal(e)", "}"]);
    assert!(output.text.contains("import \"github.com/golang/glog\"\n"));
}

#[test]
fn demo_program_expands_completely() {
    let output = expand_ok(include_str!("../demos/basic.go"));
    assert_eq!(output.expanded, 9);
    assert!(!output.has_residue());
    // RETURN in main, which returns nothing
    assert_eq!(count_kind(&output.warnings, WarningKind::AmbiguousPolicy), 1);

    let call = function_body(&output.text, "call");
    assert!(call.contains(&"output, err := next(-1)".to_string()));
    assert!(call.contains(&"output, err = next(-1)".to_string()));
    assert!(call.contains(&"_, err = next(-1)".to_string()));
    assert!(call.contains(&"log.Fatal(\"message\", err)".to_string()));

    let main = function_body(&output.text, "main");
    assert_eq!(main.iter().filter(|l| l.as_str() == "var err error").count(), 1);
    assert!(main.contains(&"fmt.Println(err)".to_string()));
    assert!(main.contains(&"err = bareCall(6)".to_string()));
}

#[test]
fn named_error_result_is_not_redeclared() {
    let text = "package main\n\nfunc load() (n int, err error) {\n\tn = guard(parse())\n\treturn\n}\n";
    let output = expand_ok(text);
    assert_eq!(count_lines(&output.text, "var err error"), 0);
    assert_eq!(
        function_body(&output.text, "load"),
        ["n, err = parse()", "if err != nil {", "var ret0 int", "return ret0, err", "}", "return"]
    );
}

#[test]
fn error_parameter_is_not_redeclared() {
    let text = "package main\n\nfunc wrap(err error) error {\n\tguard(step())\n\treturn err\n}\n";
    let output = expand_ok(text);
    assert_eq!(count_lines(&output.text, "var err error"), 0);
    assert_eq!(count_lines(&output.text, "err = step()"), 1);
}

#[test]
fn receiver_named_like_the_capture_is_not_redeclared() {
    let text = "package main\n\ntype fault struct{}\n\nfunc (err *fault) retry() error {\n\tguard(step())\n\treturn nil\n}\n";
    let output = expand_ok(text);
    assert_eq!(count_lines(&output.text, "var err error"), 0);
    assert_eq!(count_kind(&output.warnings, WarningKind::HygieneConflict), 0);
}

#[test]
fn zero_locals_do_not_shadow_named_results() {
    let text = "package main\n\nfunc load() (ret0 string, err error) {\n\tguard(step(), RETURN)\n\treturn\n}\n";
    let output = expand_ok(text);
    assert_eq!(count_lines(&output.text, "var ret0_ string"), 1);
    assert_eq!(count_lines(&output.text, "return ret0_, err"), 1);
}

#[test]
fn guard_in_a_handler_follows_the_outer_function() {
    let text = "package main

import \"log\"

func run() error {
\tguard(first(), func() {
\t\tguard(second())
\t\tlog.Print(\"x\")
\t})
\treturn nil
}
";
    let output = expand_ok(text);
    assert_eq!(output.expanded, 2);
    assert_eq!(count_lines(&output.text, "log.Fatal(err)"), 0);
    assert_eq!(count_lines(&output.text, "return err"), 1);
}

#[test]
fn guard_free_file_outside_the_grammar_passes_through() {
    let text = "package main

// Max is generic, which the parser does not accept.
func Max[T int | float64](a, b T) T {
\tif a > b {
\t\treturn a
\t}
\treturn b
}
";
    let output = expand_ok(text);
    assert_eq!(output.text, text);
    assert_eq!(output.expanded, 0);
}

#[test]
fn switch_select_and_labels_are_understood() {
    let text = "package main

func route(kind string, in chan int) error {
\tswitch kind {
\tcase \"load\":
\t\tguard(load())
\tdefault:
\t}
loop:
\tfor {
\t\tselect {
\t\tcase v := <-in:
\t\t\tif v < 0 {
\t\t\t\tbreak loop
\t\t\t}
\t\t\tguard(store(v))
\t\t}
\t}
\treturn nil
}
";
    let output = expand_ok(text);
    assert_eq!(output.expanded, 2);
    assert!(output.text.contains("\tcase \"load\":\n\t\tvar err error\n\t\terr = load()\n\t\tif err != nil {\n\t\t\treturn err\n\t\t}\n\tdefault:\n\t}\n"));
    assert!(output.text.contains("\nloop:\n\tfor {\n\t\tselect {\n\t\tcase v := <-in:\n"));
    assert!(output.text.contains("\t\t\terr = store(v)\n"));
    assert!(!output.text.contains("guard("));
}
