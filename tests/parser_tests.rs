// tests/parser_tests.rs

use guardex::ast::{Decl, ExprKind, StmtKind};
use guardex::errors::{ErrorCategory, SourceContext};
use guardex::syntax::{parse, parse_str, print_file};
use miette::Diagnostic;

#[test]
fn demo_program_parses() {
    let file = parse_str(include_str!("../demos/basic.go")).unwrap();
    assert_eq!(file.package.name, "main");

    let imports: Vec<_> = file.imports.iter().map(|i| i.local_name()).collect();
    assert_eq!(imports, ["fmt", "log"]);

    let names: Vec<_> = file
        .decls
        .iter()
        .filter_map(|decl| match decl {
            Decl::Func(func) => Some(func.name.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(names, ["next", "call", "bareCall", "main"]);
}

#[test]
fn guard_calls_are_ordinary_calls_to_the_parser() {
    let file = parse_str("package main\n\nfunc main() {\n\tx := guard(f(1), FATAL, \"ctx\")\n}\n").unwrap();
    let Decl::Func(main) = &file.decls[0] else {
        panic!("expected a function");
    };
    let stmts = &main.body.as_ref().unwrap().stmts;
    let StmtKind::Assign { rhs, .. } = &stmts[0].value else {
        panic!("expected an assignment, got {:?}", stmts[0].value);
    };
    let ExprKind::Call { func, args, spread } = &rhs[0].value else {
        panic!("expected a call");
    };
    assert_eq!(func.value.as_ident(), Some("guard"));
    assert_eq!(args.len(), 3);
    assert!(!spread);
    assert!(matches!(args[0].value, ExprKind::Call { .. }));
}

#[test]
fn syntax_errors_carry_code_and_location() {
    let text = "package main\n\nfunc Map[T any](x T) T {\n\treturn x\n}\n";
    let err = parse(&SourceContext::from_file("bad.go", text)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Parse);
    assert_eq!(
        err.code().map(|c| c.to_string()).as_deref(),
        Some("guardex::parse::syntax")
    );

    let label = err.labels().and_then(|mut labels| labels.next()).unwrap();
    let name_at = text.find("Map").unwrap();
    assert!(label.offset() >= name_at, "error reported at {}", label.offset());
    assert!(err.source_code().is_some());
}

#[test]
fn missing_package_clause_is_rejected() {
    let err = parse_str("func main() {\n}\n").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Parse);
}

#[test]
fn gofmt_layout_prints_back_unchanged() {
    let text = "package shapes

import (
\t\"errors\"
\t\"fmt\"
)

type Point struct {
\tX int
\tY int
}

var origin = Point{X: 0, Y: 0}

func (p *Point) Sum(ks ...int) (int, error) {
\tif p == nil {
\t\treturn 0, errors.New(\"nil point\")
\t}
\ttotal := p.X + p.Y
\tfor _, k := range ks {
\t\ttotal += k
\t}
\tfmt.Println(total)
\treturn total, nil
}
";
    let file = parse_str(text).unwrap();
    assert_eq!(print_file(&file), text);
}

#[test]
fn switch_select_and_goto_print_back_unchanged() {
    let text = "package worker

func drain(jobs chan int, quit chan bool) int {
\tn := 0
next:
\tselect {
\tcase j := <-jobs:
\t\tswitch j % 3 {
\t\tcase 0:
\t\t\tn++
\t\t\tfallthrough
\t\tcase 1:
\t\t\tn += j
\t\t}
\t\tgoto next
\tcase <-quit:
\tdefault:
\t\tquit <- true
\t}
\treturn n
}
";
    let file = parse_str(text).unwrap();
    assert_eq!(print_file(&file), text);
}
