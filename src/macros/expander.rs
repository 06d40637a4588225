//! Expands every guard statement in a file.
//!
//! Expansion runs in two passes so that a malformed guard anywhere leaves the
//! file untouched:
//!
//! 1. A read-only pass walks all blocks, recognizes their guard statements,
//!    checks them, and resolves the return shape of the enclosing function
//!    (declaration or literal) for every block that needs rewriting. A
//!    handler closure's body is inlined into the guarded block, so guards in
//!    it take the shape of the function around the closure.
//! 2. The blocks are then rewritten in reverse traversal order. A block is
//!    always rewritten after the blocks nested in it, so the recorded paths
//!    of the blocks still to come stay valid.
//!
//! The residue validator runs last, over the rewritten tree.

use std::rc::Rc;

use crate::ast::tree::{
    filter, is_block, is_function, nearest_ancestor, resolve_block_mut, Cursor, NodeRef, NotFound, TreePath,
};
use crate::ast::{ExprKind, ImportSpec, SourceFile, Span};
use crate::errors::{ErrorReporting, GuardError, Warning};
use crate::validation;

use super::codegen::callee_text;
use super::{recognize, resolve, ArityTable, CodeGenerator, GuardCall, MacroContext, ReturnShape};

/// What expanding a file produced besides the rewritten tree.
#[derive(Debug, Clone, Default)]
pub struct ExpandReport {
    /// Number of guard statements rewritten
    pub expanded: usize,
    /// Expansion findings and residue, ordered by position
    pub warnings: Vec<Warning>,
    /// The log package had to be imported
    pub import_added: bool,
}

/// Rewrites all guard statements of `file` in place.
pub fn expand(file: &mut SourceFile, ctx: &MacroContext<'_>) -> Result<ExpandReport, GuardError> {
    let arities = ArityTable::from_file(file);
    let plan = plan_blocks(file, &arities, ctx)?;

    let mut report = ExpandReport::default();
    let mut uses_log = false;
    let file_span = file.span;

    for PlannedBlock {
        path,
        shape,
        capture_bound,
    } in plan.into_iter().rev()
    {
        let block = resolve_block_mut(file, &path)
            .ok_or_else(|| ctx.internal_error("a planned block could not be found again", file_span))?;
        let stmts = std::mem::take(&mut block.stmts);
        let mut generator = if capture_bound {
            CodeGenerator::with_declared(ctx.config, &arities)
        } else {
            CodeGenerator::new(ctx.config, &arities)
        };
        let mut rewritten = Vec::with_capacity(stmts.len() + 2);
        let mut header = None;

        for stmt in stmts {
            let Some(guard) = recognize(&stmt, ctx)? else {
                report.warnings.extend(generator.observe(&stmt));
                rewritten.push(stmt);
                continue;
            };
            let policy = resolve(&guard, &shape);
            let expansion = generator.generate(guard, policy, &shape);
            header = header.or(expansion.header);
            rewritten.extend(expansion.replacement);
            report.warnings.extend(expansion.warnings);
            uses_log |= expansion.uses_log;
            report.expanded += 1;
        }

        if let Some(header) = header {
            rewritten.insert(0, header);
        }
        block.stmts = rewritten;
    }

    if uses_log {
        report.import_added = ensure_import(file, &ctx.config.log_import);
    }

    report
        .warnings
        .extend(validation::validate(file, &ctx.config.guard_ident));
    report.warnings.sort_by_key(|warning| warning.span);
    let source = ctx.source();
    report.warnings = report
        .warnings
        .into_iter()
        .map(|warning| warning.with_source(source.clone()))
        .collect();

    Ok(report)
}

/// A block holding guard statements, as found by the read-only pass.
struct PlannedBlock {
    path: TreePath,
    shape: ReturnShape,
    /// The block is a function body whose header already binds the capture
    /// variable
    capture_bound: bool,
}

/// Read-only pass: validates every guard and records the blocks to rewrite
/// with the return shape that applies inside them.
fn plan_blocks(
    file: &SourceFile,
    arities: &ArityTable,
    ctx: &MacroContext<'_>,
) -> Result<Vec<PlannedBlock>, GuardError> {
    let mut plan = Vec::new();
    for cursor in filter(NodeRef::File(file), is_block) {
        let NodeRef::Block(block) = cursor.node() else {
            continue;
        };
        let mut has_guard = false;
        for stmt in &block.stmts {
            if let Some(guard) = recognize(stmt, ctx)? {
                check_result_count(&guard, arities, ctx)?;
                has_guard = true;
            }
        }
        if !has_guard {
            continue;
        }

        let no_function =
            |e: NotFound| ctx.internal_error(format!("guard block has no enclosing function: {e}"), block.span);
        let mut function = nearest_ancestor(&cursor, is_function).map_err(no_function)?;
        while is_inlined_handler(&function, ctx)? {
            function = nearest_ancestor(&function, is_function).map_err(no_function)?;
        }
        let signature = function
            .node()
            .signature()
            .ok_or_else(|| ctx.internal_error("enclosing function has no signature", block.span))?;
        let receiver = match function.node() {
            NodeRef::Func(func) => func.receiver.as_ref(),
            _ => None,
        };
        let shape = ReturnShape::from_signature(signature, &ctx.config.error_type).with_receiver(receiver);
        let is_body = cursor.parent().is_some_and(|parent| Rc::ptr_eq(parent, &function));
        plan.push(PlannedBlock {
            path: cursor.path(),
            capture_bound: is_body && shape.binds(&ctx.config.capture_var),
            shape,
        });
    }
    Ok(plan)
}

/// Whether `function` is the handler closure of a guard statement.
fn is_inlined_handler(function: &Rc<Cursor<'_>>, ctx: &MacroContext<'_>) -> Result<bool, GuardError> {
    let NodeRef::Expr(literal) = function.node() else {
        return Ok(false);
    };
    let ExprKind::FuncLit { body, .. } = &literal.value else {
        return Ok(false);
    };
    let Some(call) = function.parent() else {
        return Ok(false);
    };
    let NodeRef::Expr(call_expr) = call.node() else {
        return Ok(false);
    };
    let ExprKind::Call { func, .. } = &call_expr.value else {
        return Ok(false);
    };
    if func.value.as_ident() != Some(ctx.config.guard_ident.as_str()) {
        return Ok(false);
    }
    let Some(NodeRef::Stmt(stmt)) = call.parent().map(|stmt| stmt.node()) else {
        return Ok(false);
    };
    Ok(recognize(stmt, ctx)?
        .and_then(|guard| guard.handler)
        .is_some_and(|handler| handler.span == body.span))
}

/// A guarded call to a function known to return nothing has no error to test.
fn check_result_count(guard: &GuardCall, arities: &ArityTable, ctx: &MacroContext<'_>) -> Result<(), GuardError> {
    let ExprKind::Call { func, .. } = &guard.inner.value else {
        return Ok(());
    };
    if arities.result_count(func) == Some(0) {
        return Err(ctx.malformed_guard(
            format!("`{}` returns no values, so there is no error to check", callee_text(guard)),
            guard.inner.span,
        ));
    }
    Ok(())
}

/// Adds `import "<path>"` unless the file already imports it. Returns whether
/// an import was added.
fn ensure_import(file: &mut SourceFile, path: &str) -> bool {
    if file.imports.iter().any(|import| import.path_value() == path) {
        return false;
    }
    let at = file
        .imports
        .partition_point(|import| import.path_value() < path);
    file.imports.insert(
        at,
        ImportSpec {
            alias: None,
            path: format!("\"{path}\""),
            span: Span::default(),
        },
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExpandConfig;
    use crate::errors::{ErrorCategory, SourceContext, WarningKind};
    use crate::syntax::{parse_str, print_file};

    fn run(text: &str) -> Result<(String, ExpandReport), GuardError> {
        let config = ExpandConfig::default();
        let source = SourceContext::from_file("test.go", text);
        let ctx = MacroContext::new(&config, &source);
        let mut file = parse_str(text)?;
        let report = expand(&mut file, &ctx)?;
        Ok((print_file(&file), report))
    }

    #[test]
    fn nested_blocks_and_literals_use_their_own_shape() {
        let text = "package main

func outer() error {
\tif ready {
\t\tguard(step())
\t}
\tcb := func() {
\t\tguard(step())
\t}
\tcb()
\treturn nil
}
";
        let (out, report) = run(text).unwrap();
        assert_eq!(report.expanded, 2);
        assert!(report.import_added);
        assert!(out.contains("\t\tif err != nil {\n\t\t\treturn err\n\t\t}"));
        assert!(out.contains("\t\tif err != nil {\n\t\t\tlog.Fatal(err)\n\t\t}"));
        assert!(out.starts_with("package main\n\nimport \"log\"\n"));
    }

    #[test]
    fn handler_containing_a_guard_expands_inside_out() {
        let text = "package main

func run() error {
\tguard(first(), func() {
\t\tguard(second())
\t\tlog.Print(\"x\")
\t})
\treturn nil
}
";
        let (out, report) = run(text).unwrap();
        assert_eq!(report.expanded, 2);
        assert!(!out.contains("guard("));
        assert!(report.warnings.is_empty());
        // the handler runs inline in run, so the inner guard propagates
        assert!(out.contains("\t\terr = second()\n\t\tif err != nil {\n\t\t\treturn err\n\t\t}\n\t\tlog.Print(\"x\")"));
        assert!(!out.contains("log.Fatal(err)"));
    }

    #[test]
    fn closures_passed_elsewhere_keep_their_own_shape() {
        let text = "package main

func run() error {
\tgo func() {
\t\tguard(second())
\t}()
\treturn nil
}
";
        let (out, _) = run(text).unwrap();
        assert!(out.contains("log.Fatal(err)"));
    }

    #[test]
    fn signature_names_count_as_declared() {
        let text = "package main

func load() (n int, err error) {
\tn = guard(parse())
\treturn
}

func wrap(err error) error {
\tguard(step())
\treturn err
}

func (err *fault) retry() error {
\tguard(step())
\treturn nil
}

func nested(err error) error {
\tif true {
\t\tguard(step())
\t}
\treturn err
}
";
        let (out, report) = run(text).unwrap();
        assert_eq!(report.expanded, 4);
        // only the nested block needs its own declaration
        assert_eq!(out.matches("var err error").count(), 1);
        assert!(out.contains("\tif true {\n\t\tvar err error\n"));
        assert!(out.contains("\tn, err = parse()\n"));
    }

    #[test]
    fn malformed_guard_leaves_nothing_half_done() {
        let text = "package main\n\nfunc a() {\n\tguard(f())\n}\n\nfunc b() {\n\tguard(1)\n}\n";
        let err = run(text).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Expansion);
    }

    #[test]
    fn guarding_a_function_without_results_is_malformed() {
        let text = "package main\n\nfunc noop() {\n}\n\nfunc main() {\n\tguard(noop())\n}\n";
        let err = run(text).unwrap_err();
        assert!(err.to_string().contains("returns no values"));
    }

    #[test]
    fn existing_import_is_reused_and_warnings_are_sorted() {
        let text = "package main

import \"log\"

func main() {
\tuse(guard(a()))
\tguard(b(), FATAL, RETURN)
}
";
        let (_, report) = run(text).unwrap();
        assert!(!report.import_added);
        let kinds: Vec<_> = report.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(kinds, [WarningKind::ResidueDetected, WarningKind::AmbiguousPolicy]);
    }
}
