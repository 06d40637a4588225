//! Finds guard statements and splits their arguments.
//!
//! Two statement shapes are recognized:
//!
//! - `guard(f(x), ...)` as a bare expression statement
//! - `a, b := guard(f(x), ...)` / `a = guard(f(x), ...)` with exactly one
//!   right-hand value
//!
//! Every other position a guard can appear in is left alone here and reported
//! by the residue validator afterwards.

use crate::ast::{AssignOp, Expr, ExprKind, Stmt, StmtKind};
use crate::errors::{ErrorReporting, GuardError, Warning, WarningKind};

use super::{Binding, GuardCall, MacroContext, PolicyToken};

/// Returns the guard call carried by `stmt`, if its shape is supported.
///
/// A supported shape with unusable arguments is a `MalformedGuardCall`.
pub fn recognize(stmt: &Stmt, ctx: &MacroContext<'_>) -> Result<Option<GuardCall>, GuardError> {
    let (call, binding) = match &stmt.value {
        StmtKind::Expr(expr) => (expr, None),
        StmtKind::Assign { lhs, op, rhs }
            if matches!(op, AssignOp::Assign | AssignOp::Define) && rhs.len() == 1 =>
        {
            (
                &rhs[0],
                Some(Binding {
                    lhs: lhs.clone(),
                    op: *op,
                }),
            )
        }
        _ => return Ok(None),
    };

    let ExprKind::Call { func, args, spread } = &call.value else {
        return Ok(None);
    };
    if func.value.as_ident() != Some(ctx.config.guard_ident.as_str()) {
        return Ok(None);
    }
    if *spread {
        return Err(ctx.malformed_guard("arguments cannot be spread into a guard call", call.span));
    }

    let Some((first, rest)) = args.split_first() else {
        return Err(ctx.malformed_guard("guard needs the call it protects as its first argument", call.span));
    };
    let inner = strip_parens(first);
    if !matches!(inner.value, ExprKind::Call { .. }) {
        return Err(ctx.malformed_guard("the first argument of guard must be a function call", first.span));
    }

    let mut guard = GuardCall {
        inner: inner.clone(),
        policy: None,
        log_values: Vec::new(),
        handler: None,
        statement: stmt.clone(),
        binding,
        warnings: Vec::new(),
    };
    let mut token_span = None;

    for arg in rest {
        if let Some(token) = policy_token(arg, ctx) {
            if let Some(current) = guard.policy {
                guard.warnings.push(Warning::new(
                    WarningKind::AmbiguousPolicy,
                    format!(
                        "ignored late policy token `{}`: `{}` already applies",
                        token_spelling(token, ctx),
                        token_spelling(current, ctx)
                    ),
                    Some(arg.span),
                ));
            } else {
                guard.policy = Some(token);
                token_span = Some(arg.span);
            }
            continue;
        }
        match &arg.value {
            ExprKind::FuncLit { body, .. } if guard.handler.is_none() => {
                guard.handler = Some(body.clone());
            }
            ExprKind::FuncLit { .. } => guard.warnings.push(Warning::new(
                WarningKind::AmbiguousPolicy,
                "ignored additional handler closure: only the first one runs",
                Some(arg.span),
            )),
            _ => guard.log_values.push(arg.clone()),
        }
    }

    if let (Some(token), Some(_)) = (guard.policy, &guard.handler) {
        guard.warnings.push(Warning::new(
            WarningKind::AmbiguousPolicy,
            format!(
                "inline handler takes precedence over policy token `{}`",
                token_spelling(token, ctx)
            ),
            token_span,
        ));
    }

    Ok(Some(guard))
}

fn strip_parens(expr: &Expr) -> &Expr {
    let mut current = expr;
    while let ExprKind::Paren(inner) = &current.value {
        current = inner;
    }
    current
}

fn policy_token(arg: &Expr, ctx: &MacroContext<'_>) -> Option<PolicyToken> {
    let name = arg.value.as_ident()?;
    if name == ctx.config.fatal_token {
        Some(PolicyToken::Fatal)
    } else if name == ctx.config.return_token {
        Some(PolicyToken::Return)
    } else {
        None
    }
}

fn token_spelling<'c>(token: PolicyToken, ctx: &'c MacroContext<'_>) -> &'c str {
    match token {
        PolicyToken::Fatal => &ctx.config.fatal_token,
        PolicyToken::Return => &ctx.config.return_token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Decl;
    use crate::config::ExpandConfig;
    use crate::errors::{ErrorCategory, SourceContext};
    use crate::syntax::parse_str;

    fn first_stmt(body: &str) -> Stmt {
        let file = parse_str(&format!("package main\n\nfunc f() {{\n{body}\n}}\n")).unwrap();
        let Decl::Func(func) = &file.decls[0] else {
            panic!("expected a function");
        };
        func.body.as_ref().unwrap().stmts[0].clone()
    }

    fn run(body: &str) -> Result<Option<GuardCall>, GuardError> {
        let config = ExpandConfig::default();
        let source = SourceContext::from_file("test.go", body);
        let ctx = MacroContext::new(&config, &source);
        recognize(&first_stmt(body), &ctx)
    }

    #[test]
    fn bare_statement_with_token_and_log_values() {
        let guard = run("guard(open(path), \"open\", path, FATAL)").unwrap().unwrap();
        assert_eq!(guard.policy, Some(PolicyToken::Fatal));
        assert_eq!(guard.log_values.len(), 2);
        assert!(guard.binding.is_none());
        assert!(guard.warnings.is_empty());
    }

    #[test]
    fn assignment_keeps_binding_and_operator() {
        let guard = run("n, ok := guard((parse(s)))").unwrap().unwrap();
        let binding = guard.binding.unwrap();
        assert_eq!(binding.op, AssignOp::Define);
        assert_eq!(binding.lhs.len(), 2);
        assert!(matches!(guard.inner.value, ExprKind::Call { .. }));
    }

    #[test]
    fn unsupported_shapes_are_not_recognized() {
        assert!(run("x += guard(f())").unwrap().is_none());
        assert!(run("a, b := guard(f()), 1").unwrap().is_none());
        assert!(run("use(guard(f()))").unwrap().is_none());
        assert!(run("var x = guard(f())").unwrap().is_none());
        assert!(run("other(f(), FATAL)").unwrap().is_none());
    }

    #[test]
    fn malformed_arguments_are_errors() {
        for body in ["guard()", "guard(x, FATAL)", "guard(args...)"] {
            let err = run(body).unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Expansion, "{body}");
        }
    }

    #[test]
    fn first_policy_token_wins() {
        let guard = run("guard(f(), RETURN, FATAL)").unwrap().unwrap();
        assert_eq!(guard.policy, Some(PolicyToken::Return));
        assert_eq!(guard.warnings.len(), 1);
        assert!(guard.warnings[0].message.contains("ignored late policy token"));
    }

    #[test]
    fn closure_beats_token_and_extra_closures_are_dropped() {
        let guard = run("guard(f(), FATAL, func() {\n\treturn\n}, func() {\n})")
            .unwrap()
            .unwrap();
        assert_eq!(guard.handler.as_ref().map(|b| b.stmts.len()), Some(1));
        assert_eq!(guard.warnings.len(), 2);
        assert!(guard
            .warnings
            .iter()
            .all(|w| w.kind == WarningKind::AmbiguousPolicy));
    }
}
