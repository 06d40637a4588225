//! Constructors for synthesized nodes.
//!
//! Generated code has no source text of its own; callers pass the span of the
//! construct it replaces so diagnostics still point somewhere useful.

use super::*;

pub fn make_name(name: &str, span: Span) -> Ident {
    Ident {
        name: name.to_string(),
        span,
    }
}

pub fn make_ident(name: &str, span: Span) -> Expr {
    Spanned {
        value: ExprKind::Ident(name.to_string()),
        span,
    }
}

/// `pkg.name` or a bare `name`, depending on whether `path` is qualified.
pub fn make_qualified(path: &str, span: Span) -> Expr {
    match path.split_once('.') {
        Some((package, name)) => make_selector(make_ident(package, span), name, span),
        None => make_ident(path, span),
    }
}

pub fn make_selector(base: Expr, field: &str, span: Span) -> Expr {
    Spanned {
        value: ExprKind::Selector {
            base: Box::new(base),
            field: make_name(field, span),
        },
        span,
    }
}

pub fn make_call(func: Expr, args: Vec<Expr>, span: Span) -> Expr {
    Spanned {
        value: ExprKind::Call {
            func: Box::new(func),
            args,
            spread: false,
        },
        span,
    }
}

pub fn make_binary(op: BinaryOp, lhs: Expr, rhs: Expr, span: Span) -> Expr {
    Spanned {
        value: ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        span,
    }
}

pub fn make_expr_stmt(expr: Expr) -> Stmt {
    let span = expr.span;
    Spanned {
        value: StmtKind::Expr(expr),
        span,
    }
}

pub fn make_assign(lhs: Vec<Expr>, op: AssignOp, rhs: Vec<Expr>, span: Span) -> Stmt {
    Spanned {
        value: StmtKind::Assign { lhs, op, rhs },
        span,
    }
}

pub fn make_if(cond: Expr, body: Vec<Stmt>, span: Span) -> Stmt {
    Spanned {
        value: StmtKind::If {
            init: None,
            cond,
            then: Block { stmts: body, span },
            otherwise: None,
        },
        span,
    }
}

/// `var name ty`
pub fn make_var_decl(name: &str, ty: TypeExpr, span: Span) -> Stmt {
    Spanned {
        value: StmtKind::Value(ValueDecl {
            keyword: ValueKeyword::Var,
            specs: vec![ValueSpec {
                names: vec![make_name(name, span)],
                ty: Some(ty),
                values: Vec::new(),
            }],
            grouped: false,
            span,
        }),
        span,
    }
}

pub fn make_return(values: Vec<Expr>, span: Span) -> Stmt {
    Spanned {
        value: StmtKind::Return(values),
        span,
    }
}

pub fn make_named_type(name: &str) -> TypeExpr {
    match name.split_once('.') {
        Some((package, name)) => TypeExpr::Named {
            package: Some(package.to_string()),
            name: name.to_string(),
        },
        None => TypeExpr::Named {
            package: None,
            name: name.to_string(),
        },
    }
}
