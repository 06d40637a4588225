//! Builds the long-form replacement for a guard call.
//!
//! A guard expands to a capture statement followed by a check:
//!
//! ```text
//! _, err = load(path)
//! if err != nil {
//!     <action>
//! }
//! ```
//!
//! One [`CodeGenerator`] serves one block. It remembers whether the capture
//! variable already exists in that block, so `var err error` is emitted at
//! most once and only when nothing before the first guard declared it.

use std::collections::{HashMap, HashSet};

use crate::ast::*;
use crate::config::ExpandConfig;
use crate::errors::{Warning, WarningKind};
use crate::syntax::printer::print_expr;

use super::{ExpansionPolicy, GuardCall, ReturnShape};

/// Output of expanding one guard call.
#[derive(Debug, Clone)]
pub struct Expansion {
    /// `var err error`, for the block head
    pub header: Option<Stmt>,
    /// Statements replacing the guard statement
    pub replacement: Vec<Stmt>,
    pub warnings: Vec<Warning>,
    /// A synthesized call goes through the configured log package
    pub uses_log: bool,
}

// ============================================================================
// RESULT COUNTS
// ============================================================================

/// Result counts of the functions and methods declared in a file.
#[derive(Debug, Clone, Default)]
pub struct ArityTable {
    funcs: HashMap<String, usize>,
    /// `None` when methods sharing a name disagree
    methods: HashMap<String, Option<usize>>,
    packages: HashSet<String>,
}

impl ArityTable {
    pub fn from_file(file: &SourceFile) -> Self {
        let mut table = ArityTable {
            packages: file
                .imports
                .iter()
                .map(|import| import.local_name().to_string())
                .collect(),
            ..Default::default()
        };
        for decl in &file.decls {
            let Decl::Func(func) = decl else { continue };
            let count = func.signature.result_count();
            if func.receiver.is_some() {
                table
                    .methods
                    .entry(func.name.name.clone())
                    .and_modify(|known| {
                        if *known != Some(count) {
                            *known = None;
                        }
                    })
                    .or_insert(Some(count));
            } else {
                table.funcs.insert(func.name.name.clone(), count);
            }
        }
        table
    }

    /// Number of values returned by a call to `callee`, when the file says.
    pub fn result_count(&self, callee: &Expr) -> Option<usize> {
        match &callee.value {
            ExprKind::Ident(name) => self.funcs.get(name).copied(),
            ExprKind::Selector { base, field } => {
                if matches!(base.value.as_ident(), Some(name) if self.packages.contains(name)) {
                    return None;
                }
                self.methods.get(&field.name).copied().flatten()
            }
            ExprKind::Paren(inner) => self.result_count(inner),
            _ => None,
        }
    }
}

// ============================================================================
// GENERATOR
// ============================================================================

pub struct CodeGenerator<'c> {
    config: &'c ExpandConfig,
    arities: &'c ArityTable,
    header_emitted: bool,
    capture_declared: bool,
}

impl<'c> CodeGenerator<'c> {
    pub fn new(config: &'c ExpandConfig, arities: &'c ArityTable) -> Self {
        Self {
            config,
            arities,
            header_emitted: false,
            capture_declared: false,
        }
    }

    /// A generator for a block where the capture variable is already in scope,
    /// such as a function body whose header names it.
    pub fn with_declared(config: &'c ExpandConfig, arities: &'c ArityTable) -> Self {
        Self {
            capture_declared: true,
            ..Self::new(config, arities)
        }
    }

    /// Records a statement of the block that stays as written.
    ///
    /// Before the first guard this only notes whether the capture variable is
    /// declared; once the header has been emitted, a fresh declaration of it
    /// would no longer compile and is reported.
    pub fn observe(&mut self, stmt: &Stmt) -> Option<Warning> {
        let capture = self.config.capture_var.as_str();
        if self.header_emitted {
            return declares_alone(stmt, capture).then(|| {
                Warning::new(
                    WarningKind::HygieneConflict,
                    format!(
                        "`{capture}` is declared again after guard expansion declared it at the top of the block"
                    ),
                    Some(stmt.span),
                )
            });
        }
        if declares(stmt, capture) {
            self.capture_declared = true;
        }
        None
    }

    pub fn generate(&mut self, guard: GuardCall, policy: ExpansionPolicy, shape: &ReturnShape) -> Expansion {
        let span = guard.statement.span;
        let mut warnings = guard.warnings.clone();
        let mut uses_log = false;

        let header = if self.capture_declared || self.header_emitted {
            None
        } else {
            self.header_emitted = true;
            Some(make_var_decl(
                &self.config.capture_var,
                make_named_type(&self.config.error_type),
                span,
            ))
        };

        let capture = self.capture(&guard, span);
        let action = match policy {
            ExpansionPolicy::Abort => {
                uses_log |= self.is_log_call(&self.config.fatal_func);
                vec![self.log_call(&self.config.fatal_func, &guard.log_values, span)]
            }
            ExpansionPolicy::PropagateReturn => {
                let mut body = Vec::new();
                if !guard.log_values.is_empty() {
                    uses_log |= self.is_log_call(&self.config.print_func);
                    body.push(self.log_call(&self.config.print_func, &guard.log_values, span));
                }
                body.extend(self.zero_return(shape, span, &mut warnings));
                body
            }
            ExpansionPolicy::RunHandler => {
                if !guard.log_values.is_empty() {
                    warnings.push(Warning::new(
                        WarningKind::AmbiguousPolicy,
                        "log values are ignored when an inline handler is given",
                        Some(span),
                    ));
                }
                guard.handler.map(|block| block.stmts).unwrap_or_default()
            }
        };

        let check = make_binary(
            BinaryOp::Ne,
            self.capture_ident(span),
            make_ident("nil", span),
            span,
        );

        Expansion {
            header,
            replacement: vec![capture, make_if(check, action, span)],
            warnings,
            uses_log,
        }
    }

    fn capture_ident(&self, span: Span) -> Expr {
        make_ident(&self.config.capture_var, span)
    }

    /// `lhs..., err := f()` for bindings, `_, ..., err = f()` otherwise.
    fn capture(&self, guard: &GuardCall, span: Span) -> Stmt {
        let capture = self.config.capture_var.as_str();
        match &guard.binding {
            Some(binding) => {
                let mut lhs = binding.lhs.clone();
                if !lhs.iter().any(|e| e.value.as_ident() == Some(capture)) {
                    lhs.push(self.capture_ident(span));
                }
                make_assign(lhs, binding.op, vec![guard.inner.clone()], span)
            }
            None => {
                let count = match &guard.inner.value {
                    ExprKind::Call { func, .. } => self.arities.result_count(func),
                    _ => None,
                }
                .unwrap_or(1)
                .max(1);
                let mut lhs: Vec<Expr> = (1..count).map(|_| make_ident("_", span)).collect();
                lhs.push(self.capture_ident(span));
                make_assign(lhs, AssignOp::Assign, vec![guard.inner.clone()], span)
            }
        }
    }

    fn log_call(&self, func: &str, values: &[Expr], span: Span) -> Stmt {
        let mut args = values.to_vec();
        args.push(self.capture_ident(span));
        make_expr_stmt(make_call(make_qualified(func, span), args, span))
    }

    fn is_log_call(&self, func: &str) -> bool {
        matches!(func.split_once('.'), Some((package, _)) if package == self.config.log_package())
    }

    /// `var retN T` for each non-error slot, then the return itself. A name the
    /// function header already binds gets `_` appended until it is free.
    fn zero_return(&self, shape: &ReturnShape, span: Span, warnings: &mut Vec<Warning>) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        let mut values = Vec::new();
        for (index, ty) in shape.slots.iter().enumerate() {
            if shape.failure_slot == Some(index) {
                values.push(self.capture_ident(span));
                continue;
            }
            let mut name = format!("{}{}", self.config.zero_prefix, index);
            while shape.binds(&name) || name == self.config.capture_var {
                name.push('_');
            }
            stmts.push(make_var_decl(&name, ty.clone(), span));
            values.push(make_ident(&name, span));
        }
        if !shape.has_failure_slot() {
            warnings.push(Warning::new(
                WarningKind::AmbiguousPolicy,
                "the enclosing function returns no error, so the captured error is discarded",
                Some(span),
            ));
        }
        stmts.push(make_return(values, span));
        stmts
    }
}

/// `var name ...`, `const name ...`, or `..., name, ... := ...`.
fn declares(stmt: &Stmt, name: &str) -> bool {
    match &stmt.value {
        StmtKind::Value(decl) => decl
            .specs
            .iter()
            .any(|spec| spec.names.iter().any(|ident| ident.name == name)),
        StmtKind::Assign {
            lhs,
            op: AssignOp::Define,
            ..
        } => lhs.iter().any(|e| e.value.as_ident() == Some(name)),
        _ => false,
    }
}

/// Like [`declares`], but a short declaration only counts when `name` is its
/// sole target: `x, err := f()` stays legal next to an existing `err`.
fn declares_alone(stmt: &Stmt, name: &str) -> bool {
    match &stmt.value {
        StmtKind::Assign {
            lhs,
            op: AssignOp::Define,
            ..
        } => matches!(lhs.as_slice(), [only] if only.value.as_ident() == Some(name)),
        _ => declares(stmt, name),
    }
}

/// Renders the callee of a guard's inner call, for messages.
pub fn callee_text(guard: &GuardCall) -> String {
    match &guard.inner.value {
        ExprKind::Call { func, .. } => print_expr(func),
        _ => print_expr(&guard.inner),
    }
}
