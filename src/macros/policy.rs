//! Policy resolution: what a guard does when the call fails.

use crate::ast::{Param, Signature, TypeExpr};
use crate::syntax::printer::print_type;

use super::{GuardCall, PolicyToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionPolicy {
    /// Log the error and terminate the process
    Abort,
    /// Return zero values plus the error from the enclosing function
    PropagateReturn,
    /// Run the inline closure body
    RunHandler,
}

/// Declared results of the function enclosing a guard, one slot per value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReturnShape {
    pub slots: Vec<TypeExpr>,
    /// Index of the last slot typed as the error type
    pub failure_slot: Option<usize>,
    /// Names the function header binds: receiver, parameters, named results
    pub bound: Vec<String>,
}

impl ReturnShape {
    /// Flattens `signature`'s results; `(a, b int, err error)` has three slots.
    pub fn from_signature(signature: &Signature, error_type: &str) -> Self {
        let slots: Vec<TypeExpr> = signature
            .results
            .iter()
            .flat_map(|param| std::iter::repeat(param.ty.clone()).take(param.arity()))
            .collect();
        let failure_slot = slots.iter().rposition(|ty| print_type(ty) == error_type);
        let bound = signature
            .params
            .iter()
            .chain(&signature.results)
            .flat_map(|param| &param.names)
            .filter(|ident| ident.name != "_")
            .map(|ident| ident.name.clone())
            .collect();
        Self {
            slots,
            failure_slot,
            bound,
        }
    }

    /// Adds the receiver names of a method.
    pub fn with_receiver(mut self, receiver: Option<&Param>) -> Self {
        if let Some(receiver) = receiver {
            self.bound.extend(
                receiver
                    .names
                    .iter()
                    .filter(|ident| ident.name != "_")
                    .map(|ident| ident.name.clone()),
            );
        }
        self
    }

    pub fn has_failure_slot(&self) -> bool {
        self.failure_slot.is_some()
    }

    pub fn binds(&self, name: &str) -> bool {
        self.bound.iter().any(|bound| bound == name)
    }
}

/// A handler beats any token; a token beats the default; the default is to
/// propagate when the function can return an error and abort otherwise.
pub fn resolve(guard: &GuardCall, shape: &ReturnShape) -> ExpansionPolicy {
    if guard.handler.is_some() {
        return ExpansionPolicy::RunHandler;
    }
    match guard.policy {
        Some(PolicyToken::Fatal) => ExpansionPolicy::Abort,
        Some(PolicyToken::Return) => ExpansionPolicy::PropagateReturn,
        None if shape.has_failure_slot() => ExpansionPolicy::PropagateReturn,
        None => ExpansionPolicy::Abort,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{make_call, make_expr_stmt, make_ident, Block, Decl, Span};
    use crate::syntax::parse_str;

    fn signature_of(header: &str) -> Signature {
        let file = parse_str(&format!("package main\n\nfunc {header}\n")).unwrap();
        let Decl::Func(func) = &file.decls[0] else {
            panic!("expected a function");
        };
        func.signature.clone()
    }

    fn guard(policy: Option<PolicyToken>, handler: bool) -> GuardCall {
        let span = Span::default();
        let inner = make_call(make_ident("f", span), Vec::new(), span);
        GuardCall {
            statement: make_expr_stmt(inner.clone()),
            inner,
            policy,
            log_values: Vec::new(),
            handler: handler.then(|| Block {
                stmts: Vec::new(),
                span,
            }),
            binding: None,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn named_results_flatten_to_one_slot_per_name() {
        let shape = ReturnShape::from_signature(&signature_of("f() (a, b int, err error)"), "error");
        assert_eq!(shape.slots.len(), 3);
        assert_eq!(shape.failure_slot, Some(2));
    }

    #[test]
    fn header_names_are_bound() {
        let shape = ReturnShape::from_signature(&signature_of("f(path string, _ int) (n int, err error)"), "error");
        assert_eq!(shape.bound, ["path", "n", "err"]);
        assert!(shape.binds("err"));
        assert!(!shape.binds("_"));

        let file = parse_str("package main\n\nfunc (err *Fault) Error() string {\n\treturn \"\"\n}\n").unwrap();
        let Decl::Func(method) = &file.decls[0] else {
            panic!("expected a method");
        };
        let shape = ReturnShape::from_signature(&method.signature, "error").with_receiver(method.receiver.as_ref());
        assert!(shape.binds("err"));
    }

    #[test]
    fn failure_slot_is_the_last_error_slot() {
        let shape = ReturnShape::from_signature(&signature_of("f() (error, string, error)"), "error");
        assert_eq!(shape.failure_slot, Some(2));
        let shape = ReturnShape::from_signature(&signature_of("f() (error, int)"), "error");
        assert_eq!(shape.failure_slot, Some(0));
        let shape = ReturnShape::from_signature(&signature_of("f()"), "error");
        assert!(shape.slots.is_empty());
        assert!(!shape.has_failure_slot());
    }

    #[test]
    fn defaults_follow_the_return_shape() {
        let fallible = ReturnShape::from_signature(&signature_of("f() (int, error)"), "error");
        let infallible = ReturnShape::from_signature(&signature_of("f() int"), "error");
        assert_eq!(resolve(&guard(None, false), &fallible), ExpansionPolicy::PropagateReturn);
        assert_eq!(resolve(&guard(None, false), &infallible), ExpansionPolicy::Abort);
    }

    #[test]
    fn explicit_choices_override_the_default() {
        let fallible = ReturnShape::from_signature(&signature_of("f() error"), "error");
        let infallible = ReturnShape::default();
        assert_eq!(
            resolve(&guard(Some(PolicyToken::Fatal), false), &fallible),
            ExpansionPolicy::Abort
        );
        assert_eq!(
            resolve(&guard(Some(PolicyToken::Return), false), &infallible),
            ExpansionPolicy::PropagateReturn
        );
        assert_eq!(
            resolve(&guard(Some(PolicyToken::Fatal), true), &fallible),
            ExpansionPolicy::RunHandler
        );
    }
}
