//! Reports guard identifiers that survived expansion.
//!
//! Anything the recognizer does not accept (a guard nested in another call, a
//! compound assignment, `var x = guard(...)`, a function value named `guard`)
//! is left in the tree. This pass finds every such occurrence so the user
//! learns that the output will not build. Findings never block output.

use crate::ast::tree::{visit, Cursor, NodeRef};
use crate::ast::{ExprKind, SourceFile};
use crate::errors::{Warning, WarningKind};

/// One `ResidueDetected` warning per occurrence of `guard_ident`, in source
/// traversal order.
pub fn validate(file: &SourceFile, guard_ident: &str) -> Vec<Warning> {
    let mut warnings = Vec::new();
    visit(NodeRef::File(file), |cursor| {
        let node = cursor.node();
        if node.ident_name() == Some(guard_ident) {
            let message = match node {
                NodeRef::Ident(_) => format!("guard macro used in code: `{guard_ident}` is declared here"),
                _ if is_callee(cursor) => {
                    format!("guard macro used in code: this call to `{guard_ident}` was not expanded")
                }
                _ => format!("guard macro used in code: bare reference to `{guard_ident}`"),
            };
            warnings.push(Warning::new(
                WarningKind::ResidueDetected,
                message,
                Some(node.span()),
            ));
        }
        true
    });
    warnings
}

/// The node is the function position of a call expression.
fn is_callee(cursor: &Cursor<'_>) -> bool {
    cursor.index() == 0
        && matches!(
            cursor.parent().map(|parent| parent.node()),
            Some(NodeRef::Expr(expr)) if matches!(expr.value, ExprKind::Call { .. })
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_str;

    fn residue(body: &str) -> Vec<Warning> {
        let file = parse_str(&format!("package main\n\nfunc f() {{\n{body}\n}}\n")).unwrap();
        validate(&file, "guard")
    }

    #[test]
    fn clean_tree_has_no_residue() {
        assert!(residue("x := load()\nguarded(x)\ns.guard()").is_empty());
    }

    #[test]
    fn nested_call_is_reported_once() {
        let warnings = residue("use(guard(load()))");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::ResidueDetected);
        assert!(warnings[0].message.contains("was not expanded"));
    }

    #[test]
    fn references_and_declarations_are_told_apart() {
        let warnings = residue("g := guard\nguard := 1\n_ = g");
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.message.contains("bare reference")));

        let file = parse_str("package main\n\nfunc guard() {\n}\n").unwrap();
        let warnings = validate(&file, "guard");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("declared here"));
    }
}
