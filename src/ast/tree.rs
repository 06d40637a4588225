//! Parent-linked traversal over the syntax tree.
//!
//! A [`Cursor`] pairs a borrowed node with the cursor of its parent, so a
//! traversal can answer "which function encloses this block?" without the
//! tree storing back-pointers. Cursors are rebuilt for every traversal.
//!
//! Child order is fixed by [`NodeRef::children`] and mirrored by
//! [`NodeMut::into_children`]; a [`TreePath`] recorded during an immutable
//! walk therefore addresses the same node when resolved mutably.

use std::rc::Rc;
use thiserror::Error;

use super::*;

// ============================================================================
// NODE VIEWS
// ============================================================================

/// Closed classification of node views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    FunctionDecl,
    VarDecl,
    TypeDecl,
    Block,
    ExpressionStatement,
    Assignment,
    If,
    For,
    Return,
    OtherStatement,
    Call,
    FuncLiteral,
    BinaryExpr,
    Literal,
    Identifier,
    OtherExpression,
}

/// Borrowed view of any node that takes part in traversal.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    File(&'a SourceFile),
    Func(&'a FuncDecl),
    Value(&'a ValueDecl),
    Type(&'a TypeDecl),
    Block(&'a Block),
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    /// Declared names: function names, parameters, var/const/type names, labels
    Ident(&'a Ident),
}

impl<'a> NodeRef<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::File(_) => NodeKind::File,
            NodeRef::Func(_) => NodeKind::FunctionDecl,
            NodeRef::Value(_) => NodeKind::VarDecl,
            NodeRef::Type(_) => NodeKind::TypeDecl,
            NodeRef::Block(_) => NodeKind::Block,
            NodeRef::Stmt(stmt) => stmt_kind(&stmt.value),
            NodeRef::Expr(expr) => expr_kind(&expr.value),
            NodeRef::Ident(_) => NodeKind::Identifier,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            NodeRef::File(file) => file.span,
            NodeRef::Func(func) => func.span,
            NodeRef::Value(decl) => decl.span,
            NodeRef::Type(decl) => decl.span,
            NodeRef::Block(block) => block.span,
            NodeRef::Stmt(stmt) => stmt.span,
            NodeRef::Expr(expr) => expr.span,
            NodeRef::Ident(ident) => ident.span,
        }
    }

    /// Identifier text for identifier expressions and declared names.
    pub fn ident_name(&self) -> Option<&'a str> {
        match *self {
            NodeRef::Ident(ident) => Some(&ident.name),
            NodeRef::Expr(expr) => expr.value.as_ident(),
            _ => None,
        }
    }

    /// Signature of a function declaration or function literal.
    pub fn signature(&self) -> Option<&'a Signature> {
        match *self {
            NodeRef::Func(func) => Some(&func.signature),
            NodeRef::Expr(expr) => match &expr.value {
                ExprKind::FuncLit { signature, .. } => Some(signature),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn children(&self) -> Vec<NodeRef<'a>> {
        let mut out = Vec::new();
        match *self {
            NodeRef::File(file) => {
                for decl in &file.decls {
                    out.push(match decl {
                        Decl::Func(func) => NodeRef::Func(func),
                        Decl::Value(value) => NodeRef::Value(value),
                        Decl::Type(ty) => NodeRef::Type(ty),
                    });
                }
            }
            NodeRef::Func(func) => {
                if let Some(receiver) = &func.receiver {
                    out.extend(receiver.names.iter().map(NodeRef::Ident));
                }
                out.push(NodeRef::Ident(&func.name));
                signature_names(&func.signature, &mut out);
                if let Some(body) = &func.body {
                    out.push(NodeRef::Block(body));
                }
            }
            NodeRef::Value(decl) => {
                for spec in &decl.specs {
                    out.extend(spec.names.iter().map(NodeRef::Ident));
                    out.extend(spec.values.iter().map(NodeRef::Expr));
                }
            }
            NodeRef::Type(decl) => {
                out.extend(decl.specs.iter().map(|spec| NodeRef::Ident(&spec.name)));
            }
            NodeRef::Block(block) => out.extend(block.stmts.iter().map(NodeRef::Stmt)),
            NodeRef::Stmt(stmt) => stmt_children(stmt, &mut out),
            NodeRef::Expr(expr) => expr_children(expr, &mut out),
            NodeRef::Ident(_) => {}
        }
        out
    }
}

fn stmt_kind(stmt: &StmtKind) -> NodeKind {
    match stmt {
        StmtKind::Expr(_) => NodeKind::ExpressionStatement,
        StmtKind::Assign { .. } => NodeKind::Assignment,
        StmtKind::If { .. } => NodeKind::If,
        StmtKind::For { .. } => NodeKind::For,
        StmtKind::Return(_) => NodeKind::Return,
        StmtKind::IncDec { .. }
        | StmtKind::Value(_)
        | StmtKind::Type(_)
        | StmtKind::Defer(_)
        | StmtKind::Go(_)
        | StmtKind::Break(_)
        | StmtKind::Continue(_)
        | StmtKind::Send { .. }
        | StmtKind::Switch { .. }
        | StmtKind::TypeSwitch { .. }
        | StmtKind::Select(_)
        | StmtKind::Labeled { .. }
        | StmtKind::Goto(_)
        | StmtKind::Fallthrough
        | StmtKind::Block(_) => NodeKind::OtherStatement,
    }
}

fn expr_kind(expr: &ExprKind) -> NodeKind {
    match expr {
        ExprKind::Ident(_) => NodeKind::Identifier,
        ExprKind::Literal(_) => NodeKind::Literal,
        ExprKind::Call { .. } => NodeKind::Call,
        ExprKind::FuncLit { .. } => NodeKind::FuncLiteral,
        ExprKind::Binary { .. } => NodeKind::BinaryExpr,
        ExprKind::Composite { .. }
        | ExprKind::Paren(_)
        | ExprKind::Selector { .. }
        | ExprKind::Index { .. }
        | ExprKind::Slice { .. }
        | ExprKind::TypeAssert { .. }
        | ExprKind::Unary { .. }
        | ExprKind::Type(_) => NodeKind::OtherExpression,
    }
}

fn signature_names<'a>(signature: &'a Signature, out: &mut Vec<NodeRef<'a>>) {
    for param in signature.params.iter().chain(&signature.results) {
        out.extend(param.names.iter().map(NodeRef::Ident));
    }
}

fn stmt_children<'a>(stmt: &'a Stmt, out: &mut Vec<NodeRef<'a>>) {
    match &stmt.value {
        StmtKind::Expr(expr) | StmtKind::Defer(expr) | StmtKind::Go(expr) => {
            out.push(NodeRef::Expr(expr))
        }
        StmtKind::Assign { lhs, rhs, .. } => {
            out.extend(lhs.iter().chain(rhs).map(NodeRef::Expr));
        }
        StmtKind::IncDec { target, .. } => out.push(NodeRef::Expr(target)),
        StmtKind::Value(decl) => out.push(NodeRef::Value(decl)),
        StmtKind::Type(decl) => out.push(NodeRef::Type(decl)),
        StmtKind::Return(values) => out.extend(values.iter().map(NodeRef::Expr)),
        StmtKind::If {
            init,
            cond,
            then,
            otherwise,
        } => {
            if let Some(init) = init {
                out.push(NodeRef::Stmt(init));
            }
            out.push(NodeRef::Expr(cond));
            out.push(NodeRef::Block(then));
            if let Some(otherwise) = otherwise {
                out.push(NodeRef::Stmt(otherwise));
            }
        }
        StmtKind::For { header, body } => {
            match header {
                ForHeader::Infinite => {}
                ForHeader::Cond(cond) => out.push(NodeRef::Expr(cond)),
                ForHeader::Clause { init, cond, post } => {
                    if let Some(init) = init {
                        out.push(NodeRef::Stmt(init));
                    }
                    if let Some(cond) = cond {
                        out.push(NodeRef::Expr(cond));
                    }
                    if let Some(post) = post {
                        out.push(NodeRef::Stmt(post));
                    }
                }
                ForHeader::Range {
                    key, value, expr, ..
                } => {
                    out.extend(key.iter().chain(value).map(NodeRef::Expr));
                    out.push(NodeRef::Expr(expr));
                }
            }
            out.push(NodeRef::Block(body));
        }
        StmtKind::Break(label) | StmtKind::Continue(label) => {
            out.extend(label.iter().map(NodeRef::Ident));
        }
        StmtKind::Send { channel, value } => {
            out.push(NodeRef::Expr(channel));
            out.push(NodeRef::Expr(value));
        }
        StmtKind::Switch { init, tag, clauses } => {
            out.extend(init.iter().map(|init| NodeRef::Stmt(init)));
            out.extend(tag.iter().map(NodeRef::Expr));
            case_children(clauses, out);
        }
        StmtKind::TypeSwitch {
            init,
            binding,
            subject,
            clauses,
        } => {
            out.extend(init.iter().map(|init| NodeRef::Stmt(init)));
            out.extend(binding.iter().map(NodeRef::Ident));
            out.push(NodeRef::Expr(subject));
            case_children(clauses, out);
        }
        StmtKind::Select(clauses) => {
            for clause in clauses {
                out.extend(clause.comm.iter().map(|comm| NodeRef::Stmt(comm)));
                out.push(NodeRef::Block(&clause.body));
            }
        }
        StmtKind::Labeled { label, stmt } => {
            out.push(NodeRef::Ident(label));
            out.extend(stmt.iter().map(|stmt| NodeRef::Stmt(stmt)));
        }
        StmtKind::Goto(label) => out.push(NodeRef::Ident(label)),
        StmtKind::Fallthrough => {}
        StmtKind::Block(block) => out.push(NodeRef::Block(block)),
    }
}

fn case_children<'a>(clauses: &'a [CaseClause], out: &mut Vec<NodeRef<'a>>) {
    for clause in clauses {
        out.extend(clause.values.iter().map(NodeRef::Expr));
        out.push(NodeRef::Block(&clause.body));
    }
}

fn expr_children<'a>(expr: &'a Expr, out: &mut Vec<NodeRef<'a>>) {
    match &expr.value {
        ExprKind::Ident(_) | ExprKind::Literal(_) | ExprKind::Type(_) => {}
        ExprKind::Composite { elements, .. } => {
            for element in elements {
                out.extend(element.key.iter().map(NodeRef::Expr));
                out.push(NodeRef::Expr(&element.value));
            }
        }
        ExprKind::FuncLit { signature, body } => {
            signature_names(signature, out);
            out.push(NodeRef::Block(body));
        }
        ExprKind::Paren(inner) => out.push(NodeRef::Expr(inner)),
        ExprKind::Selector { base, .. } | ExprKind::TypeAssert { base, .. } => {
            out.push(NodeRef::Expr(base))
        }
        ExprKind::Index { base, index } => {
            out.push(NodeRef::Expr(base));
            out.push(NodeRef::Expr(index));
        }
        ExprKind::Slice { base, low, high } => {
            out.push(NodeRef::Expr(base));
            out.extend(low.iter().chain(high).map(|e| NodeRef::Expr(e)));
        }
        ExprKind::Call { func, args, .. } => {
            out.push(NodeRef::Expr(func));
            out.extend(args.iter().map(NodeRef::Expr));
        }
        ExprKind::Unary { operand, .. } => out.push(NodeRef::Expr(operand)),
        ExprKind::Binary { lhs, rhs, .. } => {
            out.push(NodeRef::Expr(lhs));
            out.push(NodeRef::Expr(rhs));
        }
    }
}

/// Mutable counterpart of [`NodeRef`], used only to resolve a [`TreePath`].
pub enum NodeMut<'a> {
    File(&'a mut SourceFile),
    Func(&'a mut FuncDecl),
    Value(&'a mut ValueDecl),
    Type(&'a mut TypeDecl),
    Block(&'a mut Block),
    Stmt(&'a mut Stmt),
    Expr(&'a mut Expr),
    Ident(&'a mut Ident),
}

impl<'a> NodeMut<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeMut::File(_) => NodeKind::File,
            NodeMut::Func(_) => NodeKind::FunctionDecl,
            NodeMut::Value(_) => NodeKind::VarDecl,
            NodeMut::Type(_) => NodeKind::TypeDecl,
            NodeMut::Block(_) => NodeKind::Block,
            NodeMut::Stmt(stmt) => stmt_kind(&stmt.value),
            NodeMut::Expr(expr) => expr_kind(&expr.value),
            NodeMut::Ident(_) => NodeKind::Identifier,
        }
    }

    /// Children in exactly the order of [`NodeRef::children`].
    pub fn into_children(self) -> Vec<NodeMut<'a>> {
        let mut out = Vec::new();
        match self {
            NodeMut::File(file) => {
                for decl in file.decls.iter_mut() {
                    out.push(match decl {
                        Decl::Func(func) => NodeMut::Func(func),
                        Decl::Value(value) => NodeMut::Value(value),
                        Decl::Type(ty) => NodeMut::Type(ty),
                    });
                }
            }
            NodeMut::Func(func) => {
                let FuncDecl {
                    receiver,
                    name,
                    signature,
                    body,
                    ..
                } = func;
                if let Some(receiver) = receiver {
                    out.extend(receiver.names.iter_mut().map(NodeMut::Ident));
                }
                out.push(NodeMut::Ident(name));
                signature_names_mut(signature, &mut out);
                if let Some(body) = body {
                    out.push(NodeMut::Block(body));
                }
            }
            NodeMut::Value(decl) => {
                for spec in decl.specs.iter_mut() {
                    out.extend(spec.names.iter_mut().map(NodeMut::Ident));
                    out.extend(spec.values.iter_mut().map(NodeMut::Expr));
                }
            }
            NodeMut::Type(decl) => {
                out.extend(decl.specs.iter_mut().map(|spec| NodeMut::Ident(&mut spec.name)));
            }
            NodeMut::Block(block) => out.extend(block.stmts.iter_mut().map(NodeMut::Stmt)),
            NodeMut::Stmt(stmt) => stmt_children_mut(stmt, &mut out),
            NodeMut::Expr(expr) => expr_children_mut(expr, &mut out),
            NodeMut::Ident(_) => {}
        }
        out
    }
}

fn signature_names_mut<'a>(signature: &'a mut Signature, out: &mut Vec<NodeMut<'a>>) {
    let Signature { params, results } = signature;
    for param in params.iter_mut().chain(results.iter_mut()) {
        out.extend(param.names.iter_mut().map(NodeMut::Ident));
    }
}

fn stmt_children_mut<'a>(stmt: &'a mut Stmt, out: &mut Vec<NodeMut<'a>>) {
    match &mut stmt.value {
        StmtKind::Expr(expr) | StmtKind::Defer(expr) | StmtKind::Go(expr) => {
            out.push(NodeMut::Expr(expr))
        }
        StmtKind::Assign { lhs, rhs, .. } => {
            out.extend(lhs.iter_mut().chain(rhs.iter_mut()).map(NodeMut::Expr));
        }
        StmtKind::IncDec { target, .. } => out.push(NodeMut::Expr(target)),
        StmtKind::Value(decl) => out.push(NodeMut::Value(decl)),
        StmtKind::Type(decl) => out.push(NodeMut::Type(decl)),
        StmtKind::Return(values) => out.extend(values.iter_mut().map(NodeMut::Expr)),
        StmtKind::If {
            init,
            cond,
            then,
            otherwise,
        } => {
            if let Some(init) = init {
                out.push(NodeMut::Stmt(init));
            }
            out.push(NodeMut::Expr(cond));
            out.push(NodeMut::Block(then));
            if let Some(otherwise) = otherwise {
                out.push(NodeMut::Stmt(otherwise));
            }
        }
        StmtKind::For { header, body } => {
            match header {
                ForHeader::Infinite => {}
                ForHeader::Cond(cond) => out.push(NodeMut::Expr(cond)),
                ForHeader::Clause { init, cond, post } => {
                    if let Some(init) = init {
                        out.push(NodeMut::Stmt(init));
                    }
                    if let Some(cond) = cond {
                        out.push(NodeMut::Expr(cond));
                    }
                    if let Some(post) = post {
                        out.push(NodeMut::Stmt(post));
                    }
                }
                ForHeader::Range {
                    key, value, expr, ..
                } => {
                    out.extend(key.iter_mut().chain(value.iter_mut()).map(NodeMut::Expr));
                    out.push(NodeMut::Expr(expr));
                }
            }
            out.push(NodeMut::Block(body));
        }
        StmtKind::Break(label) | StmtKind::Continue(label) => {
            out.extend(label.iter_mut().map(NodeMut::Ident));
        }
        StmtKind::Send { channel, value } => {
            out.push(NodeMut::Expr(channel));
            out.push(NodeMut::Expr(value));
        }
        StmtKind::Switch { init, tag, clauses } => {
            out.extend(init.iter_mut().map(|init| NodeMut::Stmt(init)));
            out.extend(tag.iter_mut().map(NodeMut::Expr));
            case_children_mut(clauses, out);
        }
        StmtKind::TypeSwitch {
            init,
            binding,
            subject,
            clauses,
        } => {
            out.extend(init.iter_mut().map(|init| NodeMut::Stmt(init)));
            out.extend(binding.iter_mut().map(NodeMut::Ident));
            out.push(NodeMut::Expr(subject));
            case_children_mut(clauses, out);
        }
        StmtKind::Select(clauses) => {
            for clause in clauses.iter_mut() {
                let CommClause { comm, body, .. } = clause;
                out.extend(comm.iter_mut().map(|comm| NodeMut::Stmt(comm)));
                out.push(NodeMut::Block(body));
            }
        }
        StmtKind::Labeled { label, stmt } => {
            out.push(NodeMut::Ident(label));
            out.extend(stmt.iter_mut().map(|stmt| NodeMut::Stmt(stmt)));
        }
        StmtKind::Goto(label) => out.push(NodeMut::Ident(label)),
        StmtKind::Fallthrough => {}
        StmtKind::Block(block) => out.push(NodeMut::Block(block)),
    }
}

fn case_children_mut<'a>(clauses: &'a mut [CaseClause], out: &mut Vec<NodeMut<'a>>) {
    for clause in clauses.iter_mut() {
        let CaseClause { values, body, .. } = clause;
        out.extend(values.iter_mut().map(NodeMut::Expr));
        out.push(NodeMut::Block(body));
    }
}

fn expr_children_mut<'a>(expr: &'a mut Expr, out: &mut Vec<NodeMut<'a>>) {
    match &mut expr.value {
        ExprKind::Ident(_) | ExprKind::Literal(_) | ExprKind::Type(_) => {}
        ExprKind::Composite { elements, .. } => {
            for element in elements.iter_mut() {
                let Element { key, value } = element;
                out.extend(key.iter_mut().map(NodeMut::Expr));
                out.push(NodeMut::Expr(value));
            }
        }
        ExprKind::FuncLit { signature, body } => {
            signature_names_mut(signature, out);
            out.push(NodeMut::Block(body));
        }
        ExprKind::Paren(inner) => out.push(NodeMut::Expr(inner)),
        ExprKind::Selector { base, .. } | ExprKind::TypeAssert { base, .. } => {
            out.push(NodeMut::Expr(base))
        }
        ExprKind::Index { base, index } => {
            out.push(NodeMut::Expr(base));
            out.push(NodeMut::Expr(index));
        }
        ExprKind::Slice { base, low, high } => {
            out.push(NodeMut::Expr(base));
            out.extend(
                low.iter_mut()
                    .chain(high.iter_mut())
                    .map(|e| NodeMut::Expr(&mut **e)),
            );
        }
        ExprKind::Call { func, args, .. } => {
            out.push(NodeMut::Expr(func));
            out.extend(args.iter_mut().map(NodeMut::Expr));
        }
        ExprKind::Unary { operand, .. } => out.push(NodeMut::Expr(operand)),
        ExprKind::Binary { lhs, rhs, .. } => {
            out.push(NodeMut::Expr(lhs));
            out.push(NodeMut::Expr(rhs));
        }
    }
}

// ============================================================================
// CURSORS AND PATHS
// ============================================================================

/// Child indices from the root down to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TreePath(pub Vec<usize>);

/// A node together with the chain of its ancestors.
#[derive(Debug)]
pub struct Cursor<'a> {
    node: NodeRef<'a>,
    parent: Option<Rc<Cursor<'a>>>,
    index: usize,
}

impl<'a> Cursor<'a> {
    pub fn root(node: NodeRef<'a>) -> Rc<Self> {
        Rc::new(Self {
            node,
            parent: None,
            index: 0,
        })
    }

    fn child(parent: &Rc<Self>, node: NodeRef<'a>, index: usize) -> Rc<Self> {
        Rc::new(Self {
            node,
            parent: Some(Rc::clone(parent)),
            index,
        })
    }

    pub fn node(&self) -> NodeRef<'a> {
        self.node
    }

    pub fn parent(&self) -> Option<&Rc<Cursor<'a>>> {
        self.parent.as_ref()
    }

    /// Position of this node among its parent's children.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> TreePath {
        let mut indices = Vec::new();
        let mut current = self;
        while let Some(parent) = &current.parent {
            indices.push(current.index);
            current = parent;
        }
        indices.reverse();
        TreePath(indices)
    }

    fn push_children(self: &Rc<Self>, stack: &mut Vec<Rc<Cursor<'a>>>) {
        let children = self.node.children();
        for (index, child) in children.into_iter().enumerate().rev() {
            stack.push(Cursor::child(self, child, index));
        }
    }
}

// ============================================================================
// TRAVERSAL
// ============================================================================

/// Pre-order traversal. The visitor returns `false` to skip a node's children.
pub fn visit<'a, F>(root: NodeRef<'a>, mut visitor: F)
where
    F: FnMut(&Rc<Cursor<'a>>) -> bool,
{
    let mut stack = vec![Cursor::root(root)];
    while let Some(cursor) = stack.pop() {
        if visitor(&cursor) {
            cursor.push_children(&mut stack);
        }
    }
}

/// Lazy pre-order search. Dropping the iterator early leaves nothing behind.
pub fn filter<'a, P>(root: NodeRef<'a>, predicate: P) -> Filter<'a, P>
where
    P: FnMut(NodeRef<'a>) -> bool,
{
    Filter {
        stack: vec![Cursor::root(root)],
        predicate,
    }
}

pub struct Filter<'a, P> {
    stack: Vec<Rc<Cursor<'a>>>,
    predicate: P,
}

impl<'a, P> Iterator for Filter<'a, P>
where
    P: FnMut(NodeRef<'a>) -> bool,
{
    type Item = Rc<Cursor<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(cursor) = self.stack.pop() {
            cursor.push_children(&mut self.stack);
            if (self.predicate)(cursor.node) {
                return Some(cursor);
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no enclosing node matched before reaching the root")]
pub struct NotFound;

/// Nearest strict ancestor of `cursor` accepted by `predicate`.
pub fn nearest_ancestor<'a, P>(cursor: &Rc<Cursor<'a>>, mut predicate: P) -> Result<Rc<Cursor<'a>>, NotFound>
where
    P: FnMut(NodeRef<'a>) -> bool,
{
    let mut current = cursor.parent.clone();
    while let Some(candidate) = current {
        if predicate(candidate.node) {
            return Ok(candidate);
        }
        current = candidate.parent.clone();
    }
    Err(NotFound)
}

/// Follows `path` from the file root and returns the block it names.
pub fn resolve_block_mut<'a>(file: &'a mut SourceFile, path: &TreePath) -> Option<&'a mut Block> {
    let mut node = NodeMut::File(file);
    for &index in &path.0 {
        node = node.into_children().into_iter().nth(index)?;
    }
    match node {
        NodeMut::Block(block) => Some(block),
        _ => None,
    }
}

pub fn is_block(node: NodeRef<'_>) -> bool {
    matches!(node, NodeRef::Block(_))
}

pub fn is_function(node: NodeRef<'_>) -> bool {
    matches!(
        node.kind(),
        NodeKind::FunctionDecl | NodeKind::FuncLiteral
    )
}
