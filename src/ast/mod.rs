//! Syntax tree for the supported Go subset.
//!
//! The tree is fully owned: the expander rewrites block statement lists in
//! place, and parent relationships are computed on demand by [`tree`].

use serde::{Deserialize, Serialize};

pub mod builder;
pub mod tree;

pub use builder::*;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Byte range in the source text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn join(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Wrapper for carrying source span information with any value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

pub type Stmt = Spanned<StmtKind>;
pub type Expr = Spanned<ExprKind>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFile {
    pub package: Ident,
    pub imports: Vec<ImportSpec>,
    pub decls: Vec<Decl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSpec {
    /// `_`, `.`, or a renaming identifier
    pub alias: Option<String>,
    /// The quoted path exactly as written
    pub path: String,
    pub span: Span,
}

impl ImportSpec {
    /// Unquoted import path.
    pub fn path_value(&self) -> &str {
        self.path.trim_matches(|c| c == '"' || c == '`')
    }

    /// Name under which the package is referenced in the file.
    pub fn local_name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => self.path_value().rsplit('/').next().unwrap_or_default(),
        }
    }
}

// ============================================================================
// DECLARATIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Decl {
    Func(FuncDecl),
    Value(ValueDecl),
    Type(TypeDecl),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuncDecl {
    pub receiver: Option<Param>,
    pub name: Ident,
    pub signature: Signature,
    /// `None` for body-less declarations
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Signature {
    pub params: Vec<Param>,
    pub results: Vec<Param>,
}

impl Signature {
    /// Number of values a call returns: named groups count once per name.
    pub fn result_count(&self) -> usize {
        self.results.iter().map(Param::arity).sum()
    }
}

/// One parameter group: `a, b int`, `xs ...string`, or an unnamed `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub names: Vec<Ident>,
    pub ty: TypeExpr,
    pub variadic: bool,
}

impl Param {
    pub fn arity(&self) -> usize {
        self.names.len().max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueKeyword {
    Var,
    Const,
}

impl ValueKeyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Var => "var",
            Self::Const => "const",
        }
    }
}

/// `var`/`const` declaration, single or parenthesized group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueDecl {
    pub keyword: ValueKeyword,
    pub specs: Vec<ValueSpec>,
    pub grouped: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueSpec {
    pub names: Vec<Ident>,
    pub ty: Option<TypeExpr>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDecl {
    pub specs: Vec<TypeSpec>,
    pub grouped: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSpec {
    pub name: Ident,
    pub alias: bool,
    pub ty: TypeExpr,
}

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeExpr {
    Named {
        package: Option<String>,
        name: String,
    },
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    Array {
        /// Length as written, `...` included
        len: String,
        elem: Box<TypeExpr>,
    },
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    Chan {
        dir: ChanDir,
        elem: Box<TypeExpr>,
    },
    Func(Box<Signature>),
    Struct(Vec<Field>),
    Interface(Vec<InterfaceElem>),
}

impl TypeExpr {
    pub fn is_named(&self, wanted: &str) -> bool {
        matches!(self, TypeExpr::Named { package: None, name } if name == wanted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Empty for embedded fields
    pub names: Vec<Ident>,
    pub ty: TypeExpr,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InterfaceElem {
    Method { name: Ident, signature: Signature },
    Embed(TypeExpr),
}

// ============================================================================
// STATEMENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StmtKind {
    Expr(Expr),
    Assign {
        lhs: Vec<Expr>,
        op: AssignOp,
        rhs: Vec<Expr>,
    },
    IncDec {
        target: Expr,
        increment: bool,
    },
    /// `ch <- value`
    Send {
        channel: Expr,
        value: Expr,
    },
    Value(ValueDecl),
    Type(TypeDecl),
    Return(Vec<Expr>),
    If {
        init: Option<Box<Stmt>>,
        cond: Expr,
        then: Block,
        /// Either another `If` or a `Block` statement
        otherwise: Option<Box<Stmt>>,
    },
    For {
        header: ForHeader,
        body: Block,
    },
    /// Expression switch; `tag` is absent for `switch {`
    Switch {
        init: Option<Box<Stmt>>,
        tag: Option<Expr>,
        clauses: Vec<CaseClause>,
    },
    /// `switch v := x.(type) {`; clause values are types in expression form
    TypeSwitch {
        init: Option<Box<Stmt>>,
        binding: Option<Ident>,
        subject: Expr,
        clauses: Vec<CaseClause>,
    },
    Select(Vec<CommClause>),
    Labeled {
        label: Ident,
        stmt: Option<Box<Stmt>>,
    },
    Defer(Expr),
    Go(Expr),
    Break(Option<Ident>),
    Continue(Option<Ident>),
    Goto(Ident),
    Fallthrough,
    Block(Block),
}

/// `case a, b:` or, with no values, `default:`.
///
/// The body is the clause's implicit block; it prints without braces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseClause {
    pub values: Vec<Expr>,
    pub body: Block,
    pub span: Span,
}

/// `case v := <-ch:`, `case ch <- v:` or, with no communication, `default:`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommClause {
    pub comm: Option<Box<Stmt>>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ForHeader {
    Infinite,
    Cond(Expr),
    Clause {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
    },
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        expr: Expr,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssignOp {
    Assign,
    Define,
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Define => ":=",
            Self::Add => "+=",
            Self::Sub => "-=",
            Self::Mul => "*=",
            Self::Quo => "/=",
            Self::Rem => "%=",
            Self::And => "&=",
            Self::Or => "|=",
            Self::Xor => "^=",
            Self::Shl => "<<=",
            Self::Shr => ">>=",
            Self::AndNot => "&^=",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "=" => Self::Assign,
            ":=" => Self::Define,
            "+=" => Self::Add,
            "-=" => Self::Sub,
            "*=" => Self::Mul,
            "/=" => Self::Quo,
            "%=" => Self::Rem,
            "&=" => Self::And,
            "|=" => Self::Or,
            "^=" => Self::Xor,
            "<<=" => Self::Shl,
            ">>=" => Self::Shr,
            "&^=" => Self::AndNot,
            _ => return None,
        })
    }
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    Ident(String),
    Literal(Literal),
    /// `T{...}`; the type is elided for nested element bodies
    Composite {
        ty: Option<TypeExpr>,
        elements: Vec<Element>,
    },
    FuncLit {
        signature: Signature,
        body: Block,
    },
    Paren(Box<Expr>),
    Selector {
        base: Box<Expr>,
        field: Ident,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        base: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
    },
    TypeAssert {
        base: Box<Expr>,
        ty: TypeExpr,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        spread: bool,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// A type in operand position: `make([]int, n)`, `[]byte(s)`
    Type(TypeExpr),
}

impl ExprKind {
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Literal {
    pub kind: LitKind,
    /// Source text of the literal, quotes included
    pub raw: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LitKind {
    Int,
    Float,
    Rune,
    String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub key: Option<Expr>,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    Deref,
    AddrOf,
    Recv,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Plus => "+",
            Self::Not => "!",
            Self::BitNot => "^",
            Self::Deref => "*",
            Self::AddrOf => "&",
            Self::Recv => "<-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    LogOr,
    LogAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Or,
    Xor,
    Mul,
    Quo,
    Rem,
    Shl,
    Shr,
    And,
    AndNot,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LogOr => "||",
            Self::LogAnd => "&&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Mul => "*",
            Self::Quo => "/",
            Self::Rem => "%",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::And => "&",
            Self::AndNot => "&^",
        }
    }
}
