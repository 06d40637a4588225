//! # Guard Macro Expansion
//!
//! `guard(call(), ...)` is a pseudo-call: it never reaches the build tool.
//! Every occurrence in a supported statement shape is rewritten into the
//! explicit form the language needs:
//!
//! ```text
//! x := guard(load(path), "loading", path)
//!
//! var err error
//! x, err := load(path)
//! if err != nil {
//!     log.Print("loading", path, err)
//!     var ret0 int
//!     return ret0, err
//! }
//! ```
//!
//! The work is split the way the pipeline runs:
//!
//! - [`recognizer`] finds guard statements and pulls their arguments apart.
//! - [`policy`] picks abort, propagate or handler from the arguments and the
//!   enclosing function's results.
//! - [`codegen`] builds the replacement statements and keeps the capture
//!   variable declared once per block.
//! - [`expander`] drives the three over a whole file.
//!
//! Expansion is purely syntactic: no type information is consulted, and the
//! guard is identified by name.

use miette::{NamedSource, SourceSpan};
use std::sync::Arc;

use crate::ast::{AssignOp, Block, Expr, Stmt};
use crate::config::ExpandConfig;
use crate::errors::{
    DiagnosticInfo, ErrorKind, ErrorReporting, GuardError, SourceContext, SourceInfo, Warning,
};

pub mod codegen;
pub mod expander;
pub mod policy;
pub mod recognizer;

pub use codegen::{ArityTable, CodeGenerator, Expansion};
pub use expander::{expand, ExpandReport};
pub use policy::{resolve, ExpansionPolicy, ReturnShape};
pub use recognizer::recognize;

// ============================================================================
// SECTION 1: CORE DATA STRUCTURES
// ============================================================================

/// Explicit policy argument of a guard call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyToken {
    Fatal,
    Return,
}

/// Left-hand side of a guard statement written as an assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub lhs: Vec<Expr>,
    /// `=` or `:=`
    pub op: AssignOp,
}

/// One recognized guard statement.
#[derive(Debug, Clone)]
pub struct GuardCall {
    /// The fallible call, parentheses removed
    pub inner: Expr,
    pub policy: Option<PolicyToken>,
    /// Extra arguments logged ahead of the error
    pub log_values: Vec<Expr>,
    /// Body of an inline closure argument
    pub handler: Option<Block>,
    /// The statement being replaced
    pub statement: Stmt,
    pub binding: Option<Binding>,
    /// Findings made while pulling the arguments apart
    pub warnings: Vec<Warning>,
}

// ============================================================================
// SECTION 2: EXPANSION CONTEXT
// ============================================================================

/// Configuration and source of the file being expanded.
pub struct MacroContext<'a> {
    pub config: &'a ExpandConfig,
    source: Arc<NamedSource<String>>,
}

impl<'a> MacroContext<'a> {
    pub fn new(config: &'a ExpandConfig, source: &SourceContext) -> Self {
        Self {
            config,
            source: source.to_named_source(),
        }
    }

    pub fn source(&self) -> Arc<NamedSource<String>> {
        Arc::clone(&self.source)
    }
}

impl ErrorReporting for MacroContext<'_> {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> GuardError {
        let error_code = format!("guardex::expand::{}", kind.code_suffix());
        GuardError {
            kind,
            source_info: SourceInfo {
                source: self.source(),
                primary_span: span,
                phase: "expand".to_string(),
            },
            diagnostic_info: DiagnosticInfo {
                help: None,
                error_code,
            },
        }
    }
}
