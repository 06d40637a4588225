//! guardex error handling.
//!
//! Hard failures are `GuardError` values built through an `ErrorReporting`
//! context; soft findings are `Warning` values collected by the expander and
//! rendered with miette at the edge of the program.

use miette::{Diagnostic, LabeledSpan, NamedSource, Severity, SourceSpan};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::ast::Span;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// The text and display name of the file an error or warning points into.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    /// Create a source context from real file content
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Create a fallback when no source file is involved (I/O, config, build)
    pub fn fallback(context: &str) -> Self {
        Self {
            name: "guardex".to_string(),
            content: format!("// {}", context),
        }
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::fallback("default context")
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// The single error type of the crate
#[derive(Debug)]
pub struct GuardError {
    /// What went wrong
    pub kind: ErrorKind,
    /// Where it happened
    pub source_info: SourceInfo,
    /// How to help
    pub diagnostic_info: DiagnosticInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    // Front end
    #[error("syntax error: {message}")]
    Syntax { message: String },

    // Expansion
    #[error("malformed guard call: {reason}")]
    MalformedGuardCall { reason: String },
    #[error("internal consistency failure: {message}")]
    InternalConsistency { message: String },

    // Environment
    #[error("i/o error on '{path}': {message}")]
    Io { path: String, message: String },
    #[error("invalid configuration: {message}")]
    Config { message: String },
    #[error("build failed: {message}")]
    Build { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Expansion,
    Internal,
    Environment,
}

impl ErrorKind {
    /// Get the error category for test assertions
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Syntax { .. } => ErrorCategory::Parse,
            Self::MalformedGuardCall { .. } => ErrorCategory::Expansion,
            Self::InternalConsistency { .. } => ErrorCategory::Internal,
            Self::Io { .. } | Self::Config { .. } | Self::Build { .. } => {
                ErrorCategory::Environment
            }
        }
    }

    /// Get error code suffix for diagnostic codes
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "syntax",
            Self::MalformedGuardCall { .. } => "malformed_guard_call",
            Self::InternalConsistency { .. } => "internal_consistency",
            Self::Io { .. } => "io",
            Self::Config { .. } => "config",
            Self::Build { .. } => "build",
        }
    }

    fn primary_label(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "unexpected input",
            Self::MalformedGuardCall { .. } => "malformed guard call",
            Self::InternalConsistency { .. } => "inconsistent tree here",
            Self::Io { .. } | Self::Config { .. } | Self::Build { .. } => "here",
        }
    }
}

/// Context-specific source information
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
    pub phase: String,
}

/// Diagnostic enhancement data
#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

impl GuardError {
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.diagnostic_info.help = Some(help.into());
        self
    }

    /// Errors raised outside of any source file: I/O, configuration, build.
    pub fn environment(kind: ErrorKind) -> Self {
        PhaseContext::new(SourceContext::fallback(&kind.to_string()), "env").report(kind, unspanned())
    }

    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        Self::environment(ErrorKind::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        })
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::environment(ErrorKind::Config {
            message: message.into(),
        })
    }

    pub fn build(message: impl Into<String>) -> Self {
        Self::environment(ErrorKind::Build {
            message: message.into(),
        })
    }
}

impl std::error::Error for GuardError {}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl Diagnostic for GuardError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.kind.primary_label().to_string()),
            self.source_info.primary_span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source_info.source)
    }
}

/// Context-aware error creation - each context knows its source and phase
pub trait ErrorReporting {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> GuardError;

    fn syntax_error(&self, message: impl Into<String>, span: SourceSpan) -> GuardError
    where
        Self: Sized,
    {
        self.report(
            ErrorKind::Syntax {
                message: message.into(),
            },
            span,
        )
    }

    fn malformed_guard(&self, reason: impl Into<String>, span: Span) -> GuardError
    where
        Self: Sized,
    {
        self.report(
            ErrorKind::MalformedGuardCall {
                reason: reason.into(),
            },
            to_source_span(span),
        )
        .with_help("guard takes a call expression first, e.g. guard(f(x), FATAL)")
    }

    /// Engine bugs or front-end/engine mismatches, never user errors.
    fn internal_error(&self, message: impl Into<String>, span: Span) -> GuardError
    where
        Self: Sized,
    {
        self.report(
            ErrorKind::InternalConsistency {
                message: message.into(),
            },
            to_source_span(span),
        )
        .with_help("This is an internal guardex error. Please report it as a bug.")
    }
}

/// General-purpose error creation context: a source file plus the phase
/// (`parse`, `expand`, ...) that is reporting.
pub struct PhaseContext {
    pub source: SourceContext,
    pub phase: String,
}

impl PhaseContext {
    pub fn new(source: SourceContext, phase: impl Into<String>) -> Self {
        Self {
            source,
            phase: phase.into(),
        }
    }
}

impl ErrorReporting for PhaseContext {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> GuardError {
        let error_code = format!("guardex::{}::{}", self.phase, kind.code_suffix());
        GuardError {
            kind,
            source_info: SourceInfo {
                source: self.source.to_named_source(),
                primary_span: span,
                phase: self.phase.clone(),
            },
            diagnostic_info: DiagnosticInfo {
                help: None,
                error_code,
            },
        }
    }
}

// ============================================================================
// WARNINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WarningKind {
    /// Conflicting or redundant policy arguments on one guard call
    AmbiguousPolicy,
    /// A guard identifier survived expansion
    ResidueDetected,
    /// A later declaration collides with the synthesized capture variable
    HygieneConflict,
}

impl WarningKind {
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::AmbiguousPolicy => "ambiguous_policy",
            Self::ResidueDetected => "residue_detected",
            Self::HygieneConflict => "hygiene_conflict",
        }
    }
}

/// A non-fatal finding. Collected during expansion, surfaced afterwards.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    pub span: Option<Span>,
    source: Option<Arc<NamedSource<String>>>,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            source: None,
        }
    }

    pub fn with_source(mut self, source: Arc<NamedSource<String>>) -> Self {
        self.source = Some(source);
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Warning {}

impl Diagnostic for Warning {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("guardex::warning::{}", self.kind.code_suffix())))
    }

    fn severity(&self) -> Option<Severity> {
        Some(Severity::Warning)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        self.source.as_ref()?;
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            None,
            to_source_span(span),
        ))))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source
            .as_ref()
            .map(|s| &**s as &dyn miette::SourceCode)
    }
}

// ============================================================================
// SPAN HELPERS
// ============================================================================

/// Placeholder span for errors not tied to a source location.
pub fn unspanned() -> SourceSpan {
    SourceSpan::from(0..0)
}

pub fn to_source_span(span: Span) -> SourceSpan {
    SourceSpan::from(span.start..span.end)
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// Prints a GuardError with full miette diagnostics
pub fn print_error(error: GuardError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}

/// Prints a warning with miette diagnostics
pub fn print_warning(warning: &Warning) {
    use miette::Report;
    let report = Report::new(warning.clone());
    eprintln!("{report:?}");
}
