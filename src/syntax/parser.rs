//! guardex parser.
//!
//! Turns Go source into the owned syntax tree of [`crate::ast`]. The text is
//! first run through [`insert_terminators`], then parsed with the pest grammar
//! in `grammar.pest`; binary operators are folded by a Pratt parser using Go's
//! five precedence levels. Purely syntactic: no name resolution, no types.

use once_cell::sync::Lazy;
use pest::error::{Error, InputLocation};
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;

use crate::ast::*;
use crate::errors::{ErrorReporting, GuardError, PhaseContext, SourceContext};
use crate::syntax::lexer::insert_terminators;

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct GoParser;

static PRATT: Lazy<PrattParser<Rule>> = Lazy::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::lor, Assoc::Left))
        .op(Op::infix(Rule::land, Assoc::Left))
        .op(Op::infix(Rule::eq, Assoc::Left)
            | Op::infix(Rule::ne, Assoc::Left)
            | Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::le, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left)
            | Op::infix(Rule::ge, Assoc::Left))
        .op(Op::infix(Rule::add, Assoc::Left)
            | Op::infix(Rule::sub, Assoc::Left)
            | Op::infix(Rule::or, Assoc::Left)
            | Op::infix(Rule::xor, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left)
            | Op::infix(Rule::div, Assoc::Left)
            | Op::infix(Rule::rem, Assoc::Left)
            | Op::infix(Rule::shl, Assoc::Left)
            | Op::infix(Rule::shr, Assoc::Left)
            | Op::infix(Rule::and_not, Assoc::Left)
            | Op::infix(Rule::band, Assoc::Left))
});

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse one Go source file.
pub fn parse(source: &SourceContext) -> Result<SourceFile, GuardError> {
    let context = PhaseContext::new(source.clone(), "parse");
    let prepared = insert_terminators(&source.content);
    let mut pairs = GoParser::parse(Rule::file, &prepared)
        .map_err(|e| convert_parse_error(e, &context))?;
    let builder = TreeBuilder { context: &context };
    let file = builder.expect(&mut pairs, "file", Span::new(0, prepared.len()))?;
    builder.build_file(file)
}

fn convert_parse_error(error: Error<Rule>, context: &PhaseContext) -> GuardError {
    let span = match error.location {
        InputLocation::Pos(pos) => pos..pos,
        InputLocation::Span((start, end)) => start..end,
    };
    let message = error.variant.message().replace('\u{1E}', "end of line");
    context
        .syntax_error(message, span.into())
        .with_help("guardex accepts a subset of Go: type parameters and generic instantiation are not supported")
}

fn span_of(pair: &Pair<Rule>) -> Span {
    let span = pair.as_span();
    Span::new(span.start(), span.end())
}

// ============================================================================
// TREE BUILDER
// ============================================================================

struct TreeBuilder<'c> {
    context: &'c PhaseContext,
}

impl<'c> TreeBuilder<'c> {
    fn expect<'i>(
        &self,
        pairs: &mut Pairs<'i, Rule>,
        what: &str,
        span: Span,
    ) -> Result<Pair<'i, Rule>, GuardError> {
        pairs
            .next()
            .ok_or_else(|| self.context.internal_error(format!("grammar produced no {what}"), span))
    }

    fn unexpected(&self, pair: &Pair<Rule>) -> GuardError {
        self.context
            .internal_error(format!("unexpected {:?} in syntax tree", pair.as_rule()), span_of(pair))
    }

    fn ident(&self, pair: Pair<Rule>) -> Ident {
        Ident {
            name: pair.as_str().to_string(),
            span: span_of(&pair),
        }
    }

    fn ident_list(&self, pair: Pair<Rule>) -> Vec<Ident> {
        pair.into_inner().map(|p| self.ident(p)).collect()
    }

    // ---- file level -------------------------------------------------------

    fn build_file(&self, pair: Pair<Rule>) -> Result<SourceFile, GuardError> {
        let span = span_of(&pair);
        let mut inner = pair.into_inner();
        let package_clause = self.expect(&mut inner, "package clause", span)?;
        let package_span = span_of(&package_clause);
        let package = self.ident(self.expect(&mut package_clause.into_inner(), "package name", package_span)?);

        let mut imports = Vec::new();
        let mut decls = Vec::new();
        for pair in inner {
            match pair.as_rule() {
                Rule::import_decl => {
                    for spec in pair.into_inner() {
                        match spec.as_rule() {
                            Rule::import_group => {
                                for spec in spec.into_inner() {
                                    imports.push(self.build_import(spec)?);
                                }
                            }
                            _ => imports.push(self.build_import(spec)?),
                        }
                    }
                }
                Rule::func_decl => decls.push(Decl::Func(self.build_func_decl(pair)?)),
                Rule::value_decl => decls.push(Decl::Value(self.build_value_decl(pair)?)),
                Rule::type_decl => decls.push(Decl::Type(self.build_type_decl(pair)?)),
                Rule::EOI => {}
                _ => return Err(self.unexpected(&pair)),
            }
        }
        Ok(SourceFile {
            package,
            imports,
            decls,
            span,
        })
    }

    fn build_import(&self, pair: Pair<Rule>) -> Result<ImportSpec, GuardError> {
        let span = span_of(&pair);
        let mut alias = None;
        let mut path = None;
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::import_alias => alias = Some(part.as_str().to_string()),
                Rule::string_lit => path = Some(part.as_str().to_string()),
                _ => return Err(self.unexpected(&part)),
            }
        }
        let path = path.ok_or_else(|| self.context.internal_error("import without a path", span))?;
        Ok(ImportSpec { alias, path, span })
    }

    // ---- declarations -----------------------------------------------------

    fn build_func_decl(&self, pair: Pair<Rule>) -> Result<FuncDecl, GuardError> {
        let span = span_of(&pair);
        let mut receiver = None;
        let mut name = None;
        let mut signature = Signature::default();
        let mut body = None;
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::receiver => {
                    let part_span = span_of(&part);
                    let param = self.expect(&mut part.into_inner(), "receiver", part_span)?;
                    receiver = Some(self.build_param(param)?);
                }
                Rule::ident => name = Some(self.ident(part)),
                Rule::signature => signature = self.build_signature(part)?,
                Rule::block => body = Some(self.build_block(part)?),
                _ => return Err(self.unexpected(&part)),
            }
        }
        let name = name.ok_or_else(|| self.context.internal_error("function without a name", span))?;
        Ok(FuncDecl {
            receiver,
            name,
            signature,
            body,
            span,
        })
    }

    fn build_signature(&self, pair: Pair<Rule>) -> Result<Signature, GuardError> {
        let mut signature = Signature::default();
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::parameters => signature.params = self.build_parameters(part)?,
                Rule::results => {
                    let span = span_of(&part);
                    let result = self.expect(&mut part.into_inner(), "result", span)?;
                    signature.results = match result.as_rule() {
                        Rule::parameters => self.build_parameters(result)?,
                        _ => vec![Param {
                            names: Vec::new(),
                            ty: self.build_type(result)?,
                            variadic: false,
                        }],
                    };
                }
                _ => return Err(self.unexpected(&part)),
            }
        }
        Ok(signature)
    }

    fn build_parameters(&self, pair: Pair<Rule>) -> Result<Vec<Param>, GuardError> {
        pair.into_inner().map(|p| self.build_param(p)).collect()
    }

    fn build_param(&self, pair: Pair<Rule>) -> Result<Param, GuardError> {
        let span = span_of(&pair);
        let mut names = Vec::new();
        let mut variadic = false;
        let mut ty = None;
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::ident_list => names = self.ident_list(part),
                Rule::variadic => variadic = true,
                _ => ty = Some(self.build_type(part)?),
            }
        }
        let ty = ty.ok_or_else(|| self.context.internal_error("parameter without a type", span))?;
        Ok(Param {
            names,
            ty,
            variadic,
        })
    }

    fn build_value_decl(&self, pair: Pair<Rule>) -> Result<ValueDecl, GuardError> {
        let span = span_of(&pair);
        let mut inner = pair.into_inner();
        let keyword = match self.expect(&mut inner, "keyword", span)?.as_str() {
            "const" => ValueKeyword::Const,
            _ => ValueKeyword::Var,
        };
        let body = self.expect(&mut inner, "declaration body", span)?;
        let (specs, grouped) = match body.as_rule() {
            Rule::value_group => (
                body.into_inner()
                    .map(|p| self.build_value_spec(p))
                    .collect::<Result<_, _>>()?,
                true,
            ),
            _ => (vec![self.build_value_spec(body)?], false),
        };
        Ok(ValueDecl {
            keyword,
            specs,
            grouped,
            span,
        })
    }

    fn build_value_spec(&self, pair: Pair<Rule>) -> Result<ValueSpec, GuardError> {
        let mut spec = ValueSpec {
            names: Vec::new(),
            ty: None,
            values: Vec::new(),
        };
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::ident_list => spec.names = self.ident_list(part),
                Rule::type_expr => spec.ty = Some(self.build_type(part)?),
                Rule::expr_list => spec.values = self.build_expr_list(part)?,
                _ => return Err(self.unexpected(&part)),
            }
        }
        Ok(spec)
    }

    fn build_type_decl(&self, pair: Pair<Rule>) -> Result<TypeDecl, GuardError> {
        let span = span_of(&pair);
        let body = self.expect(&mut pair.into_inner(), "type declaration", span)?;
        let (specs, grouped) = match body.as_rule() {
            Rule::type_group => (
                body.into_inner()
                    .map(|p| self.build_type_spec(p))
                    .collect::<Result<_, _>>()?,
                true,
            ),
            _ => (vec![self.build_type_spec(body)?], false),
        };
        Ok(TypeDecl {
            specs,
            grouped,
            span,
        })
    }

    fn build_type_spec(&self, pair: Pair<Rule>) -> Result<TypeSpec, GuardError> {
        let span = span_of(&pair);
        let mut name = None;
        let mut alias = false;
        let mut ty = None;
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::ident => name = Some(self.ident(part)),
                Rule::type_alias => alias = true,
                _ => ty = Some(self.build_type(part)?),
            }
        }
        match (name, ty) {
            (Some(name), Some(ty)) => Ok(TypeSpec { name, alias, ty }),
            _ => Err(self.context.internal_error("incomplete type specification", span)),
        }
    }

    // ---- types ------------------------------------------------------------

    fn build_type(&self, pair: Pair<Rule>) -> Result<TypeExpr, GuardError> {
        let span = span_of(&pair);
        let rule = pair.as_rule();
        match rule {
            Rule::type_expr => {
                let inner = self.expect(&mut pair.into_inner(), "type", span)?;
                self.build_type(inner)
            }
            Rule::type_name => Ok(make_named_type(pair.as_str())),
            Rule::pointer_type | Rule::slice_type => {
                let elem = self.build_type(self.expect(&mut pair.into_inner(), "element type", span)?)?;
                Ok(match rule {
                    Rule::pointer_type => TypeExpr::Pointer(Box::new(elem)),
                    _ => TypeExpr::Slice(Box::new(elem)),
                })
            }
            Rule::array_type => {
                let mut inner = pair.into_inner();
                let len = self.expect(&mut inner, "array length", span)?.as_str().trim().to_string();
                let elem = self.build_type(self.expect(&mut inner, "element type", span)?)?;
                Ok(TypeExpr::Array {
                    len,
                    elem: Box::new(elem),
                })
            }
            Rule::map_type => {
                let mut inner = pair.into_inner();
                let key = self.build_type(self.expect(&mut inner, "key type", span)?)?;
                let value = self.build_type(self.expect(&mut inner, "value type", span)?)?;
                Ok(TypeExpr::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                })
            }
            Rule::chan_type => {
                let mut inner = pair.into_inner();
                let dir_text = self.expect(&mut inner, "channel direction", span)?.as_str().to_string();
                let dir = if dir_text.starts_with("<-") {
                    ChanDir::Recv
                } else if dir_text.ends_with("<-") {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                let elem = self.build_type(self.expect(&mut inner, "element type", span)?)?;
                Ok(TypeExpr::Chan {
                    dir,
                    elem: Box::new(elem),
                })
            }
            Rule::func_type => {
                let signature = self.build_signature(self.expect(&mut pair.into_inner(), "signature", span)?)?;
                Ok(TypeExpr::Func(Box::new(signature)))
            }
            Rule::struct_type => {
                let fields = pair
                    .into_inner()
                    .map(|p| self.build_field(p))
                    .collect::<Result<_, _>>()?;
                Ok(TypeExpr::Struct(fields))
            }
            Rule::interface_type => {
                let mut elems = Vec::new();
                for part in pair.into_inner() {
                    elems.push(match part.as_rule() {
                        Rule::method_spec => {
                            let part_span = span_of(&part);
                            let mut inner = part.into_inner();
                            let name = self.ident(self.expect(&mut inner, "method name", part_span)?);
                            let signature =
                                self.build_signature(self.expect(&mut inner, "signature", part_span)?)?;
                            InterfaceElem::Method { name, signature }
                        }
                        _ => InterfaceElem::Embed(self.build_type(part)?),
                    });
                }
                Ok(TypeExpr::Interface(elems))
            }
            _ => Err(self.unexpected(&pair)),
        }
    }

    fn build_field(&self, pair: Pair<Rule>) -> Result<Field, GuardError> {
        let span = span_of(&pair);
        let mut names = Vec::new();
        let mut ty = None;
        let mut tag = None;
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::ident_list => names = self.ident_list(part),
                Rule::type_expr => ty = Some(self.build_type(part)?),
                Rule::embedded_field => {
                    let mut pointer = false;
                    for piece in part.into_inner() {
                        match piece.as_rule() {
                            Rule::embedded_ptr => pointer = true,
                            _ => ty = Some(self.build_type(piece)?),
                        }
                    }
                    if pointer {
                        ty = ty.map(|t| TypeExpr::Pointer(Box::new(t)));
                    }
                }
                Rule::string_lit => tag = Some(part.as_str().to_string()),
                _ => return Err(self.unexpected(&part)),
            }
        }
        let ty = ty.ok_or_else(|| self.context.internal_error("field without a type", span))?;
        Ok(Field { names, ty, tag })
    }

    // ---- statements -------------------------------------------------------

    fn build_block(&self, pair: Pair<Rule>) -> Result<Block, GuardError> {
        let span = span_of(&pair);
        let stmts = pair
            .into_inner()
            .map(|p| self.build_stmt(p))
            .collect::<Result<_, _>>()?;
        Ok(Block { stmts, span })
    }

    fn build_stmt(&self, pair: Pair<Rule>) -> Result<Stmt, GuardError> {
        let span = span_of(&pair);
        let value = match pair.as_rule() {
            Rule::simple_stmt | Rule::header_stmt => return self.build_simple_stmt(pair),
            Rule::value_decl => StmtKind::Value(self.build_value_decl(pair)?),
            Rule::type_decl => StmtKind::Type(self.build_type_decl(pair)?),
            Rule::return_stmt => {
                let values = match pair.into_inner().next() {
                    Some(list) => self.build_expr_list(list)?,
                    None => Vec::new(),
                };
                StmtKind::Return(values)
            }
            Rule::if_stmt => self.build_if(pair)?,
            Rule::for_stmt => self.build_for(pair)?,
            Rule::defer_stmt => {
                StmtKind::Defer(self.build_expr(self.expect(&mut pair.into_inner(), "deferred call", span)?)?)
            }
            Rule::go_stmt => StmtKind::Go(self.build_expr(self.expect(&mut pair.into_inner(), "go call", span)?)?),
            Rule::break_stmt => StmtKind::Break(pair.into_inner().next().map(|p| self.ident(p))),
            Rule::continue_stmt => StmtKind::Continue(pair.into_inner().next().map(|p| self.ident(p))),
            Rule::goto_stmt => StmtKind::Goto(self.ident(self.expect(&mut pair.into_inner(), "label", span)?)),
            Rule::fallthrough_stmt => StmtKind::Fallthrough,
            Rule::switch_stmt => self.build_switch(pair)?,
            Rule::select_stmt => self.build_select(pair)?,
            Rule::labeled_stmt => {
                let mut inner = pair.into_inner();
                let label = self.ident(self.expect(&mut inner, "label", span)?);
                let stmt = match inner.next() {
                    Some(stmt) => Some(Box::new(self.build_stmt(stmt)?)),
                    None => None,
                };
                StmtKind::Labeled { label, stmt }
            }
            Rule::block => StmtKind::Block(self.build_block(pair)?),
            _ => return Err(self.unexpected(&pair)),
        };
        Ok(Spanned { value, span })
    }

    fn build_simple_stmt(&self, pair: Pair<Rule>) -> Result<Stmt, GuardError> {
        let span = span_of(&pair);
        let mut inner = pair.into_inner();
        let mut lhs = self.build_expr_list(self.expect(&mut inner, "expression", span)?)?;
        let value = match inner.next() {
            None => {
                if lhs.len() != 1 {
                    return Err(self.context.syntax_error(
                        "an expression list is not a statement",
                        crate::errors::to_source_span(span),
                    ));
                }
                StmtKind::Expr(lhs.remove(0))
            }
            Some(op) if op.as_rule() == Rule::inc_dec => {
                if lhs.len() != 1 {
                    return Err(self.context.syntax_error(
                        "increment needs a single operand",
                        crate::errors::to_source_span(span),
                    ));
                }
                StmtKind::IncDec {
                    target: lhs.remove(0),
                    increment: op.as_str() == "++",
                }
            }
            Some(op) if op.as_rule() == Rule::send_op => {
                if lhs.len() != 1 {
                    return Err(self.context.syntax_error(
                        "a send needs a single channel",
                        crate::errors::to_source_span(span),
                    ));
                }
                let value = self.build_expr(self.expect(&mut inner, "sent value", span)?)?;
                StmtKind::Send {
                    channel: lhs.remove(0),
                    value,
                }
            }
            Some(op) => {
                let op_span = span_of(&op);
                let op = AssignOp::from_token(op.as_str())
                    .ok_or_else(|| self.context.internal_error("unknown assignment operator", op_span))?;
                let rhs = self.build_expr_list(self.expect(&mut inner, "right-hand side", span)?)?;
                StmtKind::Assign { lhs, op, rhs }
            }
        };
        Ok(Spanned { value, span })
    }

    fn build_switch(&self, pair: Pair<Rule>) -> Result<StmtKind, GuardError> {
        let mut init = None;
        let mut tag = None;
        let mut guard = None;
        let mut clauses = Vec::new();
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::header_stmt => init = Some(Box::new(self.build_simple_stmt(part)?)),
                Rule::header_expr => tag = Some(self.build_expr(part)?),
                Rule::type_switch_guard => {
                    let span = span_of(&part);
                    let mut binding = None;
                    let mut subject = None;
                    for inner in part.into_inner() {
                        match inner.as_rule() {
                            Rule::ident => binding = Some(self.ident(inner)),
                            Rule::header_primary => subject = Some(self.build_expr(inner)?),
                            _ => return Err(self.unexpected(&inner)),
                        }
                    }
                    let subject =
                        subject.ok_or_else(|| self.context.internal_error("type switch without a subject", span))?;
                    guard = Some((binding, subject));
                }
                Rule::case_clause => clauses.push(self.build_case_clause(part)?),
                _ => return Err(self.unexpected(&part)),
            }
        }
        Ok(match guard {
            Some((binding, subject)) => StmtKind::TypeSwitch {
                init,
                binding,
                subject,
                clauses,
            },
            None => StmtKind::Switch { init, tag, clauses },
        })
    }

    fn build_case_clause(&self, pair: Pair<Rule>) -> Result<CaseClause, GuardError> {
        let span = span_of(&pair);
        let mut values = Vec::new();
        let mut body = None;
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::expr_list => values = self.build_expr_list(part)?,
                Rule::clause_body => body = Some(self.build_block(part)?),
                _ => return Err(self.unexpected(&part)),
            }
        }
        let body = body.ok_or_else(|| self.context.internal_error("case clause without a body", span))?;
        Ok(CaseClause { values, body, span })
    }

    fn build_select(&self, pair: Pair<Rule>) -> Result<StmtKind, GuardError> {
        let mut clauses = Vec::new();
        for clause in pair.into_inner() {
            let span = span_of(&clause);
            let mut comm = None;
            let mut body = None;
            for part in clause.into_inner() {
                match part.as_rule() {
                    Rule::simple_stmt => comm = Some(Box::new(self.build_simple_stmt(part)?)),
                    Rule::clause_body => body = Some(self.build_block(part)?),
                    _ => return Err(self.unexpected(&part)),
                }
            }
            let body = body.ok_or_else(|| self.context.internal_error("select case without a body", span))?;
            clauses.push(CommClause { comm, body, span });
        }
        Ok(StmtKind::Select(clauses))
    }

    fn build_if(&self, pair: Pair<Rule>) -> Result<StmtKind, GuardError> {
        let span = span_of(&pair);
        let mut init = None;
        let mut cond = None;
        let mut then = None;
        let mut otherwise = None;
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::header_stmt => init = Some(Box::new(self.build_simple_stmt(part)?)),
                Rule::header_expr => cond = Some(self.build_expr(part)?),
                Rule::block if then.is_none() => then = Some(self.build_block(part)?),
                Rule::block | Rule::if_stmt => otherwise = Some(Box::new(self.build_stmt(part)?)),
                _ => return Err(self.unexpected(&part)),
            }
        }
        match (cond, then) {
            (Some(cond), Some(then)) => Ok(StmtKind::If {
                init,
                cond,
                then,
                otherwise,
            }),
            _ => Err(self.context.internal_error("incomplete if statement", span)),
        }
    }

    fn build_for(&self, pair: Pair<Rule>) -> Result<StmtKind, GuardError> {
        let span = span_of(&pair);
        let mut header = ForHeader::Infinite;
        let mut body = None;
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::header_expr => header = ForHeader::Cond(self.build_expr(part)?),
                Rule::for_clause => {
                    let mut init = None;
                    let mut cond = None;
                    let mut post = None;
                    for piece in part.into_inner() {
                        let piece_span = span_of(&piece);
                        let rule = piece.as_rule();
                        let inner = self.expect(&mut piece.into_inner(), "loop clause", piece_span)?;
                        match rule {
                            Rule::for_init => init = Some(Box::new(self.build_simple_stmt(inner)?)),
                            Rule::for_cond => cond = Some(self.build_expr(inner)?),
                            Rule::for_post => post = Some(Box::new(self.build_simple_stmt(inner)?)),
                            _ => return Err(self.unexpected(&inner)),
                        }
                    }
                    header = ForHeader::Clause { init, cond, post };
                }
                Rule::range_clause => header = self.build_range(part)?,
                Rule::block => body = Some(self.build_block(part)?),
                _ => return Err(self.unexpected(&part)),
            }
        }
        let body = body.ok_or_else(|| self.context.internal_error("loop without a body", span))?;
        Ok(StmtKind::For { header, body })
    }

    fn build_range(&self, pair: Pair<Rule>) -> Result<ForHeader, GuardError> {
        let span = span_of(&pair);
        let mut targets = Vec::new();
        let mut define = false;
        let mut expr = None;
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::header_expr_list => targets = self.build_expr_list(part)?,
                Rule::range_op => define = part.as_str() == ":=",
                Rule::header_expr => expr = Some(self.build_expr(part)?),
                _ => return Err(self.unexpected(&part)),
            }
        }
        if targets.len() > 2 {
            return Err(self.context.syntax_error(
                "range permits at most two iteration variables",
                crate::errors::to_source_span(span),
            ));
        }
        let mut targets = targets.into_iter();
        let expr = expr.ok_or_else(|| self.context.internal_error("range without an operand", span))?;
        Ok(ForHeader::Range {
            key: targets.next(),
            value: targets.next(),
            define,
            expr,
        })
    }

    // ---- expressions ------------------------------------------------------

    fn build_expr_list(&self, pair: Pair<Rule>) -> Result<Vec<Expr>, GuardError> {
        pair.into_inner().map(|p| self.build_expr(p)).collect()
    }

    fn build_expr(&self, pair: Pair<Rule>) -> Result<Expr, GuardError> {
        let span = span_of(&pair);
        match pair.as_rule() {
            Rule::expr | Rule::header_expr => PRATT
                .map_primary(|primary| self.build_expr(primary))
                .map_infix(|lhs, op, rhs| {
                    let (lhs, rhs) = (lhs?, rhs?);
                    let op = binary_op(op.as_rule())
                        .ok_or_else(|| self.context.internal_error("unknown binary operator", span_of(&op)))?;
                    let span = lhs.span.join(rhs.span);
                    Ok(make_binary(op, lhs, rhs, span))
                })
                .parse(pair.into_inner()),
            Rule::unary_expr | Rule::header_unary => self.build_unary(pair),
            Rule::primary_expr | Rule::header_primary => self.build_primary(pair),
            Rule::int_lit => Ok(literal(LitKind::Int, &pair)),
            Rule::float_lit => Ok(literal(LitKind::Float, &pair)),
            Rule::rune_lit => Ok(literal(LitKind::Rune, &pair)),
            Rule::string_lit => Ok(literal(LitKind::String, &pair)),
            Rule::ident => Ok(make_ident(pair.as_str(), span)),
            Rule::composite_lit | Rule::literal_composite => {
                let mut inner = pair.into_inner();
                let ty = self.build_type(self.expect(&mut inner, "literal type", span)?)?;
                let body = self.expect(&mut inner, "literal body", span)?;
                Ok(Spanned {
                    value: ExprKind::Composite {
                        ty: Some(ty),
                        elements: self.build_elements(body)?,
                    },
                    span,
                })
            }
            Rule::composite_body => Ok(Spanned {
                value: ExprKind::Composite {
                    ty: None,
                    elements: self.build_elements(pair)?,
                },
                span,
            }),
            Rule::func_lit => {
                let mut inner = pair.into_inner();
                let signature = self.build_signature(self.expect(&mut inner, "signature", span)?)?;
                let body = self.build_block(self.expect(&mut inner, "body", span)?)?;
                Ok(Spanned {
                    value: ExprKind::FuncLit { signature, body },
                    span,
                })
            }
            Rule::type_operand => {
                let ty = self.build_type(self.expect(&mut pair.into_inner(), "type", span)?)?;
                Ok(Spanned {
                    value: ExprKind::Type(ty),
                    span,
                })
            }
            Rule::paren_expr => {
                let inner = self.build_expr(self.expect(&mut pair.into_inner(), "expression", span)?)?;
                Ok(Spanned {
                    value: ExprKind::Paren(Box::new(inner)),
                    span,
                })
            }
            _ => Err(self.unexpected(&pair)),
        }
    }

    fn build_elements(&self, body: Pair<Rule>) -> Result<Vec<Element>, GuardError> {
        let mut elements = Vec::new();
        for element in body.into_inner() {
            let element_span = span_of(&element);
            let mut key = None;
            let mut value = None;
            for part in element.into_inner() {
                let part_span = span_of(&part);
                let rule = part.as_rule();
                let expr = self.build_expr(self.expect(&mut part.into_inner(), "element", part_span)?)?;
                match rule {
                    Rule::element_key => key = Some(expr),
                    _ => value = Some(expr),
                }
            }
            let value = value.ok_or_else(|| self.context.internal_error("element without a value", element_span))?;
            elements.push(Element { key, value });
        }
        Ok(elements)
    }

    fn build_unary(&self, pair: Pair<Rule>) -> Result<Expr, GuardError> {
        let mut ops = Vec::new();
        let mut operand = None;
        let span = span_of(&pair);
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::unary_op => ops.push((unary_op(part.as_str()), span_of(&part))),
                _ => operand = Some(self.build_expr(part)?),
            }
        }
        let mut expr = operand.ok_or_else(|| self.context.internal_error("operator without an operand", span))?;
        for (op, op_span) in ops.into_iter().rev() {
            let span = op_span.join(expr.span);
            expr = Spanned {
                value: ExprKind::Unary {
                    op,
                    operand: Box::new(expr),
                },
                span,
            };
        }
        Ok(expr)
    }

    fn build_primary(&self, pair: Pair<Rule>) -> Result<Expr, GuardError> {
        let span = span_of(&pair);
        let mut inner = pair.into_inner();
        let mut expr = self.build_expr(self.expect(&mut inner, "operand", span)?)?;
        for postfix in inner {
            let span = expr.span.join(span_of(&postfix));
            let base = Box::new(expr);
            let value = match postfix.as_rule() {
                Rule::call_args => {
                    let mut args = Vec::new();
                    let mut spread = false;
                    for arg in postfix.into_inner() {
                        match arg.as_rule() {
                            Rule::ellipsis => spread = true,
                            _ => args.push(self.build_expr(arg)?),
                        }
                    }
                    ExprKind::Call {
                        func: base,
                        args,
                        spread,
                    }
                }
                Rule::selector => {
                    let postfix_span = span_of(&postfix);
                    let field = self.ident(self.expect(&mut postfix.into_inner(), "field", postfix_span)?);
                    ExprKind::Selector { base, field }
                }
                Rule::type_assert => {
                    let postfix_span = span_of(&postfix);
                    let ty = self.build_type(self.expect(&mut postfix.into_inner(), "type", postfix_span)?)?;
                    ExprKind::TypeAssert { base, ty }
                }
                Rule::index_suffix => {
                    let postfix_span = span_of(&postfix);
                    let index = self.build_expr(self.expect(&mut postfix.into_inner(), "index", postfix_span)?)?;
                    ExprKind::Index {
                        base,
                        index: Box::new(index),
                    }
                }
                Rule::slice_suffix => {
                    let mut low = None;
                    let mut high = None;
                    for bound in postfix.into_inner() {
                        let bound_span = span_of(&bound);
                        let rule = bound.as_rule();
                        let value = self.build_expr(self.expect(&mut bound.into_inner(), "bound", bound_span)?)?;
                        match rule {
                            Rule::slice_low => low = Some(Box::new(value)),
                            _ => high = Some(Box::new(value)),
                        }
                    }
                    ExprKind::Slice { base, low, high }
                }
                _ => return Err(self.unexpected(&postfix)),
            };
            expr = Spanned { value, span };
        }
        Ok(expr)
    }
}

fn literal(kind: LitKind, pair: &Pair<Rule>) -> Expr {
    Spanned {
        value: ExprKind::Literal(Literal {
            kind,
            raw: pair.as_str().to_string(),
        }),
        span: span_of(pair),
    }
}

fn unary_op(token: &str) -> UnaryOp {
    match token {
        "<-" => UnaryOp::Recv,
        "!" => UnaryOp::Not,
        "-" => UnaryOp::Neg,
        "+" => UnaryOp::Plus,
        "^" => UnaryOp::BitNot,
        "*" => UnaryOp::Deref,
        _ => UnaryOp::AddrOf,
    }
}

fn binary_op(rule: Rule) -> Option<BinaryOp> {
    Some(match rule {
        Rule::lor => BinaryOp::LogOr,
        Rule::land => BinaryOp::LogAnd,
        Rule::eq => BinaryOp::Eq,
        Rule::ne => BinaryOp::Ne,
        Rule::lt => BinaryOp::Lt,
        Rule::le => BinaryOp::Le,
        Rule::gt => BinaryOp::Gt,
        Rule::ge => BinaryOp::Ge,
        Rule::add => BinaryOp::Add,
        Rule::sub => BinaryOp::Sub,
        Rule::or => BinaryOp::Or,
        Rule::xor => BinaryOp::Xor,
        Rule::mul => BinaryOp::Mul,
        Rule::div => BinaryOp::Quo,
        Rule::rem => BinaryOp::Rem,
        Rule::shl => BinaryOp::Shl,
        Rule::shr => BinaryOp::Shr,
        Rule::band => BinaryOp::And,
        Rule::and_not => BinaryOp::AndNot,
        _ => return None,
    })
}
